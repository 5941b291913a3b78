//! Register values for this boot configuration
//!
//! Everything here is a compile-time constant. Each control register value is
//! composed from a complete field list (see the `*Config` types in
//! [`register`](crate::register)), and the `const _: () = assert!(..)` items
//! at the bottom turn a missing RES1 bit or an overlapping field into a build
//! failure.

use crate::register::{
    Endianness, ExceptionMode, Granule, HcrConfig, HcrEl2, MairEl1, PhysicalAddressSize,
    RegimeConfig, ScrConfig, ScrEl3, SctlrConfig, SctlrEl1, SctlrEl2, SctlrEl2Config, Spsr, SpsrConfig, TcrConfig, TcrEl1,
    WalkCacheability,
};

/// Start of the upper (TTBR1_EL1) virtual address region
pub const VA_START: u64 = 0xffff_0000_0000_0000;

/// log2 of the translation granule
pub const PAGE_SHIFT: u32 = 12;
/// log2 of the number of descriptors in one table
pub const TABLE_SHIFT: u32 = 9;
/// log2 of the block mapped by one level 2 descriptor
pub const SECTION_SHIFT: u32 = PAGE_SHIFT + TABLE_SHIFT;

/// Translation granule, 4 KiB
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;
/// One level 2 block, 2 MiB
pub const SECTION_SIZE: u64 = 1 << SECTION_SHIFT;
/// Descriptors per table
pub const ENTRIES_PER_TABLE: usize = 1 << TABLE_SHIFT;

/// Size of the identity-mapped window starting at physical address zero
pub const LOW_MEMORY: u64 = 2 * SECTION_SIZE;
/// Number of level 2 blocks in the window
pub const SECTIONS_IN_WINDOW: usize = (LOW_MEMORY / SECTION_SIZE) as usize;

/// The memory types the boot tables use
///
/// The discriminant is the MAIR_EL1 slot the type lives in, and so the
/// `AttrIndx` every descriptor of that type carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MemoryType {
    /// Device-nGnRnE: strongly ordered, no gathering, no reordering, no
    /// early write acknowledgement. Never executable.
    Device = 0,
    /// Normal memory, inner and outer non-cacheable
    NormalNonCacheable = 1,
}

impl MemoryType {
    /// Every type, in MAIR slot order
    pub const ALL: [MemoryType; 2] = [MemoryType::Device, MemoryType::NormalNonCacheable];

    /// The type used for anything not explicitly classified
    pub const STRICTEST: MemoryType = MemoryType::Device;

    /// MAIR_EL1 slot, and so the descriptor `AttrIndx`
    pub const fn attr_index(self) -> u8 {
        self as u8
    }

    /// The MAIR_EL1 attribute byte
    pub const fn mair_encoding(self) -> u8 {
        match self {
            MemoryType::Device => MT_DEVICE_NGNRNE_FLAGS,
            MemoryType::NormalNonCacheable => MT_NORMAL_NC_FLAGS,
        }
    }

    /// Can instructions be fetched from memory of this type?
    pub const fn executable(self) -> bool {
        match self {
            MemoryType::Device => false,
            MemoryType::NormalNonCacheable => true,
        }
    }
}

/// MAIR attribute byte for Device-nGnRnE
pub const MT_DEVICE_NGNRNE_FLAGS: u8 = 0x00;
/// MAIR attribute byte for Normal, inner/outer non-cacheable
pub const MT_NORMAL_NC_FLAGS: u8 = 0x44;

/// MAIR_EL1 with one slot per [`MemoryType`], every other slot zero
pub const MAIR: MairEl1 = {
    let mut mair = MairEl1::new_with_raw_value(0);
    let mut i = 0;
    while i < MemoryType::ALL.len() {
        let memory = MemoryType::ALL[i];
        mair = mair.with_attr(memory.attr_index(), memory.mair_encoding());
        i += 1;
    }
    mair
};
pub const MAIR_VALUE: u64 = MAIR.raw_value();

/// EL2 configuration: EL1 runs AArch64, nothing is routed or trapped to EL2
pub const HCR: HcrEl2 = HcrEl2::from_config(HcrConfig {
    el1_aarch64: true,
    trap_general_exceptions: false,
    route_serror_to_el2: false,
    route_irq_to_el2: false,
    route_fiq_to_el2: false,
    set_way_invalidation_override: false,
    stage2_translation: false,
});
pub const HCR_VALUE: u64 = HCR.raw_value();

/// EL3 configuration: lower levels Non-secure and AArch64
pub const SCR: ScrEl3 = ScrEl3::from_config(ScrConfig {
    non_secure: true,
    route_irq_to_el3: false,
    route_fiq_to_el3: false,
    route_external_abort_to_el3: false,
    smc_disabled: false,
    hvc_enabled: false,
    secure_instruction_fetch_only: false,
    lower_level_aarch64: true,
});
pub const SCR_VALUE: u64 = SCR.raw_value();

/// EL1 system control while translation is still off
///
/// Little-endian, caches off, EL0 `WFE`/`WFI` not trapped, stack alignment
/// checks on, alignment fault checking off.
pub const SCTLR_MMU_DISABLED: SctlrEl1 = SctlrEl1::from_config(SctlrConfig {
    el1_endianness: Endianness::Little,
    el0_endianness: Endianness::Little,
    pan_unchanged_on_exception: true,
    write_implies_execute_never: false,
    el0_wfe_not_trapped: true,
    el0_wfi_not_trapped: true,
    instruction_cache: false,
    el0_cp15_barriers: true,
    el0_stack_alignment_check: true,
    stack_alignment_check: true,
    data_cache: false,
    alignment_check: false,
    mmu: false,
});
pub const SCTLR_VALUE_MMU_DISABLED: u64 = SCTLR_MMU_DISABLED.raw_value();

/// EL2 system control, written before anything runs at EL2 with it
///
/// Little-endian, translation and caches off, stack alignment checks on.
pub const SCTLR_EL2: SctlrEl2 = SctlrEl2::from_config(SctlrEl2Config {
    endianness: Endianness::Little,
    write_implies_execute_never: false,
    instruction_cache: false,
    stack_alignment_check: true,
    data_cache: false,
    alignment_check: false,
    mmu: false,
});
pub const SCTLR_EL2_VALUE: u64 = SCTLR_EL2.raw_value();

/// Return state for the final drop into the kernel: EL1h, SError/IRQ/FIQ
/// masked
pub const SPSR: Spsr = Spsr::from_config(SpsrConfig {
    mode: ExceptionMode::El1h,
    debug_masked: false,
    serror_masked: true,
    irq_masked: true,
    fiq_masked: true,
});
pub const SPSR_VALUE: u64 = SPSR.raw_value();

/// 48-bit virtual address space and 4 KiB granule for both regions, walks
/// non-cacheable and non-shareable, 32-bit physical addresses
pub const TCR: TcrEl1 = TcrEl1::from_config(TcrConfig {
    lower: REGION,
    upper: REGION,
    asid_from_ttbr1: false,
    physical_address_size: PhysicalAddressSize::Bits32,
});
pub const TCR_VALUE: u64 = TCR.raw_value();

const REGION: RegimeConfig = RegimeConfig {
    va_bits: 48,
    granule: Granule::Kb4,
    inner_cacheability: WalkCacheability::NonCacheable,
    outer_cacheability: WalkCacheability::NonCacheable,
    shareability: 0b00,
    walks_disabled: false,
};

// Symbolic field masks, checked for collisions below.

pub const HCR_RW: u64 = 1 << 31;

pub const SCR_RESERVED: u64 = ScrEl3::RES1;
pub const SCR_RW: u64 = 1 << 10;
pub const SCR_NS: u64 = 1 << 0;

pub const SCTLR_RESERVED: u64 = SctlrEl1::RES1 | (1 << 5) | (1 << 4) | (1 << 3);
pub const SCTLR_SPAN: u64 = 1 << 23;
pub const SCTLR_EE_BIG_ENDIAN: u64 = 1 << 25;
pub const SCTLR_E0E_BIG_ENDIAN: u64 = 1 << 24;
pub const SCTLR_NTWE: u64 = 1 << 18;
pub const SCTLR_NTWI: u64 = 1 << 16;
pub const SCTLR_I_CACHE: u64 = 1 << 12;
pub const SCTLR_D_CACHE: u64 = 1 << 2;
pub const SCTLR_ALIGNMENT_CHECK: u64 = 1 << 1;
pub const SCTLR_MMU_ENABLED: u64 = 1 << 0;

pub const SPSR_MASK_ALL: u64 = 7 << 6;
pub const SPSR_EL1H: u64 = 0b0101;

pub const TCR_T0SZ: u64 = 64 - 48;
pub const TCR_T1SZ: u64 = (64 - 48) << 16;
pub const TCR_TG0_4K: u64 = 0b00 << 14;
pub const TCR_TG1_4K: u64 = 0b10 << 30;

/// True if no two masks in `masks` share a bit
pub const fn disjoint(masks: &[u64]) -> bool {
    let mut seen = 0u64;
    let mut i = 0;
    while i < masks.len() {
        if seen & masks[i] != 0 {
            return false;
        }
        seen |= masks[i];
        i += 1;
    }
    true
}

const _: () = assert!(SECTION_SIZE == PAGE_SIZE << TABLE_SHIFT);
const _: () = assert!(LOW_MEMORY == 2 * SECTION_SIZE);
const _: () = assert!(VA_START >> 48 == 0xFFFF && VA_START << 16 == 0);

const _: () = assert!(disjoint(&[HCR_RW]));
const _: () = assert!(HCR_VALUE == HCR_RW);

const _: () = assert!(disjoint(&[SCR_RESERVED, SCR_RW, SCR_NS]));
const _: () = assert!(SCR_VALUE & ScrEl3::RES1 == ScrEl3::RES1);
const _: () = assert!(SCR_VALUE == SCR_RESERVED | SCR_RW | SCR_NS);

const _: () = assert!(disjoint(&[
    SCTLR_RESERVED,
    SCTLR_SPAN,
    SCTLR_EE_BIG_ENDIAN,
    SCTLR_E0E_BIG_ENDIAN,
    SCTLR_NTWE,
    SCTLR_NTWI,
    SCTLR_I_CACHE,
    SCTLR_D_CACHE,
    SCTLR_ALIGNMENT_CHECK,
    SCTLR_MMU_ENABLED,
]));
const _: () = assert!(SCTLR_VALUE_MMU_DISABLED & SctlrEl1::RES1 == SctlrEl1::RES1);
const _: () = assert!(SCTLR_VALUE_MMU_DISABLED & SCTLR_MMU_ENABLED == 0);
const _: () = assert!(SCTLR_VALUE_MMU_DISABLED & (SCTLR_I_CACHE | SCTLR_D_CACHE) == 0);
const _: () = assert!(
    SCTLR_VALUE_MMU_DISABLED == SCTLR_RESERVED | SCTLR_SPAN | SCTLR_NTWE | SCTLR_NTWI
);

const _: () = assert!(SCTLR_EL2_VALUE & SctlrEl2::RES1 == SctlrEl2::RES1);
const _: () = assert!(
    SCTLR_EL2_VALUE & (SCTLR_MMU_ENABLED | SCTLR_ALIGNMENT_CHECK | SCTLR_D_CACHE | SCTLR_I_CACHE)
        == 0
);
const _: () = assert!(SCTLR_EL2_VALUE & SCTLR_EE_BIG_ENDIAN == 0);

const _: () = assert!(disjoint(&[SPSR_MASK_ALL, SPSR_EL1H]));
const _: () = assert!(SPSR_VALUE == SPSR_MASK_ALL | SPSR_EL1H);

const _: () = assert!(disjoint(&[TCR_T0SZ, TCR_T1SZ, TCR_TG0_4K, TCR_TG1_4K]));
const _: () = assert!(TCR_VALUE == TCR_T0SZ | TCR_T1SZ | TCR_TG0_4K | TCR_TG1_4K);

const _: () = assert!(MAIR.attr(MemoryType::Device as u8) == MT_DEVICE_NGNRNE_FLAGS);
const _: () = assert!(MAIR.attr(MemoryType::NormalNonCacheable as u8) == MT_NORMAL_NC_FLAGS);
const _: () = assert!(MAIR_VALUE == 0x4400);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_exact_values() {
        assert_eq!(HCR_VALUE, 0x8000_0000);
        assert_eq!(SCR_VALUE, 0x431);
        assert_eq!(SCTLR_VALUE_MMU_DISABLED, 0x00C5_0838);
        assert_eq!(SCTLR_EL2_VALUE, 0x30C5_0838);
        assert_eq!(SPSR_VALUE, 0x1C5);
        assert_eq!(TCR_VALUE, 0x8010_0010);
        assert_eq!(MAIR_VALUE, 0x4400);
        assert_eq!(SECTION_SIZE, 0x20_0000);
        assert_eq!(LOW_MEMORY, 0x40_0000);
    }

    #[test]
    fn disabled_phase_sctlr() {
        assert!(!SCTLR_MMU_DISABLED.m());
        assert!(!SCTLR_MMU_DISABLED.c());
        assert!(!SCTLR_MMU_DISABLED.i());
        assert_eq!(SCTLR_MMU_DISABLED.el1_endianness(), Endianness::Little);
        assert_eq!(SCTLR_MMU_DISABLED.el0_endianness(), Endianness::Little);
        assert_eq!(SCTLR_VALUE_MMU_DISABLED & SCTLR_RESERVED, SCTLR_RESERVED);
    }

    #[test]
    fn el2_sctlr_leaves_everything_off() {
        assert!(!SCTLR_EL2.m());
        assert!(!SCTLR_EL2.a());
        assert!(!SCTLR_EL2.c());
        assert!(!SCTLR_EL2.i());
        assert!(!SCTLR_EL2.wxn());
        assert_eq!(SCTLR_EL2.endianness(), Endianness::Little);
    }

    #[test]
    fn tcr_regions() {
        assert_eq!(TCR.lower_va_bits(), 48);
        assert_eq!(TCR.upper_va_bits(), 48);
        assert_eq!(TCR.lower_granule(), Some(Granule::Kb4));
        assert_eq!(TCR.upper_granule(), Some(Granule::Kb4));
    }

    #[test]
    fn memory_types_map_to_their_mair_slots() {
        for memory in MemoryType::ALL {
            assert_eq!(MAIR.attr(memory.attr_index()), memory.mair_encoding());
            assert_eq!(MemoryType::try_from(memory.attr_index()).ok(), Some(memory));
        }
        assert_eq!(MemoryType::STRICTEST, MemoryType::Device);
        assert!(!MemoryType::STRICTEST.executable());
    }

    #[test]
    fn collision_check() {
        assert!(disjoint(&[1, 2, 4]));
        assert!(!disjoint(&[1, 3]));
        assert!(disjoint(&[]));
    }
}
