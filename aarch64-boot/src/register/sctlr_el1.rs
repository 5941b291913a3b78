//! Code for managing SCTLR_EL1 (*System Control Register*)

use crate::register::{SysReg, SysRegRead, SysRegWrite};

/// Data endianness for a translation regime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    pub(crate) const fn is_big(self) -> bool {
        matches!(self, Endianness::Big)
    }

    pub(crate) const fn from_bit(big: bool) -> Endianness {
        if big {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}

/// SCTLR_EL1 (*System Control Register*)
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SctlrEl1 {
    /// Endianness of EL1 data accesses and table walks
    #[bit(25, rw)]
    ee: bool,
    /// Endianness of EL0 data accesses
    #[bit(24, rw)]
    e0e: bool,
    /// PSTATE.PAN is left unchanged on taking an exception to EL1
    #[bit(23, rw)]
    span: bool,
    /// Reserved, RES1 for this boot configuration
    #[bit(22, rw)]
    res1_22: bool,
    /// Write permission implies execute-never
    #[bit(19, rw)]
    wxn: bool,
    /// EL0 `WFE` is not trapped
    #[bit(18, rw)]
    ntwe: bool,
    /// EL0 `WFI` is not trapped
    #[bit(16, rw)]
    ntwi: bool,
    /// Instruction cache enable
    #[bit(12, rw)]
    i: bool,
    /// Reserved, RES1 for this boot configuration
    #[bit(11, rw)]
    res1_11: bool,
    /// EL0 use of the AArch32 CP15 barrier instructions is enabled
    #[bit(5, rw)]
    cp15ben: bool,
    /// Stack alignment check for EL0
    #[bit(4, rw)]
    sa0: bool,
    /// Stack alignment check
    #[bit(3, rw)]
    sa: bool,
    /// Data cache enable
    #[bit(2, rw)]
    c: bool,
    /// Alignment check enable
    #[bit(1, rw)]
    a: bool,
    /// MMU enable for the EL1&0 stage 1 translation regime
    #[bit(0, rw)]
    m: bool,
}

/// Every programmable field of [`SctlrEl1`]
///
/// Build one with struct-literal syntax so that no field is left to a reset
/// default. Reset values of SCTLR_EL1 are architecturally UNKNOWN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SctlrConfig {
    pub el1_endianness: Endianness,
    pub el0_endianness: Endianness,
    pub pan_unchanged_on_exception: bool,
    pub write_implies_execute_never: bool,
    pub el0_wfe_not_trapped: bool,
    pub el0_wfi_not_trapped: bool,
    pub instruction_cache: bool,
    pub el0_cp15_barriers: bool,
    pub el0_stack_alignment_check: bool,
    pub stack_alignment_check: bool,
    pub data_cache: bool,
    pub alignment_check: bool,
    pub mmu: bool,
}

impl SctlrEl1 {
    /// Bits that must read as one
    pub const RES1: u64 = (1 << 22) | (1 << 11);

    /// Compose a value from a complete field list, forcing the RES1 bits
    pub const fn from_config(config: SctlrConfig) -> SctlrEl1 {
        SctlrEl1::new_with_raw_value(0)
            .with_res1_22(true)
            .with_res1_11(true)
            .with_ee(config.el1_endianness.is_big())
            .with_e0e(config.el0_endianness.is_big())
            .with_span(config.pan_unchanged_on_exception)
            .with_wxn(config.write_implies_execute_never)
            .with_ntwe(config.el0_wfe_not_trapped)
            .with_ntwi(config.el0_wfi_not_trapped)
            .with_i(config.instruction_cache)
            .with_cp15ben(config.el0_cp15_barriers)
            .with_sa0(config.el0_stack_alignment_check)
            .with_sa(config.stack_alignment_check)
            .with_c(config.data_cache)
            .with_a(config.alignment_check)
            .with_m(config.mmu)
    }

    /// Endianness of EL1 data accesses
    pub const fn el1_endianness(&self) -> Endianness {
        Endianness::from_bit(self.ee())
    }

    /// Endianness of EL0 data accesses
    pub const fn el0_endianness(&self) -> Endianness {
        Endianness::from_bit(self.e0e())
    }
}

impl SysReg for SctlrEl1 {
    const OP0: u32 = 3;
    const OP1: u32 = 0;
    const CRN: u32 = 1;
    const CRM: u32 = 0;
    const OP2: u32 = 0;
}
impl crate::register::SysRegRead for SctlrEl1 {}
impl SctlrEl1 {
    #[inline]
    /// Reads SCTLR_EL1 (*System Control Register*)
    pub fn read() -> SctlrEl1 {
        Self::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}
impl crate::register::SysRegWrite for SctlrEl1 {}
impl SctlrEl1 {
    #[inline]
    /// Writes SCTLR_EL1 (*System Control Register*)
    ///
    /// # Safety
    ///
    /// Setting `M` turns on address translation. The instruction stream is
    /// translated from the next fetch onwards, so the code running must be
    /// mapped, and an `ISB` must follow.
    pub unsafe fn write(value: Self) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

impl core::fmt::Debug for SctlrEl1 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "SCTLR_EL1 {{ EE={} E0E={} SPAN={} WXN={} nTWE={} nTWI={} I={} CP15BEN={} SA0={} SA={} C={} A={} M={} }}",
            self.ee() as u8,
            self.e0e() as u8,
            self.span() as u8,
            self.wxn() as u8,
            self.ntwe() as u8,
            self.ntwi() as u8,
            self.i() as u8,
            self.cp15ben() as u8,
            self.sa0() as u8,
            self.sa() as u8,
            self.c() as u8,
            self.a() as u8,
            self.m() as u8,
        )
    }
}
