//! Code for managing SCTLR_EL2 (*System Control Register (EL2)*)

use crate::register::{Endianness, SysReg, SysRegRead, SysRegWrite};

/// SCTLR_EL2 (*System Control Register (EL2)*), with `HCR_EL2.E2H` clear
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SctlrEl2 {
    /// Endianness of EL2 data accesses and table walks
    #[bit(25, rw)]
    ee: bool,
    /// Write permission implies execute-never
    #[bit(19, rw)]
    wxn: bool,
    /// Instruction cache enable
    #[bit(12, rw)]
    i: bool,
    /// Stack alignment check
    #[bit(3, rw)]
    sa: bool,
    /// Data cache enable
    #[bit(2, rw)]
    c: bool,
    /// Alignment check enable
    #[bit(1, rw)]
    a: bool,
    /// MMU enable for the EL2 stage 1 translation regime
    #[bit(0, rw)]
    m: bool,
}

/// Every programmable field of [`SctlrEl2`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SctlrEl2Config {
    pub endianness: Endianness,
    pub write_implies_execute_never: bool,
    pub instruction_cache: bool,
    pub stack_alignment_check: bool,
    pub data_cache: bool,
    pub alignment_check: bool,
    pub mmu: bool,
}

impl SctlrEl2 {
    /// Bits that must read as one
    pub const RES1: u64 = (1 << 29)
        | (1 << 28)
        | (1 << 23)
        | (1 << 22)
        | (1 << 18)
        | (1 << 16)
        | (1 << 11)
        | (1 << 5)
        | (1 << 4);

    /// Compose a value from a complete field list, forcing the RES1 bits
    pub const fn from_config(config: SctlrEl2Config) -> SctlrEl2 {
        SctlrEl2::new_with_raw_value(SctlrEl2::RES1)
            .with_ee(config.endianness.is_big())
            .with_wxn(config.write_implies_execute_never)
            .with_i(config.instruction_cache)
            .with_sa(config.stack_alignment_check)
            .with_c(config.data_cache)
            .with_a(config.alignment_check)
            .with_m(config.mmu)
    }

    /// Endianness of EL2 data accesses
    pub const fn endianness(&self) -> Endianness {
        Endianness::from_bit(self.ee())
    }
}

impl SysReg for SctlrEl2 {
    const OP0: u32 = 3;
    const OP1: u32 = 4;
    const CRN: u32 = 1;
    const CRM: u32 = 0;
    const OP2: u32 = 0;
}
impl crate::register::SysRegRead for SctlrEl2 {}
impl SctlrEl2 {
    #[inline]
    /// Reads SCTLR_EL2 (*System Control Register (EL2)*)
    pub fn read() -> SctlrEl2 {
        Self::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}
impl crate::register::SysRegWrite for SctlrEl2 {}
impl SctlrEl2 {
    #[inline]
    /// Writes SCTLR_EL2 (*System Control Register (EL2)*)
    ///
    /// # Safety
    ///
    /// Must be at EL2 or EL3. Written at EL2, it changes how the running code
    /// executes, and an `ISB` must follow.
    pub unsafe fn write(value: Self) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

impl core::fmt::Debug for SctlrEl2 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "SCTLR_EL2 {{ EE={} WXN={} I={} SA={} C={} A={} M={} }}",
            self.ee() as u8,
            self.wxn() as u8,
            self.i() as u8,
            self.sa() as u8,
            self.c() as u8,
            self.a() as u8,
            self.m() as u8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bits_survive_any_config() {
        let all = SctlrEl2::from_config(SctlrEl2Config {
            endianness: Endianness::Big,
            write_implies_execute_never: true,
            instruction_cache: true,
            stack_alignment_check: true,
            data_cache: true,
            alignment_check: true,
            mmu: true,
        });
        assert_eq!(all.raw_value(), SctlrEl2::RES1 | (1 << 25) | (1 << 19) | (1 << 12) | 0b1111);
        assert_eq!(all.endianness(), Endianness::Big);

        let none = SctlrEl2::from_config(SctlrEl2Config {
            endianness: Endianness::Little,
            write_implies_execute_never: false,
            instruction_cache: false,
            stack_alignment_check: false,
            data_cache: false,
            alignment_check: false,
            mmu: false,
        });
        assert_eq!(none.raw_value(), 0x30C5_0830);
        assert_eq!(
            format!("{:?}", none),
            "SCTLR_EL2 { EE=0 WXN=0 I=0 SA=0 C=0 A=0 M=0 }"
        );
    }
}
