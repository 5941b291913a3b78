//! Code for managing SCR_EL3 (*Secure Configuration Register*)

use crate::register::{SysReg, SysRegRead, SysRegWrite};

/// SCR_EL3 (*Secure Configuration Register*)
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScrEl3 {
    /// Execution state for the next lower level is AArch64
    #[bit(10, rw)]
    rw: bool,
    /// Secure instruction fetch
    #[bit(9, rw)]
    sif: bool,
    /// Hypervisor Call instruction enable
    #[bit(8, rw)]
    hce: bool,
    /// Secure Monitor Call disable
    #[bit(7, rw)]
    smd: bool,
    /// Reserved, RES1 on Armv8.0
    #[bit(5, rw)]
    res1_5: bool,
    /// Reserved, RES1 on Armv8.0
    #[bit(4, rw)]
    res1_4: bool,
    /// Route external aborts and SError to EL3
    #[bit(3, rw)]
    ea: bool,
    /// Route FIQ to EL3
    #[bit(2, rw)]
    fiq: bool,
    /// Route IRQ to EL3
    #[bit(1, rw)]
    irq: bool,
    /// Lower levels are Non-secure
    #[bit(0, rw)]
    ns: bool,
}

/// Every programmable field of [`ScrEl3`]
///
/// Build one with struct-literal syntax so that no field is left to a reset
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrConfig {
    pub non_secure: bool,
    pub route_irq_to_el3: bool,
    pub route_fiq_to_el3: bool,
    pub route_external_abort_to_el3: bool,
    pub smc_disabled: bool,
    pub hvc_enabled: bool,
    pub secure_instruction_fetch_only: bool,
    pub lower_level_aarch64: bool,
}

impl ScrEl3 {
    /// Bits that must read as one
    pub const RES1: u64 = (1 << 5) | (1 << 4);

    /// Compose a value from a complete field list, forcing the RES1 bits
    pub const fn from_config(config: ScrConfig) -> ScrEl3 {
        ScrEl3::new_with_raw_value(0)
            .with_res1_5(true)
            .with_res1_4(true)
            .with_ns(config.non_secure)
            .with_irq(config.route_irq_to_el3)
            .with_fiq(config.route_fiq_to_el3)
            .with_ea(config.route_external_abort_to_el3)
            .with_smd(config.smc_disabled)
            .with_hce(config.hvc_enabled)
            .with_sif(config.secure_instruction_fetch_only)
            .with_rw(config.lower_level_aarch64)
    }
}

impl SysReg for ScrEl3 {
    const OP0: u32 = 3;
    const OP1: u32 = 6;
    const CRN: u32 = 1;
    const CRM: u32 = 1;
    const OP2: u32 = 0;
}
impl crate::register::SysRegRead for ScrEl3 {}
impl ScrEl3 {
    #[inline]
    /// Reads SCR_EL3 (*Secure Configuration Register*)
    ///
    /// Only accessible at EL3.
    pub fn read() -> ScrEl3 {
        Self::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}
impl crate::register::SysRegWrite for ScrEl3 {}
impl ScrEl3 {
    #[inline]
    /// Writes SCR_EL3 (*Secure Configuration Register*)
    ///
    /// # Safety
    ///
    /// Must be at EL3, and the value must be appropriate for the lower levels
    /// about to run.
    pub unsafe fn write(value: Self) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

impl core::fmt::Debug for ScrEl3 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "SCR_EL3 {{ RW={} SIF={} HCE={} SMD={} EA={} FIQ={} IRQ={} NS={} }}",
            self.rw() as u8,
            self.sif() as u8,
            self.hce() as u8,
            self.smd() as u8,
            self.ea() as u8,
            self.fiq() as u8,
            self.irq() as u8,
            self.ns() as u8,
        )
    }
}
