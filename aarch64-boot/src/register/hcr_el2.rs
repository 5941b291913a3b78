//! Code for managing HCR_EL2 (*Hypervisor Configuration Register*)

use crate::register::{SysReg, SysRegRead, SysRegWrite};

/// HCR_EL2 (*Hypervisor Configuration Register*)
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HcrEl2 {
    /// EL1 executes in AArch64
    #[bit(31, rw)]
    rw: bool,
    /// Trap general exceptions from EL0 to EL2
    #[bit(27, rw)]
    tge: bool,
    /// Route physical SError to EL2
    #[bit(5, rw)]
    amo: bool,
    /// Route physical IRQ to EL2
    #[bit(4, rw)]
    imo: bool,
    /// Route physical FIQ to EL2
    #[bit(3, rw)]
    fmo: bool,
    /// Set/Way invalidation override
    #[bit(1, rw)]
    swio: bool,
    /// Stage 2 translation enable
    #[bit(0, rw)]
    vm: bool,
}

/// Every programmable field of [`HcrEl2`] this crate cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HcrConfig {
    pub el1_aarch64: bool,
    pub trap_general_exceptions: bool,
    pub route_serror_to_el2: bool,
    pub route_irq_to_el2: bool,
    pub route_fiq_to_el2: bool,
    pub set_way_invalidation_override: bool,
    pub stage2_translation: bool,
}

impl HcrEl2 {
    /// Compose a value from a complete field list
    ///
    /// Every bit not named in [`HcrConfig`] is written as zero.
    pub const fn from_config(config: HcrConfig) -> HcrEl2 {
        HcrEl2::new_with_raw_value(0)
            .with_rw(config.el1_aarch64)
            .with_tge(config.trap_general_exceptions)
            .with_amo(config.route_serror_to_el2)
            .with_imo(config.route_irq_to_el2)
            .with_fmo(config.route_fiq_to_el2)
            .with_swio(config.set_way_invalidation_override)
            .with_vm(config.stage2_translation)
    }
}

impl SysReg for HcrEl2 {
    const OP0: u32 = 3;
    const OP1: u32 = 4;
    const CRN: u32 = 1;
    const CRM: u32 = 1;
    const OP2: u32 = 0;
}
impl crate::register::SysRegRead for HcrEl2 {}
impl HcrEl2 {
    #[inline]
    /// Reads HCR_EL2 (*Hypervisor Configuration Register*)
    pub fn read() -> HcrEl2 {
        Self::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}
impl crate::register::SysRegWrite for HcrEl2 {}
impl HcrEl2 {
    #[inline]
    /// Writes HCR_EL2 (*Hypervisor Configuration Register*)
    ///
    /// # Safety
    ///
    /// Must be at EL2 or EL3. Changes how EL1 and EL0 execute.
    pub unsafe fn write(value: Self) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

impl core::fmt::Debug for HcrEl2 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "HCR_EL2 {{ RW={} TGE={} AMO={} IMO={} FMO={} SWIO={} VM={} }}",
            self.rw() as u8,
            self.tge() as u8,
            self.amo() as u8,
            self.imo() as u8,
            self.fmo() as u8,
            self.swio() as u8,
            self.vm() as u8,
        )
    }
}
