//! Code for managing the EL2 generic timer controls

use crate::register::{SysReg, SysRegWrite};

/// CNTHCTL_EL2 (*Counter-timer Hypervisor Control Register*)
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CnthctlEl2 {
    /// EL0/EL1 access to the physical timer registers is not trapped
    #[bit(1, rw)]
    el1pcen: bool,
    /// EL0/EL1 access to the physical counter is not trapped
    #[bit(0, rw)]
    el1pcten: bool,
}

impl CnthctlEl2 {
    /// Give EL1 untrapped access to the physical counter and timer
    pub const EL1_TIMER_ACCESS: CnthctlEl2 = CnthctlEl2::new_with_raw_value(0)
        .with_el1pcen(true)
        .with_el1pcten(true);
}

impl SysReg for CnthctlEl2 {
    const OP0: u32 = 3;
    const OP1: u32 = 4;
    const CRN: u32 = 14;
    const CRM: u32 = 1;
    const OP2: u32 = 0;
}
impl crate::register::SysRegWrite for CnthctlEl2 {}
impl CnthctlEl2 {
    #[inline]
    /// Writes CNTHCTL_EL2 (*Counter-timer Hypervisor Control Register*)
    ///
    /// # Safety
    ///
    /// Must be at EL2 or EL3.
    pub unsafe fn write(value: Self) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

impl core::fmt::Debug for CnthctlEl2 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "CNTHCTL_EL2 {{ EL1PCEN={} EL1PCTEN={} }}",
            self.el1pcen() as u8,
            self.el1pcten() as u8
        )
    }
}

/// CNTVOFF_EL2 (*Counter-timer Virtual Offset Register*)
///
/// A plain 64-bit offset, so there is no value type.
pub struct CntvoffEl2;

impl SysReg for CntvoffEl2 {
    const OP0: u32 = 3;
    const OP1: u32 = 4;
    const CRN: u32 = 14;
    const CRM: u32 = 0;
    const OP2: u32 = 3;
}
impl crate::register::SysRegWrite for CntvoffEl2 {}
impl CntvoffEl2 {
    #[inline]
    /// Writes CNTVOFF_EL2 (*Counter-timer Virtual Offset Register*)
    ///
    /// # Safety
    ///
    /// Must be at EL2 or EL3.
    pub unsafe fn write(offset: u64) {
        unsafe {
            <Self as SysRegWrite>::write_raw(offset);
        }
    }
}
