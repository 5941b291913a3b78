//! Code for managing DAIF (*Interrupt Mask Bits*)

use crate::register::{SysReg, SysRegRead, SysRegWrite};

/// DAIF (*Interrupt Mask Bits*)
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Daif {
    /// Debug exceptions masked
    #[bit(9, rw)]
    d: bool,
    /// SError masked
    #[bit(8, rw)]
    a: bool,
    /// IRQ masked
    #[bit(7, rw)]
    i: bool,
    /// FIQ masked
    #[bit(6, rw)]
    f: bool,
}

impl SysReg for Daif {
    const OP0: u32 = 3;
    const OP1: u32 = 3;
    const CRN: u32 = 4;
    const CRM: u32 = 2;
    const OP2: u32 = 1;
}
impl crate::register::SysRegRead for Daif {}
impl Daif {
    #[inline]
    /// Reads DAIF (*Interrupt Mask Bits*)
    pub fn read() -> Daif {
        Self::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}
impl crate::register::SysRegWrite for Daif {}
impl Daif {
    #[inline]
    /// Writes DAIF (*Interrupt Mask Bits*)
    ///
    /// # Safety
    ///
    /// Unmasking lets interrupts in; there must be a vector table to take
    /// them.
    pub unsafe fn write(value: Self) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

impl core::fmt::Debug for Daif {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "DAIF {{ D={} A={} I={} F={} }}",
            self.d() as u8,
            self.a() as u8,
            self.i() as u8,
            self.f() as u8
        )
    }
}
