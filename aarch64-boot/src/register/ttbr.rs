//! Code for managing TTBR0_EL1 and TTBR1_EL1 (*Translation Table Base Registers*)

use arbitrary_int::u47;

use crate::addr::PhysAddr;
use crate::register::{SysReg, SysRegRead, SysRegWrite};

/// TTBRn_EL1 (*Translation Table Base Register*) value
///
/// Both base registers share this layout. [`Ttbr0El1`] and [`Ttbr1El1`]
/// select which one is accessed.
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ttbr {
    /// Address space identifier
    #[bits(48..=63, rw)]
    asid: u16,
    /// Translation table base address, bits [47:1]
    #[bits(1..=47, rw)]
    baddr: u47,
    /// Common not private
    #[bit(0, rw)]
    cnp: bool,
}

impl Ttbr {
    /// Point at a level 0 table with ASID 0
    ///
    /// Panics if `table` is not 4 KiB aligned or is wider than 48 bits.
    pub const fn for_table(table: PhysAddr) -> Ttbr {
        assert!(table.is_aligned(crate::catalog::PAGE_SIZE));
        assert!(table.as_u64() >> 48 == 0);
        Ttbr::new_with_raw_value(0)
            .with_asid(0)
            .with_baddr(u47::new(table.as_u64() >> 1))
            .with_cnp(false)
    }

    /// The table this value points at
    pub const fn table(&self) -> PhysAddr {
        PhysAddr::new(self.baddr().value() << 1)
    }
}

impl core::fmt::Debug for Ttbr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "TTBR {{ ASID={:#06x} BADDR={:?} CnP={} }}",
            self.asid(),
            self.table(),
            self.cnp() as u8
        )
    }
}

/// TTBR0_EL1, the tables for the lower (identity) region
pub struct Ttbr0El1;

impl SysReg for Ttbr0El1 {
    const OP0: u32 = 3;
    const OP1: u32 = 0;
    const CRN: u32 = 2;
    const CRM: u32 = 0;
    const OP2: u32 = 0;
}
impl crate::register::SysRegRead for Ttbr0El1 {}
impl Ttbr0El1 {
    #[inline]
    /// Reads TTBR0_EL1
    pub fn read() -> Ttbr {
        Ttbr::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}
impl crate::register::SysRegWrite for Ttbr0El1 {}
impl Ttbr0El1 {
    #[inline]
    /// Writes TTBR0_EL1
    ///
    /// # Safety
    ///
    /// The tables must stay valid for as long as they are installed.
    pub unsafe fn write(value: Ttbr) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

/// TTBR1_EL1, the tables for the upper (kernel) region
pub struct Ttbr1El1;

impl SysReg for Ttbr1El1 {
    const OP0: u32 = 3;
    const OP1: u32 = 0;
    const CRN: u32 = 2;
    const CRM: u32 = 0;
    const OP2: u32 = 1;
}
impl crate::register::SysRegRead for Ttbr1El1 {}
impl Ttbr1El1 {
    #[inline]
    /// Reads TTBR1_EL1
    pub fn read() -> Ttbr {
        Ttbr::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}
impl crate::register::SysRegWrite for Ttbr1El1 {}
impl Ttbr1El1 {
    #[inline]
    /// Writes TTBR1_EL1
    ///
    /// # Safety
    ///
    /// The tables must stay valid for as long as they are installed.
    pub unsafe fn write(value: Ttbr) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_address_round_trips() {
        let ttbr = Ttbr::for_table(PhysAddr::new(0x8_3000));
        assert_eq!(ttbr.raw_value(), 0x8_3000);
        assert_eq!(ttbr.table(), PhysAddr::new(0x8_3000));
        assert_eq!(ttbr.asid(), 0);
    }
}
