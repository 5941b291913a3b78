//! Code for managing MAIR_EL1 (*Memory Attribute Indirection Register*)

use crate::register::{SysReg, SysRegRead, SysRegWrite};

/// MAIR_EL1 (*Memory Attribute Indirection Register*)
///
/// Eight attribute bytes. A descriptor's `AttrIndx` field selects one of
/// them.
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MairEl1 {
    #[bits(56..=63, rw)]
    attr7: u8,
    #[bits(48..=55, rw)]
    attr6: u8,
    #[bits(40..=47, rw)]
    attr5: u8,
    #[bits(32..=39, rw)]
    attr4: u8,
    #[bits(24..=31, rw)]
    attr3: u8,
    #[bits(16..=23, rw)]
    attr2: u8,
    #[bits(8..=15, rw)]
    attr1: u8,
    #[bits(0..=7, rw)]
    attr0: u8,
}

impl MairEl1 {
    /// The attribute byte in slot `index`
    ///
    /// Panics if `index` is not in `0..8`.
    pub const fn attr(&self, index: u8) -> u8 {
        assert!(index < 8);
        (self.raw_value() >> (8 * index as u32)) as u8
    }

    /// Replace the attribute byte in slot `index`
    ///
    /// Panics if `index` is not in `0..8`.
    pub const fn with_attr(self, index: u8, encoding: u8) -> MairEl1 {
        assert!(index < 8);
        let shift = 8 * index as u32;
        let raw = (self.raw_value() & !(0xFF << shift)) | ((encoding as u64) << shift);
        MairEl1::new_with_raw_value(raw)
    }
}

impl SysReg for MairEl1 {
    const OP0: u32 = 3;
    const OP1: u32 = 0;
    const CRN: u32 = 10;
    const CRM: u32 = 2;
    const OP2: u32 = 0;
}
impl crate::register::SysRegRead for MairEl1 {}
impl MairEl1 {
    #[inline]
    /// Reads MAIR_EL1 (*Memory Attribute Indirection Register*)
    pub fn read() -> MairEl1 {
        Self::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}
impl crate::register::SysRegWrite for MairEl1 {}
impl MairEl1 {
    #[inline]
    /// Writes MAIR_EL1 (*Memory Attribute Indirection Register*)
    ///
    /// # Safety
    ///
    /// Changing an attribute byte in use by live mappings changes the
    /// memory type of those mappings.
    pub unsafe fn write(value: Self) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

impl core::fmt::Debug for MairEl1 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "MAIR_EL1 {{ {:#04x} {:#04x} {:#04x} {:#04x} {:#04x} {:#04x} {:#04x} {:#04x} }}",
            self.attr0(),
            self.attr1(),
            self.attr2(),
            self.attr3(),
            self.attr4(),
            self.attr5(),
            self.attr6(),
            self.attr7()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_bytes() {
        let mair = MairEl1::new_with_raw_value(0).with_attr(1, 0x44).with_attr(7, 0xFF);
        assert_eq!(mair.raw_value(), 0xFF00_0000_0000_4400);
        assert_eq!(mair.attr(1), 0x44);
        assert_eq!(mair.attr1(), 0x44);
        assert_eq!(mair.attr(0), 0x00);
        assert_eq!(mair.with_attr(1, 0x00).attr(1), 0x00);
    }
}
