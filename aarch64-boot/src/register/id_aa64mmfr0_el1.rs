//! Code for reading ID_AA64MMFR0_EL1 (*Memory Model Feature Register 0*)

use arbitrary_int::u4;

use crate::register::{PhysicalAddressSize, SysReg, SysRegRead};

/// ID_AA64MMFR0_EL1 (*AArch64 Memory Model Feature Register 0*)
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdAa64Mmfr0El1 {
    /// 4 KiB granule support: 0b0000 yes, 0b0001 yes with 52-bit, 0b1111 no
    #[bits(28..=31, r)]
    tgran4: u4,
    /// 64 KiB granule support: 0b0000 yes, 0b1111 no
    #[bits(24..=27, r)]
    tgran64: u4,
    /// 16 KiB granule support: 0b0000 no, anything else yes
    #[bits(20..=23, r)]
    tgran16: u4,
    /// Supported physical address range
    #[bits(0..=3, r)]
    parange: u4,
}

impl IdAa64Mmfr0El1 {
    /// Can stage 1 use the 4 KiB translation granule?
    pub const fn supports_4k_granule(&self) -> bool {
        matches!(self.tgran4().value(), 0b0000 | 0b0001)
    }

    /// Can stage 1 use the 16 KiB translation granule?
    pub const fn supports_16k_granule(&self) -> bool {
        self.tgran16().value() != 0b0000
    }

    /// Can stage 1 use the 64 KiB translation granule?
    pub const fn supports_64k_granule(&self) -> bool {
        self.tgran64().value() == 0b0000
    }

    /// Largest physical address size the core implements
    pub fn physical_address_size(&self) -> Option<PhysicalAddressSize> {
        PhysicalAddressSize::try_from(self.parange().value()).ok()
    }
}

impl SysReg for IdAa64Mmfr0El1 {
    const OP0: u32 = 3;
    const OP1: u32 = 0;
    const CRN: u32 = 0;
    const CRM: u32 = 7;
    const OP2: u32 = 0;
}
impl crate::register::SysRegRead for IdAa64Mmfr0El1 {}
impl IdAa64Mmfr0El1 {
    #[inline]
    /// Reads ID_AA64MMFR0_EL1 (*AArch64 Memory Model Feature Register 0*)
    pub fn read() -> IdAa64Mmfr0El1 {
        Self::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}

impl core::fmt::Debug for IdAa64Mmfr0El1 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "ID_AA64MMFR0_EL1 {{ TGran4={:#06b} TGran64={:#06b} TGran16={:#06b} PARange={:#06b} }}",
            self.tgran4().value(),
            self.tgran64().value(),
            self.tgran16().value(),
            self.parange().value()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granule_support() {
        // Cortex-A53 as seen by QEMU raspi3b
        let mmfr0 = IdAa64Mmfr0El1::new_with_raw_value(0x0000_0000_0000_1122);
        assert!(mmfr0.supports_4k_granule());
        assert!(mmfr0.supports_64k_granule());
        assert!(!mmfr0.supports_16k_granule());
        assert_eq!(
            mmfr0.physical_address_size(),
            Some(PhysicalAddressSize::Bits40)
        );

        let no_4k = IdAa64Mmfr0El1::new_with_raw_value(0xF000_0000);
        assert!(!no_4k.supports_4k_granule());
    }
}
