//! Code for reading MPIDR_EL1 (*Multiprocessor Affinity Register*)

use crate::register::{SysReg, SysRegRead};

/// MPIDR_EL1 (*Multiprocessor Affinity Register*)
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MpidrEl1 {
    /// Affinity level 3
    #[bits(32..=39, r)]
    aff3: u8,
    /// Uniprocessor system
    #[bit(30, r)]
    u: bool,
    /// Lowest affinity level is made of hardware threads
    #[bit(24, r)]
    mt: bool,
    /// Affinity level 2
    #[bits(16..=23, r)]
    aff2: u8,
    /// Affinity level 1
    #[bits(8..=15, r)]
    aff1: u8,
    /// Affinity level 0
    #[bits(0..=7, r)]
    aff0: u8,
}

impl MpidrEl1 {
    /// Aff3, Aff2, Aff1 and Aff0
    pub const AFFINITY_MASK: u64 = 0xFF_00FF_FFFF;

    /// Is this the core that runs bring-up?
    ///
    /// The boot core is the one with every affinity field zero. The reset
    /// trampoline parks every other core before touching memory.
    pub const fn is_boot_core(&self) -> bool {
        self.raw_value() & Self::AFFINITY_MASK == 0
    }
}

impl SysReg for MpidrEl1 {
    const OP0: u32 = 3;
    const OP1: u32 = 0;
    const CRN: u32 = 0;
    const CRM: u32 = 0;
    const OP2: u32 = 5;
}
impl crate::register::SysRegRead for MpidrEl1 {}
impl MpidrEl1 {
    #[inline]
    /// Reads MPIDR_EL1 (*Multiprocessor Affinity Register*)
    pub fn read() -> MpidrEl1 {
        Self::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}

impl core::fmt::Debug for MpidrEl1 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "MPIDR_EL1 {{ Aff3={} Aff2={} Aff1={} Aff0={} U={} MT={} }}",
            self.aff3(),
            self.aff2(),
            self.aff1(),
            self.aff0(),
            self.u() as u8,
            self.mt() as u8
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_core() {
        // Cortex-A53 core 0 and core 2 in a single cluster
        assert!(MpidrEl1::new_with_raw_value(0x8000_0000).is_boot_core());
        let second = MpidrEl1::new_with_raw_value(0x8000_0002);
        assert_eq!(second.aff0(), 2);
        assert!(!second.is_boot_core());
        // a core in the second cluster
        assert!(!MpidrEl1::new_with_raw_value(0x8000_0100).is_boot_core());
        assert_eq!(MpidrEl1::new_with_raw_value(0x8000_0100).aff1(), 1);
    }
}
