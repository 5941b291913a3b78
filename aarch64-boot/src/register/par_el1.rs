//! Code for decoding PAR_EL1 (*Physical Address Register*)
//!
//! PAR_EL1 holds the result of an `AT` address translation instruction. Bit 0
//! says whether the translation failed, and the rest of the register is laid
//! out differently for the two outcomes, so there are two views of it.

use arbitrary_int::{u2, u36, u6};

use crate::addr::PhysAddr;
use crate::register::{SysReg, SysRegRead};

/// PAR_EL1 (*Physical Address Register*), raw
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParEl1(u64);

/// PAR_EL1 after a successful translation
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParSuccess {
    /// MAIR attribute byte of the mapping
    #[bits(56..=63, r)]
    attr: u8,
    /// Output address, bits [47:12]
    #[bits(12..=47, r)]
    pa: u36,
    /// Non-secure
    #[bit(9, r)]
    ns: bool,
    /// Shareability of the mapping
    #[bits(7..=8, r)]
    sh: u2,
}

/// PAR_EL1 after a failed translation
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParFault {
    /// Stage of translation that faulted, 0 is stage 1
    #[bit(9, r)]
    s: bool,
    /// Fault was on a stage 2 walk for a stage 1 table
    #[bit(8, r)]
    ptw: bool,
    /// Fault status code
    #[bits(1..=6, r)]
    fst_raw: u6,
}

/// Fault status codes reported by a failed translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FaultStatus {
    AddressSizeLevel0 = 0b000000,
    AddressSizeLevel1 = 0b000001,
    AddressSizeLevel2 = 0b000010,
    AddressSizeLevel3 = 0b000011,
    TranslationLevel0 = 0b000100,
    TranslationLevel1 = 0b000101,
    TranslationLevel2 = 0b000110,
    TranslationLevel3 = 0b000111,
    AccessFlagLevel1 = 0b001001,
    AccessFlagLevel2 = 0b001010,
    AccessFlagLevel3 = 0b001011,
    PermissionLevel1 = 0b001101,
    PermissionLevel2 = 0b001110,
    PermissionLevel3 = 0b001111,
    SyncExternalAbort = 0b010000,
    SyncExternalAbortOnWalkLevel0 = 0b010100,
    SyncExternalAbortOnWalkLevel1 = 0b010101,
    SyncExternalAbortOnWalkLevel2 = 0b010110,
    SyncExternalAbortOnWalkLevel3 = 0b010111,
    Alignment = 0b100001,
    TlbConflict = 0b110000,
}

/// Decoded outcome of an address translation
#[derive(Clone, Copy)]
pub enum Translation {
    Mapped(ParSuccess),
    Fault(ParFault),
}

impl ParEl1 {
    pub const fn new_with_raw_value(raw: u64) -> ParEl1 {
        ParEl1(raw)
    }

    pub const fn raw_value(&self) -> u64 {
        self.0
    }

    /// Split into the success or failure view
    pub const fn decode(&self) -> Translation {
        if self.0 & 1 == 1 {
            Translation::Fault(ParFault::new_with_raw_value(self.0))
        } else {
            Translation::Mapped(ParSuccess::new_with_raw_value(self.0))
        }
    }

    /// The physical address the translation produced, if it succeeded
    ///
    /// `va` supplies the offset within the 4 KiB page.
    pub const fn output(&self, va: u64) -> Option<PhysAddr> {
        match self.decode() {
            Translation::Mapped(ok) => Some(ok.output(va)),
            Translation::Fault(_) => None,
        }
    }
}

impl ParSuccess {
    /// Output physical address for `va`
    pub const fn output(&self, va: u64) -> PhysAddr {
        PhysAddr::new((self.pa().value() << 12) | (va & 0xFFF))
    }
}

impl ParFault {
    /// Fault status, or the raw code if it is not one this crate knows
    pub fn status(&self) -> Result<FaultStatus, u8> {
        let status = self.fst_raw().value();
        FaultStatus::try_from(status).map_err(|_| status)
    }
}

impl SysReg for ParEl1 {
    const OP0: u32 = 3;
    const OP1: u32 = 0;
    const CRN: u32 = 7;
    const CRM: u32 = 4;
    const OP2: u32 = 0;
}
impl crate::register::SysRegRead for ParEl1 {}
impl ParEl1 {
    #[inline]
    /// Reads PAR_EL1 (*Physical Address Register*)
    pub fn read() -> ParEl1 {
        Self::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}

impl core::fmt::Debug for ParSuccess {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "PAR_EL1 {{ PA={:#x} ATTR={:#04x} NS={} SH={:#04b} }}",
            self.pa().value() << 12,
            self.attr(),
            self.ns() as u8,
            self.sh().value()
        )
    }
}

impl core::fmt::Debug for ParFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "PAR_EL1 {{ F=1 S={} PTW={} FST={:?} }}",
            self.s() as u8,
            self.ptw() as u8,
            self.status()
        )
    }
}

impl core::fmt::Debug for Translation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Translation::Mapped(ok) => ok.fmt(f),
            Translation::Fault(fault) => fault.fmt(f),
        }
    }
}

impl core::fmt::Debug for ParEl1 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.decode().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_success() {
        let par = ParEl1::new_with_raw_value(0x4400_0000_0020_0000);
        assert_eq!(par.output(0x20_0123), Some(PhysAddr::new(0x20_0123)));
        match par.decode() {
            Translation::Mapped(ok) => assert_eq!(ok.attr(), 0x44),
            Translation::Fault(_) => panic!("expected a mapping"),
        }
    }

    #[test]
    fn decodes_translation_fault() {
        // FST = level 1 translation fault
        let par = ParEl1::new_with_raw_value((0b000101 << 1) | 1);
        assert_eq!(par.output(0x4000_0000), None);
        match par.decode() {
            Translation::Fault(fault) => {
                assert_eq!(fault.status(), Ok(FaultStatus::TranslationLevel1))
            }
            Translation::Mapped(_) => panic!("expected a fault"),
        }
    }

    #[test]
    fn unknown_fault_code_is_returned_raw() {
        let par = ParEl1::new_with_raw_value((0b111111 << 1) | 1);
        match par.decode() {
            Translation::Fault(fault) => assert_eq!(fault.status(), Err(0b111111)),
            Translation::Mapped(_) => panic!("expected a fault"),
        }
    }
}
