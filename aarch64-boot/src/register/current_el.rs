//! Code for reading CurrentEL (*Current Exception Level*)

use arbitrary_int::u2;

use crate::register::{SysReg, SysRegRead};

/// The four AArch64 exception levels, ordered by privilege
///
/// `El3` is the most privileged (secure monitor), `El0` the least
/// (applications). Descent during bring-up only ever moves towards `El0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, num_enum::TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ExceptionLevel {
    El0 = 0,
    El1 = 1,
    El2 = 2,
    El3 = 3,
}

impl ExceptionLevel {
    /// Every level, most privileged first
    pub const DESCENDING: [ExceptionLevel; 4] = [
        ExceptionLevel::El3,
        ExceptionLevel::El2,
        ExceptionLevel::El1,
        ExceptionLevel::El0,
    ];

    /// The next less privileged level, if there is one
    pub const fn below(self) -> Option<ExceptionLevel> {
        match self {
            ExceptionLevel::El3 => Some(ExceptionLevel::El2),
            ExceptionLevel::El2 => Some(ExceptionLevel::El1),
            ExceptionLevel::El1 => Some(ExceptionLevel::El0),
            ExceptionLevel::El0 => None,
        }
    }

    /// Decode the two-bit level number
    pub const fn from_u2(value: u2) -> ExceptionLevel {
        match value.value() {
            0 => ExceptionLevel::El0,
            1 => ExceptionLevel::El1,
            2 => ExceptionLevel::El2,
            _ => ExceptionLevel::El3,
        }
    }
}

impl core::fmt::Display for ExceptionLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "EL{}", *self as u8)
    }
}

/// CurrentEL (*Current Exception Level Register*)
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CurrentEl {
    #[bits(2..=3, r)]
    el_raw: u2,
}

impl SysReg for CurrentEl {
    const OP0: u32 = 3;
    const OP1: u32 = 0;
    const CRN: u32 = 4;
    const CRM: u32 = 2;
    const OP2: u32 = 2;
}
impl crate::register::SysRegRead for CurrentEl {}
impl CurrentEl {
    /// The level this value describes
    pub fn level(&self) -> ExceptionLevel {
        ExceptionLevel::from_u2(self.el_raw())
    }

    #[inline]
    /// Reads CurrentEL (*Current Exception Level Register*)
    pub fn read() -> CurrentEl {
        Self::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}

impl core::fmt::Debug for CurrentEl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "CurrentEL {{ {} }}", self.level())
    }
}
