//! Code for managing the SPSR_ELx (*Saved Program Status Registers*)
//!
//! All three banked copies share one layout, [`Spsr`]. The zero-sized
//! [`SpsrEl1`], [`SpsrEl2`] and [`SpsrEl3`] select which copy to write.

use arbitrary_int::u4;

use crate::register::{ExceptionLevel, SysReg, SysRegWrite};

/// The AArch64 values of `SPSR_ELx.M[3:0]`
///
/// The `t` modes use `SP_EL0`, the `h` modes use the stack pointer of the
/// level itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ExceptionMode {
    El0t = 0b0000,
    El1t = 0b0100,
    El1h = 0b0101,
    El2t = 0b1000,
    El2h = 0b1001,
    El3t = 0b1100,
    El3h = 0b1101,
}

impl ExceptionMode {
    /// The mode a level runs in after an exception return into it
    ///
    /// EL0 has no stack pointer of its own; every other level gets its own.
    pub const fn for_level(level: ExceptionLevel) -> ExceptionMode {
        match level {
            ExceptionLevel::El0 => ExceptionMode::El0t,
            ExceptionLevel::El1 => ExceptionMode::El1h,
            ExceptionLevel::El2 => ExceptionMode::El2h,
            ExceptionLevel::El3 => ExceptionMode::El3h,
        }
    }

    /// Which exception level this mode runs at
    pub const fn level(self) -> ExceptionLevel {
        match self {
            ExceptionMode::El0t => ExceptionLevel::El0,
            ExceptionMode::El1t | ExceptionMode::El1h => ExceptionLevel::El1,
            ExceptionMode::El2t | ExceptionMode::El2h => ExceptionLevel::El2,
            ExceptionMode::El3t | ExceptionMode::El3h => ExceptionLevel::El3,
        }
    }
}

/// SPSR_ELx (*Saved Program Status Register*) for an AArch64 target
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Spsr {
    /// Debug exception mask
    #[bit(9, rw)]
    d: bool,
    /// SError interrupt mask
    #[bit(8, rw)]
    a: bool,
    /// IRQ mask
    #[bit(7, rw)]
    i: bool,
    /// FIQ mask
    #[bit(6, rw)]
    f: bool,
    /// Execution state on return, 0 is AArch64
    #[bit(4, rw)]
    nrw: bool,
    /// Exception level and stack pointer selection
    #[bits(0..=3, rw)]
    mode_raw: u4,
}

/// Every programmable field of [`Spsr`]
///
/// The execution state is always AArch64; there is no AArch32 support at
/// this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpsrConfig {
    pub mode: ExceptionMode,
    pub debug_masked: bool,
    pub serror_masked: bool,
    pub irq_masked: bool,
    pub fiq_masked: bool,
}

impl Spsr {
    /// Compose a value from a complete field list
    pub const fn from_config(config: SpsrConfig) -> Spsr {
        Spsr::new_with_raw_value(0)
            .with_nrw(false)
            .with_mode_raw(u4::new(config.mode as u8))
            .with_d(config.debug_masked)
            .with_a(config.serror_masked)
            .with_i(config.irq_masked)
            .with_f(config.fiq_masked)
    }

    /// The same masks, returning into a different mode
    pub const fn with_mode(self, mode: ExceptionMode) -> Spsr {
        self.with_mode_raw(u4::new(mode as u8))
    }

    /// The mode this value returns into
    ///
    /// Gives back the raw `M` bits if they do not name an AArch64 mode.
    pub fn mode(&self) -> Result<ExceptionMode, u8> {
        let raw = self.mode_raw().value();
        ExceptionMode::try_from(raw).map_err(|_| raw)
    }

    /// Are all of SError, IRQ and FIQ masked?
    pub const fn asynchronous_masked(&self) -> bool {
        self.a() && self.i() && self.f()
    }
}

impl core::fmt::Debug for Spsr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "SPSR {{ D={} A={} I={} F={} nRW={} M={:?} }}",
            self.d() as u8,
            self.a() as u8,
            self.i() as u8,
            self.f() as u8,
            self.nrw() as u8,
            self.mode()
        )
    }
}

/// SPSR_EL1, the return state for `eret` from EL1
pub struct SpsrEl1;

impl SysReg for SpsrEl1 {
    const OP0: u32 = 3;
    const OP1: u32 = 0;
    const CRN: u32 = 4;
    const CRM: u32 = 0;
    const OP2: u32 = 0;
}
impl crate::register::SysRegWrite for SpsrEl1 {}
impl SpsrEl1 {
    #[inline]
    /// Writes SPSR_EL1
    ///
    /// # Safety
    ///
    /// Controls the state the next `eret` from EL1 returns into.
    pub unsafe fn write(value: Spsr) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

/// SPSR_EL2, the return state for `eret` from EL2
pub struct SpsrEl2;

impl SysReg for SpsrEl2 {
    const OP0: u32 = 3;
    const OP1: u32 = 4;
    const CRN: u32 = 4;
    const CRM: u32 = 0;
    const OP2: u32 = 0;
}
impl crate::register::SysRegWrite for SpsrEl2 {}
impl SpsrEl2 {
    #[inline]
    /// Writes SPSR_EL2
    ///
    /// # Safety
    ///
    /// Controls the state the next `eret` from EL2 returns into.
    pub unsafe fn write(value: Spsr) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

/// SPSR_EL3, the return state for `eret` from EL3
pub struct SpsrEl3;

impl SysReg for SpsrEl3 {
    const OP0: u32 = 3;
    const OP1: u32 = 6;
    const CRN: u32 = 4;
    const CRM: u32 = 0;
    const OP2: u32 = 0;
}
impl crate::register::SysRegWrite for SpsrEl3 {}
impl SpsrEl3 {
    #[inline]
    /// Writes SPSR_EL3
    ///
    /// # Safety
    ///
    /// Controls the state the next `eret` from EL3 returns into.
    pub unsafe fn write(value: Spsr) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_encodings() {
        let spsr = Spsr::from_config(SpsrConfig {
            mode: ExceptionMode::El1h,
            debug_masked: false,
            serror_masked: true,
            irq_masked: true,
            fiq_masked: true,
        });
        assert_eq!(spsr.raw_value(), 0x1C5);
        assert_eq!(spsr.mode(), Ok(ExceptionMode::El1h));
        assert_eq!(spsr.with_mode(ExceptionMode::El2h).raw_value(), 0x1C9);
        assert_eq!(spsr.with_mode(ExceptionMode::El0t).raw_value(), 0x1C0);
    }

    #[test]
    fn rejects_aarch32_mode_bits() {
        let spsr = Spsr::new_with_raw_value(0b0010);
        assert_eq!(spsr.mode(), Err(0b0010));
    }

    #[test]
    fn mode_for_level_round_trips() {
        for level in ExceptionLevel::DESCENDING {
            assert_eq!(ExceptionMode::for_level(level).level(), level);
        }
    }
}
