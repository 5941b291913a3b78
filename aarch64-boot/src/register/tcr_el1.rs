//! Code for managing TCR_EL1 (*Translation Control Register*)
//!
//! TCR_EL1 holds one set of controls for the lower region (walked from
//! TTBR0_EL1) and one for the upper region (walked from TTBR1_EL1). The two
//! granule fields use different encodings for the same sizes, so the
//! configuration is expressed with [`Granule`] and translated here.

use arbitrary_int::{u2, u3, u6};

use crate::register::{SysReg, SysRegRead, SysRegWrite};

/// Translation granule size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Granule {
    Kb4,
    Kb16,
    Kb64,
}

impl Granule {
    const fn tg0(self) -> u2 {
        match self {
            Granule::Kb4 => u2::new(0b00),
            Granule::Kb64 => u2::new(0b01),
            Granule::Kb16 => u2::new(0b10),
        }
    }

    const fn tg1(self) -> u2 {
        match self {
            Granule::Kb16 => u2::new(0b01),
            Granule::Kb4 => u2::new(0b10),
            Granule::Kb64 => u2::new(0b11),
        }
    }

    const fn from_tg0(raw: u2) -> Option<Granule> {
        match raw.value() {
            0b00 => Some(Granule::Kb4),
            0b01 => Some(Granule::Kb64),
            0b10 => Some(Granule::Kb16),
            _ => None,
        }
    }

    const fn from_tg1(raw: u2) -> Option<Granule> {
        match raw.value() {
            0b01 => Some(Granule::Kb16),
            0b10 => Some(Granule::Kb4),
            0b11 => Some(Granule::Kb64),
            _ => None,
        }
    }
}

/// Cacheability of translation table walks
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WalkCacheability {
    NonCacheable = 0b00,
    WriteBackWriteAllocate = 0b01,
    WriteThrough = 0b10,
    WriteBackNoWriteAllocate = 0b11,
}

/// Intermediate physical address size, `TCR_EL1.IPS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PhysicalAddressSize {
    Bits32 = 0b000,
    Bits36 = 0b001,
    Bits40 = 0b010,
    Bits42 = 0b011,
    Bits44 = 0b100,
    Bits48 = 0b101,
    Bits52 = 0b110,
}

/// TCR_EL1 (*Translation Control Register*)
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TcrEl1 {
    /// Intermediate physical address size
    #[bits(32..=34, rw)]
    ips: u3,
    /// Granule size for TTBR1_EL1
    #[bits(30..=31, rw)]
    tg1: u2,
    /// Shareability of TTBR1_EL1 walks
    #[bits(28..=29, rw)]
    sh1: u2,
    /// Outer cacheability of TTBR1_EL1 walks
    #[bits(26..=27, rw)]
    orgn1: u2,
    /// Inner cacheability of TTBR1_EL1 walks
    #[bits(24..=25, rw)]
    irgn1: u2,
    /// Disable TTBR1_EL1 walks
    #[bit(23, rw)]
    epd1: bool,
    /// ASID comes from TTBR1_EL1 rather than TTBR0_EL1
    #[bit(22, rw)]
    a1: bool,
    /// Size offset of the TTBR1_EL1 region, 2^(64 - T1SZ) bytes
    #[bits(16..=21, rw)]
    t1sz: u6,
    /// Granule size for TTBR0_EL1
    #[bits(14..=15, rw)]
    tg0: u2,
    /// Shareability of TTBR0_EL1 walks
    #[bits(12..=13, rw)]
    sh0: u2,
    /// Outer cacheability of TTBR0_EL1 walks
    #[bits(10..=11, rw)]
    orgn0: u2,
    /// Inner cacheability of TTBR0_EL1 walks
    #[bits(8..=9, rw)]
    irgn0: u2,
    /// Disable TTBR0_EL1 walks
    #[bit(7, rw)]
    epd0: bool,
    /// Size offset of the TTBR0_EL1 region, 2^(64 - T0SZ) bytes
    #[bits(0..=5, rw)]
    t0sz: u6,
}

/// The controls for one of the two translation regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegimeConfig {
    /// Width of the virtual address space, between 25 and 48 bits
    pub va_bits: u8,
    pub granule: Granule,
    pub inner_cacheability: WalkCacheability,
    pub outer_cacheability: WalkCacheability,
    /// Raw `SHx` encoding: 0b00 non-shareable, 0b10 outer, 0b11 inner
    pub shareability: u8,
    pub walks_disabled: bool,
}

/// Every programmable field of [`TcrEl1`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcrConfig {
    /// Region walked from TTBR0_EL1
    pub lower: RegimeConfig,
    /// Region walked from TTBR1_EL1
    pub upper: RegimeConfig,
    pub asid_from_ttbr1: bool,
    pub physical_address_size: PhysicalAddressSize,
}

impl TcrEl1 {
    /// Compose a value from a complete field list
    ///
    /// Panics (a build failure when used in `const` context) if a region is
    /// wider than 48 bits or narrower than 25 bits.
    pub const fn from_config(config: TcrConfig) -> TcrEl1 {
        let lower = config.lower;
        let upper = config.upper;
        assert!(lower.va_bits >= 25 && lower.va_bits <= 48);
        assert!(upper.va_bits >= 25 && upper.va_bits <= 48);
        TcrEl1::new_with_raw_value(0)
            .with_ips(u3::new(config.physical_address_size as u8))
            .with_a1(config.asid_from_ttbr1)
            .with_t0sz(u6::new(64 - lower.va_bits))
            .with_tg0(lower.granule.tg0())
            .with_irgn0(u2::new(lower.inner_cacheability as u8))
            .with_orgn0(u2::new(lower.outer_cacheability as u8))
            .with_sh0(u2::new(lower.shareability))
            .with_epd0(lower.walks_disabled)
            .with_t1sz(u6::new(64 - upper.va_bits))
            .with_tg1(upper.granule.tg1())
            .with_irgn1(u2::new(upper.inner_cacheability as u8))
            .with_orgn1(u2::new(upper.outer_cacheability as u8))
            .with_sh1(u2::new(upper.shareability))
            .with_epd1(upper.walks_disabled)
    }

    /// Virtual address width of the TTBR0_EL1 region
    pub const fn lower_va_bits(&self) -> u8 {
        64 - self.t0sz().value()
    }

    /// Virtual address width of the TTBR1_EL1 region
    pub const fn upper_va_bits(&self) -> u8 {
        64 - self.t1sz().value()
    }

    /// Granule of the TTBR0_EL1 region, `None` for a reserved encoding
    pub const fn lower_granule(&self) -> Option<Granule> {
        Granule::from_tg0(self.tg0())
    }

    /// Granule of the TTBR1_EL1 region, `None` for a reserved encoding
    pub const fn upper_granule(&self) -> Option<Granule> {
        Granule::from_tg1(self.tg1())
    }
}

impl SysReg for TcrEl1 {
    const OP0: u32 = 3;
    const OP1: u32 = 0;
    const CRN: u32 = 2;
    const CRM: u32 = 0;
    const OP2: u32 = 2;
}
impl crate::register::SysRegRead for TcrEl1 {}
impl TcrEl1 {
    #[inline]
    /// Reads TCR_EL1 (*Translation Control Register*)
    pub fn read() -> TcrEl1 {
        Self::new_with_raw_value(<Self as SysRegRead>::read_raw())
    }
}
impl crate::register::SysRegWrite for TcrEl1 {}
impl TcrEl1 {
    #[inline]
    /// Writes TCR_EL1 (*Translation Control Register*)
    ///
    /// # Safety
    ///
    /// Must agree with the tables in TTBR0_EL1/TTBR1_EL1 before translation
    /// is enabled.
    pub unsafe fn write(value: Self) {
        unsafe {
            <Self as SysRegWrite>::write_raw(value.raw_value());
        }
    }
}

impl core::fmt::Debug for TcrEl1 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "TCR_EL1 {{ IPS={:#05b} TG1={:?} T1SZ={} EPD1={} TG0={:?} T0SZ={} EPD0={} }}",
            self.ips().value(),
            self.upper_granule(),
            self.t1sz().value(),
            self.epd1() as u8,
            self.lower_granule(),
            self.t0sz().value(),
            self.epd0() as u8,
        )
    }
}
