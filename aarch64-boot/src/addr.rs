//! Physical and virtual addresses

use crate::catalog::{PAGE_SHIFT, TABLE_SHIFT, VA_START};

/// Number of bits a canonical virtual address carries
pub const VA_BITS: u32 = 48;

/// A physical address
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct PhysAddr(u64);

impl PhysAddr {
    #[inline(always)]
    pub const fn new(addr: u64) -> PhysAddr {
        PhysAddr(addr)
    }

    #[inline(always)]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Is this address a multiple of `align`? `align` must be a power of two.
    #[inline(always)]
    pub const fn is_aligned(self, align: u64) -> bool {
        self.0 & (align - 1) == 0
    }

    #[inline(always)]
    pub const fn align_down(self, align: u64) -> PhysAddr {
        PhysAddr(align_down(self.0, align))
    }

    #[inline(always)]
    pub const fn align_up(self, align: u64) -> PhysAddr {
        PhysAddr(align_up(self.0, align))
    }

    #[inline(always)]
    pub const fn offset(self, bytes: u64) -> PhysAddr {
        PhysAddr(self.0 + bytes)
    }

    /// Where this address appears in the upper (TTBR1) region
    #[inline(always)]
    pub const fn kernel_va(self) -> VirtAddr {
        VirtAddr(self.0 | VA_START)
    }

    /// The same address, read as an identity-mapped virtual address
    #[inline(always)]
    pub const fn identity_va(self) -> VirtAddr {
        VirtAddr(self.0)
    }
}

impl core::fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PhysAddr({:#x})", self.0)
    }
}

/// A canonical 48-bit virtual address
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct VirtAddr(u64);

/// A 64-bit value whose bits [63:48] are neither all zero nor all one
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidVirtAddr(pub u64);

impl core::fmt::Debug for InvalidVirtAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "InvalidVirtAddr({:#x})", self.0)
    }
}

impl core::fmt::Display for InvalidVirtAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#x} is not a canonical {}-bit virtual address", self.0, VA_BITS)
    }
}

impl VirtAddr {
    /// Accept `addr` only if bits [63:48] are a copy of bit 47's region
    #[inline]
    pub const fn try_new(addr: u64) -> Result<VirtAddr, InvalidVirtAddr> {
        match addr >> VA_BITS {
            0 | 0xFFFF => Ok(VirtAddr(addr)),
            _ => Err(InvalidVirtAddr(addr)),
        }
    }

    #[inline(always)]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Does this address fall in the upper (TTBR1) region?
    #[inline(always)]
    pub const fn is_upper(self) -> bool {
        self.0 >> VA_BITS == 0xFFFF
    }

    /// The offset into whichever region this address is in
    #[inline(always)]
    pub const fn region_offset(self) -> u64 {
        self.0 & ((1 << VA_BITS) - 1)
    }

    /// Index into the translation table at `level` (0 to 3)
    #[inline]
    pub const fn table_index(self, level: u32) -> usize {
        assert!(level <= 3);
        let shift = PAGE_SHIFT + (3 - level) * TABLE_SHIFT;
        ((self.0 >> shift) & ((1 << TABLE_SHIFT) - 1)) as usize
    }

    /// Offset within the 4 KiB page
    #[inline(always)]
    pub const fn page_offset(self) -> u64 {
        self.0 & ((1 << PAGE_SHIFT) - 1)
    }
}

impl core::fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "VirtAddr({:#x})", self.0)
    }
}

/// Round `addr` down to a multiple of `align`, which must be a power of two
#[inline]
pub const fn align_down(addr: u64, align: u64) -> u64 {
    addr & !(align - 1)
}

/// Round `addr` up to a multiple of `align`, which must be a power of two
#[inline]
pub const fn align_up(addr: u64, align: u64) -> u64 {
    align_down(addr + (align - 1), align)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_addresses() {
        assert!(VirtAddr::try_new(0).is_ok());
        assert!(VirtAddr::try_new(0x0000_FFFF_FFFF_FFFF).is_ok());
        assert!(VirtAddr::try_new(VA_START).is_ok());
        assert_eq!(
            VirtAddr::try_new(0x0001_0000_0000_0000),
            Err(InvalidVirtAddr(0x0001_0000_0000_0000))
        );
        assert!(VirtAddr::try_new(0xFFFE_0000_0000_0000).is_err());
    }

    #[test]
    fn kernel_alias_is_in_the_upper_region() {
        let va = PhysAddr::new(0x8_0000).kernel_va();
        assert!(va.is_upper());
        assert_eq!(va.region_offset(), 0x8_0000);
        assert!(!PhysAddr::new(0x8_0000).identity_va().is_upper());
    }

    #[test]
    fn table_indices() {
        let va = VirtAddr::try_new(0x0000_0080_4020_1123).unwrap();
        assert_eq!(va.table_index(0), 1);
        assert_eq!(va.table_index(1), 1);
        assert_eq!(va.table_index(2), 1);
        assert_eq!(va.table_index(3), 1);
        assert_eq!(va.page_offset(), 0x123);
        // The upper region starts at slot 0 of every level
        let start = VirtAddr::try_new(VA_START).unwrap();
        assert_eq!(start.table_index(0), 0);
        assert_eq!(start.table_index(2), 0);
    }

    #[test]
    fn alignment() {
        assert_eq!(align_down(0x20_0FFF, 0x1000), 0x20_0000);
        assert_eq!(align_up(0x20_0001, 0x1000), 0x20_1000);
        assert_eq!(align_up(0x20_0000, 0x1000), 0x20_0000);
        assert!(PhysAddr::new(0x40_0000).is_aligned(0x20_0000));
        assert!(!PhysAddr::new(0x40_1000).is_aligned(0x20_0000));
    }
}
