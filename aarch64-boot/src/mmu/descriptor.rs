//! Stage 1 translation table descriptors, 4 KiB granule

use arbitrary_int::{u2, u3, u36, Number};

use crate::addr::PhysAddr;
use crate::catalog::{MemoryType, PAGE_SHIFT};

/// `AP[2:1]` value: read/write at EL1, no access from EL0
pub const AP_EL1_RW: u8 = 0b00;

/// `SH[1:0]` value used for every leaf
pub const NON_SHAREABLE: u8 = 0b00;

/// A block (level 1 or 2) or page (level 3) descriptor
///
/// Both share a layout; they differ only in bit 1 and in the level they are
/// found at.
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockDescriptor {
    /// Unprivileged execute-never
    #[bit(54, rw)]
    uxn: bool,
    /// Privileged execute-never
    #[bit(53, rw)]
    pxn: bool,
    /// Part of a contiguous set of entries
    #[bit(52, rw)]
    contiguous: bool,
    /// Output address, bits [47:12]
    #[bits(12..=47, rw)]
    output: u36,
    /// Not global
    #[bit(11, rw)]
    ng: bool,
    /// Access flag
    #[bit(10, rw)]
    af: bool,
    /// Shareability
    #[bits(8..=9, rw)]
    sh: u2,
    /// Access permissions
    #[bits(6..=7, rw)]
    ap: u2,
    /// Non-secure output address
    #[bit(5, rw)]
    ns: bool,
    /// Index into MAIR_EL1
    #[bits(2..=4, rw)]
    attr_index: u3,
    /// Set for a level 3 page, clear for a block
    #[bit(1, rw)]
    page: bool,
    #[bit(0, rw)]
    valid: bool,
}

impl BlockDescriptor {
    /// A valid block mapping `pa` as `memory`
    ///
    /// The access flag is set so the first access does not fault, EL1 gets
    /// read/write and EL0 nothing. Device memory is never executable, and
    /// nothing is executable from EL0.
    pub const fn for_memory(pa: PhysAddr, memory: MemoryType) -> BlockDescriptor {
        BlockDescriptor::new_with_raw_value(0)
            .with_valid(true)
            .with_page(false)
            .with_attr_index(u3::new(memory.attr_index()))
            .with_ns(false)
            .with_ap(u2::new(AP_EL1_RW))
            .with_sh(u2::new(NON_SHAREABLE))
            .with_af(true)
            .with_ng(false)
            .with_output(u36::new((pa.as_u64() >> PAGE_SHIFT) & u36::MAX.value()))
            .with_contiguous(false)
            .with_pxn(!memory.executable())
            .with_uxn(true)
    }

    /// The same attributes as [`BlockDescriptor::for_memory`], as a level 3
    /// page
    pub const fn page_for_memory(pa: PhysAddr, memory: MemoryType) -> BlockDescriptor {
        BlockDescriptor::for_memory(pa, memory).with_page(true)
    }

    /// Where this entry points
    pub const fn output_address(&self) -> PhysAddr {
        PhysAddr::new(self.output().value() << PAGE_SHIFT)
    }

    /// The memory type selected by `AttrIndx`, if it names a MAIR slot in use
    pub fn memory(&self) -> Option<MemoryType> {
        MemoryType::try_from(self.attr_index().value()).ok()
    }
}

impl core::fmt::Debug for BlockDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} {{ OA={:#x} AttrIndx={} AP={:#04b} SH={:#04b} AF={} PXN={} UXN={} }}",
            if self.page() { "PAGE" } else { "BLOCK" },
            self.output_address().as_u64(),
            self.attr_index().value(),
            self.ap().value(),
            self.sh().value(),
            self.af() as u8,
            self.pxn() as u8,
            self.uxn() as u8,
        )
    }
}

/// A descriptor pointing at the next level table
#[bitbybit::bitfield(u64)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TableDescriptor {
    /// Non-secure for every later level
    #[bit(63, rw)]
    ns_table: bool,
    /// Access permission limit for every later level
    #[bits(61..=62, rw)]
    ap_table: u2,
    /// Unprivileged execute-never for every later level
    #[bit(60, rw)]
    uxn_table: bool,
    /// Privileged execute-never for every later level
    #[bit(59, rw)]
    pxn_table: bool,
    /// Next level table address, bits [47:12]
    #[bits(12..=47, rw)]
    next: u36,
    /// Always set for a table descriptor
    #[bit(1, rw)]
    table: bool,
    #[bit(0, rw)]
    valid: bool,
}

impl TableDescriptor {
    /// Point at the 4 KiB aligned table at `pa`, placing no extra limits on
    /// the levels below
    pub const fn for_table(pa: PhysAddr) -> TableDescriptor {
        TableDescriptor::new_with_raw_value(0)
            .with_valid(true)
            .with_table(true)
            .with_next(u36::new((pa.as_u64() >> PAGE_SHIFT) & u36::MAX.value()))
            .with_pxn_table(false)
            .with_uxn_table(false)
            .with_ap_table(u2::new(0))
            .with_ns_table(false)
    }

    /// Where the next level table lives
    pub const fn next_table(&self) -> PhysAddr {
        PhysAddr::new(self.next().value() << PAGE_SHIFT)
    }
}

impl core::fmt::Debug for TableDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "TABLE {{ NEXT={:#x} NS={} AP={:#04b} UXN={} PXN={} }}",
            self.next_table().as_u64(),
            self.ns_table() as u8,
            self.ap_table().value(),
            self.uxn_table() as u8,
            self.pxn_table() as u8,
        )
    }
}

/// One raw table entry, decoded for the level it was found at
#[derive(Debug, Clone, Copy)]
pub enum Descriptor {
    /// Bit 0 clear: any access faults
    Invalid,
    /// Points at a table for the next level
    Table(TableDescriptor),
    /// Maps a whole level 1 or 2 block
    Block(BlockDescriptor),
    /// Maps one 4 KiB page
    Page(BlockDescriptor),
}

impl Descriptor {
    /// Decode `raw` as found in a table at `level` (0 to 3)
    pub const fn decode(raw: u64, level: u32) -> Descriptor {
        let valid = raw & 0b01 != 0;
        let table_bit = raw & 0b10 != 0;
        match (valid, table_bit, level) {
            (false, _, _) => Descriptor::Invalid,
            (true, true, 3) => Descriptor::Page(BlockDescriptor::new_with_raw_value(raw)),
            (true, true, _) => Descriptor::Table(TableDescriptor::new_with_raw_value(raw)),
            // level 0 blocks do not exist with a 4 KiB granule, and level 3
            // entries with bit 1 clear are reserved
            (true, false, 0) | (true, false, 3) => Descriptor::Invalid,
            (true, false, _) => Descriptor::Block(BlockDescriptor::new_with_raw_value(raw)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_block() {
        let desc = BlockDescriptor::for_memory(PhysAddr::new(0x20_0000), MemoryType::Device);
        // valid, block, AttrIndx 0, AF, PXN, UXN
        assert_eq!(desc.raw_value(), 0x0060_0000_0020_0401);
        assert_eq!(desc.memory(), Some(MemoryType::Device));
        assert_eq!(desc.output_address(), PhysAddr::new(0x20_0000));
    }

    #[test]
    fn normal_block() {
        let desc = BlockDescriptor::for_memory(PhysAddr::new(0), MemoryType::NormalNonCacheable);
        // valid, block, AttrIndx 1, AF, UXN
        assert_eq!(desc.raw_value(), 0x0040_0000_0000_0405);
        assert!(!desc.pxn());
        assert_eq!(desc.attr_index().value(), 1);
    }

    #[test]
    fn page_sets_bit_one() {
        let desc =
            BlockDescriptor::page_for_memory(PhysAddr::new(0x1000), MemoryType::NormalNonCacheable);
        assert_eq!(desc.raw_value() & 0b11, 0b11);
        assert!(matches!(Descriptor::decode(desc.raw_value(), 3), Descriptor::Page(_)));
        assert!(matches!(Descriptor::decode(desc.raw_value(), 2), Descriptor::Table(_)));
    }

    #[test]
    fn table_link() {
        let desc = TableDescriptor::for_table(PhysAddr::new(0x8_2000));
        assert_eq!(desc.raw_value(), 0x8_2003);
        assert_eq!(desc.next_table(), PhysAddr::new(0x8_2000));
    }

    #[test]
    fn output_address_above_48_bits_is_dropped() {
        let desc = BlockDescriptor::for_memory(
            PhysAddr::new(0xFFFF_0000_0040_0000),
            MemoryType::NormalNonCacheable,
        );
        assert_eq!(desc.output_address(), PhysAddr::new(0x0000_0000_0040_0000));
        let desc = TableDescriptor::for_table(PhysAddr::new(0x0001_0000_0000_1000));
        assert_eq!(desc.next_table(), PhysAddr::new(0x1000));
        assert_eq!(desc.raw_value(), 0x1003);
    }

    #[test]
    fn decode_by_level() {
        let block = BlockDescriptor::for_memory(PhysAddr::new(0), MemoryType::Device).raw_value();
        assert!(matches!(Descriptor::decode(0, 1), Descriptor::Invalid));
        assert!(matches!(Descriptor::decode(block, 2), Descriptor::Block(_)));
        assert!(matches!(Descriptor::decode(block, 0), Descriptor::Invalid));
        assert!(matches!(Descriptor::decode(block, 3), Descriptor::Invalid));
    }
}
