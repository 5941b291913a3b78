//! The statically reserved boot translation tables and the code that fills
//! them in

use core::mem::{offset_of, size_of};

use crate::addr::{PhysAddr, VirtAddr};
use crate::catalog::{
    MemoryType, ENTRIES_PER_TABLE, LOW_MEMORY, PAGE_SHIFT, PAGE_SIZE, SECTIONS_IN_WINDOW,
    SECTION_SIZE, TABLE_SHIFT,
};
use crate::mmu::descriptor::{BlockDescriptor, Descriptor, TableDescriptor};
use crate::mmu::partition::Partition;

// One level 2 table has to be enough for the whole window.
const _: () = assert!(LOW_MEMORY <= SECTION_SIZE * ENTRIES_PER_TABLE as u64);

/// One 4 KiB translation table
#[derive(Clone)]
#[repr(C, align(4096))]
pub struct PageTable([u64; ENTRIES_PER_TABLE]);

impl PageTable {
    /// Every entry invalid
    pub const EMPTY: PageTable = PageTable([0; ENTRIES_PER_TABLE]);

    /// Raw entry at `index`
    pub fn entry(&self, index: usize) -> u64 {
        self.0[index]
    }

    /// Entry at `index`, decoded for a table at `level`
    pub fn descriptor(&self, index: usize, level: u32) -> Descriptor {
        Descriptor::decode(self.0[index], level)
    }

    /// Indices and raw values of every entry with the valid bit set
    pub fn valid_entries(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.0
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, raw)| raw & 1 != 0)
    }

    fn set(&mut self, index: usize, raw: u64) {
        self.0[index] = raw;
    }

    fn clear(&mut self) {
        self.0.fill(0);
    }
}

/// Which of the boot tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TableId {
    Level0,
    Level1,
    Level2,
    /// The level 3 table for one section of the window
    Level3(usize),
}

impl TableId {
    /// Byte offset of the table from the start of [`BootTables`]
    pub const fn offset(self) -> u64 {
        let offset = match self {
            TableId::Level0 => offset_of!(BootTables, level0),
            TableId::Level1 => offset_of!(BootTables, level1),
            TableId::Level2 => offset_of!(BootTables, level2),
            TableId::Level3(section) => {
                offset_of!(BootTables, level3) + section * size_of::<PageTable>()
            }
        };
        offset as u64
    }

    /// The table starting `offset` bytes into [`BootTables`], if any
    pub const fn at_offset(offset: u64) -> Option<TableId> {
        if offset % PAGE_SIZE != 0 || offset >= BootTables::SIZE {
            return None;
        }
        let index = (offset >> PAGE_SHIFT) as usize;
        Some(match index {
            0 => TableId::Level0,
            1 => TableId::Level1,
            2 => TableId::Level2,
            n => TableId::Level3(n - 3),
        })
    }
}

/// Every table the boot mapping needs
///
/// Level 0 → level 1 → level 2 cover the window with one level 2 entry per
/// section. A section that is not all one memory type is split into pages
/// through its own level 3 table.
#[repr(C, align(4096))]
pub struct BootTables {
    level0: PageTable,
    level1: PageTable,
    level2: PageTable,
    level3: [PageTable; SECTIONS_IN_WINDOW],
}

const _: () = assert!(TableId::Level0.offset() == 0);
const _: () = assert!(TableId::Level3(0).offset() == 3 * PAGE_SIZE);

/// What [`TableBuilder::build`] produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BuildSummary {
    /// Level 2 block descriptors written
    pub blocks: usize,
    /// Level 3 page descriptors written
    pub pages: usize,
}

/// Result of walking the boot tables in software
#[derive(Debug, Clone, Copy)]
pub enum Lookup {
    Mapped {
        pa: PhysAddr,
        leaf: BlockDescriptor,
        level: u32,
    },
    /// The walk stopped at `level` on an invalid entry
    Fault { level: u32 },
}

impl BootTables {
    /// Size of the whole table area
    pub const SIZE: u64 = size_of::<BootTables>() as u64;

    /// All tables empty
    pub const fn new() -> BootTables {
        BootTables {
            level0: PageTable::EMPTY,
            level1: PageTable::EMPTY,
            level2: PageTable::EMPTY,
            level3: [PageTable::EMPTY; SECTIONS_IN_WINDOW],
        }
    }

    pub fn table(&self, id: TableId) -> &PageTable {
        match id {
            TableId::Level0 => &self.level0,
            TableId::Level1 => &self.level1,
            TableId::Level2 => &self.level2,
            TableId::Level3(section) => &self.level3[section],
        }
    }

    fn table_mut(&mut self, id: TableId) -> &mut PageTable {
        match id {
            TableId::Level0 => &mut self.level0,
            TableId::Level1 => &mut self.level1,
            TableId::Level2 => &mut self.level2,
            TableId::Level3(section) => &mut self.level3[section],
        }
    }

    /// Translate `va` the way the table walker would, assuming these tables
    /// live at `tables_pa`
    pub fn lookup(&self, tables_pa: PhysAddr, va: VirtAddr) -> Lookup {
        let mut table = TableId::Level0;
        for level in 0..=3 {
            match self.table(table).descriptor(va.table_index(level), level) {
                Descriptor::Invalid => return Lookup::Fault { level },
                Descriptor::Table(next) => {
                    let next = next.next_table().as_u64();
                    match next
                        .checked_sub(tables_pa.as_u64())
                        .and_then(TableId::at_offset)
                    {
                        Some(id) => table = id,
                        // points outside the boot tables
                        None => return Lookup::Fault { level },
                    }
                }
                Descriptor::Block(leaf) | Descriptor::Page(leaf) => {
                    let span = 1u64 << (PAGE_SHIFT + (3 - level) * TABLE_SHIFT);
                    let pa = leaf.output_address().as_u64() | (va.as_u64() & (span - 1));
                    return Lookup::Mapped {
                        pa: PhysAddr::new(pa),
                        leaf,
                        level,
                    };
                }
            }
        }
        Lookup::Fault { level: 3 }
    }
}

impl Default for BootTables {
    fn default() -> BootTables {
        BootTables::new()
    }
}

/// Fills in [`BootTables`] for a [`Partition`] of the low memory window
pub struct TableBuilder<'a> {
    partition: &'a Partition,
}

impl<'a> TableBuilder<'a> {
    pub const fn new(partition: &'a Partition) -> TableBuilder<'a> {
        TableBuilder { partition }
    }

    /// Rewrite every entry of `tables`, which the walker will find at
    /// `tables_pa`
    ///
    /// The window is identity mapped from physical address zero. A section
    /// the partition gives one memory type becomes a single block; any
    /// other section is mapped page by page. Nothing above
    /// [`LOW_MEMORY`] is mapped.
    ///
    /// `tables_pa` must be 4 KiB aligned, which it is whenever it is the
    /// real address of a `BootTables`. The caller is responsible for the
    /// `DSB` that publishes the writes to the walker.
    pub fn build(&self, tables: &mut BootTables, tables_pa: PhysAddr) -> BuildSummary {
        debug_assert!(tables_pa.is_aligned(PAGE_SIZE));
        let link = |id: TableId| TableDescriptor::for_table(tables_pa.offset(id.offset())).raw_value();

        tables.level0.clear();
        tables.level1.clear();
        tables.level2.clear();
        for table in tables.level3.iter_mut() {
            table.clear();
        }

        let window = PhysAddr::new(0).identity_va();
        tables
            .level0
            .set(window.table_index(0), link(TableId::Level1));
        tables
            .level1
            .set(window.table_index(1), link(TableId::Level2));

        let mut summary = BuildSummary {
            blocks: 0,
            pages: 0,
        };
        for section in 0..SECTIONS_IN_WINDOW {
            let base = PhysAddr::new(section as u64 * SECTION_SIZE);
            let slot = base.identity_va().table_index(2);
            match self.partition.classify_span(base.as_u64(), SECTION_SIZE) {
                Some(memory) => {
                    let block = BlockDescriptor::for_memory(base, memory);
                    tables.level2.set(slot, block.raw_value());
                    summary.blocks += 1;
                }
                None => {
                    let id = TableId::Level3(section);
                    tables.level2.set(slot, link(id));
                    let pages = tables.table_mut(id);
                    for index in 0..ENTRIES_PER_TABLE {
                        let pa = base.offset(index as u64 * PAGE_SIZE);
                        let memory: MemoryType = self.partition.classify(pa.as_u64());
                        pages.set(index, BlockDescriptor::page_for_memory(pa, memory).raw_value());
                    }
                    summary.pages += ENTRIES_PER_TABLE;
                }
            }
        }
        summary
    }
}
