//! Translation Table Builder
//!
//! Identity maps the low memory window `[0, LOW_MEMORY)` with a 4 KiB
//! granule. The window is described by a [`Partition`] into typed regions,
//! which [`TableBuilder`] turns into descriptors inside a [`BootTables`].
//!
//! ```
//! use aarch64_boot::addr::PhysAddr;
//! use aarch64_boot::mmu::{BootTables, TableBuilder, DEFAULT_PARTITION};
//!
//! let mut tables = Box::new(BootTables::new());
//! let summary = TableBuilder::new(&DEFAULT_PARTITION).build(&mut tables, PhysAddr::new(0x8_0000));
//! assert_eq!(summary.blocks, 2);
//! ```

pub mod descriptor;
pub mod partition;
pub mod table;

pub use crate::catalog::MemoryType;
pub use descriptor::{BlockDescriptor, Descriptor, TableDescriptor};
pub use partition::{Partition, PartitionError, Region, MAX_REGIONS};
pub use table::{BootTables, BuildSummary, Lookup, PageTable, TableBuilder, TableId};

use crate::catalog::SECTION_SIZE;

/// The boot mapping: the first section holds the image, its stack and the
/// tables and is normal non-cacheable memory, the second is device memory.
pub const DEFAULT_PARTITION: Partition = Partition::new_or_panic(&[
    Region::new(0, SECTION_SIZE, MemoryType::NormalNonCacheable),
    Region::new(SECTION_SIZE, SECTION_SIZE, MemoryType::Device),
]);
