//! Partitions of the low memory window into typed regions

use crate::catalog::{MemoryType, LOW_MEMORY, PAGE_SIZE};

/// Most regions a [`Partition`] can hold
pub const MAX_REGIONS: usize = 8;

/// A span of physical memory and the type it is mapped with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    pub start: u64,
    pub size: u64,
    pub memory: MemoryType,
}

impl Region {
    const UNUSED: Region = Region::new(0, 0, MemoryType::STRICTEST);

    pub const fn new(start: u64, size: u64, memory: MemoryType) -> Region {
        Region {
            start,
            size,
            memory,
        }
    }

    /// One past the last byte
    pub const fn end(&self) -> u64 {
        self.start + self.size
    }

    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr - self.start < self.size
    }

    const fn overlaps(&self, other: &Region) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// Why a list of regions is not a partition of the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PartitionError {
    /// No regions at all
    Empty,
    /// More than [`MAX_REGIONS`] regions
    TooManyRegions,
    /// Start or size of a region is not a multiple of the page size
    Misaligned { index: usize },
    ZeroSized { index: usize },
    /// A region reaches past [`LOW_MEMORY`]
    OutsideWindow { index: usize },
    /// Two regions share at least one page
    Overlap { first: usize, second: usize },
    /// No region covers the address `at`
    Gap { at: u64 },
}

impl core::fmt::Display for PartitionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PartitionError::Empty => write!(f, "partition has no regions"),
            PartitionError::TooManyRegions => {
                write!(f, "partition has more than {} regions", MAX_REGIONS)
            }
            PartitionError::Misaligned { index } => {
                write!(f, "region {} is not aligned to {:#x}", index, PAGE_SIZE)
            }
            PartitionError::ZeroSized { index } => write!(f, "region {} is empty", index),
            PartitionError::OutsideWindow { index } => {
                write!(f, "region {} reaches past {:#x}", index, LOW_MEMORY)
            }
            PartitionError::Overlap { first, second } => {
                write!(f, "regions {} and {} overlap", first, second)
            }
            PartitionError::Gap { at } => write!(f, "no region covers {:#x}", at),
        }
    }
}

/// Regions that together cover exactly `[0, LOW_MEMORY)`, pairwise disjoint
///
/// The only way to get one is [`Partition::new`], so holding a `Partition`
/// means the checks have passed. Regions keep the order they were given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    regions: [Region; MAX_REGIONS],
    len: usize,
}

impl Partition {
    /// Check `regions` and take a copy of them
    pub const fn new(regions: &[Region]) -> Result<Partition, PartitionError> {
        if regions.is_empty() {
            return Err(PartitionError::Empty);
        }
        if regions.len() > MAX_REGIONS {
            return Err(PartitionError::TooManyRegions);
        }

        let mut i = 0;
        while i < regions.len() {
            let region = &regions[i];
            if region.size == 0 {
                return Err(PartitionError::ZeroSized { index: i });
            }
            if region.start % PAGE_SIZE != 0 || region.size % PAGE_SIZE != 0 {
                return Err(PartitionError::Misaligned { index: i });
            }
            if region.start >= LOW_MEMORY || region.size > LOW_MEMORY - region.start {
                return Err(PartitionError::OutsideWindow { index: i });
            }
            i += 1;
        }

        let mut first = 0;
        while first < regions.len() {
            let mut second = first + 1;
            while second < regions.len() {
                if regions[first].overlaps(&regions[second]) {
                    return Err(PartitionError::Overlap { first, second });
                }
                second += 1;
            }
            first += 1;
        }

        // Disjoint, so following region ends from zero either reaches the
        // top of the window or stops at the first uncovered address.
        let mut at = 0;
        while at < LOW_MEMORY {
            let mut next = None;
            let mut i = 0;
            while i < regions.len() {
                if regions[i].start == at {
                    next = Some(regions[i].end());
                }
                i += 1;
            }
            match next {
                Some(end) => at = end,
                None => return Err(PartitionError::Gap { at }),
            }
        }

        let mut copy = [Region::UNUSED; MAX_REGIONS];
        let mut i = 0;
        while i < regions.len() {
            copy[i] = regions[i];
            i += 1;
        }
        Ok(Partition {
            regions: copy,
            len: regions.len(),
        })
    }

    /// As [`Partition::new`], but panics on a malformed list
    ///
    /// Meant for `const` items, where the panic is a build failure.
    pub const fn new_or_panic(regions: &[Region]) -> Partition {
        match Partition::new(regions) {
            Ok(partition) => partition,
            Err(PartitionError::Empty) => panic!("partition has no regions"),
            Err(PartitionError::TooManyRegions) => panic!("partition has too many regions"),
            Err(PartitionError::Misaligned { .. }) => panic!("region is not page aligned"),
            Err(PartitionError::ZeroSized { .. }) => panic!("region is empty"),
            Err(PartitionError::OutsideWindow { .. }) => {
                panic!("region reaches past the low memory window")
            }
            Err(PartitionError::Overlap { .. }) => panic!("regions overlap"),
            Err(PartitionError::Gap { .. }) => panic!("regions leave a gap in the window"),
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions[..self.len]
    }

    /// The memory type of the page holding `addr`
    ///
    /// Anything no region covers is [`MemoryType::STRICTEST`].
    pub fn classify(&self, addr: u64) -> MemoryType {
        self.regions()
            .iter()
            .find(|region| region.contains(addr))
            .map(|region| region.memory)
            .unwrap_or(MemoryType::STRICTEST)
    }

    /// The single memory type of `[start, start + size)`, or `None` if the
    /// span mixes types
    ///
    /// Parts of the span no region covers count as [`MemoryType::STRICTEST`].
    pub fn classify_span(&self, start: u64, size: u64) -> Option<MemoryType> {
        let end = start.saturating_add(size);
        let mut found = None;
        let mut covered = 0;
        for region in self.regions() {
            let lo = region.start.max(start);
            let hi = region.end().min(end);
            if lo >= hi {
                continue;
            }
            covered += hi - lo;
            match found {
                None => found = Some(region.memory),
                Some(memory) if memory != region.memory => return None,
                Some(_) => {}
            }
        }
        if covered < size {
            match found {
                Some(memory) if memory != MemoryType::STRICTEST => return None,
                _ => found = Some(MemoryType::STRICTEST),
            }
        }
        found
    }
}
