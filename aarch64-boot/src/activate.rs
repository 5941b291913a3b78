//! MMU Activation Sequencer
//!
//! Points the core at the boot tables and turns translation on. The order of
//! the writes and barriers in [`Activation::commit`] matters: MAIR_EL1, the
//! base registers and TCR_EL1 must all be in effect before SCTLR_EL1.M is
//! set, and the instruction stream must be resynchronised straight after,
//! because the next fetch is already translated.

use core::ops::Range;

use crate::addr::PhysAddr;
use crate::catalog::{self, MemoryType, LOW_MEMORY, PAGE_SIZE};
use crate::cpu::Cpu;
use crate::mmu::{BootTables, Partition, TableId};
use crate::register::{IdAa64Mmfr0El1, MairEl1, SctlrEl1, TcrEl1, Ttbr};

/// Why translation cannot be turned on with these tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActivationError {
    /// ID_AA64MMFR0_EL1 says the 4 KiB granule is not implemented
    Granule4kUnsupported,
    /// The table area is not 4 KiB aligned
    TablesMisaligned { tables: u64 },
    /// Some of the table area would not be identity mapped
    TablesOutsideWindow { tables: u64 },
    /// The table area overlaps the booting image
    TablesOverlapImage { tables: u64 },
    /// Some of the image would not be executable once translation is on
    ImageNotExecutable { start: u64, end: u64 },
    /// Some of the boot stack would not be Normal memory
    StackNotNormal { start: u64, end: u64 },
}

impl core::fmt::Display for ActivationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ActivationError::Granule4kUnsupported => write!(f, "4 KiB granule not supported"),
            ActivationError::TablesMisaligned { tables } => {
                write!(f, "tables at {:#x} are not page aligned", tables)
            }
            ActivationError::TablesOutsideWindow { tables } => {
                write!(f, "tables at {:#x} are outside the identity map", tables)
            }
            ActivationError::TablesOverlapImage { tables } => {
                write!(f, "tables at {:#x} overlap the image", tables)
            }
            ActivationError::ImageNotExecutable { start, end } => {
                write!(f, "image at {:#x}..{:#x} is not in executable memory", start, end)
            }
            ActivationError::StackNotNormal { start, end } => {
                write!(f, "stack at {:#x}..{:#x} is not in normal memory", start, end)
            }
        }
    }
}

/// The register values that make the boot tables live
#[derive(Debug, Clone, Copy)]
pub struct Activation {
    mair: MairEl1,
    ttbr0: Ttbr,
    ttbr1: Ttbr,
    tcr: TcrEl1,
}

impl Activation {
    /// Values for a [`BootTables`] at `tables_pa`
    ///
    /// Both regions use the same tables: the upper region starts at
    /// [`VA_START`](crate::catalog::VA_START), which walks through the same
    /// level 0 slot as physical address zero.
    ///
    /// Panics if `tables_pa` is not 4 KiB aligned; [`Activation::checked`]
    /// reports that as an error instead.
    pub(crate) const fn new(tables_pa: PhysAddr) -> Activation {
        let root = Ttbr::for_table(tables_pa.offset(TableId::Level0.offset()));
        Activation {
            mair: catalog::MAIR,
            ttbr0: root,
            ttbr1: root,
            tcr: catalog::TCR,
        }
    }

    /// Values for a [`BootTables`] at `tables_pa`, after checking that
    /// translation can be turned on without pulling the ground from under
    /// the running code
    ///
    /// The core must support the 4 KiB granule and the tables must be inside
    /// the window and clear of `image`. Under `partition`, all of `image` must
    /// be executable and all of `stack` must be Normal memory.
    pub fn checked(
        features: IdAa64Mmfr0El1,
        partition: &Partition,
        tables_pa: PhysAddr,
        image: Range<u64>,
        stack: Range<u64>,
    ) -> Result<Activation, ActivationError> {
        let tables = tables_pa.as_u64();
        if !features.supports_4k_granule() {
            return Err(ActivationError::Granule4kUnsupported);
        }
        if !tables_pa.is_aligned(PAGE_SIZE) {
            return Err(ActivationError::TablesMisaligned { tables });
        }
        let end = tables
            .checked_add(BootTables::SIZE)
            .ok_or(ActivationError::TablesOutsideWindow { tables })?;
        if end > LOW_MEMORY {
            return Err(ActivationError::TablesOutsideWindow { tables });
        }
        if tables < image.end && image.start < end {
            return Err(ActivationError::TablesOverlapImage { tables });
        }
        match span_memory(partition, &image) {
            Some(memory) if memory.executable() => {}
            _ => {
                return Err(ActivationError::ImageNotExecutable {
                    start: image.start,
                    end: image.end,
                })
            }
        }
        match span_memory(partition, &stack) {
            Some(MemoryType::NormalNonCacheable) => {}
            _ => {
                return Err(ActivationError::StackNotNormal {
                    start: stack.start,
                    end: stack.end,
                })
            }
        }
        Ok(Activation::new(tables_pa))
    }

    pub const fn mair(&self) -> MairEl1 {
        self.mair
    }

    pub const fn ttbr0(&self) -> Ttbr {
        self.ttbr0
    }

    pub const fn ttbr1(&self) -> Ttbr {
        self.ttbr1
    }

    pub const fn tcr(&self) -> TcrEl1 {
        self.tcr
    }

    /// SCTLR_EL1 with translation on and both caches left off
    pub const fn enabled_sctlr(before: SctlrEl1) -> SctlrEl1 {
        before.with_m(true).with_c(false).with_i(false)
    }

    /// Program the core and enable translation
    ///
    /// The tables must already be written. Returns the SCTLR_EL1 value that
    /// was written.
    pub fn commit<C: Cpu>(&self, cpu: &mut C) -> SctlrEl1 {
        // table writes reach memory before the walker can look
        cpu.dsb_ish();
        cpu.write_mair_el1(self.mair);
        cpu.write_ttbr0_el1(self.ttbr0);
        cpu.write_ttbr1_el1(self.ttbr1);
        cpu.write_tcr_el1(self.tcr);
        // nothing cached from before these tables
        cpu.tlbi_vmalle1();
        cpu.dsb_ish();
        cpu.isb();

        let sctlr = Activation::enabled_sctlr(cpu.read_sctlr_el1());
        cpu.write_sctlr_el1(sctlr);
        cpu.isb();
        sctlr
    }
}

/// The one memory type covering all of `span`; an empty span has none
fn span_memory(partition: &Partition, span: &Range<u64>) -> Option<MemoryType> {
    if span.end <= span.start {
        return None;
    }
    partition.classify_span(span.start, span.end - span.start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::recording::{Event, RecordingCpu, Reg, FIRMWARE_SCTLR};
    use crate::catalog::SECTION_SIZE;
    use crate::mmu::DEFAULT_PARTITION;
    use crate::register::ExceptionLevel;

    const TABLES_PA: PhysAddr = PhysAddr::new(0x10_0000);
    const STACK: Range<u64> = 0x18_0000..0x19_0000;

    fn checked(tables_pa: PhysAddr, image: Range<u64>) -> Result<Activation, ActivationError> {
        Activation::checked(features(), &DEFAULT_PARTITION, tables_pa, image, STACK)
    }

    fn features() -> IdAa64Mmfr0El1 {
        IdAa64Mmfr0El1::new_with_raw_value(0x1122)
    }

    #[test]
    fn ordered_writes_and_barriers() {
        let mut cpu = RecordingCpu::at(ExceptionLevel::El1);
        cpu.registers
            .insert(Reg::SctlrEl1, catalog::SCTLR_VALUE_MMU_DISABLED);
        Activation::new(TABLES_PA).commit(&mut cpu);
        assert_eq!(
            cpu.events,
            [
                Event::Dsb,
                Event::Write(Reg::MairEl1, 0x4400),
                Event::Write(Reg::Ttbr0El1, 0x10_0000),
                Event::Write(Reg::Ttbr1El1, 0x10_0000),
                Event::Write(Reg::TcrEl1, 0x8010_0010),
                Event::Tlbi,
                Event::Dsb,
                Event::Isb,
                Event::Write(Reg::SctlrEl1, 0x00C5_0839),
                Event::Isb,
            ]
        );
    }

    #[test]
    fn only_the_enable_bit_changes() {
        let mut cpu = RecordingCpu::at(ExceptionLevel::El1);
        let before = catalog::SCTLR_VALUE_MMU_DISABLED;
        cpu.registers.insert(Reg::SctlrEl1, before);
        let after = Activation::new(TABLES_PA).commit(&mut cpu);
        assert_eq!(after.raw_value() ^ before, 1);
        assert!(after.m());
        assert_eq!(after.raw_value() & catalog::SCTLR_RESERVED, catalog::SCTLR_RESERVED);
    }

    #[test]
    fn caches_stay_off_whatever_firmware_left() {
        let mut cpu = RecordingCpu::at(ExceptionLevel::El1);
        assert_eq!(cpu.register(Reg::SctlrEl1), Some(FIRMWARE_SCTLR));
        let after = Activation::new(TABLES_PA).commit(&mut cpu);
        assert!(after.m() && !after.c() && !after.i());
        let changed = after.raw_value() ^ FIRMWARE_SCTLR;
        assert_eq!(changed, (1 << 12) | (1 << 2) | 1);
    }

    #[test]
    fn same_inputs_same_writes() {
        let run = |cpu: &mut RecordingCpu| {
            cpu.events.clear();
            Activation::new(TABLES_PA).commit(cpu);
            cpu.writes()
        };
        let mut cpu = RecordingCpu::at(ExceptionLevel::El1);
        let first = run(&mut cpu);
        let again = run(&mut cpu);
        let mut other = RecordingCpu::at(ExceptionLevel::El1);
        let fresh = run(&mut other);
        assert_eq!(first, again);
        assert_eq!(first, fresh);
        assert_eq!(
            Activation::new(TABLES_PA).ttbr0().raw_value(),
            Activation::new(TABLES_PA).ttbr1().raw_value()
        );
    }

    #[test]
    fn checks_before_commit() {
        let image = 0x8_0000..0x10_0000;
        assert!(checked(TABLES_PA, image.clone()).is_ok());
        assert_eq!(
            checked(PhysAddr::new(0xF_0000), image.clone()).unwrap_err(),
            ActivationError::TablesOverlapImage { tables: 0xF_0000 }
        );
        assert_eq!(
            checked(PhysAddr::new(0x10_0800), image.clone()).unwrap_err(),
            ActivationError::TablesMisaligned { tables: 0x10_0800 }
        );
        assert_eq!(
            checked(PhysAddr::new(LOW_MEMORY - PAGE_SIZE), image.clone()).unwrap_err(),
            ActivationError::TablesOutsideWindow {
                tables: LOW_MEMORY - PAGE_SIZE
            }
        );
        // TGran4 = 0b1111: not implemented
        let no_4k = IdAa64Mmfr0El1::new_with_raw_value(0xF000_0000);
        assert_eq!(
            Activation::checked(no_4k, &DEFAULT_PARTITION, TABLES_PA, image, STACK).unwrap_err(),
            ActivationError::Granule4kUnsupported
        );
    }

    #[test]
    fn image_must_stay_in_the_executable_section() {
        // runs from 512 KiB into the Device section at 2 MiB
        let image = 0x8_0000..0x28_0000;
        let err = checked(PhysAddr::new(0x30_0000), image).unwrap_err();
        assert_eq!(
            err,
            ActivationError::ImageNotExecutable {
                start: 0x8_0000,
                end: 0x28_0000
            }
        );
        assert_eq!(
            err.to_string(),
            "image at 0x80000..0x280000 is not in executable memory"
        );
        // entirely in the Device section
        assert!(matches!(
            checked(TABLES_PA, SECTION_SIZE..SECTION_SIZE + 0x1000),
            Err(ActivationError::ImageNotExecutable { .. })
        ));
        // right up to the end of the first section is fine
        assert!(checked(TABLES_PA, 0x8_0000..0x10_0000).is_ok());
        assert!(checked(PhysAddr::new(0x8_0000), 0x1A_0000..SECTION_SIZE).is_ok());
        assert!(matches!(
            checked(TABLES_PA, 0x8_0000..0x8_0000),
            Err(ActivationError::ImageNotExecutable { .. })
        ));
    }

    #[test]
    fn stack_must_be_normal_memory() {
        let image = 0x8_0000..0x10_0000;
        let stack = SECTION_SIZE - 0x8000..SECTION_SIZE + 0x8000;
        assert_eq!(
            Activation::checked(features(), &DEFAULT_PARTITION, TABLES_PA, image.clone(), stack)
                .unwrap_err(),
            ActivationError::StackNotNormal {
                start: SECTION_SIZE - 0x8000,
                end: SECTION_SIZE + 0x8000
            }
        );
        let stack = LOW_MEMORY..LOW_MEMORY + 0x1000;
        assert!(matches!(
            Activation::checked(features(), &DEFAULT_PARTITION, TABLES_PA, image, stack),
            Err(ActivationError::StackNotNormal { .. })
        ));
    }
}
