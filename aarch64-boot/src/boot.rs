//! The complete bring-up pipeline
//!
//! Every check runs first: the descent plan, the granule, the table
//! placement and the memory types under the image and the stack. Only then does anything get written, in order: descent, table
//! construction, activation.

use core::ops::Range;

use crate::activate::{Activation, ActivationError};
use crate::addr::PhysAddr;
use crate::cpu::Cpu;
use crate::el::{Descent, DescentError, KERNEL_EL};
use crate::mmu::{BootTables, BuildSummary, Partition, TableBuilder};
use crate::register::{ExceptionLevel, SctlrEl1};

/// Something that stopped bring-up before the first register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootError {
    Descent(DescentError),
    Activation(ActivationError),
}

impl From<DescentError> for BootError {
    fn from(value: DescentError) -> BootError {
        BootError::Descent(value)
    }
}

impl From<ActivationError> for BootError {
    fn from(value: ActivationError) -> BootError {
        BootError::Activation(value)
    }
}

impl core::fmt::Display for BootError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BootError::Descent(e) => write!(f, "descent: {}", e),
            BootError::Activation(e) => write!(f, "activation: {}", e),
        }
    }
}

/// Where things are in physical memory
#[derive(Debug, Clone)]
pub struct BootConfig<'a> {
    /// How the low memory window is mapped
    pub partition: &'a Partition,
    /// Physical address of the [`BootTables`] passed to [`bring_up`]
    pub tables_pa: PhysAddr,
    /// Physical extent of the booting image
    pub image: Range<u64>,
    /// Physical extent of the boot stack
    pub stack: Range<u64>,
}

/// The state the core was left in
#[derive(Debug, Clone, Copy)]
pub struct Booted {
    pub level: ExceptionLevel,
    pub tables: BuildSummary,
    pub sctlr: SctlrEl1,
}

/// Take the core from its reset level to [`KERNEL_EL`] with translation on
///
/// On error nothing has been written.
pub fn bring_up<C: Cpu>(
    cpu: &mut C,
    config: &BootConfig<'_>,
    tables: &mut BootTables,
) -> Result<Booted, BootError> {
    let descent = Descent::plan(cpu.current_el(), KERNEL_EL)?;
    let activation = Activation::checked(
        cpu.mmu_features(),
        config.partition,
        config.tables_pa,
        config.image.clone(),
        config.stack.clone(),
    )?;

    let level = descent.commit(cpu);
    let summary = TableBuilder::new(config.partition).build(tables, config.tables_pa);
    let sctlr = activation.commit(cpu);
    Ok(Booted {
        level,
        tables: summary,
        sctlr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, LOW_MEMORY};
    use crate::cpu::recording::{Event, RecordingCpu, Reg};
    use crate::mmu::DEFAULT_PARTITION;
    use crate::register::ExceptionLevel::{El0, El1, El2, El3};

    fn config() -> BootConfig<'static> {
        BootConfig {
            partition: &DEFAULT_PARTITION,
            tables_pa: PhysAddr::new(0x10_0000),
            image: 0x8_0000..0xA_0000,
            stack: 0x10_5000..0x11_5000,
        }
    }

    #[test]
    fn reset_at_el1_goes_straight_to_tables() {
        let mut cpu = RecordingCpu::at(El1);
        let mut tables = Box::new(BootTables::new());
        let booted = bring_up(&mut cpu, &config(), &mut tables).unwrap();
        assert_eq!(booted.level, El1);
        assert_eq!(booted.tables.blocks, 2);
        assert!(cpu.erets().is_empty());
        assert_eq!(
            cpu.events[..2],
            [
                Event::Write(Reg::SctlrEl1, catalog::SCTLR_VALUE_MMU_DISABLED),
                Event::Dsb
            ]
        );
        assert_eq!(
            cpu.register(Reg::SctlrEl1),
            Some(catalog::SCTLR_VALUE_MMU_DISABLED | 1)
        );
    }

    #[test]
    fn from_el3_activation_happens_at_el1() {
        let mut cpu = RecordingCpu::at(El3);
        let mut tables = Box::new(BootTables::new());
        let booted = bring_up(&mut cpu, &config(), &mut tables).unwrap();
        assert_eq!(booted.level, El1);
        assert_eq!(cpu.erets(), [(El3, El2), (El2, El1)]);
        let last_eret = cpu
            .events
            .iter()
            .rposition(|e| matches!(e, Event::Eret { .. }))
            .unwrap();
        let first_mair = cpu
            .events
            .iter()
            .position(|e| matches!(e, Event::Write(Reg::MairEl1, _)))
            .unwrap();
        assert!(last_eret < first_mair);
        assert!(booted.sctlr.m());
    }

    #[test]
    fn nothing_written_on_error() {
        let mut cpu = RecordingCpu::at(El0);
        let mut tables = Box::new(BootTables::new());
        assert_eq!(
            bring_up(&mut cpu, &config(), &mut tables).unwrap_err(),
            BootError::Descent(DescentError::BelowTarget {
                current: El0,
                target: El1
            })
        );
        assert!(cpu.events.is_empty());

        let mut cpu = RecordingCpu::at(El2);
        cpu.mmfr0 = 0xF000_0000;
        let err = bring_up(&mut cpu, &config(), &mut tables).unwrap_err();
        assert_eq!(err, BootError::Activation(ActivationError::Granule4kUnsupported));
        assert!(cpu.events.is_empty());
        assert_eq!(tables.table(crate::mmu::TableId::Level0).valid_entries().count(), 0);
        assert_eq!(err.to_string(), "activation: 4 KiB granule not supported");
    }

    #[test]
    fn image_crossing_into_device_memory_is_refused() {
        let mut cpu = RecordingCpu::at(El2);
        let mut tables = Box::new(BootTables::new());
        let crossing = BootConfig {
            tables_pa: PhysAddr::new(0x30_0000),
            image: 0x8_0000..0x28_0000,
            ..config()
        };
        assert_eq!(
            bring_up(&mut cpu, &crossing, &mut tables).unwrap_err(),
            BootError::Activation(ActivationError::ImageNotExecutable {
                start: 0x8_0000,
                end: 0x28_0000
            })
        );
        assert!(cpu.events.is_empty());

        let device_stack = BootConfig {
            stack: 0x3F_0000..LOW_MEMORY,
            ..config()
        };
        assert!(matches!(
            bring_up(&mut cpu, &device_stack, &mut tables),
            Err(BootError::Activation(ActivationError::StackNotNormal { .. }))
        ));
        assert!(cpu.events.is_empty());
        assert_eq!(tables.table(crate::mmu::TableId::Level0).valid_entries().count(), 0);
    }
}
