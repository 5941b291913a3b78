//! Exception Level Descent Controller
//!
//! Moves the boot core from whatever level reset left it at down to the
//! level the kernel runs at. Each step configures the level being left, then
//! performs an exception return into the level below it. Nothing ever moves
//! upwards; the only way back up is an exception, and there are no handlers
//! yet.
//!
//! Planning ([`Descent::plan`]) does all the checking. Committing
//! ([`Descent::commit`]) only writes registers and cannot fail.

use crate::catalog;
use crate::cpu::Cpu;
use crate::register::{
    CnthctlEl2, ExceptionLevel, ExceptionMode, HcrEl2, ScrEl3, SctlrEl1, SctlrEl2, Spsr,
};

/// The level the kernel runs at
pub const KERNEL_EL: ExceptionLevel = ExceptionLevel::El1;

/// Why a descent cannot be planned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescentError {
    /// The core already runs with less privilege than the target
    BelowTarget {
        current: ExceptionLevel,
        target: ExceptionLevel,
    },
}

impl core::fmt::Display for DescentError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DescentError::BelowTarget { current, target } => {
                write!(f, "running at {}, cannot climb to {}", current, target)
            }
        }
    }
}

/// Everything written to leave one exception level for the one below
#[derive(Debug, Clone, Copy)]
pub enum LevelExit {
    /// Make the lower levels Non-secure and AArch64, give EL2 a known
    /// system control value, return to EL2h
    El3 {
        scr: ScrEl3,
        sctlr_el2: SctlrEl2,
        spsr: Spsr,
    },
    /// Make EL1 AArch64 with untrapped timer access, return to EL1h
    El2 {
        hcr: HcrEl2,
        cnthctl: CnthctlEl2,
        cntvoff: u64,
        spsr: Spsr,
    },
    /// Return to EL0t
    El1 { spsr: Spsr },
}

impl LevelExit {
    /// The writes needed to leave `level`, or `None` for EL0
    pub const fn leaving(level: ExceptionLevel) -> Option<LevelExit> {
        let Some(below) = level.below() else {
            return None;
        };
        let spsr = catalog::SPSR.with_mode(ExceptionMode::for_level(below));
        Some(match level {
            ExceptionLevel::El3 => LevelExit::El3 {
                scr: catalog::SCR,
                sctlr_el2: catalog::SCTLR_EL2,
                spsr,
            },
            ExceptionLevel::El2 => LevelExit::El2 {
                hcr: catalog::HCR,
                cnthctl: CnthctlEl2::EL1_TIMER_ACCESS,
                cntvoff: 0,
                spsr,
            },
            _ => LevelExit::El1 { spsr },
        })
    }

    /// The level being left
    pub const fn from(&self) -> ExceptionLevel {
        match self {
            LevelExit::El3 { .. } => ExceptionLevel::El3,
            LevelExit::El2 { .. } => ExceptionLevel::El2,
            LevelExit::El1 { .. } => ExceptionLevel::El1,
        }
    }

    /// The level the exception return lands in
    pub const fn to(&self) -> ExceptionLevel {
        match self {
            LevelExit::El3 { .. } => ExceptionLevel::El2,
            LevelExit::El2 { .. } => ExceptionLevel::El1,
            LevelExit::El1 { .. } => ExceptionLevel::El0,
        }
    }

    pub const fn spsr_value(&self) -> Spsr {
        match self {
            LevelExit::El3 { spsr, .. } | LevelExit::El2 { spsr, .. } | LevelExit::El1 { spsr } => {
                *spsr
            }
        }
    }

    fn apply<C: Cpu>(&self, cpu: &mut C) {
        match *self {
            LevelExit::El3 {
                scr,
                sctlr_el2,
                spsr,
            } => {
                cpu.write_scr_el3(scr);
                cpu.write_sctlr_el2(sctlr_el2);
                cpu.write_spsr(ExceptionLevel::El3, spsr);
            }
            LevelExit::El2 {
                hcr,
                cnthctl,
                cntvoff,
                spsr,
            } => {
                cpu.write_hcr_el2(hcr);
                cpu.write_cnthctl_el2(cnthctl);
                cpu.write_cntvoff_el2(cntvoff);
                cpu.write_spsr(ExceptionLevel::El2, spsr);
            }
            LevelExit::El1 { spsr } => cpu.write_spsr(ExceptionLevel::El1, spsr),
        }
        cpu.exception_return(self.from());
    }
}

/// A checked plan for getting from one level to another
#[derive(Debug, Clone, Copy)]
pub struct Descent {
    start: ExceptionLevel,
    target: ExceptionLevel,
    sctlr: Option<SctlrEl1>,
    exits: [Option<LevelExit>; 3],
}

impl Descent {
    /// Plan the exits from `current` down to `target`, one level at a time
    ///
    /// Equal levels give an empty plan. SCTLR_EL1 gets its MMU-off value
    /// whenever the start level can write it.
    pub const fn plan(
        current: ExceptionLevel,
        target: ExceptionLevel,
    ) -> Result<Descent, DescentError> {
        if (current as u8) < (target as u8) {
            return Err(DescentError::BelowTarget { current, target });
        }
        let mut exits = [None; 3];
        let mut level = current;
        let mut i = 0;
        while (level as u8) > (target as u8) {
            exits[i] = LevelExit::leaving(level);
            level = match level.below() {
                Some(below) => below,
                None => break,
            };
            i += 1;
        }
        let sctlr = match current {
            ExceptionLevel::El0 => None,
            _ => Some(catalog::SCTLR_MMU_DISABLED),
        };
        Ok(Descent {
            start: current,
            target,
            sctlr,
            exits,
        })
    }

    pub const fn start(&self) -> ExceptionLevel {
        self.start
    }

    pub const fn target(&self) -> ExceptionLevel {
        self.target
    }

    /// The exits in the order they happen
    pub fn exits(&self) -> impl Iterator<Item = &LevelExit> {
        self.exits.iter().flatten()
    }

    /// Run the plan on `cpu`, which must be at the start level
    ///
    /// Returns the level the core ends up at, read back from the core.
    pub fn commit<C: Cpu>(&self, cpu: &mut C) -> ExceptionLevel {
        debug_assert_eq!(cpu.current_el(), self.start);
        if let Some(sctlr) = self.sctlr {
            cpu.write_sctlr_el1(sctlr);
        }
        for exit in self.exits() {
            exit.apply(cpu);
        }
        cpu.current_el()
    }
}

/// Read the current level, plan the way down to `target` and take it
pub fn descend<C: Cpu>(cpu: &mut C, target: ExceptionLevel) -> Result<ExceptionLevel, DescentError> {
    let plan = Descent::plan(cpu.current_el(), target)?;
    Ok(plan.commit(cpu))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::recording::{Event, RecordingCpu, Reg, FIRMWARE_SCTLR};
    use crate::register::ExceptionLevel::{El0, El1, El2, El3};

    #[test]
    fn three_levels_down() {
        let mut cpu = RecordingCpu::at(El3);
        assert_eq!(descend(&mut cpu, El0), Ok(El0));
        assert_eq!(cpu.erets(), [(El3, El2), (El2, El1), (El1, El0)]);
        assert_eq!(
            cpu.writes(),
            [
                (Reg::SctlrEl1, 0x00C5_0838),
                (Reg::ScrEl3, 0x431),
                (Reg::SctlrEl2, 0x30C5_0838),
                (Reg::SpsrEl3, 0x1C9),
                (Reg::HcrEl2, 0x8000_0000),
                (Reg::CnthctlEl2, 0b11),
                (Reg::CntvoffEl2, 0),
                (Reg::SpsrEl2, 0x1C5),
                (Reg::SpsrEl1, 0x1C0),
            ]
        );
        // each exit programs its level with different values
        let spsrs: Vec<u64> = [Reg::SpsrEl3, Reg::SpsrEl2, Reg::SpsrEl1]
            .iter()
            .map(|reg| cpu.register(*reg).unwrap())
            .collect();
        assert_ne!(spsrs[0], spsrs[1]);
        assert_ne!(spsrs[1], spsrs[2]);
        assert_ne!(spsrs[0], spsrs[2]);
    }

    #[test]
    fn reset_at_the_kernel_level() {
        let mut cpu = RecordingCpu::at(KERNEL_EL);
        assert_eq!(descend(&mut cpu, KERNEL_EL), Ok(KERNEL_EL));
        assert!(cpu.erets().is_empty());
        assert_eq!(cpu.events, [Event::Write(Reg::SctlrEl1, 0x00C5_0838)]);
    }

    #[test]
    fn kernel_from_el2_and_el3() {
        let mut cpu = RecordingCpu::at(El2);
        assert_eq!(descend(&mut cpu, KERNEL_EL), Ok(El1));
        assert_eq!(cpu.erets(), [(El2, El1)]);
        assert_eq!(cpu.register(Reg::SpsrEl2), Some(catalog::SPSR_VALUE));

        let mut cpu = RecordingCpu::at(El3);
        assert_eq!(descend(&mut cpu, KERNEL_EL), Ok(El1));
        assert_eq!(cpu.erets(), [(El3, El2), (El2, El1)]);
        assert_eq!(cpu.register(Reg::SpsrEl1), None);
    }

    #[test]
    fn el2_is_configured_before_it_runs() {
        let mut cpu = RecordingCpu::at(El3);
        descend(&mut cpu, KERNEL_EL).unwrap();
        let sctlr_el2 = cpu
            .events
            .iter()
            .position(|e| *e == Event::Write(Reg::SctlrEl2, catalog::SCTLR_EL2_VALUE))
            .unwrap();
        let first_eret = cpu
            .events
            .iter()
            .position(|e| matches!(e, Event::Eret { .. }))
            .unwrap();
        assert!(sctlr_el2 < first_eret);

        // firmware at EL2 already chose its own
        let mut cpu = RecordingCpu::at(El2);
        descend(&mut cpu, KERNEL_EL).unwrap();
        assert_eq!(cpu.register(Reg::SctlrEl2), None);
    }

    #[test]
    fn sctlr_is_written_before_any_exit() {
        let mut cpu = RecordingCpu::at(El2);
        assert_eq!(cpu.register(Reg::SctlrEl1), Some(FIRMWARE_SCTLR));
        descend(&mut cpu, El1).unwrap();
        assert_eq!(cpu.events[0], Event::Write(Reg::SctlrEl1, catalog::SCTLR_VALUE_MMU_DISABLED));
    }

    #[test]
    fn never_climbs() {
        for start in ExceptionLevel::DESCENDING {
            for target in ExceptionLevel::DESCENDING {
                let mut cpu = RecordingCpu::at(start);
                let result = descend(&mut cpu, target);
                if target > start {
                    assert_eq!(result, Err(DescentError::BelowTarget { current: start, target }));
                    assert!(cpu.events.is_empty());
                    continue;
                }
                assert_eq!(result, Ok(target));
                let erets = cpu.erets();
                assert_eq!(erets.len(), start as usize - target as usize);
                let mut level = start;
                for (from, to) in erets {
                    assert_eq!(from, level);
                    assert!(to < from);
                    level = to;
                }
                assert_eq!(level, target);
            }
        }
    }

    #[test]
    fn exits_leave_one_level_each() {
        let plan = Descent::plan(El3, El0).unwrap();
        let steps: Vec<_> = plan.exits().map(|exit| (exit.from(), exit.to())).collect();
        assert_eq!(steps, [(El3, El2), (El2, El1), (El1, El0)]);
        for exit in plan.exits() {
            assert!(exit.spsr_value().asynchronous_masked());
        }
        assert!(LevelExit::leaving(El0).is_none());
        assert_eq!(Descent::plan(El1, El1).unwrap().exits().count(), 0);
    }

    #[test]
    fn error_message() {
        let err = Descent::plan(El1, El2).unwrap_err();
        assert_eq!(err.to_string(), "running at EL1, cannot climb to EL2");
    }
}
