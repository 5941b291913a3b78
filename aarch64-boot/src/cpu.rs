//! The processor state that bring-up programs
//!
//! Descent and activation never touch a system register directly. They go
//! through [`Cpu`], which names each register write and each barrier they
//! need. [`Hardware`] is the real thing; tests drive the same code with a
//! recording implementation that checks privilege and keeps an ordered log.

use crate::addr::VirtAddr;
use crate::register::{
    CnthctlEl2, ExceptionLevel, HcrEl2, IdAa64Mmfr0El1, MairEl1, ParEl1, ScrEl3, SctlrEl1,
    SctlrEl2, Spsr, TcrEl1, Ttbr,
};

/// Named operations on the boot core's system registers
///
/// None of the writes are ordered against later instructions until an
/// [`isb`](Cpu::isb), and none of the memory writes are visible to the table
/// walker until a [`dsb_ish`](Cpu::dsb_ish).
pub trait Cpu {
    /// The exception level the core is running at
    fn current_el(&mut self) -> ExceptionLevel;

    /// Supported granules and physical address size
    fn mmu_features(&mut self) -> IdAa64Mmfr0El1;

    /// Needs EL3
    fn write_scr_el3(&mut self, value: ScrEl3);

    /// Needs EL2 or above
    fn write_hcr_el2(&mut self, value: HcrEl2);

    /// Needs EL2 or above
    fn write_sctlr_el2(&mut self, value: SctlrEl2);

    /// Needs EL2 or above
    fn write_cnthctl_el2(&mut self, value: CnthctlEl2);

    /// Needs EL2 or above
    fn write_cntvoff_el2(&mut self, offset: u64);

    /// Write the SPSR banked at `level`, which must be the current level
    fn write_spsr(&mut self, level: ExceptionLevel, value: Spsr);

    fn read_sctlr_el1(&mut self) -> SctlrEl1;

    fn write_sctlr_el1(&mut self, value: SctlrEl1);

    fn write_mair_el1(&mut self, value: MairEl1);

    fn write_tcr_el1(&mut self, value: TcrEl1);

    fn write_ttbr0_el1(&mut self, value: Ttbr);

    fn write_ttbr1_el1(&mut self, value: Ttbr);

    /// `DSB ISH`
    fn dsb_ish(&mut self);

    /// `ISB`
    fn isb(&mut self);

    /// `TLBI VMALLE1`
    fn tlbi_vmalle1(&mut self);

    /// Drop from `from` to the level named by its SPSR, continuing with the
    /// next instruction on the same stack
    fn exception_return(&mut self, from: ExceptionLevel);

    /// `AT S1E1R` for `va`, then read the result
    fn translate_el1_read(&mut self, va: VirtAddr) -> ParEl1;
}

/// The core this code is running on
#[cfg(target_arch = "aarch64")]
pub struct Hardware {
    _private: (),
}

#[cfg(target_arch = "aarch64")]
impl Hardware {
    /// Take control of the current core's system registers
    ///
    /// # Safety
    ///
    /// Only one `Hardware` may exist, on the boot core, while nothing else
    /// relies on the current translation, exception level or stack pointer
    /// banking.
    pub const unsafe fn new() -> Hardware {
        Hardware { _private: () }
    }
}

#[cfg(target_arch = "aarch64")]
impl Cpu for Hardware {
    fn current_el(&mut self) -> ExceptionLevel {
        crate::register::CurrentEl::read().level()
    }

    fn mmu_features(&mut self) -> IdAa64Mmfr0El1 {
        IdAa64Mmfr0El1::read()
    }

    fn write_scr_el3(&mut self, value: ScrEl3) {
        unsafe { ScrEl3::write(value) }
    }

    fn write_hcr_el2(&mut self, value: HcrEl2) {
        unsafe { HcrEl2::write(value) }
    }

    fn write_sctlr_el2(&mut self, value: SctlrEl2) {
        unsafe { SctlrEl2::write(value) }
    }

    fn write_cnthctl_el2(&mut self, value: CnthctlEl2) {
        unsafe { CnthctlEl2::write(value) }
    }

    fn write_cntvoff_el2(&mut self, offset: u64) {
        unsafe { crate::register::CntvoffEl2::write(offset) }
    }

    fn write_spsr(&mut self, level: ExceptionLevel, value: Spsr) {
        use crate::register::{SpsrEl1, SpsrEl2, SpsrEl3};
        match level {
            ExceptionLevel::El3 => unsafe { SpsrEl3::write(value) },
            ExceptionLevel::El2 => unsafe { SpsrEl2::write(value) },
            ExceptionLevel::El1 => unsafe { SpsrEl1::write(value) },
            // EL0 has no SPSR
            ExceptionLevel::El0 => {}
        }
    }

    fn read_sctlr_el1(&mut self) -> SctlrEl1 {
        SctlrEl1::read()
    }

    fn write_sctlr_el1(&mut self, value: SctlrEl1) {
        unsafe { SctlrEl1::write(value) }
    }

    fn write_mair_el1(&mut self, value: MairEl1) {
        unsafe { MairEl1::write(value) }
    }

    fn write_tcr_el1(&mut self, value: TcrEl1) {
        unsafe { TcrEl1::write(value) }
    }

    fn write_ttbr0_el1(&mut self, value: Ttbr) {
        unsafe { crate::register::Ttbr0El1::write(value) }
    }

    fn write_ttbr1_el1(&mut self, value: Ttbr) {
        unsafe { crate::register::Ttbr1El1::write(value) }
    }

    fn dsb_ish(&mut self) {
        crate::asm::dsb_ish();
    }

    fn isb(&mut self) {
        crate::asm::isb();
    }

    fn tlbi_vmalle1(&mut self) {
        crate::asm::tlbi_vmalle1();
    }

    fn exception_return(&mut self, from: ExceptionLevel) {
        // The lower level keeps using the current stack, and resumes at the
        // label straight after the ERET.
        unsafe {
            match from {
                ExceptionLevel::El3 => core::arch::asm!(
                    "mov {tmp}, sp",
                    "msr sp_el2, {tmp}",
                    "adr {tmp}, 2f",
                    "msr elr_el3, {tmp}",
                    "eret",
                    "2:",
                    tmp = out(reg) _,
                ),
                ExceptionLevel::El2 => core::arch::asm!(
                    "mov {tmp}, sp",
                    "msr sp_el1, {tmp}",
                    "adr {tmp}, 2f",
                    "msr elr_el2, {tmp}",
                    "eret",
                    "2:",
                    tmp = out(reg) _,
                ),
                ExceptionLevel::El1 => core::arch::asm!(
                    "mov {tmp}, sp",
                    "msr sp_el0, {tmp}",
                    "adr {tmp}, 2f",
                    "msr elr_el1, {tmp}",
                    "eret",
                    "2:",
                    tmp = out(reg) _,
                ),
                ExceptionLevel::El0 => {}
            }
        }
    }

    fn translate_el1_read(&mut self, va: VirtAddr) -> ParEl1 {
        unsafe {
            core::arch::asm!(
                "at s1e1r, {va}",
                va = in(reg) va.as_u64(),
                options(nostack, preserves_flags)
            );
        }
        crate::asm::isb();
        ParEl1::read()
    }
}

#[cfg(test)]
pub(crate) mod recording {
    //! A [`Cpu`] that keeps registers in a map and logs every operation

    use std::collections::HashMap;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Reg {
        ScrEl3,
        HcrEl2,
        SctlrEl2,
        CnthctlEl2,
        CntvoffEl2,
        SpsrEl1,
        SpsrEl2,
        SpsrEl3,
        SctlrEl1,
        MairEl1,
        TcrEl1,
        Ttbr0El1,
        Ttbr1El1,
    }

    impl Reg {
        /// Least privileged level that can write this register
        fn minimum_level(self) -> ExceptionLevel {
            match self {
                Reg::ScrEl3 | Reg::SpsrEl3 => ExceptionLevel::El3,
                Reg::HcrEl2
                | Reg::SctlrEl2
                | Reg::CnthctlEl2
                | Reg::CntvoffEl2
                | Reg::SpsrEl2 => ExceptionLevel::El2,
                _ => ExceptionLevel::El1,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Event {
        Write(Reg, u64),
        Dsb,
        Isb,
        Tlbi,
        Eret {
            from: ExceptionLevel,
            to: ExceptionLevel,
        },
        At(u64),
    }

    /// SCTLR_EL1 as some firmware might leave it: caches and alignment
    /// checking on, MMU off
    pub const FIRMWARE_SCTLR: u64 = 0x30D0_1806;

    pub struct RecordingCpu {
        pub level: ExceptionLevel,
        pub registers: HashMap<Reg, u64>,
        pub events: Vec<Event>,
        pub mmfr0: u64,
    }

    impl RecordingCpu {
        pub fn at(level: ExceptionLevel) -> RecordingCpu {
            let mut registers = HashMap::new();
            registers.insert(Reg::SctlrEl1, FIRMWARE_SCTLR);
            RecordingCpu {
                level,
                registers,
                events: Vec::new(),
                // 4 KiB and 64 KiB granules, 40-bit PA, like a Cortex-A53
                mmfr0: 0x0000_0000_0000_1122,
            }
        }

        pub fn register(&self, reg: Reg) -> Option<u64> {
            self.registers.get(&reg).copied()
        }

        /// Every register write, in order
        pub fn writes(&self) -> Vec<(Reg, u64)> {
            self.events
                .iter()
                .filter_map(|event| match event {
                    Event::Write(reg, value) => Some((*reg, *value)),
                    _ => None,
                })
                .collect()
        }

        pub fn erets(&self) -> Vec<(ExceptionLevel, ExceptionLevel)> {
            self.events
                .iter()
                .filter_map(|event| match event {
                    Event::Eret { from, to } => Some((*from, *to)),
                    _ => None,
                })
                .collect()
        }

        fn write(&mut self, reg: Reg, value: u64) {
            assert!(
                self.level >= reg.minimum_level(),
                "{:?} written at {}",
                reg,
                self.level
            );
            self.registers.insert(reg, value);
            self.events.push(Event::Write(reg, value));
        }
    }

    impl Cpu for RecordingCpu {
        fn current_el(&mut self) -> ExceptionLevel {
            self.level
        }

        fn mmu_features(&mut self) -> IdAa64Mmfr0El1 {
            IdAa64Mmfr0El1::new_with_raw_value(self.mmfr0)
        }

        fn write_scr_el3(&mut self, value: ScrEl3) {
            self.write(Reg::ScrEl3, value.raw_value());
        }

        fn write_hcr_el2(&mut self, value: HcrEl2) {
            self.write(Reg::HcrEl2, value.raw_value());
        }

        fn write_sctlr_el2(&mut self, value: SctlrEl2) {
            self.write(Reg::SctlrEl2, value.raw_value());
        }

        fn write_cnthctl_el2(&mut self, value: CnthctlEl2) {
            self.write(Reg::CnthctlEl2, value.raw_value());
        }

        fn write_cntvoff_el2(&mut self, offset: u64) {
            self.write(Reg::CntvoffEl2, offset);
        }

        fn write_spsr(&mut self, level: ExceptionLevel, value: Spsr) {
            assert_eq!(level, self.level, "SPSR of another level");
            let reg = match level {
                ExceptionLevel::El3 => Reg::SpsrEl3,
                ExceptionLevel::El2 => Reg::SpsrEl2,
                ExceptionLevel::El1 => Reg::SpsrEl1,
                ExceptionLevel::El0 => panic!("EL0 has no SPSR"),
            };
            self.write(reg, value.raw_value());
        }

        fn read_sctlr_el1(&mut self) -> SctlrEl1 {
            assert!(self.level >= ExceptionLevel::El1);
            SctlrEl1::new_with_raw_value(self.register(Reg::SctlrEl1).unwrap_or(0))
        }

        fn write_sctlr_el1(&mut self, value: SctlrEl1) {
            self.write(Reg::SctlrEl1, value.raw_value());
        }

        fn write_mair_el1(&mut self, value: MairEl1) {
            self.write(Reg::MairEl1, value.raw_value());
        }

        fn write_tcr_el1(&mut self, value: TcrEl1) {
            self.write(Reg::TcrEl1, value.raw_value());
        }

        fn write_ttbr0_el1(&mut self, value: Ttbr) {
            self.write(Reg::Ttbr0El1, value.raw_value());
        }

        fn write_ttbr1_el1(&mut self, value: Ttbr) {
            self.write(Reg::Ttbr1El1, value.raw_value());
        }

        fn dsb_ish(&mut self) {
            self.events.push(Event::Dsb);
        }

        fn isb(&mut self) {
            self.events.push(Event::Isb);
        }

        fn tlbi_vmalle1(&mut self) {
            self.events.push(Event::Tlbi);
        }

        fn exception_return(&mut self, from: ExceptionLevel) {
            assert_eq!(from, self.level, "ERET from another level");
            let spsr = match from {
                ExceptionLevel::El3 => Reg::SpsrEl3,
                ExceptionLevel::El2 => Reg::SpsrEl2,
                ExceptionLevel::El1 => Reg::SpsrEl1,
                ExceptionLevel::El0 => panic!("ERET from EL0"),
            };
            let spsr = self
                .register(spsr)
                .unwrap_or_else(|| panic!("ERET from {} with no SPSR", from));
            let to = Spsr::new_with_raw_value(spsr)
                .mode()
                .expect("SPSR names an AArch64 mode")
                .level();
            assert!(to < from, "ERET from {} to {}", from, to);
            if from == ExceptionLevel::El3 {
                let scr = ScrEl3::new_with_raw_value(self.register(Reg::ScrEl3).unwrap_or(0));
                assert!(scr.ns() && scr.rw(), "EL3 exit without a Non-secure AArch64 SCR");
            }
            if from == ExceptionLevel::El2 {
                let hcr = HcrEl2::new_with_raw_value(self.register(Reg::HcrEl2).unwrap_or(0));
                assert!(hcr.rw(), "EL2 exit without an AArch64 EL1");
            }
            self.events.push(Event::Eret { from, to });
            self.level = to;
        }

        fn translate_el1_read(&mut self, va: VirtAddr) -> ParEl1 {
            self.events.push(Event::At(va.as_u64()));
            // F=1, translation fault at level 0
            ParEl1::new_with_raw_value(0b0000_1001)
        }
    }
}
