//! Access to AArch64 System Registers
//!
//! Every register is addressed through its generic `S<op0>_<op1>_C<n>_C<m>_<op2>`
//! encoding, so one pair of `mrs`/`msr` templates covers all of them.

pub mod cnthctl_el2;
pub mod current_el;
pub mod daif;
pub mod hcr_el2;
pub mod id_aa64mmfr0_el1;
pub mod mair_el1;
pub mod mpidr_el1;
pub mod par_el1;
pub mod scr_el3;
pub mod sctlr_el1;
pub mod sctlr_el2;
pub mod spsr;
pub mod tcr_el1;
pub mod ttbr;

pub use cnthctl_el2::{CnthctlEl2, CntvoffEl2};
pub use current_el::{CurrentEl, ExceptionLevel};
pub use daif::Daif;
pub use hcr_el2::{HcrConfig, HcrEl2};
pub use id_aa64mmfr0_el1::IdAa64Mmfr0El1;
pub use mair_el1::MairEl1;
pub use mpidr_el1::MpidrEl1;
pub use par_el1::{FaultStatus, ParEl1, Translation};
pub use scr_el3::{ScrConfig, ScrEl3};
pub use sctlr_el1::{Endianness, SctlrConfig, SctlrEl1};
pub use sctlr_el2::{SctlrEl2, SctlrEl2Config};
pub use spsr::{ExceptionMode, Spsr, SpsrConfig, SpsrEl1, SpsrEl2, SpsrEl3};
pub use tcr_el1::{Granule, PhysicalAddressSize, RegimeConfig, TcrConfig, TcrEl1, WalkCacheability};
pub use ttbr::{Ttbr, Ttbr0El1, Ttbr1El1};

/// Describes a System Register
pub trait SysReg {
    /// Top-level encoding (always 2 or 3 for system registers)
    const OP0: u32;
    /// Which OP1 value to use
    const OP1: u32;
    /// Which CRn register to use
    const CRN: u32;
    /// Which CRm register to use
    const CRM: u32;
    /// Which OP2 value to use
    const OP2: u32;
}

/// Represents a readable System Register
pub trait SysRegRead: SysReg {
    /// Read a value from this 64-bit register
    ///
    /// On anything other than AArch64 this returns zero, so value types can
    /// be used in host tests.
    #[inline]
    fn read_raw() -> u64 {
        let r: u64;
        #[cfg(target_arch = "aarch64")]
        unsafe {
            core::arch::asm!(
                "mrs {reg}, S{op0}_{op1}_C{crn}_C{crm}_{op2}",
                op0 = const Self::OP0,
                op1 = const Self::OP1,
                reg = out(reg) r,
                crn = const Self::CRN,
                crm = const Self::CRM,
                op2 = const Self::OP2,
                options(nomem, nostack, preserves_flags)
            );
        }
        #[cfg(not(target_arch = "aarch64"))]
        {
            r = 0;
        }
        r
    }
}

/// Represents a writable System Register
pub trait SysRegWrite: SysReg {
    /// Write a value to this 64-bit register
    ///
    /// # Safety
    ///
    /// You need to read the Architecture Reference Manual to verify what
    /// happens when you write to this register. Most of these writes change
    /// how the core executes, and none of them are ordered against later
    /// instructions without an explicit barrier.
    #[inline]
    unsafe fn write_raw(value: u64) {
        #[cfg(target_arch = "aarch64")]
        unsafe {
            core::arch::asm!(
                "msr S{op0}_{op1}_C{crn}_C{crm}_{op2}, {reg}",
                op0 = const Self::OP0,
                op1 = const Self::OP1,
                reg = in(reg) value,
                crn = const Self::CRN,
                crm = const Self::CRM,
                op2 = const Self::OP2,
                options(nostack, preserves_flags)
            );
        }
        #[cfg(not(target_arch = "aarch64"))]
        {
            let _ = value;
        }
    }
}

