//! Interrupt masking on the current core
//!
//! Bring-up runs with every asynchronous exception masked. These are for the
//! code that runs after handoff, once it has a vector table.

use core::sync::atomic::{compiler_fence, Ordering};

use crate::register::Daif;

/// Mask IRQ and FIQ
#[inline]
pub fn disable() {
    compiler_fence(Ordering::SeqCst);
    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("msr daifset, #3", options(nostack, preserves_flags));
    }
    compiler_fence(Ordering::SeqCst);
}

/// Unmask IRQ and FIQ
///
/// # Safety
///
/// Do not call this function inside a critical section, or before
/// VBAR_EL1 points at a vector table.
#[inline]
pub unsafe fn enable() {
    compiler_fence(Ordering::SeqCst);
    #[cfg(target_arch = "aarch64")]
    unsafe {
        core::arch::asm!("msr daifclr, #3", options(nostack, preserves_flags));
    }
    compiler_fence(Ordering::SeqCst);
}

/// Are IRQs masked on this core?
#[inline]
pub fn is_masked() -> bool {
    Daif::read().i()
}

/// Mask IRQ and FIQ, returning the mask bits as they were
#[inline]
pub fn save() -> Daif {
    let before = Daif::read();
    disable();
    before
}

/// Put the IRQ and FIQ masks back to what [`save`] returned
///
/// The D and A bits are left alone.
///
/// # Safety
///
/// As for [`enable`], if `saved` has either mask clear.
#[inline]
pub unsafe fn restore(saved: Daif) {
    let current = Daif::read();
    compiler_fence(Ordering::SeqCst);
    unsafe {
        Daif::write(current.with_i(saved.i()).with_f(saved.f()));
    }
    compiler_fence(Ordering::SeqCst);
}

/// Run `f` with IRQ and FIQ masked, then put the masks back as they were
pub fn free<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let saved = save();
    let result = f();
    // Safety: the masks go back to a state this code was already running in
    unsafe { restore(saved) };
    result
}
