//! Simple assembly routines

use core::sync::atomic::{compiler_fence, Ordering};

/// Data Synchronization Barrier, inner shareable domain
///
/// No instruction in program order after this instruction can execute until
/// this instruction completes. It completes when every explicit memory access
/// and every cache, TLB and branch predictor maintenance operation before it
/// has completed for the inner shareable domain.
///
/// Stores to translation tables must be followed by one of these before the
/// table walker is allowed to see them.
#[inline]
pub fn dsb_ish() {
    compiler_fence(Ordering::SeqCst);
    unsafe {
        core::arch::asm!("dsb ish", options(nostack, preserves_flags));
    }
    compiler_fence(Ordering::SeqCst);
}

/// Instruction Synchronization Barrier
///
/// Flushes the pipeline in the processor, so that all instructions following
/// the `ISB` are fetched from cache or memory, after the instruction has been
/// completed. System register writes before it are visible to everything
/// after it.
#[inline]
pub fn isb() {
    compiler_fence(Ordering::SeqCst);
    unsafe {
        core::arch::asm!("isb", options(nostack, preserves_flags));
    }
    compiler_fence(Ordering::SeqCst);
}

/// Invalidate all stage 1 EL1&0 TLB entries for the current VMID
///
/// Needs a [`dsb_ish`] afterwards before the invalidation is guaranteed
/// complete.
#[inline]
pub fn tlbi_vmalle1() {
    compiler_fence(Ordering::SeqCst);
    unsafe {
        core::arch::asm!("tlbi vmalle1", options(nostack, preserves_flags));
    }
    compiler_fence(Ordering::SeqCst);
}

/// Emit an WFE instruction
#[inline]
pub fn wfe() {
    unsafe { core::arch::asm!("wfe", options(nomem, nostack, preserves_flags)) }
}

/// Park this core forever
///
/// Used when bring-up cannot continue. With no exception handlers installed
/// there is nothing else to do.
#[inline]
pub fn park() -> ! {
    loop {
        wfe();
    }
}
