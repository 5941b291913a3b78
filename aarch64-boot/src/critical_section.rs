//! `critical-section` support for a single AArch64 core
//!
//! Masking IRQ and FIQ on one core does nothing to stop another, so there
//! is no multi-core variant. Select this with the
//! `critical-section-single-core` feature.

#[cfg(feature = "critical-section-single-core")]
mod single_core {
    use crate::interrupt;
    use crate::register::Daif;

    /// Restore state bit for "IRQ was masked on entry"
    const IRQ_MASKED: u8 = 1 << 0;

    /// Restore state bit for "FIQ was masked on entry"
    const FIQ_MASKED: u8 = 1 << 1;

    struct SingleCore;

    critical_section::set_impl!(SingleCore);

    unsafe impl critical_section::Impl for SingleCore {
        unsafe fn acquire() -> critical_section::RawRestoreState {
            let saved = interrupt::save();
            let mut state = 0;
            if saved.i() {
                state |= IRQ_MASKED;
            }
            if saved.f() {
                state |= FIQ_MASKED;
            }
            state
        }

        unsafe fn release(state: critical_section::RawRestoreState) {
            let saved = Daif::new_with_raw_value(0)
                .with_i(state & IRQ_MASKED != 0)
                .with_f(state & FIQ_MASKED != 0);
            // Safety: nested sections release innermost first, so this only
            // unmasks what was unmasked when the outermost one started
            unsafe { interrupt::restore(saved) };
        }
    }
}
