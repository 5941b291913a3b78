//! # Run-time support for booting AArch64 cores
//!
//! This library supplies a reset entry point, `_start`, that takes a core
//! from whichever exception level it comes out of reset in to EL1 with the
//! MMU on and the low 4 MiB of physical memory identity mapped, and then
//! calls your `kmain`.
//!
//! The steps are:
//!
//! 1. Mask every asynchronous exception.
//! 2. Park every core except the one whose MPIDR_EL1 affinity is all zero.
//!    Bringing up the others is not handled here.
//! 3. Point the stack pointer at `_stack_top` and zero `.bss`.
//! 4. Call into Rust, which runs [`aarch64_boot::boot::bring_up`]: descend to
//!    EL1, build the translation tables in the `.boot_tables` section, and
//!    turn translation on with both caches still off.
//! 5. Call `kmain`, at EL1 with IRQ, FIQ and SError masked.
//!
//! If any check before the first register write fails (the core cannot use
//! the 4 KiB granule, say) the core parks in a `WFE` loop. There is nothing
//! else to do: no exception vectors and no output device exist yet.
//!
//! Build for `aarch64-unknown-none-softfloat`. Until `kmain` runs the
//! floating point unit may still trap, and with translation off every access
//! is to Device memory, which faults on an unaligned access.
//!
//! ## Constants
//!
//! We assume that a set of symbols exist. Our linker script `link.x` provides
//! them, and it expects a `memory.x` from you that defines a `RAM` region.
//!
//! * `_stack_top` - the address of the top of the boot stack, 16-byte
//!   aligned. Our linker script PROVIDEs one `_stack_size` bytes above the
//!   boot tables. The `_stack_size` bytes below it must be Normal memory.
//! * `__sbss` - the start of zero-initialised data in RAM. Must be 8-byte
//!   aligned.
//! * `__ebss` - the end of zero-initialised data in RAM. Must be 8-byte
//!   aligned.
//! * `__image_start` and `__image_end` - the physical extent of the loaded
//!   image, used to check the boot tables do not overlap it and that all of
//!   it stays executable once translation is on.
//! * `__boot_tables_start` - start of the `.boot_tables` section.
//!
//! ## C-Compatible Functions
//!
//! ### Main Function
//!
//! The symbol `kmain` should be an `extern "C"` function. It is called at
//! EL1 with translation on. There is no default - this function is
//! mandatory.
//!
//! ```rust
//! #[unsafe(no_mangle)]
//! extern "C" fn kmain() -> ! {
//!     loop { }
//! }
//! ```
//!
//! You can also create a 'kmain' function by using the `#[entry]` attribute
//! on a normal Rust function.
//!
//! ```rust
//! use aarch64_boot_rt::entry;
//!
//! #[entry]
//! fn my_main() -> ! {
//!     loop { }
//! }
//! ```
//!
//! ## Outputs
//!
//! This library produces global symbols called:
//!
//! * `_start` - the reset entry point, placed first in the image
//! * `_boot_rust` - the Rust half of the start-up sequence, which never
//!   returns
//!
//! ## Features
//!
//! - `panic-park`: adds a `#[panic_handler]` that parks the core.

#![no_std]

pub use aarch64_boot_rt_macros::entry;

#[cfg(target_arch = "aarch64")]
mod boot {
    use core::cell::UnsafeCell;

    use aarch64_boot::addr::PhysAddr;
    use aarch64_boot::asm::park;
    use aarch64_boot::boot::{bring_up, BootConfig};
    use aarch64_boot::cpu::Hardware;
    use aarch64_boot::mmu::{BootTables, DEFAULT_PARTITION};
    use aarch64_boot::register::MpidrEl1;

    /// The boot tables, in their own page-aligned section
    #[repr(transparent)]
    struct TableArea(UnsafeCell<BootTables>);

    // Only the boot core touches the tables, before anything else runs.
    unsafe impl Sync for TableArea {}

    #[link_section = ".boot_tables"]
    static BOOT_TABLES: TableArea = TableArea(UnsafeCell::new(BootTables::new()));

    extern "C" {
        static __image_start: u8;
        static __image_end: u8;
        static _stack_top: u8;
        static _stack_size: u8;
        fn kmain() -> !;
    }

    /// Bring the core up and hand over to `kmain`
    ///
    /// # Safety
    ///
    /// Only `_start` calls this, once, on the boot core, with a valid stack.
    #[no_mangle]
    unsafe extern "C" fn _boot_rust() -> ! {
        let tables = unsafe { &mut *BOOT_TABLES.0.get() };
        let tables_pa = PhysAddr::new(tables as *mut BootTables as u64);
        let image = unsafe {
            core::ptr::addr_of!(__image_start) as u64..core::ptr::addr_of!(__image_end) as u64
        };
        // `_stack_size` is an absolute symbol; its address is the size
        let stack = unsafe {
            let top = core::ptr::addr_of!(_stack_top) as u64;
            top.saturating_sub(core::ptr::addr_of!(_stack_size) as u64)..top
        };
        let config = BootConfig {
            partition: &DEFAULT_PARTITION,
            tables_pa,
            image,
            stack,
        };
        let mut cpu = unsafe { Hardware::new() };
        match bring_up(&mut cpu, &config, tables) {
            Ok(_) => unsafe { kmain() },
            Err(_) => park(),
        }
    }

    // Reset entry point
    //
    // Parks secondary cores, sets up the stack, zeroes .bss and calls
    // `_boot_rust`.
    core::arch::global_asm!(
        r#"
        .section .text.boot,"ax",%progbits
        .global _start
        .type _start, %function
        _start:
            msr     daifset, #0xf
            mrs     x0, mpidr_el1
            ldr     x1, ={affinity_mask}
            and     x0, x0, x1
            cbz     x0, 2f
        1:
            wfe
            b       1b
        2:
            ldr     x0, =_stack_top
            mov     sp, x0
            // Initialise .bss
            ldr     x0, =__sbss
            ldr     x1, =__ebss
        3:
            cmp     x0, x1
            b.hs    4f
            str     xzr, [x0], #8
            b       3b
        4:
            bl      _boot_rust
            // _boot_rust does not return
            b       1b
        .size _start, . - _start
        "#,
        affinity_mask = const MpidrEl1::AFFINITY_MASK,
    );
}

#[cfg(all(target_arch = "aarch64", feature = "panic-park"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    aarch64_boot::asm::park()
}
