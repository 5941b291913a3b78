//! # Early boot support for AArch64
//!
//! This crate holds everything a 64-bit Arm core needs between its reset
//! vector and the first line of kernel code:
//!
//! * [`register`] - typed views of the system registers touched during
//!   bring-up, with `read`/`write` on AArch64 targets.
//! * [`catalog`] - the fixed register values for this boot configuration,
//!   checked at build time.
//! * [`el`] - the exception level descent controller.
//! * [`mmu`] - the identity-mapped translation tables for the low memory
//!   window.
//! * [`activate`] - the ordered MMU enable sequence.
//! * [`boot`] - all of the above, checked up front and then run in order.
//!
//! The descent controller and activation sequencer drive the hardware through
//! the [`Cpu`](cpu::Cpu) trait, so the whole pipeline can be exercised on a
//! host against a recording implementation.
//!
//! ## Features
//!
//! - `critical-section-single-core`: implements the `critical-section` traits
//!   by masking IRQ and FIQ on the calling core.
//! - `defmt`: adds `defmt::Format` for the register and descriptor types.

#![cfg_attr(not(test), no_std)]

#[cfg(target_arch = "aarch64")]
pub mod asm;

pub mod activate;
pub mod addr;
pub mod boot;
pub mod catalog;
pub mod cpu;
pub mod el;
pub mod interrupt;
pub mod mmu;
pub mod register;

#[cfg(target_arch = "aarch64")]
mod critical_section;
