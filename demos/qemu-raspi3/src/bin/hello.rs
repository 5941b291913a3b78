//! Prints the state the start-up code left the core in

#![no_std]
#![no_main]

use aarch64_boot::register::{
    CurrentEl, MairEl1, MpidrEl1, SctlrEl1, TcrEl1, Ttbr0El1, Ttbr1El1,
};
use aarch64_boot_rt::entry;

// pull in our library
use qemu_raspi3 as _;

use semihosting::println;

/// The entry-point to the Rust application.
///
/// It is called by the start-up code in `aarch64-boot-rt`.
#[entry]
fn main() -> ! {
    println!("Hello from {}", CurrentEl::read().level());
    println!("{:?}", MpidrEl1::read());
    println!("{:?}", SctlrEl1::read());
    println!("{:?}", TcrEl1::read());
    println!("{:?}", MairEl1::read());
    println!("TTBR0_EL1 {:?}", Ttbr0El1::read());
    println!("TTBR1_EL1 {:?}", Ttbr1El1::read());
    semihosting::process::exit(0);
}
