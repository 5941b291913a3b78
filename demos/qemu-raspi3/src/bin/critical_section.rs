//! critical-section example for AArch64

#![no_std]
#![no_main]

use core::cell::RefCell;

use aarch64_boot_rt::entry;

use qemu_raspi3 as _;

use semihosting::println;

struct Data {
    value: u32,
}

static GLOBAL_DATA: critical_section::Mutex<RefCell<Data>> =
    critical_section::Mutex::new(RefCell::new(Data { value: 100 }));

#[entry]
fn main() -> ! {
    let value = critical_section::with(|cs| {
        let mut data = GLOBAL_DATA.borrow_ref_mut(cs);
        data.value += 1;
        data.value
    });
    println!("Data is {}, IRQs masked: {}", value, aarch64_boot::interrupt::is_masked());
    semihosting::process::exit(0);
}
