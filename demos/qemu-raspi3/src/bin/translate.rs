//! Asks the MMU how a few addresses translate now that it is on

#![no_std]
#![no_main]

use aarch64_boot::addr::VirtAddr;
use aarch64_boot::catalog::{SECTION_SIZE, VA_START};
use aarch64_boot::cpu::{Cpu, Hardware};
use aarch64_boot::mmu::DEFAULT_PARTITION;
use aarch64_boot_rt::entry;

use qemu_raspi3 as _;

use semihosting::println;

/// Identity and upper-half views of the window, plus one address past it
const PROBES: [u64; 5] = [
    0x8_0000,
    SECTION_SIZE + 0x10,
    VA_START + 0x8_0000,
    VA_START + SECTION_SIZE,
    2 * SECTION_SIZE,
];

#[entry]
fn main() -> ! {
    // SAFETY: start-up code has finished with its own handle
    let mut cpu = unsafe { Hardware::new() };
    let mut failed = false;
    for probe in PROBES {
        let Ok(va) = VirtAddr::try_new(probe) else {
            println!("{:#018x}: not a valid address", probe);
            failed = true;
            continue;
        };
        let par = cpu.translate_el1_read(va);
        println!("{:#018x}: {:?}", probe, par);
        let expected = (va.region_offset() < 2 * SECTION_SIZE)
            .then(|| DEFAULT_PARTITION.classify(va.region_offset()));
        let mapped = par.output(probe);
        if mapped.is_some() != expected.is_some() {
            println!("  unexpected result, wanted {:?}", expected);
            failed = true;
        } else if let Some(pa) = mapped {
            if pa.as_u64() != va.region_offset() {
                println!("  not an identity mapping: {:#x}", pa.as_u64());
                failed = true;
            }
        }
    }
    semihosting::process::exit(if failed { 1 } else { 0 });
}
