//! pico-acsi
//!
//! This makes a Raspberry Pi Pico look like one or more hard drives on an
//! Atari ST's ACSI bus.
//!
//! The heart of it is [`Acsi`], the bus engine: command capture, the IRQ byte
//! protocol and DRQ/ACK paced DMA block transfers, with the sub-microsecond
//! handshake done by a PWM slice and a DMA channel rather than software.  The
//! engine is written against the narrow hardware traits in [`hw`], so it also
//! builds for the host, where it is tested against a simulated bus.
//!
//! Firmware builds (the `pico` or `pico2` feature) add the RP2040/RP235x
//! implementations of those traits and the embassy based firmware around
//! them.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#![cfg_attr(not(test), no_std)]

// Provide some feature guidance when compiling the firmware.
#[cfg(all(feature = "rp", not(any(feature = "pico", feature = "pico2"))))]
compile_error!("Either 'pico' or 'pico2' feature must be enabled for firmware builds");
#[cfg(all(feature = "pico", feature = "pico2"))]
compile_error!("Features 'pico' and 'pico2' cannot be enabled simultaneously");

// Declare all of this library's modules.
pub mod acsi;
pub mod constants;
pub mod hw;
pub mod types;
mod util;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

#[cfg(feature = "rp")]
pub mod entry;
#[cfg(feature = "rp")]
pub mod infra;
#[cfg(feature = "rp")]
mod task;

pub use acsi::{Acsi, AcsiConfig, AcsiError, CommandByte, DeviceMask, Validation};
#[cfg(feature = "rp")]
pub use entry::common_main;
#[cfg(feature = "rp")]
pub use util::built::log_fw_info;

// Extra binary information that picotool can read.
#[cfg(feature = "rp")]
#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [embassy_rp::binary_info::EntryAddr; 4] = [
    embassy_rp::binary_info::rp_program_name!(c"pico-acsi by piers.rocks"),
    embassy_rp::binary_info::rp_program_description!(
        c"An ACSI hard disk bus engine, letting a Pico answer an Atari ST's DMA bus."
    ),
    embassy_rp::binary_info::rp_cargo_version!(),
    embassy_rp::binary_info::rp_program_build_attribute!(),
];

// A note about Statics
//
// The firmware uses statics to give the engine and the watchdog the
// 'static lifetimes embassy tasks and the core 1 executor need:
//
// - Use StaticCell for statics that cannot be initialized at compile time -
//   the engine (entry.rs), the watchdog (infra/watchdog.rs) and the core 1
//   executor (task.rs).
//
// - Use ConstStaticCell for statics that can be initialized at compile time,
//   such as the core 1 stack.
//
// - The sampler's holding register (infra/dma.rs) is written by DMA, so is
//   an atomic rather than anything the compiler thinks it owns.
//
// Nothing is shared mutably between cores other than the watchdog, which
// does its own locking.
