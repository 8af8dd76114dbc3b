//! bus_monitor
//!
//! Tests the pico-acsi wiring by watching the ACSI bus, without ever driving
//! it.  Logs, using RTT, whenever the bus goes idle or busy, and whenever CS
//! or ACK change level.  Plug into a running ST and access the drive to see
//! the lines move.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#![no_std]
#![no_main]

use defmt::info;
use embassy_executor::Spawner;
use embassy_time::Timer;
use pico_acsi_rs::constants::MONITOR_POLL_TIMER;
use pico_acsi_rs::infra::create_acsi;
use pico_acsi_rs::infra::gpio::standard_pins;
use pico_acsi_rs::{AcsiConfig, DeviceMask, log_fw_info};
use {defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    log_fw_info(env!("CARGO_BIN_NAME"), DeviceMask::NONE);

    let p = embassy_rp::init(Default::default());
    let pins = match standard_pins(
        p.PIN_6, p.PIN_7, p.PIN_8, p.PIN_9, p.PIN_10, p.PIN_11, p.PIN_12, p.PIN_13, p.PIN_14,
        p.PIN_15, p.PIN_18, p.PIN_19, p.PIN_20,
    ) {
        Ok(pins) => pins,
        Err(e) => defmt::panic!("Invalid ACSI pin configuration: {}", e),
    };

    // No devices, so the engine never answers anything.  It is only used for
    // its bus state queries.
    let mut acsi = create_acsi(pins, DeviceMask::NONE, AcsiConfig::default());

    let mut idle = acsi.is_idle();
    let mut cs = acsi.read_strobe();
    let mut ack = acsi.read_acknowledge();
    info!("Initial state: idle {} CS {} ACK {}", idle, cs, ack);

    let mut strobes: u32 = 0;
    loop {
        let now_idle = acsi.is_idle();
        if now_idle != idle {
            idle = now_idle;
            info!("Bus {}", if idle { "idle" } else { "busy" });
        }

        let now_cs = acsi.read_strobe();
        if now_cs != cs {
            cs = now_cs;
            if !cs {
                strobes = strobes.wrapping_add(1);
            }
            info!("CS {} (strobes seen {})", if cs { "high" } else { "low" }, strobes);
        }

        let now_ack = acsi.read_acknowledge();
        if now_ack != ack {
            ack = now_ack;
            info!("ACK {}", if ack { "high" } else { "low" });
        }

        Timer::after(MONITOR_POLL_TIMER).await;
    }
}
