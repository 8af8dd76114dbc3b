//! Firmware start-up, shared by the binaries.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#[allow(unused_imports)]
use defmt::{debug, error, info, trace, warn};
use embassy_executor::Spawner;
use embassy_time::Timer;
use static_cell::StaticCell;

use crate::acsi::{AcsiConfig, DeviceMask};
use crate::constants::{CORE0_LOOP_TIMER, DEFAULT_DEVICE_MASK};
use crate::infra::gpio::standard_pins;
use crate::infra::watchdog::{WatchdogType, create_watchdog, watchdog_task};
use crate::infra::{RpAcsi, create_acsi};
use crate::task::{core1_spawn, spawn_or_reboot};
use crate::util::built::log_fw_info;

// The engine, once started.  Handed to core 1 for good.
static ACSI: StaticCell<RpAcsi> = StaticCell::new();

/// Main entry point for the firmware.  Brings up the watchdog on core 0 and
/// the ACSI engine on core 1, then idles.
pub async fn common_main(spawner: Spawner, bin_name: &str) -> ! {
    let p = embassy_rp::init(Default::default());

    let devices = DeviceMask::new(DEFAULT_DEVICE_MASK);
    log_fw_info(bin_name, devices);

    // Start the watchdog runner first, so it is policing from the outset.
    let watchdog: &'static WatchdogType = create_watchdog(p.WATCHDOG);
    spawn_or_reboot(spawner.spawn(watchdog_task(watchdog)), "Watchdog");

    let pins = match standard_pins(
        p.PIN_6, p.PIN_7, p.PIN_8, p.PIN_9, p.PIN_10, p.PIN_11, p.PIN_12, p.PIN_13, p.PIN_14,
        p.PIN_15, p.PIN_18, p.PIN_19, p.PIN_20,
    ) {
        Ok(pins) => pins,
        Err(e) => defmt::panic!("Invalid ACSI pin configuration: {}", e),
    };
    let acsi = ACSI.init(create_acsi(pins, devices, AcsiConfig::default()));

    core1_spawn(p.CORE1, acsi, watchdog);

    loop {
        Timer::after(CORE0_LOOP_TIMER).await;
        trace!("Core0: idle");
    }
}
