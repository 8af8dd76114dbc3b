//! Implements task handling support, including dual core support.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#[allow(unused_imports)]
use defmt::{debug, error, info, trace, warn};
use embassy_executor::Executor;
use embassy_rp::multicore::{Stack, spawn_core1 as rp_spawn_core1};
use embassy_rp::peripherals::CORE1;
use static_cell::{ConstStaticCell, StaticCell};

use crate::constants::{
    COMMAND_BLOCK_LEN, COMMAND_WATCHDOG_TIMER, CORE1_STACK_SIZE, STATUS_CHECK_CONDITION,
};
use crate::infra::RpAcsi;
use crate::infra::watchdog::{TaskId, WatchdogType, reboot_normal};

// Threading and tasks model
//
// On the Pico we have 2 cores available - 0 and 1.
//
// Core 0 is the main core, and is where the main() function runs.  It runs
// the watchdog task, and otherwise idles.
//
// Core 1 runs the ACSI engine and nothing else.  The engine busy-waits with
// interrupts masked for as long as it takes the host to send a command, so it
// cannot share a core with anything that needs to be scheduled - including
// the watchdog runner, which is why that lives on core 0.
//
// Tasks can be spawned only on core 0 using the Spawner object passed into
// main().  Core 1 tasks must be spawned via an Executor, stored in a
// non-public static here.

//
// Statics
//

// A stack for core 1.  We will take it and use it mutably in core1_spawn.
static CORE1_STACK: ConstStaticCell<Stack<CORE1_STACK_SIZE>> = ConstStaticCell::new(Stack::new());

// An executor for core 1.
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

// Start core 1 running the ACSI task.  The engine and the watchdog both need
// to live for infinity, so are passed in as statics.
pub fn core1_spawn(p_core1: CORE1, acsi: &'static mut RpAcsi, watchdog: &'static WatchdogType) {
    rp_spawn_core1(p_core1, CORE1_STACK.take(), move || {
        let executor1 = EXECUTOR1.init(Executor::new());
        executor1.run(|spawner| {
            spawn_or_reboot(spawner.spawn(acsi_task(acsi, watchdog)), "ACSI");
        })
    });
}

/// The ACSI task.  Waits for commands for our devices, and services each in
/// turn.
#[embassy_executor::task]
pub async fn acsi_task(acsi: &'static mut RpAcsi, watchdog: &'static WatchdogType) -> ! {
    let core: u32 = embassy_rp::pac::SIO.cpuid().read();
    info!(
        "Core{}: ACSI task started, devices {}",
        core,
        acsi.device_mask()
    );

    info!("Core{}: Waiting for host", core);
    acsi.wait_bus_ready();
    info!("Core{}: Host ready", core);

    let mask = acsi.device_mask();
    let id = TaskId::Command;
    loop {
        let command = acsi.wait_command_strobe(mask);

        // From here on the host is expected to keep the exchange moving,
        // starting with releasing CS.  If it goes away mid-command the
        // watchdog resets us.
        watchdog.register_task(&id, COMMAND_WATCHDOG_TIMER).await;
        acsi.wait_strobe_release();
        respond(acsi, command);
        watchdog.deregister_task(&id).await;
    }
}

// The disk layer isn't part of this firmware.  Collect the rest of the
// command block, so the host sees a well-formed exchange, and report that
// the device has no media.
fn respond(acsi: &mut RpAcsi, command: crate::CommandByte) {
    let mut block = [0u8; COMMAND_BLOCK_LEN - 1];
    acsi.read_bytes(&mut block);
    acsi.send_byte(STATUS_CHECK_CONDITION);
    debug!(
        "Command {} opcode 0x{:02x}: check condition",
        command,
        command.opcode()
    );
}

/// Method to spawn tasks.  Can be called on either core.
///
/// Using the Spawner object to spawn can fail, because too many instances of
/// that task are already running.  By default only 1 is allowed at once, but
/// is configurable with e.g. #[embassy_executor::task(pool_size = 4).
///
/// We handle that by rebooting - but it shouldn't happen if processes are only
/// spawned at start of day.
///
/// Example:
/// ```ignore
/// spawn_or_reboot(spawner.spawn(my_task()), "my_task");
/// ```
pub fn spawn_or_reboot<T, E: defmt::Format>(spawn_result: Result<T, E>, task_name: &str) {
    match spawn_result {
        Ok(_) => {
            let core: u32 = embassy_rp::pac::SIO.cpuid().read();
            debug!("Core{}: Spawned task {}", core, task_name);
        }
        Err(e) => {
            error!("Failed to spawn task: {}, error: {}", task_name, e);
            reboot_normal();
        }
    }
}

