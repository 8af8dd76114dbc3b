//! This module contains constants for pico-acsi.
//!
//! Bus timing and transfer constants apply to every build.  The hardware
//! and watchdog constants further down only exist for firmware builds.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use static_assertions::const_assert;

//
// ACSI bus timing and transfer constants.
//

/// Number of bytes moved per iteration of the block transfer inner loop.
/// The remainder of a block is handled a byte at a time.  Changing this has
/// no effect on what the host sees, only on loop overhead.
pub const BLOCK_BATCH: usize = 16;
const_assert!(BLOCK_BATCH > 0);

/// Worst case time, in ns, between the host pulling ACK low and the ST's DMA
/// chip needing to see DRQ high again.  Any slower and it aborts the
/// transfer.
pub const DRQ_LATENCY_BUDGET_NS: u32 = 180;

/// Default number of bytes of each block transfer to include in trace
/// output.
pub const DUMP_LEN: usize = 26;

/// Number of bytes in a standard (group 0) ACSI command block, including the
/// command byte captured by `wait_command()`.
pub const COMMAND_BLOCK_LEN: usize = 6;

/// Number of device ids on the bus.  The id occupies the top 3 bits of the
/// command byte.
pub const NUM_DEVICE_IDS: u8 = 8;

/// Shift of the device id within a command byte.
pub const DEVICE_ID_SHIFT: u8 = 5;

/// Mask of the opcode within a command byte.
pub const OPCODE_MASK: u8 = 0x1f;

/// Default strictness for block transfers: the maximum number of ACK edges
/// allowed in one byte slot when strict validation is used.
pub const STRICT_MAX_PULSES: u16 = 1;

#[cfg(feature = "rp")]
pub use rp::*;

#[cfg(feature = "rp")]
mod rp {
    use embassy_time::Duration;

    //
    // Firmware hardware constants.
    //

    /// Device ids the firmware answers to, if not otherwise configured.  Bit n
    /// set means device id n is emulated.
    pub const DEFAULT_DEVICE_MASK: u8 = 0b0000_0001;

    /// The DMA channel used as the byte sampler.
    pub const SAMPLER_DMA_CHANNEL: usize = 0;

    /// The PIO0 state machine latching the data bus for the sampler.
    pub const CAPTURE_PIO_SM: usize = 0;

    /// IO_BANK0 function select values.
    pub const FUNCSEL_PWM: u8 = 4;
    pub const FUNCSEL_SIO: u8 = 5;

    /// Number of captures the sampler channel is loaded with each time it is
    /// (re)triggered.  It is re-triggered at the start of each block if it has
    /// run out.
    pub const SAMPLER_TRANSFERS: u32 = 0x0fff_ffff;

    //
    // Watchdog timers
    //

    /// Hardware watchdog timeout - if the watchdog runner isn't scheduled
    /// for this long the device resets.
    pub const WATCHDOG_HW_TIMEOUT: Duration = Duration::from_millis(1500);

    /// How often the watchdog runner checks its policed tasks.
    pub const WATCHDOG_CHECK_INTERVAL: Duration = Duration::from_millis(100);

    /// How long a single command, from the end of command capture to the
    /// final status byte, may take before the device is reset.  This is
    /// what rescues us from a host which disappears mid-command.
    pub const COMMAND_WATCHDOG_TIMER: Duration = Duration::from_secs(1);

    //
    // Task timers
    //

    /// How often core 0's idle loop wakes, purely to prove it's alive.
    pub const CORE0_LOOP_TIMER: Duration = Duration::from_secs(5);

    /// How often the bus monitor samples the lines.
    pub const MONITOR_POLL_TIMER: Duration = Duration::from_millis(1);

    /// Core 1 stack size.
    pub const CORE1_STACK_SIZE: usize = 4096;

    /// SCSI status byte: the command failed, the host should request sense.
    pub const STATUS_CHECK_CONDITION: u8 = 0x02;
}
