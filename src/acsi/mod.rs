//! The ACSI bus engine.
//!
//! Makes the microcontroller look like one or more hard drives on an Atari
//! ST's ACSI bus.  This module owns the electrical and timing layer only:
//! capturing command bytes, the IRQ driven byte protocol used for the rest
//! of the command block and status bytes, and DRQ/ACK paced block transfers
//! for sector data.  Interpreting commands is left to the caller.
//!
//! # How DMA is handled
//!
//! DRQ is generated by us and asks the host's DMA chip for a byte.  ACK is
//! generated by the host and tells us when the data bus is sampled.  DRQ must
//! go high again at most 180ns after ACK goes low, or the host aborts the
//! transfer.
//!
//! ```text
//! Host reads (we send)
//!           ___              _________
//!      DRQ     |____________|
//!           ______________         ___
//!      ACK                |_______|
//!
//!     DATA                        S         (sampled as ACK goes up)
//!
//! Host writes (we receive)
//!           ___              _________
//!      DRQ     |____________|
//!           ______________         ___
//!      ACK                |_______|
//!
//!     DATA               [========]         (valid for the whole ACK pulse)
//! ```
//!
//! That is far too fast to bit-bang, so the handshake is done by hardware:
//!
//! ```text
//!              __________
//!          CLK|          |CMP
//!   ACK ----->|  timer   |-----> DRQ
//!             |          |
//!             |__________|-----------+
//!                                    | trigger
//!              ________         _____V____         _________
//!             |        |       |          |       |         |
//!             |  port  |------>|   DMA    |------>| holding |
//!             |________|       |__________|       |_________|
//! ```
//!
//! - ACK clocks the timer.
//! - DRQ is the timer's compare output: low while the counter is armed, high
//!   as soon as one ACK edge has been counted.
//! - The same tick triggers a DMA copy of the bus port into a holding
//!   register, so received bytes are captured at exactly the right moment
//!   however late software gets round to looking.
//! - Each byte is: arm the counter (DRQ low), busy-wait until it has counted
//!   (DRQ is already high again by then), then read the holding register or
//!   move on to the next byte to send.
//! - More than one ACK edge before re-arming means the host and we have
//!   fallen out of step.  With strict [`Validation`] this aborts the block.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

mod command;
mod config;
mod dma;
mod error;
mod irq;
mod quiet;

pub use config::{AcsiConfig, CommandByte, DeviceMask, Validation};
pub use error::AcsiError;
pub use quiet::Quiet;

#[allow(unused_imports)]
use crate::util::log::{debug, info, trace, warn};

use crate::hw::{DmaCapability, GpioPort, JitterSource, TimerCapability};

/// The ACSI engine: the single owner of the configured bus hardware.
///
/// Created by [`Acsi::begin`], which configures the handshake timer and byte
/// sampler once for the whole session.  Every operation leaves the bus in a
/// safe, non-driving state when it returns.
pub struct Acsi<P, T, D, J>
where
    P: GpioPort,
    T: TimerCapability,
    D: DmaCapability,
    J: JitterSource,
{
    port: P,
    timer: T,
    sampler: D,
    jitter: J,
    devices: DeviceMask,
    config: AcsiConfig,
}

impl<P, T, D, J> Acsi<P, T, D, J>
where
    P: GpioPort,
    T: TimerCapability,
    D: DmaCapability,
    J: JitterSource,
{
    /// Configure the hardware and start the engine, answering to the device
    /// ids in `devices`.
    pub fn begin(
        port: P,
        timer: T,
        sampler: D,
        jitter: J,
        devices: DeviceMask,
        config: AcsiConfig,
    ) -> Self {
        let mut acsi = Self {
            port,
            timer,
            sampler,
            jitter,
            devices,
            config,
        };

        acsi.timer.configure();
        acsi.sampler.bind();
        acsi.timer.park();
        acsi.release_bus();

        info!(
            "ACSI engine started: devices {}, strict validation {}",
            devices,
            config.validation.is_strict()
        );

        acsi
    }

    /// Shut the engine down, stopping the timer and sampler, and hand the
    /// hardware back.
    pub fn end(mut self) -> (P, T, D, J) {
        self.release_bus();
        self.timer.stop();
        self.sampler.unbind();
        debug!("ACSI engine stopped");
        (self.port, self.timer, self.sampler, self.jitter)
    }

    /// The device ids this engine was started with.
    pub fn device_mask(&self) -> DeviceMask {
        self.devices
    }

    pub fn config(&self) -> &AcsiConfig {
        &self.config
    }

    //
    // Bus state queries.
    //

    /// True if IRQ, DRQ and ACK are all released.
    pub fn is_idle(&mut self) -> bool {
        self.port.sample().idle()
    }

    /// The level of CS - true if released.
    #[inline(always)]
    pub fn read_strobe(&mut self) -> bool {
        !self.port.sample().cs_asserted()
    }

    /// The level of ACK - true if released.
    #[inline(always)]
    pub fn read_acknowledge(&mut self) -> bool {
        self.port
            .sample()
            .lines
            .contains(crate::hw::Lines::ACK)
    }

    //
    // Line ownership.
    //

    /// Stop driving the data bus, IRQ and DRQ.  Safe to call at any time,
    /// any number of times.
    pub fn release_bus(&mut self) {
        self.port.release_data_bus();
        self.port.release_irq();
        self.port.release_drq();
    }

    // Hand DRQ to the handshake timer.  The counter is parked first so DRQ
    // comes up high, not with a spurious request.
    fn acquire_drq(&mut self) {
        self.sampler.rearm();
        self.timer.park();
        self.port.route_drq_to_timer();
    }

    // Suspend jitter-inducing interrupts until the returned guard is dropped.
    #[inline(always)]
    fn quiet(&self) -> Quiet<J> {
        Quiet::new(self.jitter.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::Lines;
    use crate::sim::{Directions, Sim};

    #[test]
    fn begin_configures_once_and_leaves_bus_released() {
        let sim = Sim::new();
        let _acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        let stats = sim.stats();
        assert!(stats.timer_running);
        assert!(stats.sampler_bound);
        assert_eq!(sim.directions(), Directions::default());
    }

    #[test]
    fn is_idle_truth_table() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());

        for bits in 0..8u8 {
            let irq_low = bits & 1 != 0;
            let drq_low = bits & 2 != 0;
            let ack_low = bits & 4 != 0;
            sim.set_foreign(irq_low, drq_low);
            sim.set_ack(!ack_low);

            let expected = !irq_low && !drq_low && !ack_low;
            assert_eq!(acsi.is_idle(), expected, "irq {irq_low} drq {drq_low} ack {ack_low}");
        }
    }

    #[test]
    fn strobe_and_acknowledge_follow_lines() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        assert!(acsi.read_strobe());
        assert!(acsi.read_acknowledge());

        sim.set_ack(false);
        assert!(!acsi.read_acknowledge());
        assert!(!sim.lines().contains(Lines::ACK));
    }

    #[test]
    fn release_is_idempotent() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());

        acsi.port.acquire_data_bus();
        acsi.port.pull_irq();
        acsi.acquire_drq();
        assert_ne!(sim.directions(), Directions::default());

        acsi.release_bus();
        let once = sim.directions();
        acsi.release_bus();
        assert_eq!(sim.directions(), once);
        assert_eq!(once, Directions::default());
    }

    #[test]
    fn end_stops_timer_and_sampler() {
        let sim = Sim::new();
        let acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        let _hardware = acsi.end();
        let stats = sim.stats();
        assert!(!stats.timer_running);
        assert!(!stats.sampler_bound);
        assert_eq!(sim.directions(), Directions::default());
    }
}
