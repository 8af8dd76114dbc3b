//! The hardware boundary of the ACSI engine.
//!
//! The engine never touches registers itself.  Everything it needs from the
//! microcontroller is expressed as four narrow capabilities:
//!
//! - [`GpioPort`] - reads and drives the individual bus lines, and switches
//!   data bus direction.
//! - [`TimerCapability`] - a counter clocked by ACK's falling edge, with a
//!   compare output driving DRQ.  DRQ is low while the counter is armed and
//!   goes high on the first ACK edge, without software involvement.
//! - [`DmaCapability`] - a DMA channel triggered by the same ACK edge,
//!   copying the port into a holding register.
//! - [`JitterSource`] - whatever periodic interrupt would otherwise steal CPU
//!   time from a busy-wait.
//!
//! The RP2040/RP235x implementations live in `infra`, the simulated ones in
//! `sim`.
//!
//! Line levels are always electrical: ACSI lines are active low, so a set
//! bit in [`Lines`] means that line is released (high).

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use bitflags::bitflags;

bitflags! {
    /// Levels of the ACSI control lines.  A set flag means the line is high
    /// (released).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Lines: u8 {
        /// Command start marker, driven by the host.
        const A1 = 0x01;
        /// Chip select strobe, driven by the host.
        const CS = 0x02;
        /// Interrupt request, driven by the device.
        const IRQ = 0x04;
        /// DMA request, driven by the device (via the handshake timer).
        const DRQ = 0x08;
        /// DMA acknowledge, driven by the host.
        const ACK = 0x10;
    }
}

/// A single, simultaneous read of the data bus and control lines.
///
/// Reading everything at once matters: CS pulses are around 250ns, so the
/// data byte must come from the same read that saw CS asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSnapshot {
    pub data: u8,
    pub lines: Lines,
}

impl PortSnapshot {
    pub const fn new(data: u8, lines: Lines) -> Self {
        Self { data, lines }
    }

    /// True if both A1 and CS are asserted - the start of a new command.
    #[inline(always)]
    pub fn command_strobe(&self) -> bool {
        !self.lines.intersects(Lines::A1.union(Lines::CS))
    }

    /// True if CS is asserted.
    #[inline(always)]
    pub fn cs_asserted(&self) -> bool {
        !self.lines.contains(Lines::CS)
    }

    /// True if IRQ, DRQ and ACK are all released.
    #[inline(always)]
    pub fn idle(&self) -> bool {
        self.lines
            .contains(Lines::IRQ.union(Lines::DRQ).union(Lines::ACK))
    }
}

/// Direct access to the bus lines.
///
/// All methods act immediately on the hardware - there is no buffering, and
/// no failure mode.
pub trait GpioPort {
    /// Read the data bus and all control lines at once.
    fn sample(&mut self) -> PortSnapshot;

    /// Drive the data bus.
    fn acquire_data_bus(&mut self);

    /// Stop driving the data bus.
    fn release_data_bus(&mut self);

    /// Set the value driven onto the data bus.  Has no electrical effect
    /// unless the data bus has been acquired.
    fn write_data(&mut self, byte: u8);

    /// Pull IRQ low.
    fn pull_irq(&mut self);

    /// Release IRQ.
    fn release_irq(&mut self);

    /// Hand the DRQ pin to the handshake timer's compare output.
    fn route_drq_to_timer(&mut self);

    /// Make the DRQ pin a non-driven input again.
    fn release_drq(&mut self);

    /// Enable or disable pull-downs on A1 and CS, so that a missing host
    /// reads as asserted lines rather than floating ones.
    fn set_strobe_pulldowns(&mut self, enabled: bool);
}

/// The handshake timer.
///
/// Counts ACK falling edges.  While the counter is armed (no edges since
/// [`arm`](TimerCapability::arm)) the compare output holds DRQ low; the first
/// edge takes DRQ high and fires the sampler's DMA trigger.
pub trait TimerCapability {
    /// One-off configuration: external clock on ACK's falling edge, DRQ
    /// compare output, sampler trigger, and start counting.
    fn configure(&mut self);

    /// Move the counter well away from the armed state, so DRQ is high when
    /// the pin is handed to the timer.
    fn park(&mut self);

    /// Reset the counter - DRQ goes low, asking the host for a byte.
    fn arm(&mut self);

    /// Number of ACK edges counted since the last [`arm`](TimerCapability::arm).
    fn pulses(&mut self) -> u16;

    /// Stop the timer.  Only used on full shutdown.
    fn stop(&mut self);
}

/// The byte sampler - DMA from the bus port into a holding register on the
/// ACK edge the timer counts.
pub trait DmaCapability {
    /// Bind the channel: port to holding register, one transfer per counted
    /// edge, re-arming itself after each.
    fn bind(&mut self);

    /// Make sure the channel will capture the next edge, and forget captures
    /// made before now.  Called at the start of each block transfer.
    fn rearm(&mut self) {}

    /// The data byte captured on the most recent edge.  Only called once the
    /// timer has counted that edge.  Implementations whose capture can land
    /// after the count is visible wait for it here.
    fn sample(&mut self) -> u8;

    /// Unbind the channel.  Only used on full shutdown.
    fn unbind(&mut self);
}

/// A periodic interrupt source which must be kept quiet during timing
/// critical busy-waits.  Use via [`Quiet`](crate::acsi::Quiet) rather than
/// directly.
pub trait JitterSource: Clone {
    /// Suspend the source.  Returns whether it was running beforehand.
    fn suspend(&self) -> bool;

    /// Resume the source.
    fn resume(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_strobe_needs_both_a1_and_cs() {
        let idle = Lines::IRQ | Lines::DRQ | Lines::ACK;
        assert!(PortSnapshot::new(0, idle).command_strobe());
        assert!(!PortSnapshot::new(0, idle | Lines::A1).command_strobe());
        assert!(!PortSnapshot::new(0, idle | Lines::CS).command_strobe());
        assert!(!PortSnapshot::new(0, Lines::all()).command_strobe());
    }

    #[test]
    fn idle_ignores_strobe_lines() {
        let snapshot = PortSnapshot::new(0x42, Lines::IRQ | Lines::DRQ | Lines::ACK);
        assert!(snapshot.idle());
        assert!(snapshot.cs_asserted());
    }
}
