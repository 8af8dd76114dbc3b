//! Command capture.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use super::{Acsi, CommandByte, DeviceMask};
use crate::hw::{DmaCapability, GpioPort, JitterSource, TimerCapability};
use crate::util::log::trace;

impl<P, T, D, J> Acsi<P, T, D, J>
where
    P: GpioPort,
    T: TimerCapability,
    D: DmaCapability,
    J: JitterSource,
{
    /// Wait until A1 and CS are both released and the bus is idle.
    ///
    /// Pull-downs are enabled on A1 and CS while waiting, so this only
    /// returns once a powered-up host is actually driving them high.  With no
    /// host attached it never returns.
    pub fn wait_bus_ready(&mut self) {
        self.port.set_strobe_pulldowns(true);

        loop {
            let snapshot = self.port.sample();
            if !snapshot.cs_asserted()
                && snapshot.lines.contains(crate::hw::Lines::A1)
                && snapshot.idle()
            {
                break;
            }
        }

        self.port.set_strobe_pulldowns(false);
        trace!("ACSI bus ready");
    }

    /// Block until the host sends the first byte of a command to one of the
    /// devices in `mask`, and return it once the host has released CS.
    ///
    /// This is [`wait_command_strobe`](Self::wait_command_strobe) followed by
    /// [`wait_strobe_release`](Self::wait_strobe_release).  If the cable has
    /// been pulled CS is never released, and it is left to the watchdog.
    pub fn wait_command(&mut self, mask: DeviceMask) -> CommandByte {
        let command = self.wait_command_strobe(mask);
        self.wait_strobe_release();
        command
    }

    /// Block until the host strobes the first byte of a command to one of
    /// the devices in `mask`, and return it straight away, while CS may still
    /// be asserted.
    ///
    /// The byte comes from the same port read that saw A1 and CS asserted.
    /// Commands for other devices are ignored - someone else on the bus may
    /// answer them.
    pub fn wait_command_strobe(&mut self, mask: DeviceMask) -> CommandByte {
        let command = {
            let _quiet = self.quiet();
            loop {
                let snapshot = self.port.sample();
                if snapshot.command_strobe()
                    && mask.contains(CommandByte::new(snapshot.data).device())
                    && snapshot.idle()
                {
                    break CommandByte::new(snapshot.data);
                }
            }
        };

        trace!("Command {}", command);
        command
    }

    /// Wait for the host to release CS.
    ///
    /// A host which has gone away never does, so callers expecting that
    /// should have the watchdog armed first.
    pub fn wait_strobe_release(&mut self) {
        let _quiet = self.quiet();
        while self.port.sample().cs_asserted() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acsi::AcsiConfig;
    use crate::sim::{HostOp, Sim};
    use proptest::prelude::*;

    #[test]
    fn captures_command_for_member() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        sim.push(HostOp::Command(0x08));

        let command = acsi.wait_command(DeviceMask::single(0));
        assert_eq!(command, CommandByte::new(0x08));
        assert_eq!(command.device(), 0);
        assert!(acsi.read_strobe());
        assert!(sim.interrupts_running());
        assert_eq!(sim.pending_ops(), 0);
    }

    #[test]
    fn ignores_command_while_bus_busy() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(1), AcsiConfig::default());
        sim.set_foreign(true, false);
        sim.push(HostOp::Command(0x23));
        sim.push(HostOp::Command(0x2a));

        // Let the first strobe go by while another device holds IRQ.
        while sim.pending_ops() == 2 {
            acsi.is_idle();
        }
        sim.set_foreign(false, false);

        assert_eq!(acsi.wait_command(DeviceMask::single(1)).raw(), 0x2a);
    }

    #[test]
    #[should_panic(expected = "watchdog")]
    fn empty_mask_never_returns() {
        let sim = Sim::new();
        sim.set_budget(10_000);
        let mut acsi = sim.engine(DeviceMask::ALL, AcsiConfig::default());
        for device in 0..8u8 {
            sim.push(HostOp::Command(device << 5));
        }
        acsi.wait_command(DeviceMask::NONE);
    }

    #[test]
    #[should_panic(expected = "watchdog")]
    fn cs_held_after_command_never_returns() {
        let sim = Sim::new();
        sim.set_budget(10_000);
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        sim.push(HostOp::Command(0x00));
        sim.push(HostOp::HoldCs);
        acsi.wait_command(DeviceMask::single(0));
    }

    #[test]
    fn strobe_returns_before_cs_is_released() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(2), AcsiConfig::default());
        sim.push(HostOp::Command(0x48));
        sim.push(HostOp::HoldCs);

        let command = acsi.wait_command_strobe(DeviceMask::single(2));
        assert_eq!(command.raw(), 0x48);
        assert!(sim.interrupts_running());
        assert!(!acsi.read_strobe());
    }

    #[test]
    fn strobe_release_returns_once_cs_is_high() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        sim.push(HostOp::Command(0x03));

        assert_eq!(acsi.wait_command_strobe(DeviceMask::single(0)).opcode(), 3);
        acsi.wait_strobe_release();
        assert!(acsi.read_strobe());
        assert!(sim.interrupts_running());
        assert_eq!(sim.stats().suspensions, 2);
    }

    #[test]
    #[should_panic(expected = "watchdog")]
    fn strobe_release_with_cs_held_never_returns() {
        let sim = Sim::new();
        sim.set_budget(10_000);
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        sim.push(HostOp::Command(0x00));
        sim.push(HostOp::HoldCs);

        acsi.wait_command_strobe(DeviceMask::single(0));
        acsi.wait_strobe_release();
    }

    #[test]
    #[should_panic(expected = "watchdog")]
    fn bus_ready_needs_a_host() {
        let sim = Sim::new();
        sim.set_budget(10_000);
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        sim.disconnect();
        acsi.wait_bus_ready();
    }

    #[test]
    fn bus_ready_with_host_restores_pulldowns() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        acsi.wait_bus_ready();
        assert!(!sim.directions().strobe_pulldowns);
    }

    proptest! {
        #[test]
        fn only_members_are_captured(
            mask in 1u8..=255,
            others in proptest::collection::vec(0u8..=0x1f, 0..6),
            opcode in 0u8..=0x1f,
        ) {
            let mask = DeviceMask::new(mask);
            let member = mask.ids().last().unwrap_or(0);
            let outsiders: Vec<u8> = (0..8u8).filter(|id| !mask.contains(*id)).collect();

            let sim = Sim::new();
            let mut acsi = sim.engine(mask, AcsiConfig::default());
            if !outsiders.is_empty() {
                for (i, op) in others.iter().enumerate() {
                    let device = outsiders[i % outsiders.len()];
                    sim.push(HostOp::Command((device << 5) | op));
                }
            }
            let expected = (member << 5) | opcode;
            sim.push(HostOp::Command(expected));

            let command = acsi.wait_command(mask);
            prop_assert_eq!(command.raw(), expected);
            prop_assert!(mask.contains(command.device()));
            prop_assert_eq!(sim.pending_ops(), 0);
        }
    }
}
