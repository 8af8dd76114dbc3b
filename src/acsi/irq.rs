//! The IRQ byte protocol, used for the command block and status bytes.
//!
//! Each byte is one IRQ/CS exchange: we pull IRQ, the host answers with a CS
//! strobe.  On a read the host has put the byte on the bus by the time CS
//! goes low, so it is sampled in the same port read that sees CS asserted.
//! On a send we drive the byte before pulling IRQ and hold it until the host
//! has finished its strobe.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use super::Acsi;
use crate::hw::{DmaCapability, GpioPort, JitterSource, TimerCapability};
use crate::util::dump::HexDump;
use crate::util::log::trace;

impl<P, T, D, J> Acsi<P, T, D, J>
where
    P: GpioPort,
    T: TimerCapability,
    D: DmaCapability,
    J: JitterSource,
{
    /// Request a single byte from the host.
    pub fn read_byte(&mut self) -> u8 {
        let byte = {
            let _quiet = self.quiet();
            self.read_irq()
        };
        trace!("IRQ read 0x{:02x}", byte);
        byte
    }

    /// Request `bytes.len()` bytes from the host, then wait for CS to be
    /// released after the last one.
    pub fn read_bytes(&mut self, bytes: &mut [u8]) {
        {
            let _quiet = self.quiet();
            for byte in bytes.iter_mut() {
                *byte = self.read_irq();
            }
            while self.port.sample().cs_asserted() {}
        }
        trace!(
            "IRQ read {} bytes: {}",
            bytes.len(),
            HexDump::new(bytes, self.config.dump_len)
        );
    }

    /// Send a single byte to the host, returning once the host has strobed
    /// it.
    pub fn send_byte(&mut self, byte: u8) {
        {
            let _quiet = self.quiet();
            self.send_irq(byte);
        }
        trace!("IRQ sent 0x{:02x}", byte);
    }

    pub fn send_bytes(&mut self, bytes: &[u8]) {
        {
            let _quiet = self.quiet();
            for &byte in bytes {
                self.send_irq(byte);
            }
        }
        trace!(
            "IRQ sent {} bytes: {}",
            bytes.len(),
            HexDump::new(bytes, self.config.dump_len)
        );
    }

    // Caller must hold a Quiet guard.
    #[inline(always)]
    fn read_irq(&mut self) -> u8 {
        self.port.pull_irq();
        let snapshot = loop {
            let snapshot = self.port.sample();
            if snapshot.cs_asserted() {
                break snapshot;
            }
        };
        self.port.release_irq();
        snapshot.data
    }

    // Caller must hold a Quiet guard.
    #[inline(always)]
    fn send_irq(&mut self, byte: u8) {
        self.port.write_data(byte);
        self.port.acquire_data_bus();
        self.port.pull_irq();
        while !self.port.sample().cs_asserted() {}
        while self.port.sample().cs_asserted() {}
        self.release_bus();
    }
}

#[cfg(test)]
mod tests {
    use crate::acsi::{AcsiConfig, DeviceMask};
    use crate::sim::{Directions, HostOp, Sim};

    #[test]
    fn reads_remaining_command_block() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        sim.push(HostOp::Command(0x08));
        sim.queue_bytes(&[0x00, 0x12, 0x34, 0x01, 0x00]);
        sim.push(HostOp::IrqSend(5));

        let command = acsi.wait_command(DeviceMask::single(0));
        assert_eq!(command.opcode(), 0x08);

        let mut block = [0u8; 5];
        acsi.read_bytes(&mut block);
        assert_eq!(block, [0x00, 0x12, 0x34, 0x01, 0x00]);
        assert!(acsi.read_strobe());
        assert_eq!(sim.directions(), Directions::default());
        assert!(sim.interrupts_running());
    }

    #[test]
    fn single_byte_read() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        sim.queue_bytes(&[0xa5]);
        sim.push(HostOp::IrqSend(1));

        assert_eq!(acsi.read_byte(), 0xa5);
        assert!(!sim.directions().irq_out);
    }

    #[test]
    fn sends_status_bytes() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        sim.push(HostOp::IrqReceive(3));

        acsi.send_byte(0x02);
        acsi.send_bytes(&[0x70, 0x00]);

        assert_eq!(sim.received().as_slice(), &[0x02, 0x70, 0x00]);
        assert_eq!(sim.directions(), Directions::default());
        assert_eq!(sim.stats().contention, 0);
        assert!(sim.interrupts_running());
    }

    #[test]
    fn empty_reads_and_sends_are_harmless() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        acsi.send_bytes(&[]);
        acsi.read_bytes(&mut []);
        assert_eq!(sim.directions(), Directions::default());
        assert!(sim.interrupts_running());
    }

    #[test]
    #[should_panic(expected = "watchdog")]
    fn send_to_disconnected_host_never_returns() {
        let sim = Sim::new();
        sim.set_budget(10_000);
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        sim.push(HostOp::IrqReceive(1));
        sim.push(HostOp::HoldCs);
        acsi.send_bytes(&[0x00, 0x00]);
    }

    #[test]
    #[should_panic(expected = "watchdog")]
    fn read_with_cs_stuck_never_returns() {
        let sim = Sim::new();
        sim.set_budget(10_000);
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        sim.queue_bytes(&[0x01]);
        sim.push(HostOp::IrqSend(1));
        sim.push(HostOp::HoldCs);
        let mut block = [0u8; 1];
        acsi.read_bytes(&mut block);
    }
}
