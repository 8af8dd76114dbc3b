//! DRQ/ACK paced block transfers.
//!
//! Every byte follows the same sequence: arm the handshake timer (DRQ goes
//! low), busy-wait until it has counted an ACK edge (DRQ is already high
//! again), then either collect the byte the sampler captured on that edge or
//! move on to the next byte to send.  Bytes are processed in batches of
//! [`BLOCK_BATCH`] with the remainder handled one at a time.  Batching only
//! affects how tight the loop is, not the sequence on the bus.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use super::{Acsi, AcsiError};
use crate::constants::BLOCK_BATCH;
use crate::hw::{DmaCapability, GpioPort, JitterSource, Lines, TimerCapability};
use crate::types::Direction;
use crate::util::dump::HexDump;
use crate::util::log::{trace, warn};

impl<P, T, D, J> Acsi<P, T, D, J>
where
    P: GpioPort,
    T: TimerCapability,
    D: DmaCapability,
    J: JitterSource,
{
    /// Receive `buf.len()` bytes from the host by DMA.
    ///
    /// With strict validation an [`AcsiError::Overrun`] aborts the block at
    /// the first byte that cannot be trusted.  The contents of `buf` from
    /// that byte onwards are unspecified.  The bus is released either way.
    pub fn read_block(&mut self, buf: &mut [u8]) -> Result<(), AcsiError> {
        let result = {
            let _quiet = self.quiet();
            self.acquire_drq();
            let result = self.receive_block(buf);
            self.release_bus();
            result
        };

        match result {
            Ok(()) => trace!(
                "DMA {} {} bytes: {}",
                Direction::Out,
                buf.len(),
                HexDump::new(buf, self.config.dump_len)
            ),
            Err(e) => warn!("{}", e),
        }
        result
    }

    /// Send `buf` to the host by DMA.
    ///
    /// Errors and bus state on return are as for
    /// [`read_block`](Self::read_block).  After an overrun the host has seen
    /// fewer bytes than it asked for.
    pub fn write_block(&mut self, buf: &[u8]) -> Result<(), AcsiError> {
        trace!(
            "DMA {} {} bytes: {}",
            Direction::In,
            buf.len(),
            HexDump::new(buf, self.config.dump_len)
        );

        let result = {
            let _quiet = self.quiet();
            if let Some(&first) = buf.first() {
                self.port.write_data(first);
            }
            self.port.acquire_data_bus();
            self.acquire_drq();
            let result = self.send_block(buf);
            self.release_bus();
            result
        };

        if let Err(e) = result {
            warn!("{}", e);
        }
        result
    }

    fn receive_block(&mut self, buf: &mut [u8]) -> Result<(), AcsiError> {
        let mut offset = 0;

        let mut batches = buf.chunks_exact_mut(BLOCK_BATCH);
        for batch in &mut batches {
            for (ii, byte) in batch.iter_mut().enumerate() {
                *byte = self.receive_dma_byte(offset + ii)?;
            }
            offset += BLOCK_BATCH;
        }

        for (ii, byte) in batches.into_remainder().iter_mut().enumerate() {
            *byte = self.receive_dma_byte(offset + ii)?;
        }

        Ok(())
    }

    fn send_block(&mut self, buf: &[u8]) -> Result<(), AcsiError> {
        let mut offset = 0;

        let mut batches = buf.chunks_exact(BLOCK_BATCH);
        for batch in &mut batches {
            for (ii, &byte) in batch.iter().enumerate() {
                self.send_dma_byte(byte, offset + ii)?;
            }
            offset += BLOCK_BATCH;
        }

        for (ii, &byte) in batches.remainder().iter().enumerate() {
            self.send_dma_byte(byte, offset + ii)?;
        }

        Ok(())
    }

    #[inline(always)]
    fn receive_dma_byte(&mut self, offset: usize) -> Result<u8, AcsiError> {
        self.timer.arm();
        let pulses = self.wait_tick();

        // Only valid once the tick has been seen.
        let byte = self.sampler.sample();

        self.check_slot(Direction::Out, offset, pulses)?;
        Ok(byte)
    }

    #[inline(always)]
    fn send_dma_byte(&mut self, byte: u8, offset: usize) -> Result<(), AcsiError> {
        self.port.write_data(byte);
        self.timer.arm();
        let pulses = self.wait_tick();

        if self.config.hold_until_ack_release {
            while !self.port.sample().lines.contains(Lines::ACK) {}
        }

        self.check_slot(Direction::In, offset, pulses)
    }

    // Busy-wait until the timer has counted at least one ACK edge, returning
    // the count seen.
    #[inline(always)]
    fn wait_tick(&mut self) -> u16 {
        loop {
            let pulses = self.timer.pulses();
            if pulses != 0 {
                break pulses;
            }
        }
    }

    // Strict validation looks at the counter twice: once as the tick is
    // seen, and again after the byte has been handled, to catch an extra
    // edge landing in between.
    #[inline(always)]
    fn check_slot(
        &mut self,
        direction: Direction,
        offset: usize,
        pulses: u16,
    ) -> Result<(), AcsiError> {
        let validation = self.config.validation;
        if !validation.is_strict() {
            return Ok(());
        }

        let fault = validation
            .check(pulses)
            .or_else(|| validation.check(self.timer.pulses()));
        match fault {
            Some(pulses) => Err(AcsiError::Overrun {
                direction,
                offset,
                pulses,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acsi::{AcsiConfig, DeviceMask, Validation};
    use crate::constants::DRQ_LATENCY_BUDGET_NS;
    use crate::hw::PortSnapshot;
    use crate::sim::{Directions, HostOp, Sim, SimPort, TIMER_LATENCY_NS};
    use proptest::prelude::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|ii| (ii * 7 + 3) as u8).collect()
    }

    fn strict() -> AcsiConfig {
        AcsiConfig {
            validation: Validation::STRICT,
            ..AcsiConfig::default()
        }
    }

    fn lenient() -> AcsiConfig {
        AcsiConfig {
            validation: Validation::Off,
            ..AcsiConfig::default()
        }
    }

    // Send `data` to the simulated host, then have it send the same bytes
    // back.
    fn loopback(config: AcsiConfig, data: &[u8]) -> Vec<u8> {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), config);

        sim.push(HostOp::DmaReceive(data.len()));
        acsi.write_block(data).unwrap();
        let echoed: Vec<u8> = sim.received().iter().copied().collect();
        assert_eq!(echoed.as_slice(), data);

        sim.queue_bytes(&echoed);
        sim.push(HostOp::DmaSend(echoed.len()));
        let mut back = vec![0u8; data.len()];
        acsi.read_block(&mut back).unwrap();

        assert_eq!(sim.directions(), Directions::default());
        assert_eq!(sim.pending_ops(), 0);
        back
    }

    #[test]
    fn round_trip_batch_boundaries() {
        for len in [0, 1, 15, 16, 17, 255, 4096] {
            let data = pattern(len);
            assert_eq!(loopback(lenient(), &data), data, "length {len}");
            assert_eq!(loopback(strict(), &data), data, "strict, length {len}");
        }
    }

    #[test]
    fn drq_returns_high_within_budget() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), strict());
        let data = pattern(4096);

        sim.push(HostOp::DmaReceive(data.len()));
        acsi.write_block(&data).unwrap();
        assert_eq!(sim.received().as_slice(), data.as_slice());
        sim.queue_bytes(&data);
        sim.push(HostOp::DmaSend(data.len()));
        let mut back = vec![0u8; data.len()];
        acsi.read_block(&mut back).unwrap();
        assert_eq!(back, data);

        let stats = sim.stats();
        assert_eq!(stats.drq_rises, 2 * 4096);
        assert_eq!(stats.max_drq_latency_ns, TIMER_LATENCY_NS);
        assert!(stats.max_drq_latency_ns <= DRQ_LATENCY_BUDGET_NS);
        assert_eq!(stats.captures, 2 * 4096);
    }

    #[test]
    fn drq_latency_tracks_the_timer() {
        let sim = Sim::new();
        sim.set_timer_latency(DRQ_LATENCY_BUDGET_NS / 10);
        let mut acsi = sim.engine(DeviceMask::single(0), lenient());
        let data = pattern(50);

        sim.queue_bytes(&data);
        sim.push(HostOp::DmaSend(data.len()));
        let mut back = vec![0u8; data.len()];
        acsi.read_block(&mut back).unwrap();

        assert_eq!(back, data);
        let stats = sim.stats();
        assert_eq!(stats.drq_rises, data.len());
        assert_eq!(stats.max_drq_latency_ns, DRQ_LATENCY_BUDGET_NS / 10);
    }

    // A port which leaves DRQ as an input when asked to hand it to the
    // timer.
    struct UnroutedDrq<'a>(SimPort<'a>);

    impl GpioPort for UnroutedDrq<'_> {
        fn sample(&mut self) -> PortSnapshot {
            self.0.sample()
        }
        fn acquire_data_bus(&mut self) {
            self.0.acquire_data_bus()
        }
        fn release_data_bus(&mut self) {
            self.0.release_data_bus()
        }
        fn write_data(&mut self, byte: u8) {
            self.0.write_data(byte)
        }
        fn pull_irq(&mut self) {
            self.0.pull_irq()
        }
        fn release_irq(&mut self) {
            self.0.release_irq()
        }
        fn route_drq_to_timer(&mut self) {}
        fn release_drq(&mut self) {
            self.0.release_drq()
        }
        fn set_strobe_pulldowns(&mut self, enabled: bool) {
            self.0.set_strobe_pulldowns(enabled)
        }
    }

    #[test]
    #[should_panic(expected = "watchdog")]
    fn unrouted_drq_never_requests_a_byte() {
        let sim = Sim::new();
        sim.set_budget(10_000);
        let mut acsi = Acsi::begin(
            UnroutedDrq(sim.port()),
            sim.timer(),
            sim.sampler(),
            sim.jitter(),
            DeviceMask::single(0),
            lenient(),
        );
        sim.push(HostOp::DmaReceive(4));
        let _ = acsi.write_block(&[1, 2, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "watchdog")]
    fn stopped_timer_never_requests_a_byte() {
        let sim = Sim::new();
        sim.set_budget(10_000);
        let mut acsi = sim.engine(DeviceMask::single(0), lenient());
        sim.timer().stop();
        sim.queue_bytes(&[9; 4]);
        sim.push(HostOp::DmaSend(4));
        let mut buf = [0u8; 4];
        let _ = acsi.read_block(&mut buf);
    }

    #[test]
    fn interrupts_suspended_once_per_block() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), AcsiConfig::default());
        let data = pattern(100);

        sim.push(HostOp::DmaReceive(data.len()));
        acsi.write_block(&data).unwrap();
        assert_eq!(sim.received().as_slice(), data.as_slice());
        assert_eq!(sim.stats().suspensions, 1);
        assert!(sim.interrupts_running());
    }

    #[test]
    fn strict_read_aborts_on_double_ack() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), strict());
        let data = pattern(64);
        sim.queue_bytes(&data);
        sim.inject_double_ack(20);
        sim.push(HostOp::DmaSend(data.len()));

        let mut buf = [0u8; 64];
        let err = acsi.read_block(&mut buf).unwrap_err();
        assert_eq!(
            err,
            AcsiError::Overrun {
                direction: Direction::Out,
                offset: 20,
                pulses: 2,
            }
        );
        assert_eq!(&buf[..20], &data[..20]);
        assert_eq!(sim.directions(), Directions::default());
        assert!(sim.interrupts_running());
    }

    #[test]
    fn strict_write_aborts_on_double_ack() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), strict());
        let data = pattern(40);
        sim.inject_double_ack(33);
        sim.push(HostOp::DmaReceive(data.len()));

        let err = acsi.write_block(&data).unwrap_err();
        assert!(matches!(
            err,
            AcsiError::Overrun {
                direction: Direction::In,
                offset: 33,
                ..
            }
        ));
        // The host saw byte 33 twice, and nothing after it.
        let received = sim.received();
        assert_eq!(received.len(), 35);
        assert_eq!(&received[..34], &data[..34]);
        assert_eq!(received[34], data[33]);
        assert_eq!(sim.directions(), Directions::default());
        assert!(sim.interrupts_running());
    }

    #[test]
    fn strict_read_catches_late_edge() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), strict());
        let data = pattern(32);
        sim.queue_bytes(&data);
        sim.inject_late_ack(9);
        sim.push(HostOp::DmaSend(data.len()));

        let mut buf = [0u8; 32];
        let err = acsi.read_block(&mut buf).unwrap_err();
        assert_eq!(
            err,
            AcsiError::Overrun {
                direction: Direction::Out,
                offset: 9,
                pulses: 2,
            }
        );
        assert_eq!(&buf[..9], &data[..9]);
        assert_eq!(sim.directions(), Directions::default());
    }

    #[test]
    fn strict_write_catches_late_edge() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), strict());
        let data = pattern(20);
        sim.inject_late_ack(12);
        sim.push(HostOp::DmaReceive(data.len()));

        let err = acsi.write_block(&data).unwrap_err();
        assert_eq!(
            err,
            AcsiError::Overrun {
                direction: Direction::In,
                offset: 12,
                pulses: 2,
            }
        );
        assert_eq!(sim.received().as_slice(), &data[..13]);
        assert_eq!(sim.directions(), Directions::default());
    }

    #[test]
    fn lenient_mode_survives_double_ack() {
        let sim = Sim::new();
        let mut acsi = sim.engine(DeviceMask::single(0), lenient());
        let data = pattern(48);
        sim.queue_bytes(&data);
        sim.inject_double_ack(5);
        sim.push(HostOp::DmaSend(data.len()));

        let mut buf = [0u8; 48];
        assert!(acsi.read_block(&mut buf).is_ok());
        assert_eq!(sim.directions(), Directions::default());
    }

    #[test]
    fn raised_threshold_tolerates_double_ack() {
        let sim = Sim::new();
        let config = AcsiConfig {
            validation: Validation::Strict { max_pulses: 2 },
            ..AcsiConfig::default()
        };
        let mut acsi = sim.engine(DeviceMask::single(0), config);
        let data = pattern(32);
        sim.queue_bytes(&data);
        sim.inject_double_ack(3);
        sim.push(HostOp::DmaSend(data.len()));

        let mut buf = [0u8; 32];
        assert!(acsi.read_block(&mut buf).is_ok());
    }

    #[test]
    fn fast_send_to_host_sampling_on_ack_fall() {
        let sim = Sim::new();
        sim.sample_on_ack_fall(true);
        let config = AcsiConfig {
            hold_until_ack_release: false,
            ..strict()
        };
        let mut acsi = sim.engine(DeviceMask::single(0), config);
        let data = pattern(300);

        sim.push(HostOp::DmaReceive(data.len()));
        acsi.write_block(&data).unwrap();
        assert_eq!(sim.received().as_slice(), data.as_slice());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn arbitrary_blocks_round_trip(
            data in proptest::collection::vec(any::<u8>(), 0..600),
            careful in any::<bool>(),
        ) {
            let config = if careful { strict() } else { lenient() };
            prop_assert_eq!(loopback(config, &data), data);
        }
    }
}
