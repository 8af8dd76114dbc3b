//! A simulated ACSI bus for exercising the engine off-target.
//!
//! [`Sim`] models both ends of the cable: the hardware capabilities the
//! engine drives (port, handshake timer, byte sampler and interrupt
//! suspension) and a scripted host computer on the other end.  The host is
//! scripted with [`HostOp`]s and advances one step every time the engine
//! polls the hardware, so busy-waits make progress exactly as they would on
//! a real bus.
//!
//! A poll budget stands in for the hardware watchdog: an engine that spins
//! for longer than the budget panics with a "watchdog reset" message.
//!
//! The timer and sampler are modelled as the hardware behaves: the counter
//! advances and the holding register captures the port on each ACK falling
//! edge, with no engine code involved.  DRQ is derived from the counter.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::cell::RefCell;

use heapless::{Deque, Vec};

use crate::acsi::{Acsi, AcsiConfig, DeviceMask};
use crate::hw::{DmaCapability, GpioPort, JitterSource, Lines, PortSnapshot, TimerCapability};

/// Maximum bytes queued to, or recorded from, the simulated host.
pub const SIM_BUFFER: usize = 8192;

/// Maximum scripted operations outstanding.
pub const SIM_OPS: usize = 64;

/// Simulated time taken by one poll of the hardware.
pub const POLL_NS: u32 = 24;

/// Default time from the counted ACK edge to DRQ rising, for the simulated
/// timer.
pub const TIMER_LATENCY_NS: u32 = 16;

/// Default poll budget before the simulated watchdog fires.
pub const DEFAULT_BUDGET: u32 = 1_000_000;

// Counter value used when the timer is parked.
const PARKED: u16 = 0x8000;

/// One step of the scripted host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOp {
    /// Strobe A1 and CS with this byte on the bus.
    Command(u8),

    /// Answer this many IRQs by strobing CS with the next queued byte.
    IrqSend(usize),

    /// Answer this many IRQs by strobing CS and recording the bus.
    IrqReceive(usize),

    /// Answer this many DRQs with an ACK pulse, driving the next queued byte.
    DmaSend(usize),

    /// Answer this many DRQs with an ACK pulse, recording the bus.
    DmaReceive(usize),

    /// Never release CS from the current strobe - a pulled cable.
    HoldCs,
}

/// Which lines the engine is currently driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Directions {
    pub data_out: bool,
    pub irq_out: bool,
    pub drq_timer: bool,
    pub strobe_pulldowns: bool,
}

/// Counters gathered while the simulation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimStats {
    /// DRQ low to high transitions answering an ACK falling edge.
    pub drq_rises: usize,

    /// Worst time seen from an ACK falling edge to the DRQ rise answering
    /// it.
    pub max_drq_latency_ns: u32,

    /// Holding register captures.
    pub captures: usize,

    /// Calls to suspend the jitter source.
    pub suspensions: usize,

    /// Times both ends were found driving the data bus.
    pub contention: usize,

    pub polls: u32,
    pub timer_running: bool,
    pub sampler_bound: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Strobe,
    // Holding ACK low.  `recording` is fixed when ACK falls, so the byte is
    // still recorded if that was the last one the operation asked for.
    AckLow { recording: bool, late_edge: bool },
    Stuck,
}

#[derive(Debug, Clone, Copy)]
struct Active {
    op: HostOp,
    remaining: usize,
    index: usize,
}

struct SimBus {
    now_ns: u64,
    budget: u32,
    ops: Deque<HostOp, SIM_OPS>,
    active: Option<Active>,
    phase: Phase,
    outgoing: Deque<u8, SIM_BUFFER>,
    received: Vec<u8, SIM_BUFFER>,

    // Host side
    connected: bool,
    host_data: Option<u8>,
    a1_low: bool,
    cs_low: bool,
    ack_low: bool,
    foreign_irq: bool,
    foreign_drq: bool,
    double_ack_at: Option<usize>,
    late_ack_at: Option<usize>,
    sample_on_fall: bool,
    // Set once the host has answered a DRQ, until it sees DRQ high again.
    awaiting_drq_high: bool,

    // Device side
    dirs: Directions,
    out_latch: u8,
    counter: u16,
    timer_running: bool,
    timer_latency_ns: u32,
    drq_high_at: u64,
    sampler_bound: bool,
    holding: u16,
    interrupts_running: bool,

    // DRQ edge tracking
    drq_was_low: bool,
    ack_fell_at: Option<u64>,

    stats: SimStats,
}

impl SimBus {
    fn new() -> Self {
        Self {
            now_ns: 0,
            budget: DEFAULT_BUDGET,
            ops: Deque::new(),
            active: None,
            phase: Phase::Idle,
            outgoing: Deque::new(),
            received: Vec::new(),
            connected: true,
            host_data: None,
            a1_low: false,
            cs_low: false,
            ack_low: false,
            foreign_irq: false,
            foreign_drq: false,
            double_ack_at: None,
            late_ack_at: None,
            sample_on_fall: false,
            awaiting_drq_high: false,
            dirs: Directions::default(),
            out_latch: 0,
            counter: PARKED,
            timer_running: false,
            timer_latency_ns: TIMER_LATENCY_NS,
            drq_high_at: 0,
            sampler_bound: false,
            holding: 0,
            interrupts_running: true,
            drq_was_low: false,
            ack_fell_at: None,
            stats: SimStats::default(),
        }
    }

    fn irq_low(&self) -> bool {
        self.dirs.irq_out || self.foreign_irq
    }

    // The timer's compare output: low while armed, and until the counted
    // edge has made its way through to the pin.
    fn timer_output_low(&self) -> bool {
        self.counter == 0 || self.now_ns < self.drq_high_at
    }

    fn drq_low(&self) -> bool {
        self.foreign_drq
            || (self.dirs.drq_timer && self.timer_running && self.timer_output_low())
    }

    fn lines(&self) -> Lines {
        let pulled = !self.connected && self.dirs.strobe_pulldowns;
        let mut lines = Lines::empty();
        lines.set(Lines::A1, !(self.a1_low || pulled));
        lines.set(Lines::CS, !(self.cs_low || pulled));
        lines.set(Lines::IRQ, !self.irq_low());
        lines.set(Lines::DRQ, !self.drq_low());
        lines.set(Lines::ACK, !self.ack_low);
        lines
    }

    // Record a DRQ rise, if one has happened since last called.  Rises the
    // timer made are timestamped when the output actually changed.  Anything
    // else (the pin being released, the timer parked or stopped) happens at
    // the current time.
    fn note_drq(&mut self) {
        let low = self.drq_low();
        if self.drq_was_low && !low {
            self.awaiting_drq_high = false;
            if let Some(fell) = self.ack_fell_at.take() {
                let by_timer = self.dirs.drq_timer
                    && self.timer_running
                    && self.counter != 0
                    && self.drq_high_at > fell;
                let rose = if by_timer {
                    self.drq_high_at
                } else {
                    self.now_ns
                };
                let latency = u32::try_from(rose.saturating_sub(fell)).unwrap_or(u32::MAX);
                self.stats.drq_rises += 1;
                self.stats.max_drq_latency_ns = self.stats.max_drq_latency_ns.max(latency);
            }
        }
        self.drq_was_low = low;
    }

    // Apply a change made by the engine, keeping DRQ edge tracking current
    // either side of it.
    fn drive(&mut self, change: impl FnOnce(&mut Self)) {
        self.note_drq();
        change(self);
        self.note_drq();
    }

    fn bus_data(&mut self) -> u8 {
        match (self.dirs.data_out, self.host_data) {
            (true, Some(_)) => {
                self.stats.contention += 1;
                self.out_latch
            }
            (true, None) => self.out_latch,
            (false, Some(byte)) => byte,
            (false, None) => 0xff,
        }
    }

    fn snapshot(&mut self) -> PortSnapshot {
        PortSnapshot::new(self.bus_data(), self.lines())
    }

    fn record(&mut self, byte: u8) {
        if self.received.push(byte).is_err() {
            panic!("simulated host receive buffer full");
        }
    }

    fn next_outgoing(&mut self) -> u8 {
        self.outgoing.pop_front().unwrap_or(0xff)
    }

    fn ack_fall(&mut self) {
        if self.drq_low() {
            self.ack_fell_at = Some(self.now_ns);
        }
        self.ack_low = true;

        if self.timer_running {
            if self.counter == 0 {
                self.drq_high_at = self.now_ns + u64::from(self.timer_latency_ns);
            }
            self.counter = self.counter.wrapping_add(1);
            if self.sampler_bound {
                let data = self.bus_data();
                self.holding = ((data as u16) << 8) | self.lines().bits() as u16;
                self.stats.captures += 1;
            }
        }
    }

    fn ack_rise(&mut self, recording: bool) {
        if recording && !self.sample_on_fall {
            let byte = self.bus_data();
            self.record(byte);
        }
        self.ack_low = false;
    }

    // Advance the host by one step.  Called on every poll of the hardware.
    // The host acts at the start of the poll, and the engine sees the result
    // at the end of it.
    fn tick(&mut self) {
        self.stats.polls += 1;
        if self.stats.polls > self.budget {
            panic!(
                "watchdog reset: poll budget of {} used up at {} ns",
                self.budget, self.now_ns
            );
        }

        self.note_drq();
        if !self.drq_low() {
            self.awaiting_drq_high = false;
        }
        if self.connected {
            self.step();
        }
        self.note_drq();

        self.now_ns += u64::from(POLL_NS);
    }

    fn step(&mut self) {
        match self.phase {
            Phase::Stuck => return,
            Phase::Strobe => {
                if self.ops.front() == Some(&HostOp::HoldCs) {
                    self.ops.pop_front();
                    self.phase = Phase::Stuck;
                } else {
                    self.a1_low = false;
                    self.cs_low = false;
                    self.host_data = None;
                    self.phase = Phase::Idle;
                }
                return;
            }
            Phase::AckLow {
                recording,
                late_edge,
            } => {
                self.ack_rise(recording);
                if late_edge {
                    // A second pulse, landing after the first was counted.
                    self.ack_fall();
                    self.phase = Phase::AckLow {
                        recording: false,
                        late_edge: false,
                    };
                } else {
                    self.host_data = None;
                    self.phase = Phase::Idle;
                }
                return;
            }
            Phase::Idle => {}
        }

        if self.active.is_none() {
            let Some(op) = self.ops.pop_front() else {
                return;
            };
            let count = match op {
                HostOp::Command(byte) => {
                    self.host_data = Some(byte);
                    self.a1_low = true;
                    self.cs_low = true;
                    self.phase = Phase::Strobe;
                    return;
                }
                HostOp::HoldCs => {
                    self.cs_low = true;
                    self.phase = Phase::Stuck;
                    return;
                }
                HostOp::IrqSend(n)
                | HostOp::IrqReceive(n)
                | HostOp::DmaSend(n)
                | HostOp::DmaReceive(n) => n,
            };
            self.active = Some(Active {
                op,
                remaining: count,
                index: 0,
            });
        }

        let Some(mut active) = self.active else {
            return;
        };

        let dma_ready = self.drq_low() && !self.awaiting_drq_high;
        let served = match active.op {
            HostOp::IrqSend(_) if self.irq_low() => {
                self.host_data = Some(self.next_outgoing());
                self.cs_low = true;
                self.phase = Phase::Strobe;
                true
            }
            HostOp::IrqReceive(_) if self.irq_low() => {
                let byte = self.bus_data();
                self.record(byte);
                self.cs_low = true;
                self.phase = Phase::Strobe;
                true
            }
            HostOp::DmaSend(_) if dma_ready => {
                self.host_data = Some(self.next_outgoing());
                self.serve_ack(active.index, false);
                true
            }
            HostOp::DmaReceive(_) if dma_ready => {
                self.serve_ack(active.index, true);
                true
            }
            _ => false,
        };

        if served {
            active.index += 1;
            active.remaining -= 1;
            self.active = (active.remaining > 0).then_some(active);
        }
    }

    // Pulse ACK for byte `index` of a DMA operation.
    fn serve_ack(&mut self, index: usize, recording: bool) {
        self.awaiting_drq_high = true;
        self.ack_fall();
        if recording && self.sample_on_fall {
            let byte = self.bus_data();
            self.record(byte);
        }
        if self.double_ack_at == Some(index) {
            self.double_ack_at = None;
            self.ack_rise(recording);
            self.ack_fall();
        }
        let late_edge = self.late_ack_at == Some(index);
        if late_edge {
            self.late_ack_at = None;
        }
        self.phase = Phase::AckLow {
            recording,
            late_edge,
        };
    }
}

/// The simulated bus.  Create one, then an engine on it with
/// [`Sim::engine`].
pub struct Sim {
    bus: RefCell<SimBus>,
}

/// An engine running on the simulated bus.
pub type SimAcsi<'a> = Acsi<SimPort<'a>, SimTimer<'a>, SimSampler<'a>, SimJitter<'a>>;

impl Default for Sim {
    fn default() -> Self {
        Self::new()
    }
}

impl Sim {
    pub fn new() -> Self {
        Self {
            bus: RefCell::new(SimBus::new()),
        }
    }

    /// Start an engine on this bus.
    pub fn engine(&self, devices: DeviceMask, config: AcsiConfig) -> SimAcsi<'_> {
        Acsi::begin(
            self.port(),
            self.timer(),
            self.sampler(),
            self.jitter(),
            devices,
            config,
        )
    }

    /// The individual capabilities, for building an engine by hand.
    pub fn port(&self) -> SimPort<'_> {
        SimPort { bus: &self.bus }
    }

    pub fn timer(&self) -> SimTimer<'_> {
        SimTimer { bus: &self.bus }
    }

    pub fn sampler(&self) -> SimSampler<'_> {
        SimSampler { bus: &self.bus }
    }

    pub fn jitter(&self) -> SimJitter<'_> {
        SimJitter { bus: &self.bus }
    }

    /// Queue a host operation.  Operations with a count of zero are
    /// ignored.
    pub fn push(&self, op: HostOp) {
        let count = match op {
            HostOp::IrqSend(n)
            | HostOp::IrqReceive(n)
            | HostOp::DmaSend(n)
            | HostOp::DmaReceive(n) => n,
            HostOp::Command(_) | HostOp::HoldCs => 1,
        };
        if count == 0 {
            return;
        }
        if self.bus.borrow_mut().ops.push_back(op).is_err() {
            panic!("too many simulated host operations");
        }
    }

    /// Queue bytes for the host to send, by IRQ or DMA.
    pub fn queue_bytes(&self, bytes: &[u8]) {
        let mut bus = self.bus.borrow_mut();
        for &byte in bytes {
            if bus.outgoing.push_back(byte).is_err() {
                panic!("simulated host send buffer full");
            }
        }
    }

    /// Everything the host has received so far.
    pub fn received(&self) -> Vec<u8, SIM_BUFFER> {
        self.bus.borrow().received.clone()
    }

    /// Operations not yet completed, including any in progress.
    pub fn pending_ops(&self) -> usize {
        let bus = self.bus.borrow();
        bus.ops.len() + usize::from(bus.active.is_some())
    }

    /// Change the number of polls allowed before the watchdog fires.
    pub fn set_budget(&self, polls: u32) {
        self.bus.borrow_mut().budget = polls;
    }

    /// Change how long the simulated timer takes to raise DRQ after the
    /// edge it counts.
    pub fn set_timer_latency(&self, ns: u32) {
        self.bus.borrow_mut().timer_latency_ns = ns;
    }

    /// Make the host send two ACK pulses, instead of one, for byte `index`
    /// of the next DMA operation.
    pub fn inject_double_ack(&self, index: usize) {
        self.bus.borrow_mut().double_ack_at = Some(index);
    }

    /// Make the host send a second ACK pulse for byte `index` of the next
    /// DMA operation, one poll after the first.  The engine has normally
    /// seen the first pulse counted by then.
    pub fn inject_late_ack(&self, index: usize) {
        self.bus.borrow_mut().late_ack_at = Some(index);
    }

    /// Have the host sample DMA data as ACK falls, rather than as it rises.
    pub fn sample_on_ack_fall(&self, on_fall: bool) {
        self.bus.borrow_mut().sample_on_fall = on_fall;
    }

    /// Simulate another device on the bus holding IRQ and/or DRQ low.
    pub fn set_foreign(&self, irq_low: bool, drq_low: bool) {
        let mut bus = self.bus.borrow_mut();
        bus.drive(|bus| {
            bus.foreign_irq = irq_low;
            bus.foreign_drq = drq_low;
        });
    }

    /// Set the ACK level directly - true for released.
    pub fn set_ack(&self, high: bool) {
        self.bus.borrow_mut().ack_low = !high;
    }

    /// Unplug the host.  It stops responding, and A1 and CS float.
    pub fn disconnect(&self) {
        let mut bus = self.bus.borrow_mut();
        bus.connected = false;
        bus.a1_low = false;
        bus.cs_low = false;
        bus.host_data = None;
    }

    pub fn directions(&self) -> Directions {
        self.bus.borrow().dirs
    }

    pub fn stats(&self) -> SimStats {
        let mut bus = self.bus.borrow_mut();
        bus.note_drq();
        SimStats {
            timer_running: bus.timer_running,
            sampler_bound: bus.sampler_bound,
            ..bus.stats
        }
    }

    pub fn interrupts_running(&self) -> bool {
        self.bus.borrow().interrupts_running
    }

    /// Current line levels, without advancing the host.
    pub fn lines(&self) -> Lines {
        self.bus.borrow().lines()
    }
}

/// Simulated [`GpioPort`].
#[derive(Clone, Copy)]
pub struct SimPort<'a> {
    bus: &'a RefCell<SimBus>,
}

impl GpioPort for SimPort<'_> {
    fn sample(&mut self) -> PortSnapshot {
        let mut bus = self.bus.borrow_mut();
        bus.tick();
        bus.snapshot()
    }

    fn acquire_data_bus(&mut self) {
        self.bus.borrow_mut().dirs.data_out = true;
    }

    fn release_data_bus(&mut self) {
        self.bus.borrow_mut().dirs.data_out = false;
    }

    fn write_data(&mut self, byte: u8) {
        self.bus.borrow_mut().out_latch = byte;
    }

    fn pull_irq(&mut self) {
        self.bus.borrow_mut().dirs.irq_out = true;
    }

    fn release_irq(&mut self) {
        self.bus.borrow_mut().dirs.irq_out = false;
    }

    fn route_drq_to_timer(&mut self) {
        self.bus.borrow_mut().drive(|bus| bus.dirs.drq_timer = true);
    }

    fn release_drq(&mut self) {
        self.bus.borrow_mut().drive(|bus| bus.dirs.drq_timer = false);
    }

    fn set_strobe_pulldowns(&mut self, enabled: bool) {
        self.bus.borrow_mut().dirs.strobe_pulldowns = enabled;
    }
}

/// Simulated [`TimerCapability`].
#[derive(Clone, Copy)]
pub struct SimTimer<'a> {
    bus: &'a RefCell<SimBus>,
}

impl TimerCapability for SimTimer<'_> {
    fn configure(&mut self) {
        self.bus.borrow_mut().drive(|bus| bus.timer_running = true);
    }

    fn park(&mut self) {
        self.bus.borrow_mut().drive(|bus| {
            bus.counter = PARKED;
            bus.drq_high_at = 0;
        });
    }

    fn arm(&mut self) {
        self.bus.borrow_mut().drive(|bus| {
            bus.counter = 0;
            bus.drq_high_at = 0;
        });
    }

    fn pulses(&mut self) -> u16 {
        let mut bus = self.bus.borrow_mut();
        bus.tick();
        bus.counter
    }

    fn stop(&mut self) {
        self.bus.borrow_mut().drive(|bus| bus.timer_running = false);
    }
}

/// Simulated [`DmaCapability`].
#[derive(Clone, Copy)]
pub struct SimSampler<'a> {
    bus: &'a RefCell<SimBus>,
}

impl DmaCapability for SimSampler<'_> {
    fn bind(&mut self) {
        self.bus.borrow_mut().sampler_bound = true;
    }

    fn sample(&mut self) -> u8 {
        (self.bus.borrow().holding >> 8) as u8
    }

    fn unbind(&mut self) {
        self.bus.borrow_mut().sampler_bound = false;
    }
}

/// Simulated [`JitterSource`] - the interrupts of the simulated CPU.
#[derive(Clone, Copy)]
pub struct SimJitter<'a> {
    bus: &'a RefCell<SimBus>,
}

impl JitterSource for SimJitter<'_> {
    fn suspend(&self) -> bool {
        let mut bus = self.bus.borrow_mut();
        bus.stats.suspensions += 1;
        core::mem::replace(&mut bus.interrupts_running, false)
    }

    fn resume(&self) {
        self.bus.borrow_mut().interrupts_running = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_strobe_lasts_one_poll() {
        let sim = Sim::new();
        let mut port = sim.port();
        sim.push(HostOp::Command(0x28));

        let strobe = port.sample();
        assert!(strobe.command_strobe());
        assert_eq!(strobe.data, 0x28);

        let after = port.sample();
        assert!(!after.cs_asserted());
        assert_eq!(after.data, 0xff);
    }

    #[test]
    fn timer_counts_ack_and_drives_drq() {
        let sim = Sim::new();
        let mut port = sim.port();
        let mut timer = sim.timer();
        timer.configure();
        port.route_drq_to_timer();
        timer.park();
        assert!(sim.lines().contains(Lines::DRQ));

        timer.arm();
        assert!(!sim.lines().contains(Lines::DRQ));

        sim.queue_bytes(&[0x5a]);
        sim.push(HostOp::DmaSend(1));
        assert_eq!(timer.pulses(), 1);
        assert!(sim.lines().contains(Lines::DRQ));
        assert!(!sim.lines().contains(Lines::ACK));
        assert_eq!(sim.stats().drq_rises, 1);
    }

    #[test]
    fn last_received_byte_is_kept() {
        let sim = Sim::new();
        let mut port = sim.port();
        let mut timer = sim.timer();
        timer.configure();
        port.route_drq_to_timer();
        port.acquire_data_bus();
        sim.push(HostOp::DmaReceive(2));

        for byte in [0xaa, 0xbb] {
            port.write_data(byte);
            timer.arm();
            while timer.pulses() == 0 {}
            while !port.sample().lines.contains(Lines::ACK) {}
        }

        assert_eq!(sim.received().as_slice(), &[0xaa, 0xbb]);
        assert_eq!(sim.pending_ops(), 0);
    }

    #[test]
    fn drq_latency_is_measured_from_the_ack_edge() {
        let sim = Sim::new();
        sim.set_timer_latency(20);
        let mut port = sim.port();
        let mut timer = sim.timer();
        timer.configure();
        port.route_drq_to_timer();
        sim.queue_bytes(&[1, 2]);
        sim.push(HostOp::DmaSend(2));

        timer.arm();
        while timer.pulses() == 0 {}
        port.sample();
        timer.arm();
        while timer.pulses() == 0 {}

        let stats = sim.stats();
        assert_eq!(stats.drq_rises, 2);
        assert_eq!(stats.max_drq_latency_ns, 20);
    }

    #[test]
    fn released_drq_rise_is_timed_when_released() {
        let sim = Sim::new();
        sim.set_timer_latency(u32::MAX);
        let mut port = sim.port();
        let mut timer = sim.timer();
        timer.configure();
        port.route_drq_to_timer();
        sim.push(HostOp::DmaReceive(1));

        timer.arm();
        while timer.pulses() == 0 {}
        for _ in 0..9 {
            port.sample();
        }
        // The timer never got DRQ back up.  Letting go of the pin does,
        // ten polls after ACK fell.
        port.release_drq();

        let stats = sim.stats();
        assert_eq!(stats.drq_rises, 1);
        assert_eq!(stats.max_drq_latency_ns, 10 * POLL_NS);
    }

    #[test]
    fn late_ack_is_counted_after_the_first() {
        let sim = Sim::new();
        let mut port = sim.port();
        let mut timer = sim.timer();
        timer.configure();
        sim.sampler().bind();
        port.route_drq_to_timer();
        sim.queue_bytes(&[7]);
        sim.inject_late_ack(0);
        sim.push(HostOp::DmaSend(1));

        timer.arm();
        assert_eq!(timer.pulses(), 1);
        assert_eq!(timer.pulses(), 2);
        assert_eq!(sim.stats().captures, 2);
    }

    #[test]
    fn zero_length_ops_are_dropped() {
        let sim = Sim::new();
        sim.push(HostOp::DmaSend(0));
        sim.push(HostOp::IrqReceive(0));
        assert_eq!(sim.pending_ops(), 0);
    }

    #[test]
    fn pulldowns_only_matter_when_disconnected() {
        let sim = Sim::new();
        let mut port = sim.port();
        port.set_strobe_pulldowns(true);
        assert!(sim.lines().contains(Lines::A1 | Lines::CS));

        sim.disconnect();
        assert!(!sim.lines().intersects(Lines::A1 | Lines::CS));
    }

    #[test]
    #[should_panic(expected = "watchdog reset")]
    fn budget_exhaustion_panics() {
        let sim = Sim::new();
        sim.set_budget(5);
        let mut port = sim.port();
        for _ in 0..6 {
            port.sample();
        }
    }
}
