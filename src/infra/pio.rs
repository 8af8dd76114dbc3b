//! The capture state machine: a PIO program which latches the data bus on
//! every ACK falling edge.
//!
//! The system DMA can't read the SIO GPIO registers, so the data bus is
//! sampled by a PIO state machine instead, and the byte sampler's DMA channel
//! copies words out of its RX FIFO.  PIO can read any pin's input whatever
//! function the pin has, so the data pins stay with SIO for driving.
//!
//! Each word pushed holds the data byte in bits 24-31 and a capture tag in
//! bits 0-23.  The tag is X, decremented every capture, so consecutive
//! captures never share one.
//!
//! ```text
//! .wrap_target
//! rise:
//!     jmp pin fall        ; wait for ACK to be released
//!     jmp rise
//! fall:
//!     jmp pin fall        ; then for it to fall
//!     in pins, 8          ; D0-D7
//!     in x, 24            ; tag, and autopush
//!     jmp x-- rise
//! .wrap
//! ```

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_rp::pac;
use embassy_rp::pac::dma::vals::TreqSel;

use crate::util::log::debug;

// `jmp 0` and `set x, 0`, executed directly on start.
const JMP_START: u16 = 0x0000;
const SET_X_0: u16 = 0xe020;

/// Bits of a captured word holding the tag.
pub const TAG_MASK: u32 = 0x00ff_ffff;

/// Bit position of the data byte in a captured word.
pub const DATA_SHIFT: u32 = 24;

/// One state machine on PIO0, running the capture program.
pub struct CaptureMachine {
    sm: usize,
    data_base: u8,
    ack: u8,
}

impl CaptureMachine {
    pub fn new(sm: usize, data_base: u8, ack: u8) -> Self {
        Self { sm, data_base, ack }
    }

    /// Load the program and start capturing.
    pub fn start(&self) {
        let program = pio_proc::pio_asm!(
            ".wrap_target",
            "rise:",
            "    jmp pin fall",
            "    jmp rise",
            "fall:",
            "    jmp pin fall",
            "    in pins, 8",
            "    in x, 24",
            "    jmp x-- rise",
            ".wrap",
        )
        .program;

        pac::RESETS.reset().modify(|w| w.set_pio0(false));
        while !pac::RESETS.reset_done().read().pio0() {}

        let pio = pac::PIO0;
        self.disable();

        // The program is loaded at offset 0, so its addresses need no
        // relocation.
        for (ii, &instr) in program.code.iter().enumerate() {
            pio.instr_mem(ii).write(|w| w.set_instr_mem(instr));
        }

        let sm = pio.sm(self.sm);
        sm.clkdiv().write(|w| {
            w.set_int(1);
            w.set_frac(0);
        });
        sm.execctrl().write(|w| {
            w.set_jmp_pin(self.ack);
            w.set_wrap_top(program.wrap.source);
            w.set_wrap_bottom(program.wrap.target);
        });
        sm.shiftctrl().write(|w| {
            w.set_autopush(true);
            // 0 means 32 bits.
            w.set_push_thresh(0);
            // Left, so the data byte ends up at the top of the word.
            w.set_in_shiftdir(false);
            w.set_fjoin_rx(true);
        });
        sm.pinctrl().write(|w| w.set_in_base(self.data_base));

        pio.ctrl().modify(|w| {
            w.set_sm_restart(1 << self.sm);
            w.set_clkdiv_restart(1 << self.sm);
        });
        sm.instr().write(|w| w.set_instr(SET_X_0));
        sm.instr().write(|w| w.set_instr(JMP_START));
        self.drain();

        pio.ctrl()
            .modify(|w| w.set_sm_enable(w.sm_enable() | (1 << self.sm)));

        debug!(
            "Capture state machine {} started: D0 on GPIO{}, ACK on GPIO{}",
            self.sm, self.data_base, self.ack
        );
    }

    /// Stop capturing.  The program stays loaded.
    pub fn disable(&self) {
        pac::PIO0
            .ctrl()
            .modify(|w| w.set_sm_enable(w.sm_enable() & !(1 << self.sm)));
    }

    /// Throw away anything left in the RX FIFO.
    pub fn drain(&self) {
        let pio = pac::PIO0;
        while pio.fstat().read().rxempty() & (1 << self.sm) == 0 {
            let _ = pio.rxf(self.sm).read();
        }
    }

    /// Address of the RX FIFO, for DMA.
    pub fn rx_fifo(&self) -> u32 {
        pac::PIO0.rxf(self.sm).as_ptr() as u32
    }

    /// The DREQ raised when the RX FIFO has a word in it.
    pub fn dreq(&self) -> TreqSel {
        match self.sm {
            0 => TreqSel::PIO0_RX0,
            1 => TreqSel::PIO0_RX1,
            2 => TreqSel::PIO0_RX2,
            _ => TreqSel::PIO0_RX3,
        }
    }
}
