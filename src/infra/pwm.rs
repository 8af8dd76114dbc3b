//! The handshake timer, built from a PWM slice.
//!
//! The slice is put in falling-edge divider mode, so its counter is clocked
//! by ACK on the B input.  TOP and the A compare value are both 0xFFFF, which
//! makes the A output (DRQ) low only while the counter sits at 0xFFFF:
//!
//! - Arming writes 0xFFFF to the counter.  DRQ goes low.
//! - The next ACK falling edge wraps the counter to 0, and DRQ goes high.
//!   The byte sampler latches the data bus on the same edge.
//!
//! So the number of edges since arming is simply the counter plus one.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_rp::pac;
use embassy_rp::pac::pwm::vals::Divmode;

use crate::constants::FUNCSEL_PWM;
use crate::hw::TimerCapability;
use crate::util::log::debug;

// Counter value while armed, and the wrap point.
const ARMED: u16 = 0xffff;

// Counter value while parked - far from the wrap, with DRQ high.
const PARKED: u16 = 0x7fff;

/// [`TimerCapability`] on one RP PWM slice.
pub struct RpTimer {
    slice: usize,
    ack: u8,
}

impl RpTimer {
    /// `ack` must be the B pin of `slice`.
    pub fn new(slice: usize, ack: u8) -> Self {
        Self { slice, ack }
    }
}

impl TimerCapability for RpTimer {
    fn configure(&mut self) {
        let ch = pac::PWM.ch(self.slice);

        ch.csr().write(|w| w.set_en(false));
        ch.div().write(|w| {
            w.set_int(1);
            w.set_frac(0);
        });
        ch.top().write(|w| w.set_top(ARMED));
        ch.cc().write(|w| {
            w.set_a(ARMED);
            w.set_b(0);
        });
        ch.ctr().write(|w| w.set_ctr(PARKED));

        // ACK stays with the PWM block for the whole session.  It's an input
        // only, so this never drives the line.
        pac::IO_BANK0
            .gpio(self.ack as usize)
            .ctrl()
            .write(|w| w.set_funcsel(FUNCSEL_PWM));

        ch.csr().write(|w| {
            w.set_divmode(Divmode::FALL);
            w.set_en(true);
        });

        debug!("Handshake timer on PWM slice {} configured", self.slice);
    }

    #[inline(always)]
    fn park(&mut self) {
        pac::PWM.ch(self.slice).ctr().write(|w| w.set_ctr(PARKED));
    }

    #[inline(always)]
    fn arm(&mut self) {
        pac::PWM.ch(self.slice).ctr().write(|w| w.set_ctr(ARMED));
    }

    #[inline(always)]
    fn pulses(&mut self) -> u16 {
        pac::PWM
            .ch(self.slice)
            .ctr()
            .read()
            .ctr()
            .wrapping_sub(ARMED)
    }

    fn stop(&mut self) {
        pac::PWM.ch(self.slice).csr().write(|w| w.set_en(false));
        debug!("Handshake timer on PWM slice {} stopped", self.slice);
    }
}
