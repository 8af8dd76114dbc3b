//! The byte sampler: a DMA channel copying each data bus capture into a
//! holding register.
//!
//! Captures come from the [`CaptureMachine`], which latches the bus on the
//! same ACK falling edge the handshake timer counts.  The channel is loaded
//! with a huge transfer count, doesn't increment either address and is paced
//! by the state machine's RX DREQ, so once started it moves one word per ACK
//! edge with no CPU involvement.
//!
//! The timer and the capture see the edge independently, so the engine may
//! see the tick a few cycles before the word lands.  [`RpSampler::sample`]
//! therefore waits for a word whose tag it hasn't seen yet.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::sync::atomic::{Ordering, compiler_fence};

use embassy_rp::pac;
use embassy_rp::pac::dma::vals::DataSize;
use portable_atomic::AtomicU32;

use super::pio::{CaptureMachine, DATA_SHIFT, TAG_MASK};
use crate::constants::SAMPLER_TRANSFERS;
use crate::hw::DmaCapability;
use crate::util::log::{debug, trace};

// The holding register.  Written only by the DMA channel.
static HOLDING: AtomicU32 = AtomicU32::new(0);

/// [`DmaCapability`] on one RP DMA channel, fed by a PIO capture state
/// machine.
pub struct RpSampler {
    channel: usize,
    capture: CaptureMachine,
    // Tag of the last capture handed out, or current when the block started.
    seen: u32,
}

impl RpSampler {
    pub fn new(channel: usize, capture: CaptureMachine) -> Self {
        Self {
            channel,
            capture,
            seen: 0,
        }
    }

    fn busy(&self) -> bool {
        pac::DMA.ch(self.channel).ctrl_trig().read().busy()
    }

    fn abort(&self) {
        pac::DMA
            .chan_abort()
            .write(|w| w.set_chan_abort(1 << self.channel));
        while pac::DMA.chan_abort().read().chan_abort() != 0 {}
    }

    fn start_channel(&self) {
        let ch = pac::DMA.ch(self.channel);

        ch.read_addr().write_value(self.capture.rx_fifo());
        ch.write_addr().write_value(HOLDING.as_ptr() as u32);

        #[cfg(feature = "pico")]
        ch.trans_count().write_value(SAMPLER_TRANSFERS);
        #[cfg(feature = "pico2")]
        ch.trans_count().write(|w| {
            w.set_mode(0.into());
            w.set_count(SAMPLER_TRANSFERS);
        });

        compiler_fence(Ordering::SeqCst);

        ch.ctrl_trig().write(|w| {
            w.set_treq_sel(self.capture.dreq());
            w.set_data_size(DataSize::SIZE_WORD);
            w.set_incr_read(false);
            w.set_incr_write(false);
            w.set_chain_to(self.channel as u8);
            w.set_en(true);
        });

        compiler_fence(Ordering::SeqCst);
    }

    fn holding(&self) -> u32 {
        compiler_fence(Ordering::SeqCst);
        HOLDING.load(Ordering::Acquire)
    }
}

impl DmaCapability for RpSampler {
    fn bind(&mut self) {
        self.start_channel();
        self.capture.start();
        self.seen = self.holding() & TAG_MASK;

        trace!("Sampler bound: DMA channel {}", self.channel);
    }

    fn rearm(&mut self) {
        if !self.busy() {
            debug!("Sampler DMA channel {} ran out - rebinding", self.channel);
            // Anything still queued is from an earlier block.
            self.capture.drain();
            self.start_channel();
        }
        self.seen = self.holding() & TAG_MASK;
    }

    #[inline(always)]
    fn sample(&mut self) -> u8 {
        let word = loop {
            let word = self.holding();
            if word & TAG_MASK != self.seen {
                break word;
            }
        };
        self.seen = word & TAG_MASK;
        (word >> DATA_SHIFT) as u8
    }

    fn unbind(&mut self) {
        self.capture.disable();
        self.abort();
        pac::DMA.ch(self.channel).ctrl_trig().write(|w| w.set_en(false));
        debug!("Sampler DMA channel {} unbound", self.channel);
    }
}
