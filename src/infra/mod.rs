//! RP2040/RP235x implementations of the ACSI engine's hardware capabilities,
//! plus the firmware's watchdog.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

pub mod dma;
pub mod gpio;
pub mod irq;
pub mod pio;
pub mod pwm;
pub mod watchdog;

use crate::acsi::{Acsi, AcsiConfig, DeviceMask};
use crate::constants::{CAPTURE_PIO_SM, SAMPLER_DMA_CHANNEL};
use dma::RpSampler;
use gpio::{AcsiPins, RpPort};
use irq::InterruptMask;
use pio::CaptureMachine;
use pwm::RpTimer;

/// The ACSI engine on RP hardware.
pub type RpAcsi = Acsi<RpPort, RpTimer, RpSampler, InterruptMask>;

/// Start the ACSI engine on the claimed pins.
///
/// The PWM slice behind DRQ/ACK, DMA channel [`SAMPLER_DMA_CHANNEL`] and
/// PIO0 state machine [`CAPTURE_PIO_SM`] are taken over for the life of the
/// engine, and must not be used for anything else.
pub fn create_acsi(pins: AcsiPins, devices: DeviceMask, config: AcsiConfig) -> RpAcsi {
    let pin_config = *pins.config();
    let slice = pin_config.pwm_slice();

    let timer = RpTimer::new(slice, pin_config.ack);
    let capture = CaptureMachine::new(CAPTURE_PIO_SM, pin_config.data_base, pin_config.ack);
    let sampler = RpSampler::new(SAMPLER_DMA_CHANNEL, capture);

    Acsi::begin(
        RpPort::new(pins),
        timer,
        sampler,
        InterruptMask,
        devices,
        config,
    )
}
