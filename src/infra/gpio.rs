//! This file handles ACSI pin allocation, and implements [`GpioPort`] for the
//! RP2040/RP235x.
//!
//! The source code serves as the master list of pin assignments for the
//! hardware.
//!
//! Pins are claimed as embassy [`Flex`] pins, so nothing else can use them,
//! and then driven through the SIO registers directly.  Embassy's per-pin
//! API is far too slow for the IRQ protocol: CS pulses are only 250ns long,
//! and the data bus has to be read in one go with the strobe lines.
//!
//! All ACSI lines are open-collector style.  A line is pulled low by
//! enabling its output with the output latch held at 0, and released by
//! disabling the output again.  The data bus is the exception: it is
//! push-pull while we own it.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::fmt;

use embassy_rp::gpio::{AnyPin, Flex, Pin, Pull};
use embassy_rp::pac;
use embassy_rp::peripherals::{
    PIN_6, PIN_7, PIN_8, PIN_9, PIN_10, PIN_11, PIN_12, PIN_13, PIN_14, PIN_15, PIN_18, PIN_19,
    PIN_20,
};

use crate::constants::{FUNCSEL_PWM, FUNCSEL_SIO};
use crate::hw::{GpioPort, Lines, PortSnapshot};
#[allow(unused_imports)]
use crate::util::log::{debug, info, trace, warn};

// Number of user GPIOs in bank 0.
const NUM_GPIOS: u8 = 30;

/// GPIO configurations for different boards.
pub mod config {
    use super::PinConfig;

    /// The reference board: data bus on GPIO 8-15, so the byte can be read
    /// straight out of the upper half of the low 16 bits, as on the original
    /// STM32 design.  DRQ and ACK share PWM slice 1.
    pub fn standard() -> PinConfig {
        PinConfig {
            data_base: 8,
            a1: 6,
            cs: 7,
            drq: 18,
            ack: 19,
            irq: 20,
        }
    }
}

/// ACSI pin assignments, by GPIO number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    /// The lowest of the 8 consecutive data bus pins.
    pub data_base: u8,
    pub a1: u8,
    pub cs: u8,
    /// Must be the A output of a PWM slice.
    pub drq: u8,
    /// Must be the B input of the same PWM slice as `drq`.
    pub ack: u8,
    pub irq: u8,
}

/// Default pin configuration
impl Default for PinConfig {
    fn default() -> Self {
        config::standard()
    }
}

/// Problems with a [`PinConfig`], or with the pins supplied for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    /// A pin number above the top GPIO.
    OutOfRange(u8),

    /// The same pin has been assigned twice.
    Duplicate(u8),

    /// DRQ and ACK are not the A and B pins of a single PWM slice.
    PwmPair { drq: u8, ack: u8 },

    /// The pin supplied is not the one configured.
    Mismatch { expected: u8, actual: u8 },
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinError::OutOfRange(pin) => write!(f, "GPIO {} out of range", pin),
            PinError::Duplicate(pin) => write!(f, "GPIO {} assigned twice", pin),
            PinError::PwmPair { drq, ack } => {
                write!(f, "DRQ {} and ACK {} not on one PWM slice", drq, ack)
            }
            PinError::Mismatch { expected, actual } => {
                write!(f, "Expected GPIO {}, got GPIO {}", expected, actual)
            }
        }
    }
}

impl defmt::Format for PinError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            PinError::OutOfRange(pin) => defmt::write!(f, "GPIO {} out of range", pin),
            PinError::Duplicate(pin) => defmt::write!(f, "GPIO {} assigned twice", pin),
            PinError::PwmPair { drq, ack } => {
                defmt::write!(f, "DRQ {} and ACK {} not on one PWM slice", drq, ack)
            }
            PinError::Mismatch { expected, actual } => {
                defmt::write!(f, "Expected GPIO {}, got GPIO {}", expected, actual)
            }
        }
    }
}

impl PinConfig {
    /// Check the assignment can be used: everything in range, no overlaps,
    /// and DRQ/ACK on one PWM slice.
    pub fn validate(&self) -> Result<(), PinError> {
        if self.drq % 2 != 0 || self.ack != self.drq + 1 {
            return Err(PinError::PwmPair {
                drq: self.drq,
                ack: self.ack,
            });
        }

        let mut used = 0u32;
        for pin in self.pins() {
            if pin >= NUM_GPIOS {
                return Err(PinError::OutOfRange(pin));
            }
            if used & (1 << pin) != 0 {
                return Err(PinError::Duplicate(pin));
            }
            used |= 1 << pin;
        }

        Ok(())
    }

    /// The PWM slice DRQ and ACK are attached to.
    pub fn pwm_slice(&self) -> usize {
        ((self.drq / 2) % 8) as usize
    }

    /// All pins used, data bus first.
    pub fn pins(&self) -> impl Iterator<Item = u8> {
        let control = [self.a1, self.cs, self.irq, self.drq, self.ack];
        (self.data_base..self.data_base.saturating_add(8)).chain(control)
    }

    fn data_mask(&self) -> u32 {
        0xff << self.data_base
    }
}

/// The claimed ACSI pins.  Holding these keeps the pins out of anyone else's
/// hands for the life of the engine.
pub struct AcsiPins {
    _data: [Flex<'static>; 8],
    _control: [Flex<'static>; 5],
    config: PinConfig,
}

impl AcsiPins {
    /// Claim the pins, checking they are the ones `config` names.  All are
    /// left as floating SIO inputs.
    pub fn new(
        config: PinConfig,
        data: [AnyPin; 8],
        a1: AnyPin,
        cs: AnyPin,
        irq: AnyPin,
        drq: AnyPin,
        ack: AnyPin,
    ) -> Result<Self, PinError> {
        config.validate()?;

        for (ii, pin) in data.iter().enumerate() {
            check_pin(config.data_base + ii as u8, pin)?;
        }
        check_pin(config.a1, &a1)?;
        check_pin(config.cs, &cs)?;
        check_pin(config.irq, &irq)?;
        check_pin(config.drq, &drq)?;
        check_pin(config.ack, &ack)?;

        let data = data.map(input);
        let control = [a1, cs, irq, drq, ack].map(input);

        Ok(Self {
            _data: data,
            _control: control,
            config,
        })
    }

    pub fn config(&self) -> &PinConfig {
        &self.config
    }
}

fn check_pin(expected: u8, pin: &AnyPin) -> Result<(), PinError> {
    let actual = pin.pin();
    if actual == expected {
        Ok(())
    } else {
        Err(PinError::Mismatch { expected, actual })
    }
}

fn input(pin: AnyPin) -> Flex<'static> {
    let mut flex = Flex::new(pin);
    flex.set_pull(Pull::None);
    flex.set_as_input();
    flex
}

/// [`GpioPort`] on bank 0 of the RP2040/RP235x.
pub struct RpPort {
    pins: AcsiPins,
    data_base: u8,
    data_mask: u32,
    a1: u32,
    cs: u32,
    irq: u32,
    drq: u32,
    ack: u32,
}

impl RpPort {
    pub fn new(pins: AcsiPins) -> Self {
        let config = *pins.config();

        // Output latches for every line we might drive are held at 0 - only
        // the output enables ever change.  The data latches are written
        // before the bus is acquired.
        let irq = 1 << config.irq;
        let drq = 1 << config.drq;
        pac::SIO.gpio_out(0).value_clr().write_value(irq | drq);

        Self {
            data_base: config.data_base,
            data_mask: config.data_mask(),
            a1: 1 << config.a1,
            cs: 1 << config.cs,
            irq,
            drq,
            ack: 1 << config.ack,
            pins,
        }
    }

    fn set_funcsel(pin: u8, funcsel: u8) {
        pac::IO_BANK0
            .gpio(pin as usize)
            .ctrl()
            .write(|w| w.set_funcsel(funcsel));
    }
}

impl GpioPort for RpPort {
    #[inline(always)]
    fn sample(&mut self) -> PortSnapshot {
        let port = pac::SIO.gpio_in(0).read();

        let mut lines = Lines::empty();
        lines.set(Lines::A1, port & self.a1 != 0);
        lines.set(Lines::CS, port & self.cs != 0);
        lines.set(Lines::IRQ, port & self.irq != 0);
        lines.set(Lines::DRQ, port & self.drq != 0);
        lines.set(Lines::ACK, port & self.ack != 0);

        PortSnapshot::new((port >> self.data_base) as u8, lines)
    }

    #[inline(always)]
    fn acquire_data_bus(&mut self) {
        pac::SIO.gpio_oe(0).value_set().write_value(self.data_mask);
    }

    #[inline(always)]
    fn release_data_bus(&mut self) {
        pac::SIO.gpio_oe(0).value_clr().write_value(self.data_mask);
    }

    #[inline(always)]
    fn write_data(&mut self, byte: u8) {
        // A single XOR write updates all 8 pins at once, without touching
        // anything else in the bank.
        let current = pac::SIO.gpio_out(0).value().read();
        let wanted = (byte as u32) << self.data_base;
        pac::SIO
            .gpio_out(0)
            .value_xor()
            .write_value((current ^ wanted) & self.data_mask);
    }

    #[inline(always)]
    fn pull_irq(&mut self) {
        pac::SIO.gpio_oe(0).value_set().write_value(self.irq);
    }

    #[inline(always)]
    fn release_irq(&mut self) {
        pac::SIO.gpio_oe(0).value_clr().write_value(self.irq);
    }

    fn route_drq_to_timer(&mut self) {
        // Go via a pulled-up input, so the line doesn't glitch low while the
        // function select changes.
        let drq = self.pins.config.drq;
        pac::PADS_BANK0
            .gpio(drq as usize)
            .modify(|w| w.set_pue(true));
        Self::set_funcsel(drq, FUNCSEL_PWM);
    }

    fn release_drq(&mut self) {
        let drq = self.pins.config.drq;
        pac::SIO.gpio_oe(0).value_clr().write_value(self.drq);
        Self::set_funcsel(drq, FUNCSEL_SIO);
        pac::PADS_BANK0
            .gpio(drq as usize)
            .modify(|w| w.set_pue(false));
    }

    fn set_strobe_pulldowns(&mut self, enabled: bool) {
        for pin in [self.pins.config.a1, self.pins.config.cs] {
            pac::PADS_BANK0.gpio(pin as usize).modify(|w| {
                w.set_pue(false);
                w.set_pde(enabled);
            });
        }
    }
}

/// Claim the pins of the [`config::standard`] board.
#[allow(clippy::too_many_arguments)]
pub fn standard_pins(
    pin6: PIN_6,
    pin7: PIN_7,
    pin8: PIN_8,
    pin9: PIN_9,
    pin10: PIN_10,
    pin11: PIN_11,
    pin12: PIN_12,
    pin13: PIN_13,
    pin14: PIN_14,
    pin15: PIN_15,
    pin18: PIN_18,
    pin19: PIN_19,
    pin20: PIN_20,
) -> Result<AcsiPins, PinError> {
    AcsiPins::new(
        config::standard(),
        [
            pin8.into(),
            pin9.into(),
            pin10.into(),
            pin11.into(),
            pin12.into(),
            pin13.into(),
            pin14.into(),
            pin15.into(),
        ],
        pin6.into(),
        pin7.into(),
        pin20.into(),
        pin18.into(),
        pin19.into(),
    )
}
