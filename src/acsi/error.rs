//! Errors reported by the ACSI engine.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::fmt;

use crate::types::Direction;

/// Transfer integrity faults.
///
/// Only faults the engine can detect without losing data are reported here.
/// A host that stops handshaking altogether is not an error at this level:
/// the operation simply never returns, and the watchdog resets the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcsiError {
    /// More ACK pulses than allowed arrived in a single byte slot of a block
    /// transfer, so the byte at `offset` cannot be trusted.  Only reported
    /// with strict validation.
    Overrun {
        direction: Direction,
        offset: usize,
        pulses: u16,
    },
}

impl fmt::Display for AcsiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcsiError::Overrun {
                direction,
                offset,
                pulses,
            } => write!(
                f,
                "DMA {} overrun at byte {}: {} ACK pulses",
                direction, offset, pulses
            ),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AcsiError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            AcsiError::Overrun {
                direction,
                offset,
                pulses,
            } => defmt::write!(
                f,
                "DMA {} overrun at byte {}: {} ACK pulses",
                direction,
                offset,
                pulses
            ),
        }
    }
}
