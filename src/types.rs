//! This module contains general types used across the ACSI engine.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::fmt;

/// Direction of a data transfer on the ACSI bus, from the host computer's
/// point of view (as the ST's DMA chip sees it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// In is from the device (us) to the host.
    In,

    /// Out is from the host to the device (us).
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => f.write_str("In"),
            Direction::Out => f.write_str("Out"),
        }
    }
}

// Implement Format so Direction can be formatted by defmt.
#[cfg(feature = "defmt")]
impl defmt::Format for Direction {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Direction::In => defmt::write!(f, "In"),
            Direction::Out => defmt::write!(f, "Out"),
        }
    }
}
