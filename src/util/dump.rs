//! Bounded hex dumps of transfer data, for verbose logging.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::fmt;

/// Formats at most `limit` bytes of a buffer as space separated hex, with a
/// trailing marker if anything was cut off.
pub struct HexDump<'a> {
    bytes: &'a [u8],
    limit: usize,
}

impl<'a> HexDump<'a> {
    pub fn new(bytes: &'a [u8], limit: usize) -> Self {
        Self { bytes, limit }
    }

    fn shown(&self) -> &'a [u8] {
        &self.bytes[..self.bytes.len().min(self.limit)]
    }

    fn truncated(&self) -> bool {
        self.bytes.len() > self.limit
    }
}

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ii, byte) in self.shown().iter().enumerate() {
            if ii > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        if self.truncated() {
            write!(f, " ... ({} bytes)", self.bytes.len())?;
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HexDump<'_> {
    fn format(&self, f: defmt::Formatter) {
        for byte in self.shown() {
            defmt::write!(f, "{:02x} ", byte);
        }
        if self.truncated() {
            defmt::write!(f, "... ({} bytes)", self.bytes.len());
        }
    }
}
