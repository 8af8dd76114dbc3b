//! Engine configuration: which device ids we answer to, and how carefully
//! block transfers are checked.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::fmt;

use crate::constants::{DEVICE_ID_SHIFT, DUMP_LEN, NUM_DEVICE_IDS, OPCODE_MASK, STRICT_MAX_PULSES};

/// The set of ACSI device ids (0-7) this engine emulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceMask(u8);

impl DeviceMask {
    /// No devices - nothing will ever be captured.
    pub const NONE: Self = Self(0);

    /// Every device id.
    pub const ALL: Self = Self(0xff);

    /// Create from raw bits, bit n representing device id n.
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// A mask containing a single device id.  Ids above 7 give an empty
    /// mask.
    pub const fn single(id: u8) -> Self {
        if id < NUM_DEVICE_IDS {
            Self(1 << id)
        } else {
            Self::NONE
        }
    }

    /// Build a mask from a list of ids, ignoring any out of range.
    pub fn from_ids(ids: &[u8]) -> Self {
        ids.iter()
            .fold(Self::NONE, |mask, &id| Self(mask.0 | Self::single(id).0))
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub const fn contains(self, id: u8) -> bool {
        id < NUM_DEVICE_IDS && (self.0 >> id) & 1 == 1
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the device ids in the mask, lowest first.
    pub fn ids(self) -> impl Iterator<Item = u8> {
        (0..NUM_DEVICE_IDS).filter(move |&id| self.contains(id))
    }
}

impl fmt::Display for DeviceMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceMask {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "0x{:02x}", self.0);
    }
}

/// The first byte of an ACSI command, as captured from the bus.  The device
/// id is carried in the top 3 bits, the opcode in the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandByte(u8);

impl CommandByte {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// The addressed device id.
    #[inline(always)]
    pub const fn device(self) -> u8 {
        self.0 >> DEVICE_ID_SHIFT
    }

    pub const fn opcode(self) -> u8 {
        self.0 & OPCODE_MASK
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl From<CommandByte> for u8 {
    fn from(command: CommandByte) -> u8 {
        command.0
    }
}

impl fmt::Display for CommandByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x} (device {})", self.0, self.device())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CommandByte {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "0x{:02x} (device {})", self.0, self.device());
    }
}

/// How block transfers police the handshake timer.
///
/// If the host sends more ACK pulses than expected before the counter is
/// re-armed, the byte captured is not the one the host meant.  How many
/// pulses count as "more than expected" has varied between hardware
/// revisions, so it is configurable rather than fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Trust the counter.  Extra pulses go unnoticed.
    Off,

    /// Abort the block with [`AcsiError::Overrun`](super::AcsiError::Overrun)
    /// if more than `max_pulses` ACK edges land in one byte slot.
    Strict { max_pulses: u16 },
}

impl Validation {
    /// Strict validation with the usual threshold: exactly one pulse per byte.
    pub const STRICT: Self = Self::Strict {
        max_pulses: STRICT_MAX_PULSES,
    };

    /// Returns the offending pulse count if this many pulses in one slot is
    /// a fault.
    #[inline(always)]
    pub fn check(self, pulses: u16) -> Option<u16> {
        match self {
            Validation::Off => None,
            Validation::Strict { max_pulses } if pulses > max_pulses => Some(pulses),
            Validation::Strict { .. } => None,
        }
    }

    pub fn is_strict(self) -> bool {
        matches!(self, Validation::Strict { .. })
    }
}

impl Default for Validation {
    fn default() -> Self {
        if cfg!(feature = "careful-dma") {
            Self::STRICT
        } else {
            Self::Off
        }
    }
}

/// Runtime configuration of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcsiConfig {
    /// Overrun checking for block transfers.
    pub validation: Validation,

    /// When sending a block to the host, wait for ACK to be released after
    /// each byte before putting the next one on the bus.  This keeps data
    /// stable for the whole ACK pulse, which some DMA chips need.  Turning
    /// it off shaves the wait off every byte.
    pub hold_until_ack_release: bool,

    /// Bytes of each block transfer to include in trace output.
    pub dump_len: usize,
}

impl Default for AcsiConfig {
    fn default() -> Self {
        Self {
            validation: Validation::default(),
            hold_until_ack_release: true,
            dump_len: DUMP_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_membership() {
        let mask = DeviceMask::from_ids(&[0, 3, 7, 9]);
        assert_eq!(mask.bits(), 0b1000_1001);
        assert!(mask.contains(0));
        assert!(mask.contains(3));
        assert!(!mask.contains(1));
        assert!(!mask.contains(9));
        assert_eq!(mask.ids().collect::<Vec<_>>(), vec![0, 3, 7]);
    }

    #[test]
    fn out_of_range_single_is_empty() {
        assert!(DeviceMask::single(8).is_empty());
        assert_eq!(DeviceMask::single(2), DeviceMask::new(0b100));
    }

    #[test]
    fn command_byte_splits_device_and_opcode() {
        let command = CommandByte::new(0b1010_1000);
        assert_eq!(command.device(), 5);
        assert_eq!(command.opcode(), 0x08);
        assert_eq!(u8::from(command), 0xa8);
    }

    #[test]
    fn strict_validation_threshold() {
        assert_eq!(Validation::Off.check(7), None);
        assert_eq!(Validation::STRICT.check(1), None);
        assert_eq!(Validation::STRICT.check(2), Some(2));
        let lax = Validation::Strict { max_pulses: 3 };
        assert_eq!(lax.check(3), None);
        assert_eq!(lax.check(4), Some(4));
    }
}
