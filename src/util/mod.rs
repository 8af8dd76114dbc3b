//! Various utils for pico-acsi.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#[cfg(feature = "rp")]
pub(crate) mod built;
pub(crate) mod dump;
pub(crate) mod log;
