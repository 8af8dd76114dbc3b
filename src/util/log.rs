//! Logging macros for pico-acsi.
//!
//! Firmware builds log with defmt over RTT.  The bus engine is also built and
//! tested on the host, where defmt has no transport, so these macros forward
//! to the `log` facade whenever the `defmt` feature is off.  Modules import
//! them the same way they would import defmt's:
//!
//! ```ignore
//! use crate::util::log::{debug, trace};
//! ```
//!
//! Format strings must therefore stick to the subset both understand: `{}`
//! and simple hints such as `{:02x}`.  Types logged with `{}` implement both
//! `core::fmt::Display` and (with the `defmt` feature) `defmt::Format`.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#![allow(unused_macros, unused_imports)]

macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::trace!($($arg)*);
        #[cfg(not(feature = "defmt"))]
        log::trace!($($arg)*);
    }};
}
pub(crate) use trace;

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::debug!($($arg)*);
        #[cfg(not(feature = "defmt"))]
        log::debug!($($arg)*);
    }};
}
pub(crate) use debug;

macro_rules! info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::info!($($arg)*);
        #[cfg(not(feature = "defmt"))]
        log::info!($($arg)*);
    }};
}
pub(crate) use info;

// Named with a trailing underscore, as `warn` on its own clashes with the
// built-in lint attribute when re-exported.
macro_rules! warn_ {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::warn!($($arg)*);
        #[cfg(not(feature = "defmt"))]
        log::warn!($($arg)*);
    }};
}
pub(crate) use warn_ as warn;

macro_rules! error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::error!($($arg)*);
        #[cfg(not(feature = "defmt"))]
        log::error!($($arg)*);
    }};
}
pub(crate) use error;
