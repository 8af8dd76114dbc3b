//! Interrupt masking for the core running the ACSI engine.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use cortex_m::register::primask;

use crate::hw::JitterSource;

/// Masks all interrupts on the current core via PRIMASK.
///
/// This only affects the core it is used on - the watchdog runner, the
/// embassy time driver and everything else on core 0 carry on regardless.
#[derive(Clone, Copy, Default)]
pub struct InterruptMask;

impl JitterSource for InterruptMask {
    #[inline(always)]
    fn suspend(&self) -> bool {
        let enabled = primask::read().is_active();
        cortex_m::interrupt::disable();
        enabled
    }

    #[inline(always)]
    fn resume(&self) {
        // Safety: only called by Quiet, and only if interrupts were enabled
        // when it was created, so no critical section is broken.
        unsafe { cortex_m::interrupt::enable() }
    }
}
