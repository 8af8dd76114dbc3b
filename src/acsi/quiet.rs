//! Scoped suspension of jitter-inducing interrupts.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use crate::hw::JitterSource;

/// Keeps a [`JitterSource`] suspended for as long as it lives.
///
/// On drop the source is resumed only if it was running when the guard was
/// created, so guards nest: an inner guard dropping inside an outer one
/// leaves the source suspended.
#[must_use = "the source is resumed as soon as the guard is dropped"]
pub struct Quiet<J: JitterSource> {
    source: J,
    resume: bool,
}

impl<J: JitterSource> Quiet<J> {
    #[inline(always)]
    pub fn new(source: J) -> Self {
        let resume = source.suspend();
        Self { source, resume }
    }
}

impl<J: JitterSource> Drop for Quiet<J> {
    #[inline(always)]
    fn drop(&mut self) {
        if self.resume {
            self.source.resume();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Sim;

    #[test]
    fn nested_guards_resume_once() {
        let sim = Sim::new();
        let jitter = sim.jitter();
        {
            let _outer = Quiet::new(jitter);
            {
                let _inner = Quiet::new(jitter);
                assert!(!sim.interrupts_running());
            }
            assert!(!sim.interrupts_running());
        }
        assert!(sim.interrupts_running());
        assert_eq!(sim.stats().suspensions, 2);
    }

    #[test]
    fn already_suspended_source_stays_suspended() {
        let sim = Sim::new();
        let jitter = sim.jitter();
        assert!(jitter.suspend());
        drop(Quiet::new(jitter));
        assert!(!sim.interrupts_running());
    }
}
