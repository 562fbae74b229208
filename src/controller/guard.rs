//! Reconfiguration guard.
//!
//! A three-state machine shared between the controller task and the refresh
//! workers:
//!
//! ```text
//!   Idle ──begin_reconfigure──▶ Reconfiguring ──ticket dropped──▶ Idle
//!   Idle ──begin_sleep────────▶ Asleep ──wake──▶ Reconfiguring ──▶ Idle
//! ```
//!
//! Holding a [`ReconfigureTicket`] is the only way to be in a non-idle state,
//! and dropping it is the only way back, so every exit path of a rebuild
//! releases the guard exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Reconfiguring = 1,
    Asleep = 2,
}

impl Phase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Phase::Reconfiguring,
            2 => Phase::Asleep,
            _ => Phase::Idle,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReconfigureGuard {
    phase: Arc<AtomicU8>,
}

impl ReconfigureGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// True while a rebuild runs or the system sleeps. Refreshes skip their
    /// work when this is set.
    pub fn is_reconfiguring(&self) -> bool {
        self.phase() != Phase::Idle
    }

    /// Idle -> Reconfiguring. `None` means another reconfiguration (or a
    /// sleep) already holds the guard and the caller must back off.
    pub fn begin_reconfigure(&self) -> Option<ReconfigureTicket> {
        self.transition(Phase::Idle, Phase::Reconfiguring)
    }

    /// Idle -> Asleep. The ticket is held for the whole sleep.
    pub fn begin_sleep(&self) -> Option<ReconfigureTicket> {
        self.transition(Phase::Idle, Phase::Asleep)
    }

    fn transition(&self, from: Phase, to: Phase) -> Option<ReconfigureTicket> {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ReconfigureTicket {
                guard: self.clone(),
            })
    }
}

/// Proof that the holder owns the guard. Dropping it ends the
/// reconfiguration.
#[derive(Debug)]
#[must_use = "dropping the ticket releases the guard immediately"]
pub struct ReconfigureTicket {
    guard: ReconfigureGuard,
}

impl ReconfigureTicket {
    pub fn phase(&self) -> Phase {
        self.guard.phase()
    }

    /// Asleep -> Reconfiguring, keeping the guard held across the switch.
    pub fn wake(self) -> Self {
        self.guard
            .phase
            .store(Phase::Reconfiguring as u8, Ordering::Release);
        self
    }
}

impl Drop for ReconfigureTicket {
    fn drop(&mut self) {
        self.guard.phase.store(Phase::Idle as u8, Ordering::Release);
    }
}
