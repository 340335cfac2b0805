//! Re-entrancy guards for the two engine phases.
//!
//! Each phase (`Fetching`, `Calculating`) has one slot. Entering a phase
//! while it is already active fails instead of queueing. The slot is freed
//! when the returned [`PhaseGuard`] drops, which covers early returns,
//! `?` propagation, and panics alike.
//!
//! ```text
//! Idle ──try_enter──▶ Active ──drop(guard)──▶ Idle
//!          │
//!          └─ already Active ─▶ None
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Fetching,
    Calculating,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Calculating => "calculating",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-slot occupancy flag for one phase.
#[derive(Debug, Clone)]
pub struct PhaseSlot {
    phase: Phase,
    active: Arc<AtomicBool>,
}

impl PhaseSlot {
    #[must_use]
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Occupy the slot, or `None` if the phase is already running.
    #[must_use]
    pub fn try_enter(&self) -> Option<PhaseGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        tracing::trace!(phase = %self.phase, "phase entered");
        Some(PhaseGuard {
            phase: self.phase,
            active: Arc::clone(&self.active),
        })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Proof that the holder owns a phase slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct PhaseGuard {
    phase: Phase,
    active: Arc<AtomicBool>,
}

impl PhaseGuard {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        tracing::trace!(phase = %self.phase, "phase released");
    }
}
