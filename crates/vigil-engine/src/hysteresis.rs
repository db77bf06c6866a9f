//! Per-instance candidate-to-committed state machine.
//!
//! A candidate differing from the committed status must persist for the
//! applicable delay (`up` when raising, `down` when recovering) before it
//! commits. An abandoned pending candidate leaves behind a re-arm record:
//! if the same candidate returns, its required wait is the previous one
//! scaled by the template multiplier and capped at `max`, so oscillation
//! becomes progressively harder to commit. The re-arm record decays once
//! the instance has been stable for the cap duration, restoring the
//! baseline delay. UNDEFINED candidates and the first status of a fresh
//! instance commit with zero delay.

use chrono::{DateTime, Utc};
use vigil_common::types::Status;
use vigil_template::delay::DelaySpec;

/// One committed status change, the only event the dispatcher observes.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: Status,
    pub to: Status,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Pending {
    candidate: Status,
    since: DateTime<Utc>,
    required_secs: u64,
}

#[derive(Debug, Clone)]
struct Rearm {
    candidate: Status,
    required_secs: u64,
    abandoned_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct DelayController {
    committed: Status,
    pending: Option<Pending>,
    rearm: Option<Rearm>,
}

impl Default for DelayController {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayController {
    pub fn new() -> Self {
        Self {
            committed: Status::Uninitialized,
            pending: None,
            rearm: None,
        }
    }

    pub fn committed(&self) -> Status {
        self.committed
    }

    /// Candidate waiting out its delay, with the required wait in seconds.
    pub fn pending(&self) -> Option<(Status, u64)> {
        self.pending
            .as_ref()
            .map(|p| (p.candidate, p.required_secs))
    }

    /// Feed this generation's candidate. Returns the transition if the
    /// candidate committed.
    pub fn observe(
        &mut self,
        candidate: Status,
        now: DateTime<Utc>,
        spec: &DelaySpec,
    ) -> Option<Transition> {
        if candidate == self.committed {
            // Reversal to the committed status: cancel the timer, but
            // remember the abandoned direction at its escalated wait.
            if let Some(pending) = self.pending.take() {
                self.rearm = Some(Rearm {
                    candidate: pending.candidate,
                    required_secs: escalate(pending.required_secs, spec),
                    abandoned_at: now,
                });
            } else if let Some(rearm) = &self.rearm {
                let stable_secs = (now - rearm.abandoned_at).num_seconds();
                if stable_secs >= spec.max_secs as i64 {
                    self.rearm = None;
                }
            }
            return None;
        }

        // Data-quality signals surface without damping, and a fresh
        // instance has no stable state to damp against.
        if candidate == Status::Undefined || self.committed == Status::Uninitialized {
            return Some(self.commit(candidate, now));
        }

        if let Some(pending) = self.pending.take() {
            if pending.candidate == candidate {
                let waited = (now - pending.since).num_seconds();
                if waited >= pending.required_secs as i64 {
                    return Some(self.commit(candidate, now));
                }
                self.pending = Some(pending);
                return None;
            }
            // Pending switched to a different non-committed candidate:
            // the abandoned direction re-arms escalated.
            self.rearm = Some(Rearm {
                candidate: pending.candidate,
                required_secs: escalate(pending.required_secs, spec),
                abandoned_at: now,
            });
        }

        let raising = candidate > self.committed;
        let mut required_secs = spec.baseline_secs(raising);
        if let Some(rearm) = &self.rearm {
            if rearm.candidate == candidate {
                required_secs = rearm.required_secs;
            }
        }

        if required_secs == 0 {
            return Some(self.commit(candidate, now));
        }

        self.pending = Some(Pending {
            candidate,
            since: now,
            required_secs,
        });
        None
    }

    /// Force the terminal removed state on teardown, regardless of any
    /// pending delay.
    pub fn retire(&mut self, now: DateTime<Utc>) -> Transition {
        self.commit(Status::Removed, now)
    }

    fn commit(&mut self, candidate: Status, now: DateTime<Utc>) -> Transition {
        let transition = Transition {
            from: self.committed,
            to: candidate,
            at: now,
        };
        self.committed = candidate;
        self.pending = None;
        self.rearm = None;
        transition
    }
}

/// Scale a wait by the multiplier, capped at `max` but never below the
/// wait already reached.
fn escalate(required_secs: u64, spec: &DelaySpec) -> u64 {
    let scaled = (required_secs as f64 * spec.multiplier).round() as u64;
    scaled.min(spec.max_secs.max(required_secs))
}
