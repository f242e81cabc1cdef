//! State machine definition
//!
//! Every session operation first consults the current state: only a ready
//! session has a known revision to encode requests for.

use huskylens_protocol::HardwareRevision;

use super::events::SessionEvent;

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// No probe sent yet
    #[default]
    Unprobed,
    /// Probe in flight
    Probing,
    /// Sensor answered; revision cached for the session
    Ready(HardwareRevision),
    /// Last probe went unanswered
    Failed,
}

impl SessionState {
    /// Revision of a ready session
    pub fn revision(&self) -> Option<HardwareRevision> {
        match self {
            SessionState::Ready(revision) => Some(*revision),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready(_))
    }

    /// Check if an operation must probe before it can run
    pub fn needs_probe(&self) -> bool {
        matches!(self, SessionState::Unprobed | SessionState::Failed)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: SessionEvent) -> Self {
        use SessionEvent::*;
        use SessionState::*;

        match (self, event) {
            // Any state may (re-)probe
            (_, ProbeStarted) => Probing,

            (Probing, ProbeAnswered(revision)) => Ready(revision),
            (Probing, ProbeFailed) => Failed,

            // Outcomes without a probe in flight are ignored
            _ => self,
        }
    }
}
