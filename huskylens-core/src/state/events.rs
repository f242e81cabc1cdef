//! Events that trigger session state transitions

use huskylens_protocol::HardwareRevision;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEvent {
    /// A probe request is about to be sent
    ProbeStarted,
    /// The sensor acknowledged the probe
    ProbeAnswered(HardwareRevision),
    /// No acknowledgment within the probe budget
    ProbeFailed,
}

impl SessionEvent {
    /// Check if this event ends a probe
    pub fn is_probe_outcome(&self) -> bool {
        matches!(self, SessionEvent::ProbeAnswered(_) | SessionEvent::ProbeFailed)
    }
}
