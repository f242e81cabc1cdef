//! Session configuration
//!
//! Defaults reproduce the settle delays and retry counts the sensor
//! firmware is known to tolerate.

use huskylens_protocol::{
    FrameBudget, HardwareRevision, DEFAULT_MAX_IDLE_POLLS, DEFAULT_MAX_SKIPPED,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Probe retry policy for one revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KnockPolicy {
    /// Probe attempts before giving up
    pub attempts: u8,
    /// Pause between attempts (ms)
    pub retry_delay_ms: u32,
}

impl KnockPolicy {
    pub const fn new(attempts: u8, retry_delay_ms: u32) -> Self {
        Self {
            attempts,
            retry_delay_ms,
        }
    }
}

/// Session timing and retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Pause after every write (ms)
    pub write_settle_ms: u32,
    /// Pause before the first V2 result frame (ms)
    pub first_result_delay_ms: u32,
    /// Pause between V2 result frames (ms)
    pub between_results_delay_ms: u32,
    /// Pause after an empty read (µs)
    pub poll_interval_us: u32,
    /// Consecutive empty reads tolerated per frame
    pub max_idle_polls: u16,
    /// Garbage bytes skipped while searching for a frame prefix
    pub max_skipped: u16,
    /// Extra attempts for a failed exchange
    pub exchange_retries: u8,
    /// Probe policy on V1
    pub knock_v1: KnockPolicy,
    /// Probe policy on V2
    pub knock_v2: KnockPolicy,
    /// Log raw frame bytes
    pub trace: bool,
}

impl SessionConfig {
    pub const DEFAULT: Self = Self {
        write_settle_ms: 5,
        first_result_delay_ms: 50,
        between_results_delay_ms: 10,
        poll_interval_us: 1_000,
        max_idle_polls: DEFAULT_MAX_IDLE_POLLS,
        max_skipped: DEFAULT_MAX_SKIPPED,
        exchange_retries: 1,
        knock_v1: KnockPolicy::new(10, 10),
        knock_v2: KnockPolicy::new(5, 50),
        trace: false,
    };

    /// Probe policy for `revision`
    pub fn knock_policy(&self, revision: HardwareRevision) -> KnockPolicy {
        match revision {
            HardwareRevision::V1 => self.knock_v1,
            HardwareRevision::V2 => self.knock_v2,
        }
    }

    /// Read budget for a single frame
    pub fn frame_budget(&self) -> FrameBudget {
        FrameBudget {
            max_idle_polls: self.max_idle_polls,
            max_skipped: self.max_skipped,
        }
    }

    pub const fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub const fn with_poll_interval_us(mut self, us: u32) -> Self {
        self.poll_interval_us = us;
        self
    }

    pub const fn with_max_idle_polls(mut self, polls: u16) -> Self {
        self.max_idle_polls = polls;
        self
    }

    pub const fn with_exchange_retries(mut self, retries: u8) -> Self {
        self.exchange_retries = retries;
        self
    }

    /// Zero every fixed delay
    pub const fn without_delays(mut self) -> Self {
        self.write_settle_ms = 0;
        self.first_result_delay_ms = 0;
        self.between_results_delay_ms = 0;
        self.knock_v1.retry_delay_ms = 0;
        self.knock_v2.retry_delay_ms = 0;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
