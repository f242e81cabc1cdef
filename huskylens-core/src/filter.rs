//! Post-decode record filtering
//!
//! Filters run over fully decoded records, so a frame that only partly
//! matches never yields a partly decoded record.

use huskylens_protocol::{Algorithm, QueryScope};

use crate::record::{DetectionRecord, Detections};

/// Record selection criteria; the default matches everything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecordFilter {
    pub algorithm: Option<Algorithm>,
    pub id: Option<i16>,
    pub learned_only: bool,
}

impl RecordFilter {
    pub const fn new() -> Self {
        Self {
            algorithm: None,
            id: None,
            learned_only: false,
        }
    }

    /// Keep records from this algorithm only
    pub const fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Keep records with this identifier only
    pub const fn id(mut self, id: i16) -> Self {
        self.id = Some(id);
        self
    }

    /// Keep learned records only (identifier > 0)
    pub const fn learned(mut self) -> Self {
        self.learned_only = true;
        self
    }

    pub fn matches(&self, record: &DetectionRecord) -> bool {
        self.algorithm.map_or(true, |a| record.algorithm() == a)
            && self.id.map_or(true, |id| record.id() == id)
            && (!self.learned_only || record.learned())
    }

    /// Matching records in their original order
    pub fn apply(&self, detections: &Detections) -> Detections {
        let mut kept = Detections::new();
        for record in detections.iter().filter(|r| self.matches(r)) {
            // Cannot overflow: kept is a subset of detections
            let _ = kept.push(record.clone());
        }
        kept
    }

    /// Narrowest query the sensor can serve for this filter
    ///
    /// An identifier wins over learned-only; the remaining criteria are
    /// still applied after decode.
    pub fn scope(&self) -> QueryScope {
        match (self.id, self.learned_only) {
            (Some(id), _) => QueryScope::ById(id),
            (None, true) => QueryScope::Learned,
            (None, false) => QueryScope::All,
        }
    }
}
