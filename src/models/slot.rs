//! Time slots and Early/Mid/Late classification.
//!
//! A slot is an importable unit of ice time: start, end, and the resource
//! (rink) it occupies. Slots are immutable once supplied and the engine
//! orders them by start time. The E/M/L category of a slot is a pure
//! function of its start time against two configurable cutoffs and is
//! never stored on the slot itself.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Time-of-day band a slot falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmlCategory {
    Early,
    Mid,
    Late,
}

/// The two cutoffs splitting the evening into Early / Mid / Late.
///
/// A start strictly before `early_end` is Early, before `mid_end` is Mid,
/// anything at or after `mid_end` is Late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmlCutoffs {
    pub early_end: NaiveTime,
    pub mid_end: NaiveTime,
}

impl Default for EmlCutoffs {
    fn default() -> Self {
        Self {
            early_end: NaiveTime::from_hms_opt(22, 1, 0).unwrap(),
            mid_end: NaiveTime::from_hms_opt(22, 31, 0).unwrap(),
        }
    }
}

impl EmlCutoffs {
    pub fn new(early_end: NaiveTime, mid_end: NaiveTime) -> Self {
        Self { early_end, mid_end }
    }

    /// Classifies a start time into its E/M/L band.
    pub fn classify(&self, start: NaiveDateTime) -> EmlCategory {
        let t = start.time();
        if t < self.early_end {
            EmlCategory::Early
        } else if t < self.mid_end {
            EmlCategory::Mid
        } else {
            EmlCategory::Late
        }
    }

    /// Whether a start time lands in the Late band.
    #[inline]
    pub fn is_late(&self, start: NaiveDateTime) -> bool {
        self.classify(start) == EmlCategory::Late
    }
}

/// An available time slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Caller-supplied identity, unique across the import.
    pub id: String,
    /// Start timestamp (local time).
    pub start: NaiveDateTime,
    /// End timestamp (local time).
    pub end: NaiveDateTime,
    /// Resource label, e.g. the rink name.
    pub resource: String,
}

impl Slot {
    pub fn new(
        id: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            resource: resource.into(),
        }
    }

    /// Calendar date of the slot.
    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// E/M/L band of this slot under the given cutoffs.
    #[inline]
    pub fn eml(&self, cutoffs: &EmlCutoffs) -> EmlCategory {
        cutoffs.classify(self.start)
    }
}
