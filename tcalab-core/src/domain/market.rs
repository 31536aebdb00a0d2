use crate::domain::Timestamp;
use serde::{Deserialize, Serialize};

/// Top-of-book snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub time: Timestamp,
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}

/// Traded volume over `[time_from, time_to]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInterval {
    pub time_from: Timestamp,
    pub time_to: Timestamp,
    pub symbol: String,
    pub volume: f64,
}

impl VolumeInterval {
    /// Inclusive overlap with `[start, end]`.
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        self.time_from <= end && self.time_to >= start
    }

    /// `time_from + time_to`, i.e. twice the midpoint, kept exact in i128.
    pub fn doubled_midpoint(&self) -> i128 {
        self.time_from as i128 + self.time_to as i128
    }
}
