//! Output unit systems.
//!
//! Every unit is a pure rescaling of the dimensionless fraction; nothing is
//! recomputed per unit.

use crate::error::SlippageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Basis points: fraction × 10 000.
    Bps,
    /// Percent: fraction × 100.
    Pct,
    /// Currency: fraction × arrival price × total quantity.
    Usd,
}

impl Unit {
    pub const ALL: [Unit; 3] = [Unit::Bps, Unit::Pct, Unit::Usd];

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Bps => "bps",
            Unit::Pct => "pct",
            Unit::Usd => "usd",
        }
    }

    /// Rescale a dimensionless fraction.
    pub fn scale(self, fraction: f64, arrival_price: f64, total_quantity: f64) -> f64 {
        match self {
            Unit::Bps => fraction * 10_000.0,
            Unit::Pct => fraction * 100.0,
            Unit::Usd => fraction * arrival_price * total_quantity,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = SlippageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .into_iter()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| SlippageError::UnknownUnit(s.to_string()))
    }
}
