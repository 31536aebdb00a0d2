//! Parent orders and their trade direction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trade direction of a parent order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Sign applied to raw price differences so that a positive slippage
    /// number always means the fills beat the benchmark.
    ///
    /// A buy paying more than the benchmark is a cost (-1); a sell receiving
    /// less than the benchmark is a cost (+1 times a negative difference).
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => -1.0,
            Side::Sell => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid side '{0}': expected 'buy' or 'sell'")]
pub struct SideParseError(pub String);

impl FromStr for Side {
    type Err = SideParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(SideParseError(s.to_string())),
        }
    }
}

/// Parent order metadata. Owns every fill carrying the same `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub name: String,
    pub side: Side,
    /// Informational only; slippage uses the sum of actual fill quantities.
    pub desired_quantity: f64,
    /// Benchmark price at decision time.
    pub arrival_price: f64,
}
