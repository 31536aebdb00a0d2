use serde::{Deserialize, Serialize};

/// Regression weight of one peer for one execution.
///
/// Weights come from a linear projection, not a convex combination: they may
/// be negative and need not sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerWeight {
    pub execution: String,
    pub peer: String,
    pub weight: f64,
}

/// Return volatility of one asset over the fill-spacing horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volatility {
    pub asset: String,
    pub volatility: f64,
}
