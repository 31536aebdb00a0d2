use crate::domain::Timestamp;
use serde::{Deserialize, Serialize};

/// One executed slice of a parent order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub time: Timestamp,
    pub asset: String,
    pub execution: String,
    /// Unsigned magnitude; direction comes from the parent execution's side.
    pub quantity: f64,
    pub price: f64,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}
