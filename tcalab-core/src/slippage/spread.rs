//! Spread-crossing proportion.

use crate::domain::Side;

/// Value assigned when the book is locked or crossed.
pub const DEGENERATE_SPREAD_CROSS: f64 = 0.5;

/// Where a fill priced inside the prevailing spread.
///
/// 1.0 means the favorable touch (bid for a buy, ask for a sell),
/// 0.0 the unfavorable one. Prices outside the book are clamped.
pub fn spread_cross(side: Side, price: f64, bid: f64, ask: f64) -> f64 {
    let spread = ask - bid;
    if spread <= 0.0 {
        return DEGENERATE_SPREAD_CROSS;
    }
    let raw = match side {
        Side::Buy => (ask - price) / spread,
        Side::Sell => (price - bid) / spread,
    };
    raw.clamp(0.0, 1.0)
}
