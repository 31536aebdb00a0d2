//! Market VWAP estimator.
//!
//! For a fill at `t`, the running market VWAP covers every volume interval of
//! the traded asset overlapping `[window_start, t]`, where `window_start` is
//! the execution's first fill time. Each interval is priced at the quote mid
//! nearest its midpoint.

use crate::domain::{Fill, VolumeInterval};
use crate::market::MarketData;

pub struct MarketVwapEstimator<'a> {
    market: &'a MarketData,
}

impl<'a> MarketVwapEstimator<'a> {
    pub fn new(market: &'a MarketData) -> Self {
        Self { market }
    }

    /// Running market VWAP for each fill, aligned with `fills`.
    ///
    /// Returns `None` when no volume table was supplied. A fill whose window
    /// holds no interval, or only zero volume, gets `None`.
    pub fn running(&self, asset: &str, fills: &[&Fill]) -> Option<Vec<Option<f64>>> {
        let intervals = self.market.volume_intervals(asset)?;
        let Some(window_start) = fills.iter().map(|f| f.time).min() else {
            return Some(Vec::new());
        };

        // Intervals ending before the window never overlap; the rest enter
        // the window in time_from order as fill time advances.
        let mut candidates: Vec<&VolumeInterval> =
            intervals.iter().filter(|iv| iv.time_to >= window_start).collect();
        candidates.sort_by_key(|iv| iv.time_from);

        let mut order: Vec<usize> = (0..fills.len()).collect();
        order.sort_by_key(|&i| fills[i].time);

        let mut out = vec![None; fills.len()];
        let mut next = 0;
        let mut volume = 0.0;
        let mut weighted = 0.0;
        for i in order {
            let t = fills[i].time;
            while next < candidates.len() && candidates[next].time_from <= t {
                let iv = candidates[next];
                if let Some(quote) = self.market.nearest_quote(asset, iv.doubled_midpoint()) {
                    volume += iv.volume;
                    weighted += iv.volume * quote.mid();
                }
                next += 1;
            }
            out[i] = if volume != 0.0 { Some(weighted / volume) } else { None };
        }
        Some(out)
    }
}

/// Execution-level market VWAP: the last defined running value in fill order.
pub fn execution_market_vwap(running: &[Option<f64>]) -> Option<f64> {
    running.iter().rev().find_map(|v| *v)
}
