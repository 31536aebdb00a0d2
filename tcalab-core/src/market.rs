//! Read-only market data access.
//!
//! Quotes are indexed per asset in a `BTreeMap` keyed by time, which gives
//! exact point-in-time lookups and ordered neighbours for nearest-time
//! lookups without rescanning. Exact lookups never interpolate.

use crate::domain::{Quote, Timestamp, VolumeInterval};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

#[derive(Debug, Default)]
pub struct MarketData {
    quotes: HashMap<String, BTreeMap<Timestamp, Quote>>,
    volume: Option<HashMap<String, Vec<VolumeInterval>>>,
}

impl MarketData {
    /// Index quotes (and optionally volume intervals).
    ///
    /// When several snapshots share an (asset, time) key the first one in
    /// input order is kept. Volume intervals keep input order per asset.
    pub fn new(quotes: &[Quote], volume: Option<&[VolumeInterval]>) -> Self {
        let mut index: HashMap<String, BTreeMap<Timestamp, Quote>> = HashMap::new();
        let mut duplicates = 0usize;
        for quote in quotes {
            let by_time = index.entry(quote.symbol.clone()).or_default();
            if by_time.contains_key(&quote.time) {
                duplicates += 1;
                continue;
            }
            by_time.insert(quote.time, quote.clone());
        }
        if duplicates > 0 {
            warn!(duplicates, "dropped quotes with duplicate (symbol, time); first kept");
        }

        let volume = volume.map(|intervals| {
            let mut by_asset: HashMap<String, Vec<VolumeInterval>> = HashMap::new();
            for iv in intervals {
                by_asset.entry(iv.symbol.clone()).or_default().push(iv.clone());
            }
            by_asset
        });

        Self { quotes: index, volume }
    }

    /// Quote at exactly `time`.
    pub fn quote_at(&self, asset: &str, time: Timestamp) -> Option<&Quote> {
        self.quotes.get(asset)?.get(&time)
    }

    /// Mid-price at exactly `time`.
    pub fn mid_at(&self, asset: &str, time: Timestamp) -> Option<f64> {
        self.quote_at(asset, time).map(Quote::mid)
    }

    /// Quote whose time is nearest to `doubled_target / 2`.
    ///
    /// The target is passed doubled so half-integer midpoints stay exact.
    /// On a tie the earlier quote wins.
    pub fn nearest_quote(&self, asset: &str, doubled_target: i128) -> Option<&Quote> {
        let by_time = self.quotes.get(asset)?;
        // 2t <= target  <=>  t <= floor(target / 2)
        let floor = doubled_target.div_euclid(2);
        let split = floor.clamp(Timestamp::MIN as i128, Timestamp::MAX as i128) as Timestamp;

        let below = by_time.range(..=split).next_back().map(|(_, q)| q);
        let above = if split == Timestamp::MAX {
            None
        } else {
            by_time.range(split + 1..).next().map(|(_, q)| q)
        };

        match (below, above) {
            (Some(b), Some(a)) => {
                let db = doubled_target - 2 * b.time as i128;
                let da = 2 * a.time as i128 - doubled_target;
                if db <= da {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (Some(b), None) => Some(b),
            (None, a) => a,
        }
    }

    pub fn has_volume(&self) -> bool {
        self.volume.is_some()
    }

    /// Volume intervals for `asset`, or `None` when no volume table was given.
    pub fn volume_intervals(&self, asset: &str) -> Option<&[VolumeInterval]> {
        let by_asset = self.volume.as_ref()?;
        Some(by_asset.get(asset).map(Vec::as_slice).unwrap_or(&[]))
    }
}
