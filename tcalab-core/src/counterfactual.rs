//! Counterfactual price engine.
//!
//! For every fill, the arrival price is advanced by the peer-implied return
//! since the execution's base time (its first fill):
//!
//! ```text
//! r_peer = ln(mid_peer(t) / mid_peer(t0))      clamped to ±τ·vol_peer
//! r_cf   = Σ w_peer · r_peer
//! p_cf   = p0 · exp(r_cf)
//! ```
//!
//! A peer with no base quote is dropped for the whole execution; a peer
//! without a quote at a given fill time contributes zero to that fill only.
//! Remaining weights are not renormalized in either case.

use crate::domain::{Fill, Timestamp};
use crate::market::MarketData;
use std::collections::HashMap;
use tracing::warn;

/// What one peer looked like at one fill.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeerObservation {
    pub mid: Option<f64>,
    /// Log-return since base time, after truncation.
    pub log_return: Option<f64>,
}

/// Counterfactual benchmark for one fill.
#[derive(Debug, Clone, PartialEq)]
pub struct Counterfactual {
    pub log_return: f64,
    pub price: f64,
    /// One entry per peer, in the execution's peer order.
    pub peers: Vec<PeerObservation>,
}

pub struct CounterfactualEngine<'a> {
    market: &'a MarketData,
    volatilities: &'a HashMap<String, f64>,
    truncation: f64,
}

impl<'a> CounterfactualEngine<'a> {
    pub fn new(
        market: &'a MarketData,
        volatilities: &'a HashMap<String, f64>,
        truncation: f64,
    ) -> Self {
        Self {
            market,
            volatilities,
            truncation,
        }
    }

    /// Clamp bound for `peer`, if it is truncated at all.
    fn bound(&self, peer: &str) -> Option<f64> {
        if !self.truncation.is_finite() {
            return None;
        }
        self.volatilities.get(peer).map(|vol| self.truncation * vol)
    }

    /// Counterfactual prices for the fills of one execution.
    ///
    /// `fills` must belong to a single execution; the base time is the
    /// earliest fill time among them.
    pub fn price_fills(
        &self,
        execution: &str,
        arrival_price: f64,
        peers: &[(String, f64)],
        fills: &[&Fill],
    ) -> Vec<Counterfactual> {
        let Some(base_time) = fills.iter().map(|f| f.time).min() else {
            return Vec::new();
        };
        let base_mids = self.base_mids(execution, peers, base_time);

        fills
            .iter()
            .map(|fill| {
                let mut log_return = 0.0;
                let observations = peers
                    .iter()
                    .zip(&base_mids)
                    .map(|((peer, weight), base)| {
                        let Some(base) = base else {
                            return PeerObservation::default();
                        };
                        let Some(mid) = self.market.mid_at(peer, fill.time) else {
                            return PeerObservation::default();
                        };
                        let mut r = (mid / base).ln();
                        if let Some(bound) = self.bound(peer) {
                            r = r.clamp(-bound, bound);
                        }
                        log_return += weight * r;
                        PeerObservation {
                            mid: Some(mid),
                            log_return: Some(r),
                        }
                    })
                    .collect();

                Counterfactual {
                    log_return,
                    price: arrival_price * log_return.exp(),
                    peers: observations,
                }
            })
            .collect()
    }

    fn base_mids(
        &self,
        execution: &str,
        peers: &[(String, f64)],
        base_time: Timestamp,
    ) -> Vec<Option<f64>> {
        peers
            .iter()
            .map(|(peer, _)| {
                let mid = self.market.mid_at(peer, base_time);
                if mid.is_none() {
                    warn!(execution, peer = peer.as_str(), base_time, "peer has no base quote; ignored");
                }
                mid
            })
            .collect()
    }
}
