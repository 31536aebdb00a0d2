//! Per-execution aggregation and sign convention.
//!
//! All slippage values here are dimensionless fractions of arrival notional.
//! With `side_sign = -1` for buys and `+1` for sells, a negative number is
//! always a cost.

use crate::counterfactual::{Counterfactual, CounterfactualEngine, PeerObservation};
use crate::domain::{Execution, Fill, Quote, Side};
use crate::slippage::spread::spread_cross;
use crate::slippage::units::Unit;
use crate::vwap::{execution_market_vwap, MarketVwapEstimator};
use serde::{Deserialize, Serialize};

/// Refined benchmark attached to one fill.
#[derive(Debug, Clone, PartialEq)]
pub struct FillCounterfactual {
    pub log_return: f64,
    pub price: f64,
    /// `(peer, observation)` in the execution's peer order.
    pub peers: Vec<(String, PeerObservation)>,
}

/// One fill joined with its execution, touch and benchmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct FillRow {
    pub fill: Fill,
    pub side: Side,
    pub arrival_price: f64,
    pub bid: f64,
    pub ask: f64,
    pub spread_cross: f64,
    /// Set exactly when the calculation had a peer table.
    pub counterfactual: Option<FillCounterfactual>,
    /// Running market VWAP; `None` when undefined or without volume data.
    pub market_vwap: Option<f64>,
}

/// Fill average against the execution-window market VWAP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VwapComparison {
    pub fill_vwap: f64,
    pub market_vwap: f64,
    pub slippage: f64,
}

/// Summary of one execution.
///
/// Slippage fields hold raw fractions while `unit` is `None`;
/// [`SummaryRow::in_unit`] produces rescaled copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub execution: String,
    pub asset: String,
    pub side: Side,
    pub arrival_price: f64,
    pub total_quantity: f64,
    pub fill_count: usize,
    pub classical_slippage: f64,
    pub refined_slippage: Option<f64>,
    pub spread_cross_pct: f64,
    pub vwap: Option<VwapComparison>,
    /// `None` for raw fractions.
    pub unit: Option<Unit>,
}

impl SummaryRow {
    /// Copy with slippage metrics expressed in `unit`.
    ///
    /// Prices, quantities and the spread-crossing proportion are unit-free
    /// and copied unchanged.
    pub fn in_unit(&self, unit: Unit) -> SummaryRow {
        debug_assert!(self.unit.is_none(), "rows are rescaled from raw fractions only");
        let scale = |x: f64| unit.scale(x, self.arrival_price, self.total_quantity);
        SummaryRow {
            classical_slippage: scale(self.classical_slippage),
            refined_slippage: self.refined_slippage.map(scale),
            vwap: self.vwap.map(|v| VwapComparison {
                slippage: scale(v.slippage),
                ..v
            }),
            unit: Some(unit),
            ..self.clone()
        }
    }
}

/// Shared, read-only context for aggregating executions.
pub(crate) struct Aggregator<'a> {
    pub counterfactual: Option<CounterfactualEngine<'a>>,
    pub vwap: MarketVwapEstimator<'a>,
}

impl Aggregator<'_> {
    /// Aggregate one execution. `fills` are sorted by time and all on `asset`;
    /// `touches` holds the exact-time quote of each fill.
    pub fn execution(
        &self,
        execution: &Execution,
        asset: &str,
        peers: &[(String, f64)],
        fills: &[&Fill],
        touches: &[&Quote],
    ) -> (Vec<FillRow>, SummaryRow) {
        let side = execution.side;
        let sign = side.sign();
        let arrival = execution.arrival_price;

        let counterfactuals: Option<Vec<Counterfactual>> = self
            .counterfactual
            .as_ref()
            .map(|engine| engine.price_fills(&execution.name, arrival, peers, fills));
        let running_vwap = self.vwap.running(asset, fills);

        let mut rows = Vec::with_capacity(fills.len());
        let mut total_qty = 0.0;
        let mut classical_cost = 0.0;
        let mut refined_cost = 0.0;
        let mut crossed = 0.0;
        let mut fill_notional = 0.0;

        for (i, (fill, touch)) in fills.iter().zip(touches).enumerate() {
            let (bid, ask) = (touch.bid, touch.ask);
            let cross = spread_cross(side, fill.price, bid, ask);

            total_qty += fill.quantity;
            classical_cost += (fill.price - arrival) * fill.quantity;
            crossed += cross * fill.quantity;
            fill_notional += fill.notional();

            let counterfactual = counterfactuals.as_ref().map(|cfs| {
                let cf = &cfs[i];
                refined_cost += (fill.price - cf.price) * fill.quantity;
                FillCounterfactual {
                    log_return: cf.log_return,
                    price: cf.price,
                    peers: peers
                        .iter()
                        .map(|(name, _)| name.clone())
                        .zip(cf.peers.iter().copied())
                        .collect(),
                }
            });

            rows.push(FillRow {
                fill: (*fill).clone(),
                side,
                arrival_price: arrival,
                bid,
                ask,
                spread_cross: cross,
                counterfactual,
                market_vwap: running_vwap.as_ref().and_then(|v| v[i]),
            });
        }

        let notional = total_qty * arrival;
        let vwap = running_vwap
            .as_deref()
            .and_then(execution_market_vwap)
            .map(|market_vwap| {
                let fill_vwap = fill_notional / total_qty;
                VwapComparison {
                    fill_vwap,
                    market_vwap,
                    slippage: sign * (fill_vwap - market_vwap) / arrival,
                }
            });

        let summary = SummaryRow {
            execution: execution.name.clone(),
            asset: asset.to_string(),
            side,
            arrival_price: arrival,
            total_quantity: total_qty,
            fill_count: fills.len(),
            classical_slippage: sign * classical_cost / notional,
            refined_slippage: counterfactuals.map(|_| sign * refined_cost / notional),
            spread_cross_pct: crossed / total_qty,
            vwap,
            unit: None,
        };

        (rows, summary)
    }
}
