//! Calculation entry point.
//!
//! `calculate` is a pure function from input tables and config to a
//! [`SlippageReport`]. Joins are exact-key lookups in deterministic order and
//! executions are aggregated in parallel with rayon; each worker reads shared
//! inputs and owns its output partition, and partitions are concatenated in
//! metadata order, so results are bit-identical across runs.

use crate::config::CalcConfig;
use crate::counterfactual::CounterfactualEngine;
use crate::domain::{Execution, Fill, PeerWeight, Quote, VolumeInterval, Volatility};
use crate::error::SlippageError;
use crate::market::MarketData;
use crate::peers::{CovarianceMatrix, PeerTable};
use crate::slippage::aggregate::{Aggregator, FillRow, SummaryRow};
use crate::slippage::units::Unit;
use crate::vwap::MarketVwapEstimator;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Where peer weights come from.
#[derive(Debug, Clone)]
pub enum PeerSource {
    /// One row per (execution, peer), supplied by the caller.
    Weights(Vec<PeerWeight>),
    /// Derived per traded asset from a covariance matrix.
    Covariance(CovarianceMatrix),
}

/// Materialized input tables of one calculation.
#[derive(Debug, Clone)]
pub struct CalcInputs {
    pub fills: Vec<Fill>,
    pub executions: Vec<Execution>,
    pub quotes: Vec<Quote>,
    pub volume: Option<Vec<VolumeInterval>>,
    pub peers: Option<PeerSource>,
    pub volatilities: Option<Vec<Volatility>>,
}

impl CalcInputs {
    pub fn new(fills: Vec<Fill>, executions: Vec<Execution>, quotes: Vec<Quote>) -> Self {
        Self {
            fills,
            executions,
            quotes,
            volume: None,
            peers: None,
            volatilities: None,
        }
    }

    pub fn with_volume(mut self, volume: Vec<VolumeInterval>) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_peer_weights(mut self, weights: Vec<PeerWeight>) -> Self {
        self.peers = Some(PeerSource::Weights(weights));
        self
    }

    pub fn with_covariance(mut self, cov: CovarianceMatrix) -> Self {
        self.peers = Some(PeerSource::Covariance(cov));
        self
    }

    pub fn with_volatilities(mut self, volatilities: Vec<Volatility>) -> Self {
        self.volatilities = Some(volatilities);
        self
    }
}

/// Everything one calculation produces. Owned by the caller.
#[derive(Debug, Clone)]
pub struct SlippageReport {
    /// Fill-level rows, grouped by execution in metadata order, time-sorted.
    pub fills: Vec<FillRow>,
    /// One raw-fraction row per execution with fills, in metadata order.
    pub summary: Vec<SummaryRow>,
    /// Resolved peer table; `None` without a peer source.
    pub peer_weights: Option<Vec<PeerWeight>>,
    /// Distinct peers across executions, in first-appearance order.
    pub peer_names: Vec<String>,
    /// Volatility table used for truncation.
    pub volatilities: Option<Vec<Volatility>>,
    pub has_volume: bool,
    pub config_fingerprint: String,
}

impl SlippageReport {
    pub fn has_peers(&self) -> bool {
        self.peer_weights.is_some()
    }

    /// Summary rows rescaled to `unit`.
    pub fn summary_in(&self, unit: Unit) -> Vec<SummaryRow> {
        self.summary.iter().map(|row| row.in_unit(unit)).collect()
    }

    /// Summary rows for a unit key (`bps`, `pct` or `usd`).
    pub fn summary_for(&self, key: &str) -> Result<Vec<SummaryRow>, SlippageError> {
        Ok(self.summary_in(key.parse()?))
    }
}

/// One execution with its fills joined to their exact-time quotes.
struct Joined<'a> {
    execution: &'a Execution,
    asset: &'a str,
    fills: Vec<&'a Fill>,
    touches: Vec<&'a Quote>,
}

/// Compute fill-level and summary slippage for every execution.
pub fn calculate(inputs: &CalcInputs, config: &CalcConfig) -> Result<SlippageReport, SlippageError> {
    config.validate()?;
    info!(
        fills = inputs.fills.len(),
        executions = inputs.executions.len(),
        quotes = inputs.quotes.len(),
        volume = inputs.volume.is_some(),
        peers = inputs.peers.is_some(),
        "starting slippage calculation"
    );

    let market = MarketData::new(&inputs.quotes, inputs.volume.as_deref());
    let joined = join_fills(inputs, &market)?;

    let peer_table = match &inputs.peers {
        None => None,
        Some(PeerSource::Weights(rows)) => Some(PeerTable::from_weights(rows)),
        Some(PeerSource::Covariance(cov)) => Some(PeerTable::derive(
            cov,
            joined.iter().map(|j| (j.execution.name.as_str(), j.asset)),
            config.num_peers,
        )?),
    };

    let volatilities = match (&inputs.volatilities, &inputs.peers) {
        (Some(vols), _) => Some(vols.clone()),
        (None, Some(PeerSource::Covariance(cov))) => Some(cov.volatilities()),
        (None, _) => None,
    };
    let vol_map = volatility_map(volatilities.as_deref().unwrap_or_default())?;

    let empty = PeerTable::default();
    let aggregator = Aggregator {
        counterfactual: peer_table
            .as_ref()
            .map(|_| CounterfactualEngine::new(&market, &vol_map, config.peer_return_truncation)),
        vwap: MarketVwapEstimator::new(&market),
    };
    let table = peer_table.as_ref().unwrap_or(&empty);

    let partitions: Vec<(Vec<FillRow>, SummaryRow)> = joined
        .par_iter()
        .map(|j| {
            let peers = table.peers_of(&j.execution.name);
            debug!(
                execution = j.execution.name.as_str(),
                fills = j.fills.len(),
                peers = peers.len(),
                "aggregating execution"
            );
            aggregator.execution(j.execution, j.asset, peers, &j.fills, &j.touches)
        })
        .collect();

    let mut fills = Vec::with_capacity(inputs.fills.len());
    let mut summary = Vec::with_capacity(partitions.len());
    for (rows, row) in partitions {
        fills.extend(rows);
        summary.push(row);
    }

    let executions = joined.iter().map(|j| j.execution.name.as_str());
    let peer_names = peer_table
        .as_ref()
        .map(|t| distinct_peers(t, executions.clone()))
        .unwrap_or_default();
    let peer_weights = peer_table.as_ref().map(|t| t.to_rows(executions));

    info!(
        executions = summary.len(),
        fills = fills.len(),
        peers = peer_names.len(),
        "slippage calculation complete"
    );

    Ok(SlippageReport {
        fills,
        summary,
        peer_weights,
        peer_names,
        volatilities,
        has_volume: market.has_volume(),
        config_fingerprint: config.fingerprint(),
    })
}

/// Group fills under their executions and attach exact-time quotes.
///
/// Runs sequentially so the first offending row is always the one reported.
fn join_fills<'a>(
    inputs: &'a CalcInputs,
    market: &'a MarketData,
) -> Result<Vec<Joined<'a>>, SlippageError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(inputs.executions.len());
    for (i, execution) in inputs.executions.iter().enumerate() {
        if index.insert(execution.name.as_str(), i).is_some() {
            return Err(SlippageError::DuplicateExecution(execution.name.clone()));
        }
    }

    let mut grouped: Vec<Vec<&Fill>> = vec![Vec::new(); inputs.executions.len()];
    for fill in &inputs.fills {
        let i = *index
            .get(fill.execution.as_str())
            .ok_or_else(|| SlippageError::UnknownExecution {
                execution: fill.execution.clone(),
                time: fill.time,
            })?;
        grouped[i].push(fill);
    }

    let mut joined = Vec::with_capacity(grouped.len());
    for (execution, mut fills) in inputs.executions.iter().zip(grouped) {
        let Some(&first) = fills.first() else {
            warn!(execution = execution.name.as_str(), "execution has no fills; skipped");
            continue;
        };
        let asset = first.asset.as_str();
        if let Some(other) = fills.iter().find(|f| f.asset != asset) {
            return Err(SlippageError::MixedAssets {
                execution: execution.name.clone(),
                first: asset.to_string(),
                other: other.asset.clone(),
            });
        }

        fills.sort_by_key(|f| f.time);
        let touches = fills
            .iter()
            .map(|f| {
                market.quote_at(asset, f.time).ok_or_else(|| SlippageError::MissingQuote {
                    asset: asset.to_string(),
                    time: f.time,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        joined.push(Joined {
            execution,
            asset,
            fills,
            touches,
        });
    }
    Ok(joined)
}

/// Truncation bounds are `±τ·vol`, so every volatility must be a finite,
/// non-negative number.
fn volatility_map(rows: &[Volatility]) -> Result<HashMap<String, f64>, SlippageError> {
    rows.iter()
        .map(|v| {
            if v.volatility.is_finite() && v.volatility >= 0.0 {
                Ok((v.asset.clone(), v.volatility))
            } else {
                Err(SlippageError::InvalidVolatility {
                    asset: v.asset.clone(),
                    volatility: v.volatility,
                })
            }
        })
        .collect()
}

fn distinct_peers<'a>(table: &PeerTable, executions: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for execution in executions {
        for (peer, _) in table.peers_of(execution) {
            if seen.insert(peer.as_str()) {
                names.push(peer.clone());
            }
        }
    }
    names
}
