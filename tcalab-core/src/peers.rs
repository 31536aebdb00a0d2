//! Peer weight resolver.
//!
//! Peer weights are the coefficients of the linear projection of the traded
//! asset's return onto its peers' returns under a joint covariance model:
//!
//! ```text
//! w = Σ[a,P] · Σ[P,P]⁻¹
//! ```
//!
//! Peers are chosen by absolute correlation with the traded asset. A singular
//! peer block is a fatal error; nothing is silently regularized.

use crate::config::PeerCount;
use crate::domain::{PeerWeight, Volatility};
use crate::error::SlippageError;
use nalgebra::{DMatrix, RowDVector, SVD};
use std::collections::HashMap;
use tracing::debug;

/// Reciprocal condition number below which `Σ[P,P]` counts as singular.
pub const SINGULAR_RCOND: f64 = 1e-12;

/// Symmetric covariance matrix over a labelled asset set.
#[derive(Debug, Clone)]
pub struct CovarianceMatrix {
    labels: Vec<String>,
    values: DMatrix<f64>,
}

impl CovarianceMatrix {
    /// Build from row-major data. Rejects non-square, mislabelled or
    /// asymmetric input.
    pub fn new(labels: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, SlippageError> {
        let n = labels.len();
        if rows.len() != n || rows.iter().any(|r| r.len() != n) {
            return Err(SlippageError::InvalidCovariance(format!(
                "expected a {n}x{n} matrix to match {n} labels"
            )));
        }
        let values = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (values[(i, j)], values[(j, i)]);
                let scale = a.abs().max(b.abs()).max(1.0);
                if (a - b).abs() > 1e-9 * scale {
                    return Err(SlippageError::InvalidCovariance(format!(
                        "not symmetric at ({}, {})",
                        labels[i], labels[j]
                    )));
                }
            }
        }
        Ok(Self { labels, values })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn index_of(&self, asset: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == asset)
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    /// Correlation between label indices `i` and `j`.
    ///
    /// Returns 0.0 when either variance is zero.
    pub fn correlation(&self, i: usize, j: usize) -> f64 {
        let denom = (self.get(i, i) * self.get(j, j)).sqrt();
        if denom > 0.0 && denom.is_finite() {
            self.get(i, j) / denom
        } else {
            0.0
        }
    }

    /// `sqrt(diag Σ)` for every label, in label order.
    pub fn volatilities(&self) -> Vec<Volatility> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, asset)| Volatility {
                asset: asset.clone(),
                volatility: self.get(i, i).max(0.0).sqrt(),
            })
            .collect()
    }
}

/// Pick the peers of `asset` (label indices, in rank order).
///
/// With `PeerCount::All`, or a count covering every other label, all other
/// labels are returned in label order. Otherwise the top `k` by absolute
/// correlation; the sort is stable so ties keep label order.
pub fn select_peers(
    cov: &CovarianceMatrix,
    asset: &str,
    count: PeerCount,
) -> Result<Vec<usize>, SlippageError> {
    let a = cov
        .index_of(asset)
        .ok_or_else(|| SlippageError::UnknownAsset(asset.to_string()))?;
    let others: Vec<usize> = (0..cov.labels.len()).filter(|&p| p != a).collect();

    let k = match count {
        PeerCount::Top(k) if k < others.len() => k,
        _ => return Ok(others),
    };

    let mut ranked: Vec<(usize, f64)> = others
        .into_iter()
        .map(|p| (p, cov.correlation(a, p).abs()))
        .collect();
    ranked.sort_by(|x, y| y.1.total_cmp(&x.1));
    ranked.truncate(k);
    Ok(ranked.into_iter().map(|(p, _)| p).collect())
}

/// Regression weights of `asset` on its selected peers, as `(peer, weight)`.
pub fn resolve_peer_weights(
    cov: &CovarianceMatrix,
    asset: &str,
    count: PeerCount,
) -> Result<Vec<(String, f64)>, SlippageError> {
    let peers = select_peers(cov, asset, count)?;
    if peers.is_empty() {
        return Ok(Vec::new());
    }
    let a = cov
        .index_of(asset)
        .ok_or_else(|| SlippageError::UnknownAsset(asset.to_string()))?;

    let n = peers.len();
    let block = DMatrix::from_fn(n, n, |i, j| cov.get(peers[i], peers[j]));
    let cross = RowDVector::from_iterator(n, peers.iter().map(|&p| cov.get(a, p)));

    let rcond = reciprocal_condition(&block);
    if !(rcond >= SINGULAR_RCOND) {
        return Err(SlippageError::SingularCovariance {
            asset: asset.to_string(),
            rcond,
        });
    }
    let inverse = block.try_inverse().ok_or_else(|| SlippageError::SingularCovariance {
        asset: asset.to_string(),
        rcond,
    })?;

    let weights = cross * inverse;
    debug!(asset, peers = n, rcond, "resolved peer weights");

    Ok(peers
        .iter()
        .zip(weights.iter())
        .map(|(&p, &w)| (cov.labels[p].clone(), w))
        .collect())
}

/// Smallest over largest singular value; 0.0 for an all-zero matrix.
fn reciprocal_condition(m: &DMatrix<f64>) -> f64 {
    let svd = SVD::new(m.clone(), false, false);
    let max = svd.singular_values.max();
    let min = svd.singular_values.min();
    if max > 0.0 {
        min / max
    } else {
        0.0
    }
}

/// Ordered peer weights per execution.
#[derive(Debug, Clone, Default)]
pub struct PeerTable {
    by_execution: HashMap<String, Vec<(String, f64)>>,
}

impl PeerTable {
    /// Group user-supplied rows by execution, keeping row order per execution.
    pub fn from_weights(rows: &[PeerWeight]) -> Self {
        let mut by_execution: HashMap<String, Vec<(String, f64)>> = HashMap::new();
        for row in rows {
            by_execution
                .entry(row.execution.clone())
                .or_default()
                .push((row.peer.clone(), row.weight));
        }
        Self { by_execution }
    }

    /// Derive weights for each `(execution, asset)` pair from a covariance
    /// matrix. Weights are resolved once per asset and shared by every
    /// execution on it.
    pub fn derive<'a, I>(
        cov: &CovarianceMatrix,
        executions: I,
        count: PeerCount,
    ) -> Result<Self, SlippageError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut per_asset: HashMap<&str, Vec<(String, f64)>> = HashMap::new();
        let mut by_execution = HashMap::new();
        for (execution, asset) in executions {
            if !per_asset.contains_key(asset) {
                per_asset.insert(asset, resolve_peer_weights(cov, asset, count)?);
            }
            by_execution.insert(execution.to_string(), per_asset[asset].clone());
        }
        Ok(Self { by_execution })
    }

    /// Peers of `execution`; empty when it has none.
    pub fn peers_of(&self, execution: &str) -> &[(String, f64)] {
        self.by_execution.get(execution).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Flatten back to rows, executions in the given order.
    pub fn to_rows<'a>(&self, executions: impl IntoIterator<Item = &'a str>) -> Vec<PeerWeight> {
        executions
            .into_iter()
            .flat_map(|execution| {
                self.peers_of(execution).iter().map(move |(peer, weight)| PeerWeight {
                    execution: execution.to_string(),
                    peer: peer.clone(),
                    weight: *weight,
                })
            })
            .collect()
    }
}
