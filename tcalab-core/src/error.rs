//! Fatal errors of a slippage calculation.
//!
//! Any of these aborts the whole call; no partial report is returned.
//! Graceful absences (no volume table, peer without a base price) are not
//! errors and never show up here.

use crate::domain::Timestamp;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlippageError {
    #[error("fill at time {time} references unknown execution '{execution}'")]
    UnknownExecution { execution: String, time: Timestamp },

    #[error("execution '{0}' appears more than once in metadata")]
    DuplicateExecution(String),

    #[error("execution '{execution}' has fills on several assets ('{first}', '{other}')")]
    MixedAssets {
        execution: String,
        first: String,
        other: String,
    },

    #[error("no quote for '{asset}' at time {time}")]
    MissingQuote { asset: String, time: Timestamp },

    #[error("asset '{0}' is not a label of the covariance matrix")]
    UnknownAsset(String),

    #[error("invalid covariance matrix: {0}")]
    InvalidCovariance(String),

    #[error("peer covariance sub-matrix for '{asset}' is singular (rcond = {rcond:e})")]
    SingularCovariance { asset: String, rcond: f64 },

    #[error("volatility of '{asset}' must be finite and non-negative, got {volatility}")]
    InvalidVolatility { asset: String, volatility: f64 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unknown unit '{0}': valid units are bps, pct, usd")]
    UnknownUnit(String),
}
