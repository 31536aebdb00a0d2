//! TCA Lab Core — slippage engine, domain types, market data access.
//!
//! This crate measures execution quality against three benchmarks:
//! - Classical slippage against the fixed arrival price
//! - Refined slippage against a peer-adjusted counterfactual price
//! - Slippage against the market VWAP over the execution window
//!
//! plus a per-fill spread-crossing proportion. Everything is a pure batch
//! computation over materialized tables; see [`slippage::calculate`].

pub mod config;
pub mod counterfactual;
pub mod domain;
pub mod error;
pub mod market;
pub mod peers;
pub mod slippage;
pub mod vwap;

pub use config::{CalcConfig, PeerCount};
pub use error::SlippageError;
pub use slippage::{calculate, CalcInputs, PeerSource, SlippageReport, Unit};
