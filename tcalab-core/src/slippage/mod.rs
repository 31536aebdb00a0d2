//! Slippage aggregator: spread crossing, per-execution summaries, units and
//! the calculation entry point.

pub mod aggregate;
pub mod engine;
pub mod spread;
pub mod units;

pub use aggregate::{FillCounterfactual, FillRow, SummaryRow, VwapComparison};
pub use engine::{calculate, CalcInputs, PeerSource, SlippageReport};
pub use spread::spread_cross;
pub use units::Unit;
