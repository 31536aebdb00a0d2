//! TCA Lab Runner — tabular front over `tcalab-core`.
//!
//! This crate provides:
//! - The column-name contract for every input table, with aliases
//! - DataFrame readers into the core's typed rows
//! - A single `run_slippage()` entry point producing output DataFrames
//! - TOML configuration for calculation knobs and column aliases

pub mod config;
pub mod runner;
pub mod schema;
pub mod tables;

pub use config::{ConfigError, RunnerConfig};
pub use runner::{run_slippage, InputFrames, RunError, SlippageTables};
pub use schema::{ColumnMapping, SchemaError, Table};
