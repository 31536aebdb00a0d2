//! Tabular entry point: validate frames, run the slippage engine, build
//! output frames.

use std::collections::HashMap;

use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use tcalab_core::{calculate, CalcInputs, SlippageError, SlippageReport, Unit};

use crate::config::{ConfigError, RunnerConfig};
use crate::schema::{check_time_columns, validate, ColumnMapping, SchemaError, Table};
use crate::tables;

/// Errors from a tabular run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("calculation error: {0}")]
    Calculation(#[from] SlippageError),
    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),
}

/// Borrowed input frames of one run.
#[derive(Debug, Clone, Copy)]
pub struct InputFrames<'a> {
    pub fills: &'a DataFrame,
    pub metadata: &'a DataFrame,
    pub quotes: &'a DataFrame,
    pub volume: Option<&'a DataFrame>,
    /// Explicit per-execution peer weights.
    pub peers: Option<&'a DataFrame>,
    /// Square asset covariance; used to derive peers when `peers` is absent.
    pub covariance: Option<&'a DataFrame>,
    pub volatilities: Option<&'a DataFrame>,
}

impl<'a> InputFrames<'a> {
    pub fn new(fills: &'a DataFrame, metadata: &'a DataFrame, quotes: &'a DataFrame) -> Self {
        Self {
            fills,
            metadata,
            quotes,
            volume: None,
            peers: None,
            covariance: None,
            volatilities: None,
        }
    }

    pub fn with_volume(mut self, df: &'a DataFrame) -> Self {
        self.volume = Some(df);
        self
    }

    pub fn with_peers(mut self, df: &'a DataFrame) -> Self {
        self.peers = Some(df);
        self
    }

    pub fn with_covariance(mut self, df: &'a DataFrame) -> Self {
        self.covariance = Some(df);
        self
    }

    pub fn with_volatilities(mut self, df: &'a DataFrame) -> Self {
        self.volatilities = Some(df);
        self
    }

    /// Every present frame checked against its column contract.
    fn validate(&self, mapping: &ColumnMapping) -> Result<(), SchemaError> {
        validate(self.fills, Table::Fills, mapping)?;
        validate(self.metadata, Table::Metadata, mapping)?;
        validate(self.quotes, Table::Quotes, mapping)?;
        let optional = [
            (self.volume, Table::Volume),
            (self.peers, Table::Peers),
            (self.volatilities, Table::Volatilities),
        ];
        let mut timed = vec![(self.fills, Table::Fills), (self.quotes, Table::Quotes)];
        for (df, table) in optional {
            if let Some(df) = df {
                validate(df, table, mapping)?;
                timed.push((df, table));
            }
        }
        check_time_columns(&timed, mapping)
    }

    fn to_inputs(&self, mapping: &ColumnMapping) -> Result<CalcInputs, RunError> {
        let mut inputs = CalcInputs::new(
            tables::read_fills(self.fills, mapping)?,
            tables::read_metadata(self.metadata, mapping)?,
            tables::read_quotes(self.quotes, mapping)?,
        );
        if let Some(df) = self.volume {
            inputs = inputs.with_volume(tables::read_volume(df, mapping)?);
        }
        match (self.peers, self.covariance) {
            (Some(peers), covariance) => {
                if covariance.is_some() {
                    warn!("both peer weights and covariance supplied; using peer weights");
                }
                inputs = inputs.with_peer_weights(tables::read_peer_weights(peers, mapping)?);
            }
            (None, Some(cov)) => inputs = inputs.with_covariance(tables::read_covariance(cov)?),
            (None, None) => {}
        }
        if let Some(df) = self.volatilities {
            inputs = inputs.with_volatilities(tables::read_volatilities(df, mapping)?);
        }
        Ok(inputs)
    }
}

/// Output frames of one run.
#[derive(Debug, Clone)]
pub struct SlippageTables {
    pub fills: DataFrame,
    summaries: HashMap<Unit, DataFrame>,
    pub peer_weights: Option<DataFrame>,
    pub volatilities: Option<DataFrame>,
    /// The typed report the frames were built from.
    pub report: SlippageReport,
}

impl SlippageTables {
    /// Summary frame for a unit key (`bps`, `pct` or `usd`).
    pub fn summary(&self, key: &str) -> Result<&DataFrame, RunError> {
        let unit: Unit = key.parse()?;
        Ok(self.summary_in(unit))
    }

    /// Every unit is built by [`run_slippage`].
    pub fn summary_in(&self, unit: Unit) -> &DataFrame {
        &self.summaries[&unit]
    }
}

/// Run the slippage calculation over tabular inputs.
///
/// All frames are schema-checked before any computation starts.
pub fn run_slippage(frames: &InputFrames<'_>, config: &RunnerConfig) -> Result<SlippageTables, RunError> {
    frames.validate(&config.columns)?;
    let inputs = frames.to_inputs(&config.columns)?;
    let report = calculate(&inputs, &config.calc)?;
    debug!(
        fills = report.fills.len(),
        executions = report.summary.len(),
        "building output frames"
    );
    build_tables(report)
}

fn build_tables(report: SlippageReport) -> Result<SlippageTables, RunError> {
    let fills = tables::fill_frame(&report)?;
    let mut summaries = HashMap::with_capacity(Unit::ALL.len());
    for unit in Unit::ALL {
        let rows = report.summary_in(unit);
        summaries.insert(unit, tables::summary_frame(&rows, report.has_peers(), report.has_volume)?);
    }
    let peer_weights = report
        .peer_weights
        .as_deref()
        .map(tables::peer_weights_frame)
        .transpose()?;
    let volatilities = report
        .volatilities
        .as_deref()
        .map(tables::volatilities_frame)
        .transpose()?;

    Ok(SlippageTables {
        fills,
        summaries,
        peer_weights,
        volatilities,
        report,
    })
}
