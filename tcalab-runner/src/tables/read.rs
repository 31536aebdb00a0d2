//! Typed readers over validated input frames.
//!
//! Every reader resolves canonical names through the [`ColumnMapping`],
//! casts to the engine's representation and rejects nulls with the offending
//! row. Frames are expected to have passed [`crate::schema::validate`].

use crate::runner::RunError;
use crate::schema::{ColumnKind, ColumnMapping, SchemaError, Table};
use polars::prelude::*;
use tcalab_core::domain::{Execution, Fill, PeerWeight, Quote, Side, VolumeInterval, Volatility};
use tcalab_core::peers::CovarianceMatrix;

struct Reader<'a> {
    df: &'a DataFrame,
    table: Table,
    mapping: &'a ColumnMapping,
}

impl<'a> Reader<'a> {
    fn new(df: &'a DataFrame, table: Table, mapping: &'a ColumnMapping) -> Self {
        Self { df, table, mapping }
    }

    fn column(&self, canonical: &'a str) -> Result<(&'a str, &'a Column), SchemaError> {
        let name = self.mapping.resolve(canonical);
        let column = self.df.column(name).map_err(|_| SchemaError::MissingColumn {
            table: self.table,
            column: name.to_string(),
        })?;
        Ok((name, column))
    }

    fn mismatch(&self, name: &str, kind: ColumnKind, column: &Column) -> SchemaError {
        SchemaError::TypeMismatch {
            table: self.table,
            column: name.to_string(),
            expected: kind.describe(),
            actual: column.dtype().clone(),
        }
    }

    fn non_null<T>(
        &self,
        name: &str,
        values: impl Iterator<Item = Option<T>>,
    ) -> Result<Vec<T>, SchemaError> {
        values
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| SchemaError::NullValue {
                    table: self.table,
                    column: name.to_string(),
                    row,
                })
            })
            .collect()
    }

    fn times(&self, canonical: &'a str) -> Result<Vec<i64>, SchemaError> {
        let (name, column) = self.column(canonical)?;
        // Datetimes are brought to microseconds first so every table's
        // timestamps share one unit.
        let normalized = match column.dtype() {
            DataType::Datetime(_, tz) => column
                .cast(&DataType::Datetime(TimeUnit::Microseconds, tz.clone()))
                .map_err(|_| self.mismatch(name, ColumnKind::Time, column))?,
            _ => column.clone(),
        };
        let cast = normalized
            .cast(&DataType::Int64)
            .map_err(|_| self.mismatch(name, ColumnKind::Time, column))?;
        let values = cast.i64().map_err(|_| self.mismatch(name, ColumnKind::Time, column))?;
        self.non_null(name, values.into_iter())
    }

    fn numbers(&self, canonical: &'a str) -> Result<Vec<f64>, SchemaError> {
        let (name, column) = self.column(canonical)?;
        let cast = column
            .cast(&DataType::Float64)
            .map_err(|_| self.mismatch(name, ColumnKind::Number, column))?;
        let values = cast.f64().map_err(|_| self.mismatch(name, ColumnKind::Number, column))?;
        self.non_null(name, values.into_iter())
    }

    fn texts(&self, canonical: &'a str) -> Result<Vec<String>, SchemaError> {
        let (name, column) = self.column(canonical)?;
        let values = column.str().map_err(|_| self.mismatch(name, ColumnKind::Text, column))?;
        self.non_null(name, values.into_iter().map(|v| v.map(str::to_string)))
    }
}

pub fn read_fills(df: &DataFrame, mapping: &ColumnMapping) -> Result<Vec<Fill>, SchemaError> {
    let r = Reader::new(df, Table::Fills, mapping);
    let times = r.times("time")?;
    let quantities = r.numbers("quantity")?;
    let prices = r.numbers("price")?;
    let executions = r.texts("execution_name")?;
    let assets = r.texts("asset")?;

    Ok(times
        .into_iter()
        .zip(quantities)
        .zip(prices)
        .zip(executions)
        .zip(assets)
        .map(|((((time, quantity), price), execution), asset)| Fill {
            time,
            asset,
            execution,
            quantity,
            price,
        })
        .collect())
}

pub fn read_metadata(df: &DataFrame, mapping: &ColumnMapping) -> Result<Vec<Execution>, SchemaError> {
    let r = Reader::new(df, Table::Metadata, mapping);
    let names = r.texts("execution_name")?;
    let sides = r.texts("side")?;
    let desired = r.numbers("desired_quantity")?;
    let arrivals = r.numbers("arrival_price")?;

    names
        .into_iter()
        .zip(sides)
        .zip(desired)
        .zip(arrivals)
        .enumerate()
        .map(|(row, (((name, side), desired_quantity), arrival_price))| {
            let side: Side = side
                .parse()
                .map_err(|_| SchemaError::InvalidSide { row, value: side.clone() })?;
            Ok(Execution {
                name,
                side,
                desired_quantity,
                arrival_price,
            })
        })
        .collect()
}

pub fn read_quotes(df: &DataFrame, mapping: &ColumnMapping) -> Result<Vec<Quote>, SchemaError> {
    let r = Reader::new(df, Table::Quotes, mapping);
    let times = r.times("time")?;
    let symbols = r.texts("symbol")?;
    let bids = r.numbers("bid_price")?;
    let asks = r.numbers("ask_price")?;

    Ok(times
        .into_iter()
        .zip(symbols)
        .zip(bids)
        .zip(asks)
        .map(|(((time, symbol), bid), ask)| Quote { time, symbol, bid, ask })
        .collect())
}

pub fn read_volume(df: &DataFrame, mapping: &ColumnMapping) -> Result<Vec<VolumeInterval>, SchemaError> {
    let r = Reader::new(df, Table::Volume, mapping);
    let from = r.times("time_from")?;
    let to = r.times("time_to")?;
    let symbols = r.texts("symbol")?;
    let volumes = r.numbers("volume")?;

    Ok(from
        .into_iter()
        .zip(to)
        .zip(symbols)
        .zip(volumes)
        .map(|(((time_from, time_to), symbol), volume)| VolumeInterval {
            time_from,
            time_to,
            symbol,
            volume,
        })
        .collect())
}

pub fn read_peer_weights(df: &DataFrame, mapping: &ColumnMapping) -> Result<Vec<PeerWeight>, SchemaError> {
    let r = Reader::new(df, Table::Peers, mapping);
    let executions = r.texts("execution_name")?;
    let peers = r.texts("peer")?;
    let weights = r.numbers("weight")?;

    Ok(executions
        .into_iter()
        .zip(peers)
        .zip(weights)
        .map(|((execution, peer), weight)| PeerWeight { execution, peer, weight })
        .collect())
}

pub fn read_volatilities(df: &DataFrame, mapping: &ColumnMapping) -> Result<Vec<Volatility>, SchemaError> {
    let r = Reader::new(df, Table::Volatilities, mapping);
    let assets = r.texts("asset")?;
    let vols = r.numbers("volatility")?;

    Ok(assets
        .into_iter()
        .zip(vols)
        .map(|(asset, volatility)| Volatility { asset, volatility })
        .collect())
}

/// Read a square covariance frame: one column per asset label, rows in the
/// same label order.
pub fn read_covariance(df: &DataFrame) -> Result<CovarianceMatrix, RunError> {
    let (rows, cols) = df.shape();
    if rows != cols {
        return Err(SchemaError::NonSquareCovariance { rows, cols }.into());
    }

    let mut labels = Vec::with_capacity(cols);
    let mut by_column = Vec::with_capacity(cols);
    for column in df.get_columns() {
        let name = column.name().to_string();
        let cast = column.cast(&DataType::Float64)?;
        let values: Vec<f64> = cast
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| SchemaError::NullValue {
                    table: Table::Covariance,
                    column: name.clone(),
                    row,
                })
            })
            .collect::<Result<_, _>>()?;
        labels.push(name);
        by_column.push(values);
    }

    let matrix: Vec<Vec<f64>> = (0..rows)
        .map(|i| by_column.iter().map(|col| col[i]).collect())
        .collect();
    Ok(CovarianceMatrix::new(labels, matrix)?)
}
