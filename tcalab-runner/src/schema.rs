//! Column-name contract for every input table.
//!
//! Each table has a fixed set of canonical column names. A [`ColumnMapping`]
//! lets callers supply frames with other names; it is an explicit value passed
//! into the run, never process-wide state.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The input tables of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Fills,
    Metadata,
    Quotes,
    Volume,
    Peers,
    /// Square asset covariance; columns are the asset labels.
    Covariance,
    Volatilities,
}

/// What a column must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Integer or datetime; read through the physical i64 value.
    Time,
    /// Any integer or float type; read as f64.
    Number,
    Text,
}

impl ColumnKind {
    pub fn accepts(self, dtype: &DataType) -> bool {
        match self {
            ColumnKind::Time => matches!(
                dtype,
                DataType::Int32 | DataType::Int64 | DataType::UInt32 | DataType::UInt64 | DataType::Datetime(_, _)
            ),
            ColumnKind::Number => matches!(
                dtype,
                DataType::Int32
                    | DataType::Int64
                    | DataType::UInt32
                    | DataType::UInt64
                    | DataType::Float32
                    | DataType::Float64
            ),
            ColumnKind::Text => matches!(dtype, DataType::String),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ColumnKind::Time => "integer or datetime",
            ColumnKind::Number => "numeric",
            ColumnKind::Text => "string",
        }
    }
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Fills => "fills",
            Table::Metadata => "metadata",
            Table::Quotes => "quotes",
            Table::Volume => "volume",
            Table::Peers => "peers",
            Table::Covariance => "covariance",
            Table::Volatilities => "volatilities",
        }
    }

    /// Canonical required columns and their kinds. Covariance columns are
    /// the asset labels themselves, so that table has no fixed contract.
    pub fn columns(self) -> &'static [(&'static str, ColumnKind)] {
        use ColumnKind::*;
        match self {
            Table::Fills => &[
                ("time", Time),
                ("quantity", Number),
                ("price", Number),
                ("execution_name", Text),
                ("asset", Text),
            ],
            Table::Metadata => &[
                ("execution_name", Text),
                ("side", Text),
                ("desired_quantity", Number),
                ("arrival_price", Number),
            ],
            Table::Quotes => &[
                ("time", Time),
                ("symbol", Text),
                ("bid_price", Number),
                ("ask_price", Number),
            ],
            Table::Volume => &[
                ("time_from", Time),
                ("time_to", Time),
                ("symbol", Text),
                ("volume", Number),
            ],
            Table::Peers => &[
                ("execution_name", Text),
                ("peer", Text),
                ("weight", Number),
            ],
            Table::Covariance => &[],
            Table::Volatilities => &[("asset", Text), ("volatility", Number)],
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical column name → actual column name in the caller's frames.
///
/// Names without an entry are looked up as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(HashMap<String, String>);

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, canonical: &str, actual: &str) -> Self {
        self.0.insert(canonical.to_string(), actual.to_string());
        self
    }

    pub fn resolve<'a>(&'a self, canonical: &'a str) -> &'a str {
        self.0.get(canonical).map(String::as_str).unwrap_or(canonical)
    }
}

/// Check that `df` carries every required column of `table` with an
/// acceptable type.
pub fn validate(df: &DataFrame, table: Table, mapping: &ColumnMapping) -> Result<(), SchemaError> {
    for &(canonical, kind) in table.columns() {
        let actual = mapping.resolve(canonical);
        let column = df.column(actual).map_err(|_| SchemaError::MissingColumn {
            table,
            column: actual.to_string(),
        })?;
        if !kind.accepts(column.dtype()) {
            return Err(SchemaError::TypeMismatch {
                table,
                column: actual.to_string(),
                expected: kind.describe(),
                actual: column.dtype().clone(),
            });
        }
    }
    Ok(())
}

/// Require every time column across `frames` to be a datetime, or every one
/// to be an integer.
///
/// Datetimes are normalized to one unit when read; bare integers carry no
/// unit, so the two kinds cannot be compared.
pub fn check_time_columns(frames: &[(&DataFrame, Table)], mapping: &ColumnMapping) -> Result<(), SchemaError> {
    let mut datetime: Option<bool> = None;
    for &(df, table) in frames {
        for &(canonical, kind) in table.columns() {
            if kind != ColumnKind::Time {
                continue;
            }
            let actual = mapping.resolve(canonical);
            let Ok(column) = df.column(actual) else {
                continue;
            };
            let is_datetime = matches!(column.dtype(), DataType::Datetime(_, _));
            match datetime {
                None => datetime = Some(is_datetime),
                Some(expected) if expected != is_datetime => {
                    return Err(SchemaError::MixedTimeKinds {
                        table,
                        column: actual.to_string(),
                    });
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn { table: Table, column: String },

    #[error("type mismatch in {table}.{column}: expected {expected}, got {actual:?}")]
    TypeMismatch {
        table: Table,
        column: String,
        expected: &'static str,
        actual: DataType,
    },

    #[error("null value in {table}.{column} at row {row}")]
    NullValue {
        table: Table,
        column: String,
        row: usize,
    },

    #[error("invalid side '{value}' in metadata row {row}: expected 'buy' or 'sell'")]
    InvalidSide { row: usize, value: String },

    #[error("time column {table}.{column} mixes datetime and integer timestamps with other tables")]
    MixedTimeKinds { table: Table, column: String },

    #[error("covariance frame must be square with one column per label, got {rows}x{cols}")]
    NonSquareCovariance { rows: usize, cols: usize },
}
