//! Tabular runs end to end: schema checks, aliases, optional column groups.

use polars::prelude::*;
use std::io::Write;
use tcalab_core::PeerCount;
use tcalab_runner::{run_slippage, ColumnMapping, InputFrames, RunError, RunnerConfig, SchemaError, Table};

const TOL: f64 = 1e-9;

fn fills() -> DataFrame {
    df!(
        "time" => &[1i64, 2],
        "quantity" => &[100.0, 100.0],
        "price" => &[101.0, 102.0],
        "execution_name" => &["e1", "e1"],
        "asset" => &["A", "A"],
    )
    .unwrap()
}

fn metadata() -> DataFrame {
    df!(
        "execution_name" => &["e1"],
        "side" => &["buy"],
        "desired_quantity" => &[200.0],
        "arrival_price" => &[100.0],
    )
    .unwrap()
}

fn quotes() -> DataFrame {
    df!(
        "time" => &[1i64, 2, 1, 2],
        "symbol" => &["A", "A", "P", "P"],
        "bid_price" => &[99.0, 100.0, 49.5, 50.5],
        "ask_price" => &[101.0, 102.0, 50.5, 51.5],
    )
    .unwrap()
}

fn peers() -> DataFrame {
    df!(
        "execution_name" => &["e1"],
        "peer" => &["P"],
        "weight" => &[1.0],
    )
    .unwrap()
}

fn volume() -> DataFrame {
    df!(
        "time_from" => &[0i64],
        "time_to" => &[3i64],
        "symbol" => &["A"],
        "volume" => &[1000.0],
    )
    .unwrap()
}

fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name).unwrap().f64().unwrap().into_iter().collect()
}

#[test]
fn classical_summary_in_every_unit() {
    let (f, m, q) = (fills(), metadata(), quotes());
    let tables = run_slippage(&InputFrames::new(&f, &m, &q), &RunnerConfig::default()).unwrap();

    let bps = tables.summary("bps").unwrap();
    assert_eq!(bps.height(), 1);
    let classical = f64_values(bps, "classical_slippage")[0].unwrap();
    assert!((classical + 150.0).abs() < TOL);

    let pct = f64_values(tables.summary("pct").unwrap(), "classical_slippage")[0].unwrap();
    let usd = f64_values(tables.summary("usd").unwrap(), "classical_slippage")[0].unwrap();
    assert!((pct + 1.5).abs() < TOL);
    assert!((usd + 300.0).abs() < TOL);

    let qty = f64_values(bps, "total_quantity");
    assert_eq!(qty, vec![Some(200.0)]);
}

#[test]
fn unknown_unit_key_names_valid_units() {
    let (f, m, q) = (fills(), metadata(), quotes());
    let tables = run_slippage(&InputFrames::new(&f, &m, &q), &RunnerConfig::default()).unwrap();
    let err = tables.summary("bp").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("bps"), "{message}");
    assert!(message.contains("usd"), "{message}");
}

#[test]
fn optional_columns_absent_without_peers_or_volume() {
    let (f, m, q) = (fills(), metadata(), quotes());
    let tables = run_slippage(&InputFrames::new(&f, &m, &q), &RunnerConfig::default()).unwrap();

    for name in ["counterfactual_return", "counterfactual_price", "market_vwap"] {
        assert!(tables.fills.column(name).is_err(), "unexpected column {name}");
    }
    let bps = tables.summary("bps").unwrap();
    for name in ["refined_slippage", "vs_vwap_slippage", "fill_vwap", "market_vwap"] {
        assert!(bps.column(name).is_err(), "unexpected column {name}");
    }
    assert!(tables.peer_weights.is_none());
    assert_eq!(tables.fills.height(), 2);
}

#[test]
fn peers_add_refined_and_per_peer_columns() {
    let (f, m, q, p) = (fills(), metadata(), quotes(), peers());
    let frames = InputFrames::new(&f, &m, &q).with_peers(&p);
    let tables = run_slippage(&frames, &RunnerConfig::default()).unwrap();

    let refined = f64_values(tables.summary("bps").unwrap(), "refined_slippage")[0].unwrap();
    assert!((refined + 50.0).abs() < 1e-6);

    let cf = f64_values(&tables.fills, "counterfactual_price");
    assert!((cf[0].unwrap() - 100.0).abs() < TOL);
    assert!((cf[1].unwrap() - 102.0).abs() < 1e-6);
    assert_eq!(f64_values(&tables.fills, "peer_P_mid"), vec![Some(50.0), Some(51.0)]);
    assert!(tables.fills.column("peer_P_return").is_ok());

    let weights = tables.peer_weights.as_ref().unwrap();
    assert_eq!(weights.shape(), (1, 3));
}

#[test]
fn volume_adds_vwap_columns() {
    let (f, m, q, v) = (fills(), metadata(), quotes(), volume());
    let frames = InputFrames::new(&f, &m, &q).with_volume(&v);
    let tables = run_slippage(&frames, &RunnerConfig::default()).unwrap();

    assert!(tables.fills.column("market_vwap").is_ok());
    let bps = tables.summary("bps").unwrap();
    for name in ["vs_vwap_slippage", "fill_vwap", "market_vwap"] {
        assert!(bps.column(name).is_ok(), "missing column {name}");
    }
    assert_eq!(f64_values(bps, "fill_vwap"), vec![Some(101.5)]);
}

#[test]
fn missing_column_is_reported_before_computation() {
    let (m, q) = (metadata(), quotes());
    let f = fills().drop("price").unwrap();
    let err = run_slippage(&InputFrames::new(&f, &m, &q), &RunnerConfig::default()).unwrap_err();
    match err {
        RunError::Schema(SchemaError::MissingColumn { table, column }) => {
            assert_eq!(table, Table::Fills);
            assert_eq!(column, "price");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_optional_table_column_is_reported() {
    let (f, m, q) = (fills(), metadata(), quotes());
    let v = volume().drop("volume").unwrap();
    let frames = InputFrames::new(&f, &m, &q).with_volume(&v);
    let err = run_slippage(&frames, &RunnerConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        RunError::Schema(SchemaError::MissingColumn { table: Table::Volume, .. })
    ));
}

#[test]
fn aliased_columns_are_accepted() {
    let mut q = quotes();
    q.rename("bid_price", "bid".into()).unwrap();
    q.rename("ask_price", "ask".into()).unwrap();
    let (f, m) = (fills(), metadata());

    let config = RunnerConfig {
        columns: ColumnMapping::new().with("bid_price", "bid").with("ask_price", "ask"),
        ..RunnerConfig::default()
    };
    let tables = run_slippage(&InputFrames::new(&f, &m, &q), &config).unwrap();
    assert_eq!(tables.summary("bps").unwrap().height(), 1);

    let err = run_slippage(&InputFrames::new(&f, &m, &q), &RunnerConfig::default()).unwrap_err();
    assert!(matches!(err, RunError::Schema(_)));
}

#[test]
fn calculation_errors_surface() {
    let (f, q) = (fills(), quotes());
    let m = df!(
        "execution_name" => &["other"],
        "side" => &["buy"],
        "desired_quantity" => &[200.0],
        "arrival_price" => &[100.0],
    )
    .unwrap();
    let err = run_slippage(&InputFrames::new(&f, &m, &q), &RunnerConfig::default()).unwrap_err();
    assert!(matches!(err, RunError::Calculation(_)));
}

#[test]
fn covariance_frame_derives_peers() {
    let (f, m, q) = (fills(), metadata(), quotes());
    let cov = df!(
        "A" => &[0.04, 0.02],
        "P" => &[0.02, 0.04],
    )
    .unwrap();
    let frames = InputFrames::new(&f, &m, &q).with_covariance(&cov);
    let tables = run_slippage(&frames, &RunnerConfig::default()).unwrap();

    let weights = tables.peer_weights.as_ref().unwrap();
    assert_eq!(f64_values(weights, "weight"), vec![Some(0.5)]);
    let vols = tables.volatilities.as_ref().unwrap();
    assert_eq!(vols.height(), 2);
}

#[test]
fn explicit_peers_win_over_covariance() {
    let (f, m, q, p) = (fills(), metadata(), quotes(), peers());
    let cov = df!(
        "A" => &[0.04, 0.02],
        "P" => &[0.02, 0.04],
    )
    .unwrap();
    let frames = InputFrames::new(&f, &m, &q).with_peers(&p).with_covariance(&cov);
    let tables = run_slippage(&frames, &RunnerConfig::default()).unwrap();
    let weights = tables.peer_weights.as_ref().unwrap();
    assert_eq!(f64_values(weights, "weight"), vec![Some(1.0)]);
}

#[test]
fn config_file_drives_the_run() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[calc]\nnum_peers = 1\npeer_return_truncation = inf\n\n[columns]\ntime = \"ts\"\n"
    )
    .unwrap();
    let config = RunnerConfig::load(file.path()).unwrap();
    assert_eq!(config.calc.num_peers, PeerCount::Top(1));

    let mut f = fills();
    f.rename("time", "ts".into()).unwrap();
    let mut q = quotes();
    q.rename("time", "ts".into()).unwrap();
    let m = metadata();

    let tables = run_slippage(&InputFrames::new(&f, &m, &q), &config).unwrap();
    assert_eq!(tables.fills.height(), 2);
    assert_eq!(tables.report.config_fingerprint, config.calc.fingerprint());
}

#[test]
fn peer_named_like_a_fixed_column_does_not_collide() {
    let (f, m) = (fills(), metadata());
    let q = df!(
        "time" => &[1i64, 2, 1, 2],
        "symbol" => &["A", "A", "counterfactual", "counterfactual"],
        "bid_price" => &[99.0, 100.0, 49.5, 50.5],
        "ask_price" => &[101.0, 102.0, 50.5, 51.5],
    )
    .unwrap();
    let p = df!(
        "execution_name" => &["e1"],
        "peer" => &["counterfactual"],
        "weight" => &[1.0],
    )
    .unwrap();
    let frames = InputFrames::new(&f, &m, &q).with_peers(&p);
    let tables = run_slippage(&frames, &RunnerConfig::default()).unwrap();

    assert!(tables.fills.column("counterfactual_return").is_ok());
    assert!(tables.fills.column("peer_counterfactual_return").is_ok());
    assert_eq!(
        f64_values(&tables.fills, "peer_counterfactual_mid"),
        vec![Some(50.0), Some(51.0)]
    );
}

fn datetime(name: &str, values: &[i64], unit: TimeUnit) -> Column {
    Column::new(name.into(), values)
        .cast(&DataType::Datetime(unit, None))
        .unwrap()
}

#[test]
fn datetime_units_are_aligned_across_tables() {
    let f = DataFrame::new(vec![
        datetime("time", &[1_000_000, 2_000_000], TimeUnit::Microseconds),
        Column::new("quantity".into(), &[100.0, 100.0]),
        Column::new("price".into(), &[101.0, 102.0]),
        Column::new("execution_name".into(), &["e1", "e1"]),
        Column::new("asset".into(), &["A", "A"]),
    ])
    .unwrap();
    let q = DataFrame::new(vec![
        datetime("time", &[1_000_000, 2_000_000], TimeUnit::Microseconds),
        Column::new("symbol".into(), &["A", "A"]),
        Column::new("bid_price".into(), &[99.0, 100.0]),
        Column::new("ask_price".into(), &[101.0, 102.0]),
    ])
    .unwrap();
    let v = DataFrame::new(vec![
        datetime("time_from", &[0], TimeUnit::Milliseconds),
        datetime("time_to", &[3_000], TimeUnit::Milliseconds),
        Column::new("symbol".into(), &["A"]),
        Column::new("volume".into(), &[1000.0]),
    ])
    .unwrap();
    let m = metadata();

    let frames = InputFrames::new(&f, &m, &q).with_volume(&v);
    let tables = run_slippage(&frames, &RunnerConfig::default()).unwrap();
    let bps = tables.summary("bps").unwrap();
    // Interval midpoint 1.5s ties between the quotes at 1s and 2s; the
    // earlier mid (100) prices it.
    assert_eq!(f64_values(bps, "market_vwap"), vec![Some(100.0)]);
    assert!(f64_values(bps, "vs_vwap_slippage")[0].is_some());
}

#[test]
fn datetime_and_integer_time_columns_are_rejected_together() {
    let (f, m, q) = (fills(), metadata(), quotes());
    let v = DataFrame::new(vec![
        datetime("time_from", &[0], TimeUnit::Milliseconds),
        datetime("time_to", &[3_000], TimeUnit::Milliseconds),
        Column::new("symbol".into(), &["A"]),
        Column::new("volume".into(), &[1000.0]),
    ])
    .unwrap();
    let frames = InputFrames::new(&f, &m, &q).with_volume(&v);
    let err = run_slippage(&frames, &RunnerConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        RunError::Schema(SchemaError::MixedTimeKinds { table: Table::Volume, .. })
    ));
}
