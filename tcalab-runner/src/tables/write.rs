//! Output frames built from a [`SlippageReport`].
//!
//! Optional column groups follow the inputs: counterfactual and per-peer
//! columns exist only when the run had peers, VWAP columns only when it had
//! volume data. Per-peer columns are prefixed with `peer_` so a peer name can
//! never collide with a fixed column.

use polars::prelude::*;
use tcalab_core::domain::{PeerWeight, Volatility};
use tcalab_core::slippage::{FillRow, SummaryRow};
use tcalab_core::SlippageReport;

fn peer_observation<F>(row: &FillRow, peer: &str, pick: F) -> Option<f64>
where
    F: Fn(&tcalab_core::counterfactual::PeerObservation) -> Option<f64>,
{
    row.counterfactual
        .as_ref()?
        .peers
        .iter()
        .find(|(name, _)| name == peer)
        .and_then(|(_, obs)| pick(obs))
}

/// Fill-level table.
pub fn fill_frame(report: &SlippageReport) -> PolarsResult<DataFrame> {
    let rows = &report.fills;
    let mut columns = vec![
        Column::new("time".into(), rows.iter().map(|r| r.fill.time).collect::<Vec<i64>>()),
        Column::new(
            "execution_name".into(),
            rows.iter().map(|r| r.fill.execution.as_str()).collect::<Vec<_>>(),
        ),
        Column::new("asset".into(), rows.iter().map(|r| r.fill.asset.as_str()).collect::<Vec<_>>()),
        Column::new("quantity".into(), rows.iter().map(|r| r.fill.quantity).collect::<Vec<f64>>()),
        Column::new("price".into(), rows.iter().map(|r| r.fill.price).collect::<Vec<f64>>()),
        Column::new("side".into(), rows.iter().map(|r| r.side.as_str()).collect::<Vec<_>>()),
        Column::new(
            "arrival_price".into(),
            rows.iter().map(|r| r.arrival_price).collect::<Vec<f64>>(),
        ),
        Column::new("bid_price".into(), rows.iter().map(|r| r.bid).collect::<Vec<f64>>()),
        Column::new("ask_price".into(), rows.iter().map(|r| r.ask).collect::<Vec<f64>>()),
        Column::new(
            "spread_cross".into(),
            rows.iter().map(|r| r.spread_cross).collect::<Vec<f64>>(),
        ),
    ];

    if report.has_peers() {
        columns.push(Column::new(
            "counterfactual_return".into(),
            rows.iter()
                .map(|r| r.counterfactual.as_ref().map(|c| c.log_return))
                .collect::<Vec<Option<f64>>>(),
        ));
        columns.push(Column::new(
            "counterfactual_price".into(),
            rows.iter()
                .map(|r| r.counterfactual.as_ref().map(|c| c.price))
                .collect::<Vec<Option<f64>>>(),
        ));
        for peer in &report.peer_names {
            columns.push(Column::new(
                format!("peer_{peer}_mid").into(),
                rows.iter()
                    .map(|r| peer_observation(r, peer, |o| o.mid))
                    .collect::<Vec<Option<f64>>>(),
            ));
            columns.push(Column::new(
                format!("peer_{peer}_return").into(),
                rows.iter()
                    .map(|r| peer_observation(r, peer, |o| o.log_return))
                    .collect::<Vec<Option<f64>>>(),
            ));
        }
    }

    if report.has_volume {
        columns.push(Column::new(
            "market_vwap".into(),
            rows.iter().map(|r| r.market_vwap).collect::<Vec<Option<f64>>>(),
        ));
    }

    DataFrame::new(columns)
}

/// Summary table for rows already expressed in one unit.
pub fn summary_frame(rows: &[SummaryRow], has_peers: bool, has_volume: bool) -> PolarsResult<DataFrame> {
    let mut columns = vec![
        Column::new(
            "execution_name".into(),
            rows.iter().map(|r| r.execution.as_str()).collect::<Vec<_>>(),
        ),
        Column::new("asset".into(), rows.iter().map(|r| r.asset.as_str()).collect::<Vec<_>>()),
        Column::new("side".into(), rows.iter().map(|r| r.side.as_str()).collect::<Vec<_>>()),
        Column::new(
            "classical_slippage".into(),
            rows.iter().map(|r| r.classical_slippage).collect::<Vec<f64>>(),
        ),
    ];
    if has_peers {
        columns.push(Column::new(
            "refined_slippage".into(),
            rows.iter().map(|r| r.refined_slippage).collect::<Vec<Option<f64>>>(),
        ));
    }
    columns.push(Column::new(
        "spread_cross_pct".into(),
        rows.iter().map(|r| r.spread_cross_pct).collect::<Vec<f64>>(),
    ));
    if has_volume {
        columns.push(Column::new(
            "vs_vwap_slippage".into(),
            rows.iter().map(|r| r.vwap.map(|v| v.slippage)).collect::<Vec<Option<f64>>>(),
        ));
        columns.push(Column::new(
            "fill_vwap".into(),
            rows.iter().map(|r| r.vwap.map(|v| v.fill_vwap)).collect::<Vec<Option<f64>>>(),
        ));
        columns.push(Column::new(
            "market_vwap".into(),
            rows.iter().map(|r| r.vwap.map(|v| v.market_vwap)).collect::<Vec<Option<f64>>>(),
        ));
    }
    columns.extend([
        Column::new(
            "total_quantity".into(),
            rows.iter().map(|r| r.total_quantity).collect::<Vec<f64>>(),
        ),
        Column::new(
            "arrival_price".into(),
            rows.iter().map(|r| r.arrival_price).collect::<Vec<f64>>(),
        ),
        Column::new(
            "fill_count".into(),
            rows.iter().map(|r| r.fill_count as u64).collect::<Vec<u64>>(),
        ),
    ]);

    DataFrame::new(columns)
}

pub fn peer_weights_frame(rows: &[PeerWeight]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            "execution_name".into(),
            rows.iter().map(|r| r.execution.as_str()).collect::<Vec<_>>(),
        ),
        Column::new("peer".into(), rows.iter().map(|r| r.peer.as_str()).collect::<Vec<_>>()),
        Column::new("weight".into(), rows.iter().map(|r| r.weight).collect::<Vec<f64>>()),
    ])
}

pub fn volatilities_frame(rows: &[Volatility]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new("asset".into(), rows.iter().map(|r| r.asset.as_str()).collect::<Vec<_>>()),
        Column::new(
            "volatility".into(),
            rows.iter().map(|r| r.volatility).collect::<Vec<f64>>(),
        ),
    ])
}
