//! Property tests for slippage invariants.
//!
//! Uses proptest to verify:
//! 1. Side symmetry: flipping buy/sell negates every slippage metric
//! 2. Unit consistency: pct = bps / 100, usd = bps / 10 000 × arrival × qty
//! 3. Spread crossing stays within [0, 1] and is 0.5 on locked books
//! 4. Zero peer weights: refined slippage equals classical slippage

use proptest::prelude::*;
use tcalab_core::domain::{Execution, Fill, PeerWeight, Quote, Side, VolumeInterval};
use tcalab_core::slippage::spread_cross;
use tcalab_core::{calculate, CalcConfig, CalcInputs, Unit};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_quantity() -> impl Strategy<Value = f64> {
    (1.0..1000.0_f64).prop_map(|q| q.round())
}

/// Fills at t = 1..=n with random prices and quantities.
fn arb_fills() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((arb_price(), arb_quantity()), 1..8)
}

fn build_inputs(side: Side, arrival: f64, fills: &[(f64, f64)], peer_weight: f64) -> CalcInputs {
    let mut quotes = Vec::new();
    let mut rows = Vec::new();
    for (i, &(price, quantity)) in fills.iter().enumerate() {
        let t = i as i64 + 1;
        rows.push(Fill {
            time: t,
            asset: "A".into(),
            execution: "e1".into(),
            quantity,
            price,
        });
        quotes.push(Quote { time: t, symbol: "A".into(), bid: price - 0.5, ask: price + 0.5 });
        let peer_mid = 50.0 + t as f64;
        quotes.push(Quote { time: t, symbol: "P".into(), bid: peer_mid, ask: peer_mid });
    }
    let n = fills.len() as i64;
    CalcInputs::new(
        rows,
        vec![Execution {
            name: "e1".into(),
            side,
            desired_quantity: 0.0,
            arrival_price: arrival,
        }],
        quotes,
    )
    .with_volume(vec![VolumeInterval { time_from: 0, time_to: n, symbol: "A".into(), volume: 1000.0 }])
    .with_peer_weights(vec![PeerWeight { execution: "e1".into(), peer: "P".into(), weight: peer_weight }])
}

proptest! {
    /// Flipping the side negates classical, refined and vs-VWAP slippage exactly.
    #[test]
    fn side_flip_negates_slippage(
        arrival in arb_price(),
        fills in arb_fills(),
        weight in -2.0..2.0_f64,
    ) {
        let config = CalcConfig::default();
        let buy = calculate(&build_inputs(Side::Buy, arrival, &fills, weight), &config).unwrap();
        let sell = calculate(&build_inputs(Side::Sell, arrival, &fills, weight), &config).unwrap();
        let (b, s) = (&buy.summary[0], &sell.summary[0]);

        prop_assert_eq!(b.classical_slippage, -s.classical_slippage);
        prop_assert_eq!(b.refined_slippage.unwrap(), -s.refined_slippage.unwrap());
        prop_assert_eq!(b.vwap.unwrap().slippage, -s.vwap.unwrap().slippage);
    }

    /// Every unit is a rescaling of the same fraction.
    #[test]
    fn units_are_consistent(
        arrival in arb_price(),
        fills in arb_fills(),
    ) {
        let report = calculate(&build_inputs(Side::Buy, arrival, &fills, 0.5), &CalcConfig::default()).unwrap();
        let bps = &report.summary_in(Unit::Bps)[0];
        let pct = &report.summary_in(Unit::Pct)[0];
        let usd = &report.summary_in(Unit::Usd)[0];
        let qty = bps.total_quantity;

        let tol = |x: f64| 1e-9 * x.abs().max(1.0);
        prop_assert!((pct.classical_slippage - bps.classical_slippage / 100.0).abs() <= tol(pct.classical_slippage));
        let expected_usd = bps.classical_slippage / 10_000.0 * arrival * qty;
        prop_assert!((usd.classical_slippage - expected_usd).abs() <= tol(expected_usd));

        let (bps_refined, usd_refined) = (bps.refined_slippage.unwrap(), usd.refined_slippage.unwrap());
        let expected_refined = bps_refined / 10_000.0 * arrival * qty;
        prop_assert!((usd_refined - expected_refined).abs() <= tol(expected_refined));
    }

    /// Spread crossing is a proportion for any price and book.
    #[test]
    fn spread_cross_is_bounded(
        price in arb_price(),
        bid in arb_price(),
        width in 0.0..5.0_f64,
        buy in any::<bool>(),
    ) {
        let side = if buy { Side::Buy } else { Side::Sell };
        let value = spread_cross(side, price, bid, bid + width);
        prop_assert!((0.0..=1.0).contains(&value));
    }

    /// A locked book gives 0.5 regardless of price or side.
    #[test]
    fn locked_book_is_half(price in arb_price(), touch in arb_price(), buy in any::<bool>()) {
        let side = if buy { Side::Buy } else { Side::Sell };
        prop_assert_eq!(spread_cross(side, price, touch, touch), 0.5);
    }

    /// Zero peer weights leave the counterfactual at the arrival price.
    #[test]
    fn zero_weights_reduce_to_classical(
        arrival in arb_price(),
        fills in arb_fills(),
    ) {
        let report = calculate(&build_inputs(Side::Sell, arrival, &fills, 0.0), &CalcConfig::default()).unwrap();
        let row = &report.summary[0];
        prop_assert_eq!(row.refined_slippage.unwrap(), row.classical_slippage);
    }
}
