//! Integration tests for the grid-trader system
//!
//! These tests drive whole sessions through the public API: config, grid,
//! strategy, paper broker and candle feed together.

use approx::assert_relative_eq;
use chrono::{Duration, Utc};

use grid_trader::config::{GridConfig, PaperConfig};
use grid_trader::data::{CandleFeed, MarketData};
use grid_trader::oms::PaperBroker;
use grid_trader::strategy::{CrossingSource, HoldReason};
use grid_trader::turning_point::TurningPointPolicy;
use grid_trader::{Candle, Config, Decision, GridStrategy, PriceGrid, Side, TickError};

// =============================================================================
// Test Utilities
// =============================================================================

/// One and a half swings of `1 + 0.08 * sin(i / 4)`, rounded to 3 decimals
const OSCILLATION: [f64; 60] = [
    1.0, 1.02, 1.038, 1.055, 1.067, 1.076, 1.08, 1.079, 1.073, 1.062, 1.048, 1.031, 1.011, 0.991,
    0.972, 0.954, 0.939, 0.928, 0.922, 0.92, 0.923, 0.931, 0.944, 0.959, 0.978, 0.997, 1.017,
    1.036, 1.053, 1.066, 1.075, 1.08, 1.079, 1.074, 1.064, 1.05, 1.033, 1.014, 0.994, 0.974, 0.956,
    0.941, 0.93, 0.922, 0.92, 0.923, 0.93, 0.942, 0.957, 0.975, 0.995, 1.015, 1.034, 1.051, 1.064,
    1.074, 1.079, 1.079, 1.075, 1.065,
];

/// Pack consecutive prices into bars: open = even tick, close = odd tick
fn candles_from_ticks(ticks: &[f64]) -> Vec<Candle> {
    let start_time = Utc::now() - Duration::minutes(ticks.len() as i64);

    ticks
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            let open = pair[0];
            let close = *pair.get(1).unwrap_or(&open);
            Candle::new(
                start_time + Duration::minutes(i as i64),
                open,
                open.max(close),
                open.min(close),
                close,
                1000.0,
            )
            .unwrap()
        })
        .collect()
}

fn paper_broker() -> PaperBroker {
    PaperBroker::new(&PaperConfig::default())
}

fn run_candles(
    strategy: &mut GridStrategy,
    broker: &mut PaperBroker,
    candles: &[Candle],
) -> Vec<Decision> {
    candles
        .iter()
        .flat_map(|candle| strategy.on_candle(candle, &mut *broker).unwrap())
        .collect()
}

// =============================================================================
// Grid Tests
// =============================================================================

#[test]
fn test_reference_grid() {
    let grid = PriceGrid::build(1.0, 0.5, 2.0, 0.1).unwrap();
    for level in [1.0, 1.1, 1.21, 1.331, 0.9, 0.81, 0.729] {
        assert!(grid.levels().contains(&level), "missing level {}", level);
    }
    assert!(grid.levels().windows(2).all(|w| w[0] < w[1]));
    assert!(grid.lowest().unwrap() >= 0.5);
    assert!(grid.highest().unwrap() <= 2.0);
}

#[test]
fn test_session_builds_grid_from_config() {
    let mut config = Config::default();
    config.grid = GridConfig {
        base_price: Some(1.0),
        min_price: 0.5,
        max_price: 2.0,
        width: 0.1,
    };
    let strategy = GridStrategy::new(&config).unwrap();
    let expected = PriceGrid::build(1.0, 0.5, 2.0, 0.1).unwrap();
    assert_eq!(strategy.grid(), Some(&expected));
}

#[test]
fn test_invalid_grid_config_is_fatal() {
    let mut config = Config::default();
    config.grid.width = 1.5;
    assert!(GridStrategy::new(&config).is_err());
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_paper_session_over_oscillating_candles() {
    let config = Config::default();
    let mut strategy = GridStrategy::new(&config).unwrap();
    let mut broker = paper_broker();
    let candles = candles_from_ticks(&OSCILLATION);

    let decisions = run_candles(&mut strategy, &mut broker, &candles);
    assert_eq!(decisions.len(), OSCILLATION.len());
    assert!(matches!(
        decisions[0],
        Decision::PositionOpened { fill: Some(_), .. }
    ));

    let trades: Vec<_> = decisions
        .iter()
        .filter_map(|d| match d {
            Decision::Traded { trade, .. } => Some(trade),
            _ => None,
        })
        .collect();
    let sides: Vec<Side> = trades.iter().map(|t| t.fill.side).collect();
    let quantities: Vec<f64> = trades.iter().map(|t| t.fill.quantity).collect();
    assert_eq!(
        sides,
        vec![Side::Sell, Side::Buy, Side::Sell, Side::Buy, Side::Sell]
    );
    assert_eq!(quantities, vec![18_000.0, 36_000.0, 36_000.0, 36_000.0, 45_000.0]);
    assert!(trades.iter().all(|t| t.source == CrossingSource::LastTrade));

    // Holdings follow the fills exactly
    let net: f64 = broker.fills().iter().map(|f| f.signed_quantity()).sum();
    assert_eq!(broker.holdings(), net);
    assert_eq!(broker.holdings(), 23_000.0);

    let snapshot = strategy.snapshot();
    assert_eq!(snapshot.trades, 5);
    assert_eq!(snapshot.ticks, 60);
    assert_eq!(snapshot.tracker.last_trade_price, Some(1.079));

    let notional: f64 = broker.fills().iter().map(|f| f.notional()).sum();
    assert_relative_eq!(
        snapshot.cumulative_notional.to_f64(),
        notional,
        epsilon = 1e-6
    );
    assert_relative_eq!(snapshot.profit.to_f64(), 38_079.0, epsilon = 1e-6);
}

#[test]
fn test_anti_whipsaw_holds_before_each_trade() {
    let mut strategy = GridStrategy::new(&Config::default()).unwrap();
    let mut broker = paper_broker();
    let decisions = run_candles(&mut strategy, &mut broker, &candles_from_ticks(&OSCILLATION));

    // The first peak retraces twice inside the 1.2% drawdown band before selling
    let below: Vec<_> = decisions[7..9]
        .iter()
        .map(|d| matches!(d, Decision::Hold { reason: HoldReason::BelowThreshold { .. }, .. }))
        .collect();
    assert_eq!(below, vec![true, true]);
    assert!(decisions[9].is_trade());
}

#[test]
fn test_candle_feed_matches_direct_candles() {
    let config = Config::default();
    let candles = candles_from_ticks(&OSCILLATION);

    let mut direct = GridStrategy::new(&config).unwrap();
    let expected = run_candles(&mut direct, &mut paper_broker(), &candles);

    let symbol = config.symbol();
    let mut feed = CandleFeed::new(symbol.clone(), candles);
    let mut strategy = GridStrategy::new(&config).unwrap();
    let mut broker = paper_broker();
    let mut decisions = Vec::new();
    while feed.advance().is_some() {
        for &field in &config.price_fields {
            let price = feed.latest_price(&symbol, field).unwrap();
            decisions.push(strategy.on_tick(price, &mut broker).unwrap());
        }
    }

    assert_eq!(decisions, expected);
    assert_eq!(strategy.snapshot(), direct.snapshot());
}

#[test]
fn test_session_replay_is_idempotent() {
    let mut config = Config::default();
    config.filters.turning_point_policy = TurningPointPolicy::PerDirection;
    let candles = candles_from_ticks(&OSCILLATION);

    let mut first = GridStrategy::new(&config).unwrap();
    let mut second = GridStrategy::new(&config).unwrap();
    let a = run_candles(&mut first, &mut paper_broker(), &candles);
    let b = run_candles(&mut second, &mut paper_broker(), &candles);

    assert_eq!(a, b);
    assert_eq!(first.snapshot(), second.snapshot());
    assert_eq!(
        serde_json::to_string(&first.snapshot()).unwrap(),
        serde_json::to_string(&second.snapshot()).unwrap()
    );
}

#[test]
fn test_underfunded_broker_never_opens() {
    let config = Config::default();
    let mut strategy = GridStrategy::new(&config).unwrap();
    let mut broker = PaperBroker::new(&PaperConfig {
        initial_cash: 1000.0,
        ..PaperConfig::default()
    });

    let decisions = run_candles(&mut strategy, &mut broker, &candles_from_ticks(&OSCILLATION[..10]));
    assert!(decisions.iter().all(|d| matches!(
        d,
        Decision::Rejected {
            error: TickError::OrderRejected { .. },
            ..
        }
    )));
    let snapshot = strategy.snapshot();
    assert!(!snapshot.positioned);
    assert_eq!(snapshot.tracker.last_trade_price, None);
    assert_eq!(snapshot.tracker.current_price, Some(OSCILLATION[9]));
    assert!(broker.fills().is_empty());
}

// =============================================================================
// Config and Telemetry Tests
// =============================================================================

#[test]
fn test_config_from_file() {
    let path = std::env::temp_dir().join(format!("grid_trader_config_{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{
            "symbol": "510300.XSHG",
            "grid": { "base_price": 4.0, "min_price": 3.0, "max_price": 5.0, "width": 0.01 },
            "filters": { "max_drawdown": 0.02, "turning_point_policy": "per_direction" },
            "sizing": { "trade_amount": 1000 }
        }"#,
    )
    .unwrap();

    let config = Config::from_file(&path);
    std::fs::remove_file(&path).ok();
    let config = config.unwrap();

    assert_eq!(config.grid.base_price, Some(4.0));
    assert_eq!(config.filters.max_drawdown, 0.02);
    assert_eq!(config.filters.max_bounce, 0.012);
    assert_eq!(
        config.filters.turning_point_policy,
        TurningPointPolicy::PerDirection
    );
    assert_eq!(config.sizing.trade_amount, 1000.0);
    assert_eq!(config.sizing.lot_size, 100.0);
}

#[test]
fn test_config_from_file_rejects_invalid_values() {
    let path = std::env::temp_dir().join(format!("grid_trader_bad_{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{ "grid": { "base_price": 9.0, "min_price": 3.0, "max_price": 5.0, "width": 0.01 } }"#,
    )
    .unwrap();

    let result = Config::from_file(&path);
    std::fs::remove_file(&path).ok();
    assert!(result.is_err());
}

#[test]
fn test_decisions_serialize_with_tags() {
    let mut strategy = GridStrategy::new(&Config::default()).unwrap();
    let mut broker = paper_broker();
    let decisions = run_candles(&mut strategy, &mut broker, &candles_from_ticks(&OSCILLATION[..10]));

    let opened = serde_json::to_value(&decisions[0]).unwrap();
    assert_eq!(opened["decision"], "position_opened");
    assert_eq!(opened["fill"]["side"], "Buy");

    let held = serde_json::to_value(&decisions[7]).unwrap();
    assert_eq!(held["decision"], "hold");
    assert_eq!(held["reason"]["reason"], "below_threshold");
    assert_eq!(held["reason"]["kind"], "drawdown");

    let traded = serde_json::to_value(&decisions[9]).unwrap();
    assert_eq!(traded["decision"], "traded");
    assert_eq!(traded["trade"]["grid_count"], 2);

    let invalid = strategy.on_tick(-1.0, &mut broker).unwrap();
    let invalid = serde_json::to_value(&invalid).unwrap();
    assert_eq!(invalid["decision"], "suspended");
    assert_eq!(invalid["error"]["error"], "invalid_price");
}
