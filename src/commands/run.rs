//! Paper Trading Command
//!
//! Replays a candle CSV through a grid session:
//! - Current-thread tokio runtime pacing ticks with an optional interval
//! - Graceful stop on Ctrl+C
//! - Paper broker fills with commission and slippage
//! - Optional JSON-lines decision log

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info};

use grid_trader::data::{CandleFeed, MarketData};
use grid_trader::oms::PaperBroker;
use grid_trader::{Config, Decision, GridStrategy, PriceField, Side};

/// One line of the decision log
#[derive(Serialize)]
struct DecisionRecord<'a> {
    datetime: DateTime<Utc>,
    field: PriceField,
    #[serde(flatten)]
    decision: &'a Decision,
}

#[derive(Debug, Default)]
struct SessionStats {
    bars: usize,
    ticks: usize,
    buys: usize,
    sells: usize,
    holds: usize,
    suspended: usize,
    rejected: usize,
    last_price: Option<f64>,
}

impl SessionStats {
    fn record(&mut self, decision: &Decision) {
        self.ticks += 1;
        match decision {
            Decision::Traded { trade, .. } => match trade.fill.side {
                Side::Buy => self.buys += 1,
                Side::Sell => self.sells += 1,
            },
            Decision::Hold { .. } => self.holds += 1,
            Decision::Suspended { .. } => self.suspended += 1,
            Decision::Rejected { .. } => self.rejected += 1,
            Decision::PositionOpened { .. } => {}
        }
        if decision.price().is_finite() {
            self.last_price = Some(decision.price());
        }
    }
}

pub fn run(
    config_path: String,
    data_path: String,
    interval_ms: u64,
    decisions_path: Option<String>,
) -> Result<()> {
    dotenv::dotenv().ok();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(config_path, data_path, interval_ms, decisions_path))
}

/// Wait for the next tick slot; without an interval just yield so Ctrl+C
/// can still be observed
async fn pace(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => tokio::task::yield_now().await,
    }
}

async fn run_async(
    config_path: String,
    data_path: String,
    interval_ms: u64,
    decisions_path: Option<String>,
) -> Result<()> {
    let config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;
    let symbol = config.symbol();

    let mut feed = CandleFeed::from_csv(symbol.clone(), &data_path)
        .with_context(|| format!("Failed to load candles from {}", data_path))?;
    let mut strategy = GridStrategy::new(&config).context("Failed to create grid session")?;
    let mut broker = PaperBroker::new(&config.paper);

    let mut writer = decisions_path
        .as_deref()
        .map(|path| {
            File::create(path)
                .map(BufWriter::new)
                .with_context(|| format!("Failed to create decision log {}", path))
        })
        .transpose()?;

    info!("{}", "=".repeat(60));
    info!("GRID TRADER - PAPER SESSION");
    info!("{}", "=".repeat(60));
    info!("Symbol: {}", symbol);
    info!("Bars: {}", feed.len());
    info!(
        "Grid: base={:?} range=[{}, {}] width={:.2}%",
        config.grid.base_price,
        config.grid.min_price,
        config.grid.max_price,
        config.grid.width * 100.0
    );
    info!(
        "Filters: drawdown={:.2}% bounce={:.2}% mode={:?} turning={:?}",
        config.filters.max_drawdown * 100.0,
        config.filters.max_bounce * 100.0,
        config.filters.threshold_mode,
        config.filters.turning_point_policy
    );
    info!("Initial cash: {:.2}", broker.cash());

    let mut ticker = (interval_ms > 0).then(|| {
        let mut ticker = interval(Duration::from_millis(interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut stats = SessionStats::default();

    loop {
        tokio::select! {
            _ = pace(&mut ticker) => {}
            _ = &mut shutdown => {
                info!("Received Ctrl+C, stopping session");
                break;
            }
        }

        let Some(candle) = feed.advance() else {
            debug!("Candle feed exhausted");
            break;
        };
        let datetime = candle.datetime;
        stats.bars += 1;

        for &field in &config.price_fields {
            let Some(price) = feed.latest_price(&symbol, field) else {
                continue;
            };
            let decision = strategy.on_tick(price, &mut broker)?;
            stats.record(&decision);

            if let Some(writer) = writer.as_mut() {
                let record = DecisionRecord {
                    datetime,
                    field,
                    decision: &decision,
                };
                serde_json::to_writer(&mut *writer, &record)?;
                writer.write_all(b"\n")?;
            }
        }
    }

    if let Some(mut writer) = writer {
        writer.flush().context("Failed to flush decision log")?;
    }

    print_summary(&strategy, &broker, &stats);
    Ok(())
}

fn print_summary(strategy: &GridStrategy, broker: &PaperBroker, stats: &SessionStats) {
    let snapshot = strategy.snapshot();
    let mark = stats.last_price.unwrap_or(0.0);

    println!("\n{}", "=".repeat(60));
    println!("SESSION SUMMARY: {}", snapshot.symbol);
    println!("{}", "=".repeat(60));
    println!("Bars processed:        {}", stats.bars);
    println!("Ticks processed:       {}", stats.ticks);
    println!(
        "Grid trades:           {} ({} buys, {} sells)",
        snapshot.trades, stats.buys, stats.sells
    );
    println!("Holds:                 {}", stats.holds);
    println!("Suspended ticks:       {}", stats.suspended);
    println!("Rejected orders:       {}", stats.rejected);
    println!("{}", "-".repeat(60));
    println!(
        "Last trade price:      {}",
        snapshot
            .tracker
            .last_trade_price
            .map_or_else(|| "-".to_string(), |p| format!("{:.3}", p))
    );
    println!("Cumulative notional:   {}", snapshot.cumulative_notional.round_dp(2));
    println!(
        "Grid profit ({}):  {}",
        strategy.accounting().name(),
        snapshot.profit.round_dp(2)
    );
    println!("{}", "-".repeat(60));
    println!("Cash:                  {:.2}", broker.cash());
    println!("Holdings:              {}", broker.holdings());
    println!("Commission paid:       {:.2}", broker.total_commission());
    println!("Equity @ {:.3}:        {:.2}", mark, broker.equity(mark));
    println!("{}\n", "=".repeat(60));
}
