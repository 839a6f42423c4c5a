//! Market data loading and the candle-backed price source
//!
//! Loads OHLCV bars from CSV files (`datetime,open,high,low,close,volume`)
//! and replays them through the [`MarketData`] interface the session reads
//! prices from.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, info};

use crate::{Candle, PriceField, Symbol};

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Load OHLCV data from CSV file.
///
/// Rows failing candle validation abort the load with the row number.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut candles = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let row = row_idx + 1;
        let record = result.with_context(|| format!("Failed to read row {}", row))?;

        let dt_str = record.get(0).context("Missing datetime column")?;
        let datetime = parse_datetime(dt_str)
            .with_context(|| format!("Failed to parse datetime: {}", dt_str))?;

        let field = |idx: usize, name: &str| -> Result<f64> {
            record
                .get(idx)
                .with_context(|| format!("Missing {} column in row {}", name, row))?
                .trim()
                .parse()
                .with_context(|| format!("Failed to parse {} in row {}", name, row))
        };

        let candle = Candle::new(
            datetime,
            field(1, "open")?,
            field(2, "high")?,
            field(3, "low")?,
            field(4, "close")?,
            field(5, "volume")?,
        )
        .with_context(|| format!("Invalid candle in row {}", row))?;

        candles.push(candle);
    }

    info!(path = %path.display(), candles = candles.len(), "Loaded candles");
    Ok(candles)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }
    // Exchange exports without timezone are taken as UTC
    let naive = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

// =============================================================================
// Price Source
// =============================================================================

/// Latest observed price for an instrument
pub trait MarketData {
    fn latest_price(&mut self, symbol: &Symbol, field: PriceField) -> Option<f64>;
}

/// Replays a candle series one bar at a time
#[derive(Debug, Clone)]
pub struct CandleFeed {
    symbol: Symbol,
    candles: Vec<Candle>,
    /// Index of the next bar to hand out
    cursor: usize,
}

impl CandleFeed {
    pub fn new(symbol: Symbol, candles: Vec<Candle>) -> Self {
        Self {
            symbol,
            candles,
            cursor: 0,
        }
    }

    pub fn from_csv(symbol: Symbol, path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(symbol, load_csv(path)?))
    }

    /// Move to the next bar; `None` once the series is exhausted
    pub fn advance(&mut self) -> Option<&Candle> {
        let candle = self.candles.get(self.cursor)?;
        self.cursor += 1;
        debug!(symbol = %self.symbol, datetime = %candle.datetime, "Bar");
        Some(candle)
    }

    /// Bar `latest_price` reads from
    pub fn current(&self) -> Option<&Candle> {
        self.cursor.checked_sub(1).and_then(|idx| self.candles.get(idx))
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.candles.len().saturating_sub(self.cursor)
    }
}

impl MarketData for CandleFeed {
    fn latest_price(&mut self, symbol: &Symbol, field: PriceField) -> Option<f64> {
        if *symbol != self.symbol {
            return None;
        }
        self.current().map(|candle| candle.price(field))
    }
}
