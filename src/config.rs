//! Configuration management
//!
//! Loads the session configuration from a JSON file. Every section except
//! `grid` falls back to defaults. `GRID_SYMBOL` in the environment (or a
//! `.env` file) overrides the instrument.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::accounting::AccountingMode;
use crate::error::ConfigError;
use crate::grid;
use crate::turning_point::TurningPointPolicy;
use crate::{PriceField, Symbol};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    pub grid: GridConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    /// Bar fields fed to the engine, in order, for every bar
    #[serde(default = "default_price_fields")]
    pub price_fields: Vec<PriceField>,
    #[serde(default)]
    pub accounting: AccountingMode,
    #[serde(default)]
    pub paper: PaperConfig,
}

fn default_symbol() -> String {
    "588200.XSHG".to_string()
}

fn default_price_fields() -> Vec<PriceField> {
    vec![PriceField::Open, PriceField::Close]
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        if let Ok(symbol) = std::env::var("GRID_SYMBOL") {
            config.symbol = symbol;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    pub fn symbol(&self) -> Symbol {
        Symbol::new(&self.symbol)
    }

    /// Reject configurations the engine cannot trade with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.filters.validate()?;
        self.sizing.validate()?;
        self.paper.validate()?;
        if self.price_fields.is_empty() {
            return Err(ConfigError::NoPriceFields);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            symbol: default_symbol(),
            grid: GridConfig::default(),
            filters: FilterConfig::default(),
            sizing: SizingConfig::default(),
            price_fields: default_price_fields(),
            accounting: AccountingMode::default(),
            paper: PaperConfig::default(),
        }
    }
}

/// Grid geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Grid anchor. When absent the first observed price is used.
    pub base_price: Option<f64>,
    pub min_price: f64,
    pub max_price: f64,
    /// Ratio between adjacent levels, e.g. 0.025 = 2.5%
    pub width: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            base_price: Some(1.0),
            min_price: 0.1,
            max_price: 100.0,
            width: 0.025,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        grid::validate_bounds(self.min_price, self.max_price, self.width)?;
        if let Some(base) = self.base_price {
            if !base.is_finite() {
                return Err(ConfigError::InvalidParameter {
                    name: "base_price",
                    value: base,
                    expected: "must be finite",
                });
            }
            if !(self.min_price..=self.max_price).contains(&base) {
                return Err(ConfigError::BaseOutOfRange {
                    base,
                    min: self.min_price,
                    max: self.max_price,
                });
            }
        }
        Ok(())
    }

    /// True when `price` is inside the tradable range
    pub fn in_range(&self, price: f64) -> bool {
        (self.min_price..=self.max_price).contains(&price)
    }
}

/// How the drawdown/bounce thresholds are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Drawdown candidates use `max_drawdown`, bounce candidates `max_bounce`
    #[default]
    DirectionConditioned,
    /// Both kinds use `max_drawdown`
    Symmetric,
}

/// Anti-whipsaw filters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum retracement from the turning point before selling into a rise
    pub max_drawdown: f64,
    /// Minimum rebound from the turning point before buying into a fall
    pub max_bounce: f64,
    pub threshold_mode: ThresholdMode,
    pub turning_point_policy: TurningPointPolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            max_drawdown: 0.012,
            max_bounce: 0.012,
            threshold_mode: ThresholdMode::default(),
            turning_point_policy: TurningPointPolicy::default(),
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        fraction("max_drawdown", self.max_drawdown)?;
        fraction("max_bounce", self.max_bounce)?;
        Ok(())
    }
}

/// Order sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Quantity traded per grid line crossed
    pub trade_amount: f64,
    /// Largest notional a single order may carry
    pub max_position: f64,
    /// Fraction of `max_position` bought on the first tick
    pub start_position: f64,
    /// Quantities are rounded to a multiple of this
    pub lot_size: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig {
            trade_amount: 9000.0,
            max_position: 100_000.0,
            start_position: 0.5,
            lot_size: 100.0,
        }
    }
}

impl SizingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("trade_amount", self.trade_amount)?;
        positive("max_position", self.max_position)?;
        positive("lot_size", self.lot_size)?;
        fraction("start_position", self.start_position)?;
        Ok(())
    }

    /// Round a signed quantity to the nearest lot
    pub fn round_to_lot(&self, quantity: f64) -> f64 {
        (quantity / self.lot_size).round() * self.lot_size
    }

    /// Whole lots affordable with `notional` at `price`
    pub fn floor_to_lot(&self, notional: f64, price: f64) -> f64 {
        (notional / price / self.lot_size).floor() * self.lot_size
    }

    /// Quantity of the opening buy at `price`
    pub fn initial_quantity(&self, price: f64) -> f64 {
        self.floor_to_lot(self.start_position * self.max_position, price)
    }
}

/// Paper broker used by the `run` command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    pub initial_cash: f64,
    /// Commission rate on fill notional
    pub commission: f64,
    /// Adverse price move applied to every fill
    pub slippage: f64,
    /// Allow selling more than is held
    pub allow_short: bool,
}

impl Default for PaperConfig {
    fn default() -> Self {
        PaperConfig {
            initial_cash: 100_000.0,
            commission: 0.0003,
            slippage: 0.0,
            allow_short: false,
        }
    }
}

impl PaperConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_cash >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "initial_cash",
                value: self.initial_cash,
                expected: "must be >= 0",
            });
        }
        fraction("commission", self.commission)?;
        fraction("slippage", self.slippage)?;
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            expected: "must be > 0",
        })
    }
}

fn fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            expected: "must be within [0, 1]",
        })
    }
}
