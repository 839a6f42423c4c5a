//! Grid Trading Strategy
//!
//! Decides, tick by tick, whether to trade a single instrument against a
//! geometric price grid.
//!
//! ## How it works:
//! 1. The first tick buys the starting position and becomes the last trade
//!    price
//! 2. Each later tick counts the grid lines between the price and the last
//!    trade
//! 3. Price still moving the way it crossed is left alone (continuation)
//! 4. Price reversing by more than the drawdown/bounce threshold from the
//!    turning point trades `-crossings * trade_amount`: sells after a run up,
//!    buys after a run down
//! 5. With no crossing against the last trade, the turning point stands in
//!    for the price (cross-line pullback)
//!
//! Per-tick failures never escape [`GridStrategy::on_tick`]; they come back
//! as [`Decision::Suspended`] or [`Decision::Rejected`] and leave the trade
//! anchors where they were.

mod decision;

pub use decision::{CrossingSource, Decision, GridTrade, HoldReason};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::accounting::{self, Accounting};
use crate::config::{Config, FilterConfig, GridConfig, SizingConfig, ThresholdMode};
use crate::error::{ConfigError, TickError};
use crate::grid::PriceGrid;
use crate::oms::{ExecutionAdapter, Fill, OrderPurpose, OrderRequest};
use crate::risk::PositionLimit;
use crate::tracker::{PriceTracker, TrackerState};
use crate::turning_point::{CorrectionKind, TurningPoint, TurningPointTracker};
use crate::{Candle, Money, PriceField, Signal, Symbol};

/// Observable session state, for telemetry and replay comparisons
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub symbol: Symbol,
    pub positioned: bool,
    pub tracker: TrackerState,
    pub turning_point: TurningPoint,
    pub ticks: u64,
    pub trades: u64,
    /// Sum of `quantity * price` over every fill, initial position included
    pub cumulative_notional: Money,
    pub profit: Money,
}

/// One trading session over one instrument.
///
/// Owns all mutable state; ticks must be fed sequentially through `&mut self`.
pub struct GridStrategy {
    symbol: Symbol,
    grid_config: GridConfig,
    filters: FilterConfig,
    sizing: SizingConfig,
    price_fields: Vec<PriceField>,
    grid: Option<PriceGrid>,
    tracker: PriceTracker,
    turning: TurningPointTracker,
    limit: PositionLimit,
    accounting: Box<dyn Accounting>,
    positioned: bool,
    cumulative_notional: Money,
    ticks: u64,
    trades: u64,
}

impl GridStrategy {
    /// Validate `config` and build the grid if a base price is configured.
    ///
    /// Without a base price the grid is built from the first in-range tick.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let grid = match config.grid.base_price {
            Some(base) => Some(Self::build_grid(&config.grid, base)?),
            None => None,
        };

        Ok(Self {
            symbol: config.symbol(),
            grid_config: config.grid.clone(),
            filters: config.filters.clone(),
            sizing: config.sizing.clone(),
            price_fields: config.price_fields.clone(),
            grid,
            tracker: PriceTracker::new(),
            turning: TurningPointTracker::new(config.filters.turning_point_policy),
            limit: PositionLimit::new(config.sizing.max_position),
            accounting: accounting::create(config.accounting),
            positioned: false,
            cumulative_notional: Money::ZERO,
            ticks: 0,
            trades: 0,
        })
    }

    /// Replace the accounting hook selected by the configuration
    pub fn with_accounting(mut self, accounting: Box<dyn Accounting>) -> Self {
        self.accounting = accounting;
        self
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn grid(&self) -> Option<&PriceGrid> {
        self.grid.as_ref()
    }

    pub fn is_positioned(&self) -> bool {
        self.positioned
    }

    pub fn accounting(&self) -> &dyn Accounting {
        self.accounting.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            symbol: self.symbol.clone(),
            positioned: self.positioned,
            tracker: *self.tracker.state(),
            turning_point: *self.turning.point(),
            ticks: self.ticks,
            trades: self.trades,
            cumulative_notional: self.cumulative_notional,
            profit: self.accounting.profit(),
        }
    }

    /// Feed every configured price field of a bar, in order
    pub fn on_candle(
        &mut self,
        candle: &Candle,
        executor: &mut dyn ExecutionAdapter,
    ) -> Result<Vec<Decision>, ConfigError> {
        let fields = self.price_fields.clone();
        fields
            .into_iter()
            .map(|field| self.on_tick(candle.price(field), &mut *executor))
            .collect()
    }

    /// Process one observed price.
    ///
    /// Only a failure to build the lazy grid is returned as an error.
    pub fn on_tick(
        &mut self,
        price: f64,
        executor: &mut dyn ExecutionAdapter,
    ) -> Result<Decision, ConfigError> {
        self.ticks += 1;

        if !(price.is_finite() && price > 0.0) {
            let error = TickError::InvalidPrice { price };
            warn!(symbol = %self.symbol, %error, "Ignoring tick");
            return Ok(Decision::Suspended { price, error });
        }

        if self.grid.is_none() {
            if !self.grid_config.in_range(price) {
                self.tracker.observe(price, price);
                return Ok(self.suspend(price));
            }
            self.grid = Some(Self::build_grid(&self.grid_config, price)?);
        }
        let base_price = self.grid.as_ref().map_or(price, PriceGrid::base_price);

        let state = self.tracker.observe(price, base_price);

        if !self.positioned {
            return Ok(self.open_position(price, executor));
        }

        if !self.grid_config.in_range(price) {
            return Ok(self.suspend(price));
        }

        if let Some((lower, upper)) = self.grid.as_ref().and_then(|grid| grid.bounds(price)) {
            debug!(
                symbol = %self.symbol,
                price = format!("{:.3}", price),
                lower,
                upper,
                on_line = lower == upper,
                direction = state.direction.as_i8(),
                tendency = state.tendency.as_i8(),
                "Tick"
            );
        }

        let grid_count = self.crossings(Some(price), state.last_trade_price);
        self.turning
            .refresh(state.direction, state.tendency, state.previous_price);

        let decision = if grid_count != 0 {
            self.evaluate(
                price,
                grid_count,
                CrossingSource::LastTrade,
                state.direction,
                executor,
            )
        } else {
            let reference = self.turning.reference(state.direction);
            let pullback_count = self.crossings(reference, state.last_trade_price);
            if pullback_count != 0 {
                self.evaluate(
                    price,
                    pullback_count,
                    CrossingSource::TurningPoint,
                    state.direction,
                    executor,
                )
            } else {
                Decision::Hold {
                    price,
                    reason: HoldReason::NoCrossing,
                }
            }
        };

        Ok(decision)
    }

    fn build_grid(config: &GridConfig, base: f64) -> Result<PriceGrid, ConfigError> {
        let grid = PriceGrid::build(base, config.min_price, config.max_price, config.width)?;
        info!(
            base = grid.base_price(),
            levels = grid.len(),
            lowest = ?grid.lowest(),
            highest = ?grid.highest(),
            "Price grid built"
        );
        Ok(grid)
    }

    fn crossings(&self, price: Option<f64>, reference: Option<f64>) -> i32 {
        self.grid
            .as_ref()
            .map_or(0, |grid| grid.count_crossings(price, reference))
    }

    fn threshold(&self, kind: CorrectionKind) -> f64 {
        match (self.filters.threshold_mode, kind) {
            (ThresholdMode::Symmetric, _) | (_, CorrectionKind::Drawdown) => {
                self.filters.max_drawdown
            }
            (ThresholdMode::DirectionConditioned, CorrectionKind::Bounce) => {
                self.filters.max_bounce
            }
        }
    }

    fn suspend(&self, price: f64) -> Decision {
        let error = TickError::OutOfRange {
            price,
            min: self.grid_config.min_price,
            max: self.grid_config.max_price,
        };
        warn!(symbol = %self.symbol, %error, "Trading suspended for tick");
        Decision::Suspended { price, error }
    }

    fn submit(
        &self,
        order: &OrderRequest,
        executor: &mut dyn ExecutionAdapter,
    ) -> Result<Fill, TickError> {
        self.limit.check(order)?;
        executor.place_order(order)
    }

    fn open_position(&mut self, price: f64, executor: &mut dyn ExecutionAdapter) -> Decision {
        let quantity = self.sizing.initial_quantity(price);
        let order = OrderRequest::from_signed(
            self.symbol.clone(),
            quantity,
            price,
            OrderPurpose::InitialPosition,
        );

        let fill = match order {
            Some(order) => match self.submit(&order, executor) {
                Ok(fill) => Some(fill),
                Err(error) => {
                    warn!(
                        symbol = %self.symbol,
                        price = format!("{:.3}", price),
                        quantity,
                        %error,
                        "Initial position rejected, retrying next tick"
                    );
                    return Decision::Rejected { price, error };
                }
            },
            None => {
                warn!(
                    symbol = %self.symbol,
                    price = format!("{:.3}", price),
                    lot_size = self.sizing.lot_size,
                    "Initial position rounds to zero lots, starting flat"
                );
                None
            }
        };

        let trade_price = fill.as_ref().map_or(price, |fill| fill.price);
        self.tracker.record_trade(trade_price);
        self.turning.seed(price);
        self.positioned = true;
        if let Some(fill) = &fill {
            self.cumulative_notional += Money::from_f64(fill.notional());
        }

        info!(
            symbol = %self.symbol,
            price = format!("{:.3}", trade_price),
            quantity = fill.as_ref().map_or(0.0, |fill| fill.quantity),
            "Position opened"
        );

        Decision::PositionOpened { price, fill }
    }

    fn evaluate(
        &mut self,
        price: f64,
        grid_count: i32,
        source: CrossingSource,
        direction: Signal,
        executor: &mut dyn ExecutionAdapter,
    ) -> Decision {
        let continuation = (grid_count > 0 && direction == Signal::Up)
            || (grid_count < 0 && direction == Signal::Down);
        if continuation {
            debug!(
                symbol = %self.symbol,
                price = format!("{:.3}", price),
                grid_count,
                source = ?source,
                "Trend continues, no trade"
            );
            return Decision::Hold {
                price,
                reason: HoldReason::Continuation { grid_count, source },
            };
        }

        let kind = if grid_count > 0 {
            CorrectionKind::Drawdown
        } else {
            CorrectionKind::Bounce
        };
        let correction = self.turning.correction(kind, price);
        let threshold = self.threshold(kind);

        if correction.abs() <= threshold {
            debug!(
                symbol = %self.symbol,
                price = format!("{:.3}", price),
                anchor = ?self.turning.anchor(kind),
                kind = ?kind,
                correction = format!("{:.4}", correction),
                threshold,
                "Correction within threshold, no trade"
            );
            return Decision::Hold {
                price,
                reason: HoldReason::BelowThreshold {
                    kind,
                    source,
                    grid_count,
                    correction,
                    threshold,
                },
            };
        }

        let quantity = self
            .sizing
            .round_to_lot(-f64::from(grid_count) * self.sizing.trade_amount);
        let purpose = match kind {
            CorrectionKind::Drawdown => OrderPurpose::Drawdown,
            CorrectionKind::Bounce => OrderPurpose::Bounce,
        };
        let Some(order) = OrderRequest::from_signed(self.symbol.clone(), quantity, price, purpose)
        else {
            debug!(
                symbol = %self.symbol,
                grid_count,
                lot_size = self.sizing.lot_size,
                "Order rounds to zero lots, no trade"
            );
            return Decision::Hold {
                price,
                reason: HoldReason::BelowLot {
                    grid_count,
                    quantity,
                },
            };
        };

        let fill = match self.submit(&order, executor) {
            Ok(fill) => fill,
            Err(error) => {
                warn!(
                    symbol = %self.symbol,
                    side = ?order.side,
                    quantity = order.quantity,
                    price = format!("{:.3}", price),
                    %error,
                    "Grid order rejected"
                );
                return Decision::Rejected { price, error };
            }
        };

        self.tracker.record_trade(fill.price);
        self.turning.reset_after_fill(kind, price);
        self.accounting.record_fill(grid_count, &fill);
        self.cumulative_notional += Money::from_f64(fill.notional());
        self.trades += 1;

        info!(
            symbol = %self.symbol,
            side = ?fill.side,
            quantity = fill.quantity,
            price = format!("{:.3}", fill.price),
            grid_count,
            kind = ?kind,
            source = ?source,
            correction = format!("{:.4}", correction),
            profit = %self.accounting.profit(),
            "Grid trade filled"
        );

        Decision::Traded {
            price,
            trade: GridTrade {
                kind,
                source,
                grid_count,
                correction,
                fill,
            },
        }
    }
}
