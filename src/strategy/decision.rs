//! Per-tick decision records
//!
//! A [`Decision`] says which branch of the state machine a tick took. It is
//! telemetry: callers may log or persist it, but nothing depends on it.

use serde::Serialize;

use crate::error::TickError;
use crate::oms::Fill;
use crate::turning_point::CorrectionKind;

/// Which pair of prices produced the crossing count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingSource {
    /// Current price against the last trade price
    LastTrade,
    /// Turning point against the last trade price (cross-line pullback)
    TurningPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HoldReason {
    /// No grid line between the price (or turning point) and the last trade
    NoCrossing,
    /// Price keeps moving the way it crossed
    Continuation {
        grid_count: i32,
        source: CrossingSource,
    },
    /// Retracement not past the drawdown/bounce threshold
    BelowThreshold {
        kind: CorrectionKind,
        source: CrossingSource,
        grid_count: i32,
        correction: f64,
        threshold: f64,
    },
    /// Order quantity rounds to zero lots
    BelowLot { grid_count: i32, quantity: f64 },
}

/// Executed grid trade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridTrade {
    pub kind: CorrectionKind,
    pub source: CrossingSource,
    pub grid_count: i32,
    pub correction: f64,
    pub fill: Fill,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Session position established. `fill` is `None` when the configured
    /// start position rounds to zero lots.
    PositionOpened { price: f64, fill: Option<Fill> },
    /// Price outside `[min_price, max_price]`
    Suspended { price: f64, error: TickError },
    Hold { price: f64, reason: HoldReason },
    Traded { price: f64, trade: GridTrade },
    /// Order refused by the risk guard or the execution adapter
    Rejected { price: f64, error: TickError },
}

impl Decision {
    pub fn price(&self) -> f64 {
        match self {
            Decision::PositionOpened { price, .. }
            | Decision::Suspended { price, .. }
            | Decision::Hold { price, .. }
            | Decision::Traded { price, .. }
            | Decision::Rejected { price, .. } => *price,
        }
    }

    pub fn fill(&self) -> Option<&Fill> {
        match self {
            Decision::PositionOpened { fill, .. } => fill.as_ref(),
            Decision::Traded { trade, .. } => Some(&trade.fill),
            _ => None,
        }
    }

    pub fn is_trade(&self) -> bool {
        matches!(self, Decision::Traded { .. })
    }
}
