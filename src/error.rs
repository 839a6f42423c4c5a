//! Error taxonomy
//!
//! `ConfigError` is fatal and stops a session before it trades.
//! `TickError` is absorbed by the strategy and surfaces only as telemetry.

use serde::Serialize;
use thiserror::Error;

/// Invalid grid or sizing configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("min price ({min}) must be below max price ({max})")]
    InvalidRange { min: f64, max: f64 },

    #[error("base price ({base}) must lie within [{min}, {max}]")]
    BaseOutOfRange { base: f64, min: f64, max: f64 },

    #[error("grid width ({0}) must be within (0, 1)")]
    InvalidWidth(f64),

    #[error("{name} ({value}) is out of bounds: {expected}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("no price fields configured")]
    NoPriceFields,
}

/// Recoverable per-tick failure
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum TickError {
    #[error("price {price} is not a positive finite number")]
    InvalidPrice { price: f64 },

    #[error("price {price} outside trading range [{min}, {max}]")]
    OutOfRange { price: f64, min: f64, max: f64 },

    #[error("order rejected: {reason}")]
    OrderRejected { reason: String },

    #[error("order notional {notional:.2} exceeds max position {max_position:.2}")]
    PositionLimit { notional: f64, max_position: f64 },
}

impl TickError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        TickError::OrderRejected {
            reason: reason.into(),
        }
    }
}
