//! Grid Trader
//!
//! A grid-trading decision engine for a single instrument: a geometric grid
//! of price levels, a tick-to-tick trend tracker, turning-point detection and
//! a drawdown/bounce filtered order state machine, plus a paper broker and a
//! CSV candle feed to drive sessions from the command line.

pub mod accounting;
pub mod config;
pub mod data;
pub mod error;
pub mod grid;
pub mod oms;
pub mod risk;
pub mod strategy;
pub mod tracker;
pub mod turning_point;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, TickError};
pub use grid::PriceGrid;
pub use strategy::{Decision, GridStrategy, SessionSnapshot};
pub use types::*;
