//! Order and fill types exchanged with the execution adapter

use serde::{Deserialize, Serialize};

use crate::{Side, Symbol};

/// Per-adapter sequence number
pub type OrderId = u64;

/// Why the engine sent an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPurpose {
    /// First order of the session
    InitialPosition,
    /// Selling into a retracement after a run up
    Drawdown,
    /// Buying into a rebound after a run down
    Bounce,
}

/// Market order request. Quantity is always positive; `side` carries the sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: f64,
    /// Price the decision was taken at
    pub reference_price: f64,
    pub purpose: OrderPurpose,
}

impl OrderRequest {
    /// Build from a signed quantity; `None` for a zero quantity
    pub fn from_signed(
        symbol: Symbol,
        signed_quantity: f64,
        reference_price: f64,
        purpose: OrderPurpose,
    ) -> Option<Self> {
        let side = Side::from_signed(signed_quantity)?;
        Some(Self {
            symbol,
            side,
            quantity: signed_quantity.abs(),
            reference_price,
            purpose,
        })
    }

    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity
    }

    /// Absolute notional at the reference price
    pub fn notional(&self) -> f64 {
        self.quantity * self.reference_price
    }
}

/// Confirmed execution reported by the adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
}

impl Fill {
    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity
    }

    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}
