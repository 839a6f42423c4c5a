//! Execution adapter boundary and the paper broker behind the CLI

use tracing::debug;

use crate::config::PaperConfig;
use crate::error::TickError;
use crate::oms::types::{Fill, OrderId, OrderRequest};
use crate::Side;

/// Places orders with whatever holds the account.
///
/// An `Err` is a rejection: the engine logs it and leaves its trade anchors
/// untouched so the same crossing can trigger again.
pub trait ExecutionAdapter {
    fn place_order(&mut self, order: &OrderRequest) -> Result<Fill, TickError>;
}

/// In-memory broker filling market orders at the reference price.
///
/// Buys fill `slippage` above the reference, sells below. Buys need cash for
/// notional plus commission; sells need holdings unless shorting is allowed.
#[derive(Debug, Clone)]
pub struct PaperBroker {
    commission_rate: f64,
    slippage: f64,
    allow_short: bool,
    cash: f64,
    holdings: f64,
    next_id: OrderId,
    fills: Vec<Fill>,
}

impl PaperBroker {
    pub fn new(config: &PaperConfig) -> Self {
        Self {
            commission_rate: config.commission,
            slippage: config.slippage,
            allow_short: config.allow_short,
            cash: config.initial_cash,
            holdings: 0.0,
            next_id: 1,
            fills: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn holdings(&self) -> f64 {
        self.holdings
    }

    /// Cash plus holdings marked at `price`
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.holdings * price
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn total_commission(&self) -> f64 {
        self.fills.iter().map(|f| f.commission).sum()
    }

    fn fill_price(&self, order: &OrderRequest) -> f64 {
        match order.side {
            Side::Buy => order.reference_price * (1.0 + self.slippage),
            Side::Sell => order.reference_price * (1.0 - self.slippage),
        }
    }
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new(&PaperConfig::default())
    }
}

impl ExecutionAdapter for PaperBroker {
    fn place_order(&mut self, order: &OrderRequest) -> Result<Fill, TickError> {
        if !(order.quantity > 0.0) || !(order.reference_price > 0.0) {
            return Err(TickError::rejected(format!(
                "invalid order: quantity={} price={}",
                order.quantity, order.reference_price
            )));
        }

        let price = self.fill_price(order);
        let notional = price * order.quantity;
        let commission = notional * self.commission_rate;

        match order.side {
            Side::Buy => {
                let cost = notional + commission;
                if cost > self.cash {
                    return Err(TickError::rejected(format!(
                        "insufficient cash: need {:.2}, have {:.2}",
                        cost, self.cash
                    )));
                }
                self.cash -= cost;
                self.holdings += order.quantity;
            }
            Side::Sell => {
                if !self.allow_short && order.quantity > self.holdings {
                    return Err(TickError::rejected(format!(
                        "insufficient holdings: need {}, have {}",
                        order.quantity, self.holdings
                    )));
                }
                self.cash += notional - commission;
                self.holdings -= order.quantity;
            }
        }

        let fill = Fill {
            order_id: self.next_id,
            side: order.side,
            quantity: order.quantity,
            price,
            commission,
        };
        self.next_id += 1;

        debug!(
            symbol = %order.symbol,
            side = ?fill.side,
            quantity = fill.quantity,
            price = format!("{:.4}", fill.price),
            commission = format!("{:.4}", fill.commission),
            "Paper fill"
        );

        self.fills.push(fill.clone());
        Ok(fill)
    }
}
