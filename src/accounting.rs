//! Pluggable profit bookkeeping for grid trades
//!
//! The engine reports every grid fill to an [`Accounting`] implementation
//! and never reads the result back, so the formula can be swapped without
//! touching decisions.

use serde::{Deserialize, Serialize};

use crate::oms::Fill;
use crate::Money;

/// Selects the accounting hook from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountingMode {
    /// Signed cash flow of grid fills
    #[default]
    Notional,
    /// Always zero
    None,
}

pub trait Accounting: Send {
    fn name(&self) -> &'static str;

    /// Called once per confirmed grid fill (not for the initial position)
    fn record_fill(&mut self, grid_count: i32, fill: &Fill);

    fn profit(&self) -> Money;
}

/// Sell proceeds minus buy costs over grid fills, commissions excluded.
///
/// Ignores the inventory left open, so it reads as realized profit only
/// once the grid is back where it started.
#[derive(Debug, Clone, Default)]
pub struct NotionalLedger {
    cash_flow: Money,
    fills: usize,
}

impl NotionalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fills(&self) -> usize {
        self.fills
    }
}

impl Accounting for NotionalLedger {
    fn name(&self) -> &'static str {
        "notional"
    }

    fn record_fill(&mut self, _grid_count: i32, fill: &Fill) {
        let flow = Money::from_f64(fill.quantity) * Money::from_f64(fill.price);
        self.cash_flow += match fill.side {
            crate::Side::Sell => flow,
            crate::Side::Buy => -flow,
        };
        self.fills += 1;
    }

    fn profit(&self) -> Money {
        self.cash_flow
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullAccounting;

impl Accounting for NullAccounting {
    fn name(&self) -> &'static str {
        "none"
    }

    fn record_fill(&mut self, _grid_count: i32, _fill: &Fill) {}

    fn profit(&self) -> Money {
        Money::ZERO
    }
}

/// Create the accounting hook for a mode
pub fn create(mode: AccountingMode) -> Box<dyn Accounting> {
    match mode {
        AccountingMode::Notional => Box::new(NotionalLedger::new()),
        AccountingMode::None => Box::new(NullAccounting),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Side;
    use rust_decimal_macros::dec;

    fn fill(side: Side, quantity: f64, price: f64) -> Fill {
        Fill {
            order_id: 1,
            side,
            quantity,
            price,
            commission: 0.0,
        }
    }

    #[test]
    fn test_notional_ledger_round_trip_profit() {
        let mut ledger = NotionalLedger::new();
        ledger.record_fill(-1, &fill(Side::Buy, 9000.0, 0.9));
        ledger.record_fill(1, &fill(Side::Sell, 9000.0, 1.0));
        assert_eq!(ledger.profit().inner(), dec!(900));
        assert_eq!(ledger.fills(), 2);
    }

    #[test]
    fn test_null_accounting_is_zero() {
        let mut hook = create(AccountingMode::None);
        hook.record_fill(2, &fill(Side::Sell, 100.0, 3.0));
        assert!(hook.profit().is_zero());
        assert_eq!(hook.name(), "none");
    }
}
