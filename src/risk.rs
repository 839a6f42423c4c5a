//! Pre-trade risk checks
//!
//! The engine does not know the account's position. The only guard it can
//! apply on its own is the notional of the order it is about to send.

use crate::error::TickError;
use crate::oms::OrderRequest;

#[derive(Debug, Clone, Copy)]
pub struct PositionLimit {
    max_position: f64,
}

impl PositionLimit {
    pub fn new(max_position: f64) -> Self {
        Self { max_position }
    }

    /// Reject orders whose notional is above the max position
    pub fn check(&self, order: &OrderRequest) -> Result<(), TickError> {
        let notional = order.notional();
        if notional > self.max_position {
            return Err(TickError::PositionLimit {
                notional,
                max_position: self.max_position,
            });
        }
        Ok(())
    }
}
