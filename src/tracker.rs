//! Tick-by-tick price and trend tracking

use serde::Serialize;

use crate::Signal;

/// Snapshot of the tracker after a tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TrackerState {
    pub current_price: Option<f64>,
    pub previous_price: Option<f64>,
    pub last_trade_price: Option<f64>,
    /// Current vs previous tick
    pub direction: Signal,
    /// Current vs last trade (or the grid base before any trade)
    pub tendency: Signal,
}

/// Maintains current/previous/last-trade prices and the derived signals.
///
/// `observe` must run exactly once per tick, before turning points and the
/// decision logic read `direction` and `tendency`.
#[derive(Debug, Clone, Default)]
pub struct PriceTracker {
    state: TrackerState,
}

impl PriceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift `current` into `previous`, store `price` and recompute signals.
    ///
    /// `base_price` stands in for the last trade until one is recorded.
    pub fn observe(&mut self, price: f64, base_price: f64) -> TrackerState {
        let state = &mut self.state;
        state.previous_price = state.current_price;
        state.current_price = Some(price);

        state.direction = match state.previous_price {
            Some(previous) => Signal::from_delta(price - previous),
            None => Signal::Flat,
        };
        let reference = state.last_trade_price.unwrap_or(base_price);
        state.tendency = Signal::from_delta(price - reference);

        *state
    }

    /// Record a confirmed fill price
    pub fn record_trade(&mut self, fill_price: f64) {
        self.state.last_trade_price = Some(fill_price);
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_is_flat() {
        let mut tracker = PriceTracker::new();
        let state = tracker.observe(1.02, 1.0);
        assert_eq!(state.previous_price, None);
        assert_eq!(state.direction, Signal::Flat);
        // No trade yet: tendency against the base price
        assert_eq!(state.tendency, Signal::Up);
    }

    #[test]
    fn test_rising_after_trade_is_up_up() {
        let mut tracker = PriceTracker::new();
        tracker.record_trade(95.0);
        tracker.observe(100.0, 90.0);
        let state = tracker.observe(105.0, 90.0);

        assert_eq!(state.previous_price, Some(100.0));
        assert_eq!(state.current_price, Some(105.0));
        assert_eq!(state.direction, Signal::Up);
        assert_eq!(state.tendency, Signal::Up);
    }

    #[test]
    fn test_pullback_above_last_trade() {
        let mut tracker = PriceTracker::new();
        tracker.record_trade(100.0);
        tracker.observe(110.0, 100.0);
        let state = tracker.observe(107.0, 100.0);

        assert_eq!(state.direction, Signal::Down);
        assert_eq!(state.tendency, Signal::Up);
        assert!(state.direction.opposes(state.tendency));
    }

    #[test]
    fn test_flat_tick() {
        let mut tracker = PriceTracker::new();
        tracker.record_trade(100.0);
        tracker.observe(100.0, 100.0);
        let state = tracker.observe(100.0, 100.0);
        assert_eq!(state.direction, Signal::Flat);
        assert_eq!(state.tendency, Signal::Flat);
    }
}
