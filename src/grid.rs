//! Geometric price grid
//!
//! Levels are generated multiplicatively from a base price, so every step is
//! the same percentage move. Levels are stored rounded to three decimals.

use itertools::Itertools;
use ordered_float::OrderedFloat;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::error::ConfigError;

/// Decimal places kept for each level
pub const LEVEL_PRECISION: u32 = 3;

/// Immutable, strictly ascending set of grid levels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceGrid {
    levels: Vec<f64>,
    base_price: f64,
    width: f64,
}

impl PriceGrid {
    /// Build a grid around `base_price` spanning `[min_price, max_price]`.
    ///
    /// Walks up by `(1 + width)` while the level stays `<= max_price` and
    /// down by `(1 - width)` while it stays `>= min_price`. The base price is
    /// always a member; when rounding would push it past a bound it is
    /// rounded toward the inside instead.
    pub fn build(
        base_price: f64,
        min_price: f64,
        max_price: f64,
        width: f64,
    ) -> Result<Self, ConfigError> {
        validate_bounds(min_price, max_price, width)?;
        if !base_price.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "base_price",
                value: base_price,
                expected: "must be finite",
            });
        }
        if !(min_price..=max_price).contains(&base_price) {
            return Err(ConfigError::BaseOutOfRange {
                base: base_price,
                min: min_price,
                max: max_price,
            });
        }

        let base_level = match round_level(base_price) {
            level if level < min_price => {
                round_level_with(base_price, RoundingStrategy::AwayFromZero)
            }
            level if level > max_price => round_level_with(base_price, RoundingStrategy::ToZero),
            level => level,
        };
        let mut levels = vec![base_level];

        let mut price = base_price;
        loop {
            price *= 1.0 + width;
            if price > max_price {
                break;
            }
            levels.push(round_level(price));
        }

        let mut price = base_price;
        loop {
            price *= 1.0 - width;
            if price < min_price {
                break;
            }
            levels.push(round_level(price));
        }

        // Rounding may push an edge level just past a bound or collapse
        // neighbours at very small widths.
        levels.retain(|&p| p >= min_price && p <= max_price);
        levels.sort_unstable_by_key(|&p| OrderedFloat(p));
        levels.dedup();

        debug_assert!(levels.iter().tuple_windows().all(|(a, b)| a < b));

        tracing::debug!(
            base = base_price,
            min = min_price,
            max = max_price,
            width = width,
            levels = levels.len(),
            "Built price grid"
        );

        Ok(Self {
            levels,
            base_price,
            width,
        })
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn base_price(&self) -> f64 {
        self.base_price
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn lowest(&self) -> Option<f64> {
        self.levels.first().copied()
    }

    pub fn highest(&self) -> Option<f64> {
        self.levels.last().copied()
    }

    /// Number of levels `g` with `low <= g <= high`
    fn levels_between(&self, low: f64, high: f64) -> usize {
        let start = self.levels.partition_point(|&g| g < low);
        let end = self.levels.partition_point(|&g| g <= high);
        end.saturating_sub(start)
    }

    /// Signed number of grid lines crossed moving from `reference` to `price`.
    ///
    /// Positive when `price > reference`, negative when below, zero when
    /// either side is missing, both are equal, or at most one level lies in
    /// the closed interval between them. Antisymmetric in its arguments.
    pub fn count_crossings(&self, price: Option<f64>, reference: Option<f64>) -> i32 {
        let (Some(price), Some(reference)) = (price, reference) else {
            return 0;
        };
        if price == reference {
            return 0;
        }

        let count = self.levels_between(price.min(reference), price.max(reference));
        if count <= 1 {
            return 0;
        }

        let crossed = (count - 1) as i32;
        if price > reference {
            crossed
        } else {
            -crossed
        }
    }

    /// Enclosing levels of `price`.
    ///
    /// Returns the same level twice when the price sits on a grid line and
    /// `None` outside the grid.
    pub fn bounds(&self, price: f64) -> Option<(f64, f64)> {
        let (lowest, highest) = (self.lowest()?, self.highest()?);
        if price < lowest || price > highest {
            return None;
        }

        let idx = self.levels.partition_point(|&g| g < price);
        let upper = self.levels[idx];
        if upper == price {
            return Some((price, price));
        }
        Some((self.levels[idx - 1], upper))
    }
}

/// Range and width checks shared by eager config validation and `build`
pub fn validate_bounds(min_price: f64, max_price: f64, width: f64) -> Result<(), ConfigError> {
    if !(min_price.is_finite() && min_price > 0.0) {
        return Err(ConfigError::InvalidParameter {
            name: "min_price",
            value: min_price,
            expected: "must be positive and finite",
        });
    }
    if !max_price.is_finite() {
        return Err(ConfigError::InvalidParameter {
            name: "max_price",
            value: max_price,
            expected: "must be finite",
        });
    }
    if !(min_price < max_price) {
        return Err(ConfigError::InvalidRange {
            min: min_price,
            max: max_price,
        });
    }
    if !(width > 0.0 && width < 1.0) {
        return Err(ConfigError::InvalidWidth(width));
    }
    if round_level_with(min_price, RoundingStrategy::AwayFromZero) > max_price {
        return Err(ConfigError::InvalidParameter {
            name: "max_price",
            value: max_price,
            expected: "range must hold a price at three decimals",
        });
    }
    Ok(())
}

/// Round through `Decimal` so `1.1 * 1.1` lands on exactly `1.21`
fn round_level(price: f64) -> f64 {
    round_level_with(price, RoundingStrategy::MidpointAwayFromZero)
}

fn round_level_with(price: f64, strategy: RoundingStrategy) -> f64 {
    match Decimal::from_f64(price) {
        Some(d) => {
            let rounded = d.round_dp_with_strategy(LEVEL_PRECISION, strategy);
            rounded.mantissa() as f64 / 10f64.powi(rounded.scale() as i32)
        }
        None => price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_grid() -> PriceGrid {
        PriceGrid::build(1.0, 0.5, 2.0, 0.1).unwrap()
    }

    #[test]
    fn test_build_reference_grid() {
        let grid = sample_grid();
        assert_eq!(
            grid.levels(),
            &[0.531, 0.59, 0.656, 0.729, 0.81, 0.9, 1.0, 1.1, 1.21, 1.331, 1.464, 1.611, 1.772, 1.949]
        );
    }

    #[test]
    fn test_grid_is_strictly_ascending_and_bounded() {
        for (base, min, max, width) in [
            (1.0, 0.1, 100.0, 0.025),
            (2500.0, 1500.0, 5000.0, 0.005),
            (3.0, 2.0, 4.0, 0.005),
            (0.5, 0.5, 0.6, 0.01),
        ] {
            let grid = PriceGrid::build(base, min, max, width).unwrap();
            assert!(grid.levels().iter().tuple_windows().all(|(a, b)| a < b));
            assert!(grid.levels().iter().all(|&p| p >= min && p <= max));
            assert!(grid.levels().contains(&round_level(base)));
        }
    }

    #[test]
    fn test_consecutive_ratios_follow_width() {
        let width = 0.025;
        let grid = PriceGrid::build(10.0, 5.0, 20.0, width).unwrap();
        let levels = grid.levels();
        let base_idx = levels.iter().position(|&p| p == 10.0).unwrap();

        for (a, b) in levels[base_idx..].iter().tuple_windows() {
            assert_relative_eq!(b / a, 1.0 + width, epsilon = 1e-3);
        }
        for (a, b) in levels[..=base_idx].iter().rev().tuple_windows() {
            assert_relative_eq!(b / a, 1.0 - width, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_invalid_configuration() {
        assert_eq!(
            PriceGrid::build(1.0, 2.0, 2.0, 0.1),
            Err(ConfigError::InvalidRange { min: 2.0, max: 2.0 })
        );
        assert!(matches!(
            PriceGrid::build(3.0, 0.5, 2.0, 0.1),
            Err(ConfigError::BaseOutOfRange { .. })
        ));
        assert_eq!(
            PriceGrid::build(1.0, 0.5, 2.0, 1.0),
            Err(ConfigError::InvalidWidth(1.0))
        );
        assert_eq!(
            PriceGrid::build(1.0, 0.5, 2.0, 0.0),
            Err(ConfigError::InvalidWidth(0.0))
        );
        assert!(PriceGrid::build(1.0, 0.0, 2.0, 0.1).is_err());
    }

    #[test]
    fn test_non_finite_bounds_are_rejected() {
        assert!(matches!(
            PriceGrid::build(1.0, 0.5, f64::INFINITY, 0.1),
            Err(ConfigError::InvalidParameter { name: "max_price", .. })
        ));
        assert!(matches!(
            PriceGrid::build(1.0, 0.5, f64::NAN, 0.1),
            Err(ConfigError::InvalidParameter { name: "max_price", .. })
        ));
        assert!(matches!(
            PriceGrid::build(1.0, f64::NEG_INFINITY, 2.0, 0.1),
            Err(ConfigError::InvalidParameter { name: "min_price", .. })
        ));
        assert!(matches!(
            PriceGrid::build(f64::NAN, 0.5, 2.0, 0.1),
            Err(ConfigError::InvalidParameter { name: "base_price", .. })
        ));
        assert!(validate_bounds(0.5, f64::INFINITY, 0.1).is_err());
    }

    #[test]
    fn test_base_level_rounds_inside_bounds() {
        // 0.0004 would round to 0.0, below min
        let grid = PriceGrid::build(0.0004, 0.0001, 1.0, 0.1).unwrap();
        assert!(grid.levels().iter().all(|&p| p >= 0.0001 && p <= 1.0));
        assert_eq!(grid.lowest(), Some(0.001));

        // 1.9996 would round to 2.0, above max
        let grid = PriceGrid::build(1.9996, 1.0, 1.9996, 0.1).unwrap();
        assert_eq!(grid.highest(), Some(1.999));

        // No three-decimal price fits at all
        assert!(matches!(
            PriceGrid::build(0.0002, 0.0001, 0.0004, 0.1),
            Err(ConfigError::InvalidParameter { name: "max_price", .. })
        ));
    }

    #[test]
    fn test_count_crossings_between_adjacent_levels() {
        let grid = sample_grid();
        assert_eq!(grid.count_crossings(Some(1.1), Some(1.0)), 1);
        assert_eq!(grid.count_crossings(Some(1.0), Some(1.1)), -1);
        assert_eq!(grid.count_crossings(Some(1.25), Some(0.95)), 2);
    }

    #[test]
    fn test_count_crossings_needs_two_levels() {
        let grid = sample_grid();
        // Only 1.0 lies in [0.95, 1.05]
        assert_eq!(grid.count_crossings(Some(1.05), Some(0.95)), 0);
        // Endpoint on a level, nothing else inside
        assert_eq!(grid.count_crossings(Some(1.0), Some(1.05)), 0);
        // Between two levels, none inside
        assert_eq!(grid.count_crossings(Some(1.02), Some(1.08)), 0);
    }

    #[test]
    fn test_count_crossings_absent_or_equal() {
        let grid = sample_grid();
        assert_eq!(grid.count_crossings(None, Some(1.0)), 0);
        assert_eq!(grid.count_crossings(Some(1.0), None), 0);
        assert_eq!(grid.count_crossings(Some(1.21), Some(1.21)), 0);
    }

    #[test]
    fn test_count_crossings_antisymmetric() {
        let grid = sample_grid();
        let prices = [0.52, 0.6, 0.73, 0.9, 1.0, 1.05, 1.2, 1.33, 1.7, 1.95];
        for &a in &prices {
            for &b in &prices {
                assert_eq!(
                    grid.count_crossings(Some(a), Some(b)),
                    -grid.count_crossings(Some(b), Some(a))
                );
            }
        }
    }

    #[test]
    fn test_bounds() {
        let grid = sample_grid();
        assert_eq!(grid.bounds(1.21), Some((1.21, 1.21)));
        assert_eq!(grid.bounds(1.15), Some((1.1, 1.21)));
        assert_eq!(grid.bounds(0.531), Some((0.531, 0.531)));
        assert_eq!(grid.bounds(0.52), None);
        assert_eq!(grid.bounds(1.96), None);
    }
}
