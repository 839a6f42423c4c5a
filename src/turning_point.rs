//! Turning-point tracking
//!
//! A reversal is a tick where the tick direction and the tendency against
//! the last trade point opposite ways. The previous tick's price is then a
//! turning-point candidate; how candidates are retained depends on the
//! configured [`TurningPointPolicy`].
//!
//! Anchors by policy:
//!
//! | policy | drawdown anchor | bounce anchor | after a fill |
//! |---|---|---|---|
//! | `tightening` | shared price | shared price | shared price = tick price |
//! | `per_direction` | `upper_turning_price` | `lower_turning_price` | traded side = tick price, other side cleared |

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Signal;

/// Which extrema survive successive reversals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurningPointPolicy {
    /// One shared turning price. Falling reversals keep the higher
    /// candidate, rising reversals keep the lower one.
    #[default]
    Tightening,
    /// Separate extrema since the last fill: the highest peak a fall turned
    /// from anchors drawdowns, the lowest trough a rise turned from anchors
    /// bounces. The entry price seeds neither.
    PerDirection,
}

/// Kind of retracement a reversal trade reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionKind {
    /// Price ran up through grid lines and is now falling back
    Drawdown,
    /// Price ran down through grid lines and is now rising back
    Bounce,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TurningPoint {
    /// Peak a falling reversal turned from
    pub upper_turning_price: Option<f64>,
    /// Trough a rising reversal turned from
    pub lower_turning_price: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TurningPointTracker {
    policy: TurningPointPolicy,
    point: TurningPoint,
    /// Most recently stored turning price, whichever side it went to
    latest: Option<f64>,
}

impl TurningPointTracker {
    pub fn new(policy: TurningPointPolicy) -> Self {
        Self {
            policy,
            point: TurningPoint::default(),
            latest: None,
        }
    }

    pub fn point(&self) -> &TurningPoint {
        &self.point
    }

    /// Record `previous_price` as a turning point if this tick is a reversal.
    ///
    /// Returns the stored price when an anchor changed.
    pub fn refresh(
        &mut self,
        direction: Signal,
        tendency: Signal,
        previous_price: Option<f64>,
    ) -> Option<f64> {
        if !direction.opposes(tendency) {
            return None;
        }
        let candidate = previous_price?;

        let replaced = match self.policy {
            TurningPointPolicy::Tightening => {
                let replace = match self.latest {
                    None => true,
                    Some(current) => match direction {
                        Signal::Down => candidate > current,
                        Signal::Up => candidate < current,
                        Signal::Flat => false,
                    },
                };
                if replace {
                    self.set_shared(candidate);
                }
                replace
            }
            TurningPointPolicy::PerDirection => {
                let (slot, replace) = match direction {
                    Signal::Down => {
                        let slot = &mut self.point.upper_turning_price;
                        let higher = slot.map_or(true, |peak| candidate > peak);
                        (slot, higher)
                    }
                    Signal::Up => {
                        let slot = &mut self.point.lower_turning_price;
                        let lower = slot.map_or(true, |trough| candidate < trough);
                        (slot, lower)
                    }
                    Signal::Flat => return None,
                };
                if replace {
                    *slot = Some(candidate);
                    self.latest = Some(candidate);
                }
                replace
            }
        };

        if replaced {
            debug!(
                turning_price = candidate,
                direction = ?direction,
                policy = ?self.policy,
                "Turning point updated"
            );
            Some(candidate)
        } else {
            None
        }
    }

    /// Start tracking from the opening price
    pub fn seed(&mut self, price: f64) {
        match self.policy {
            TurningPointPolicy::Tightening => self.set_shared(price),
            TurningPointPolicy::PerDirection => {
                self.point = TurningPoint::default();
                self.latest = Some(price);
            }
        }
    }

    /// Move the correction baseline to `price` after a confirmed trade
    pub fn reset_after_fill(&mut self, kind: CorrectionKind, price: f64) {
        match self.policy {
            TurningPointPolicy::Tightening => self.set_shared(price),
            TurningPointPolicy::PerDirection => {
                self.point = match kind {
                    CorrectionKind::Drawdown => TurningPoint {
                        upper_turning_price: Some(price),
                        lower_turning_price: None,
                    },
                    CorrectionKind::Bounce => TurningPoint {
                        upper_turning_price: None,
                        lower_turning_price: Some(price),
                    },
                };
                self.latest = Some(price);
            }
        }
    }

    /// Turning price a correction of `kind` is measured from
    pub fn anchor(&self, kind: CorrectionKind) -> Option<f64> {
        match (self.policy, kind) {
            (TurningPointPolicy::Tightening, _) => self.latest,
            (TurningPointPolicy::PerDirection, CorrectionKind::Drawdown) => {
                self.point.upper_turning_price
            }
            (TurningPointPolicy::PerDirection, CorrectionKind::Bounce) => {
                self.point.lower_turning_price
            }
        }
    }

    /// Turning price used to look for a cross-line pullback on this tick
    pub fn reference(&self, direction: Signal) -> Option<f64> {
        match (self.policy, direction) {
            (TurningPointPolicy::Tightening, _) | (_, Signal::Flat) => self.latest,
            (TurningPointPolicy::PerDirection, Signal::Down) => self.point.upper_turning_price,
            (TurningPointPolicy::PerDirection, Signal::Up) => self.point.lower_turning_price,
        }
    }

    /// `(price - anchor) / anchor`, or 0 without an anchor
    pub fn correction(&self, kind: CorrectionKind, price: f64) -> f64 {
        match self.anchor(kind) {
            Some(anchor) if anchor != 0.0 => (price - anchor) / anchor,
            _ => 0.0,
        }
    }

    fn set_shared(&mut self, price: f64) {
        self.point.upper_turning_price = Some(price);
        self.point.lower_turning_price = Some(price);
        self.latest = Some(price);
    }
}
