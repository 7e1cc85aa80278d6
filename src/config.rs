//! Configuration values for cost delegates.
//!
//! Every config is a small `Copy` value deserializable with serde; missing
//! fields take their defaults so partial documents are accepted.

use serde::{Deserialize, Serialize};

use crate::cost::DeviationMeasure;

/// Penalty charged per unserved request.
///
/// Delegates hold this as one value and replace it as a whole, so readers
/// never observe `enabled` and `weight` from two different calibrations.
///
/// # Examples
///
/// ```
/// use u_route_cost::config::PenaltyConfig;
///
/// let cfg = PenaltyConfig::new(12.5);
/// assert_eq!(cfg.penalty(3), 37.5);
/// assert_eq!(PenaltyConfig::disabled().penalty(3), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyConfig {
    /// Whether unserved requests are penalized.
    pub enabled: bool,
    /// Penalty per unserved request.
    pub weight: f64,
}

impl PenaltyConfig {
    /// An enabled penalty with the given weight.
    pub fn new(weight: f64) -> Self {
        Self {
            enabled: true,
            weight,
        }
    }

    /// No penalty.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            weight: 0.0,
        }
    }

    /// Total penalty for `unserved` requests.
    pub fn penalty(&self, unserved: usize) -> f64 {
        if self.enabled {
            unserved as f64 * self.weight
        } else {
            0.0
        }
    }
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Settings of a [`BalanceDelegate`](crate::cost::BalanceDelegate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// How the spread of tour costs is measured.
    pub measure: DeviationMeasure,
    /// If set, the objective is `sum + weight * deviation`; otherwise the
    /// deviation alone.
    pub penalty_weight: Option<f64>,
    /// Re-score insertions over all tours too, not only the other moves.
    pub penalize_insertions: bool,
}

impl BalanceConfig {
    /// Pure deviation objective with the given measure.
    pub fn new(measure: DeviationMeasure) -> Self {
        Self {
            measure,
            penalty_weight: None,
            penalize_insertions: false,
        }
    }

    /// Adds the deviation to the sum of tour costs with this weight.
    /// Non-finite weights are ignored.
    pub fn with_penalty_weight(mut self, weight: f64) -> Self {
        self.penalty_weight = weight.is_finite().then_some(weight);
        self
    }

    /// Re-score insertion moves over all tours.
    pub fn with_penalized_insertions(mut self, penalize: bool) -> Self {
        self.penalize_insertions = penalize;
        self
    }
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self::new(DeviationMeasure::MaxAbsDev)
    }
}

/// Settings of a [`NoisyDelegate`](crate::cost::NoisyDelegate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Largest absolute perturbation.
    pub max_noise: f64,
}

impl NoiseConfig {
    /// Noise bounded by `max_noise`.
    pub fn new(max_noise: f64) -> Self {
        Self {
            max_noise: max_noise.abs(),
        }
    }

    /// Noise bounded by `eta` times the largest distance of the instance.
    pub fn from_eta(eta: f64, max_distance: f64) -> Self {
        Self::new(eta * max_distance)
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self { max_noise: 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalty_defaults_disabled() {
        let cfg: PenaltyConfig = serde_json::from_str("{}").expect("valid");
        assert_eq!(cfg, PenaltyConfig::disabled());
        assert_eq!(cfg.penalty(10), 0.0);
    }

    #[test]
    fn test_penalty_partial_document() {
        let cfg: PenaltyConfig =
            serde_json::from_str(r#"{"enabled": true, "weight": 4.0}"#).expect("valid");
        assert_eq!(cfg.penalty(2), 8.0);
    }

    #[test]
    fn test_balance_config_from_json() {
        let cfg: BalanceConfig =
            serde_json::from_str(r#"{"measure": "std_dev", "penalty_weight": 0.5}"#)
                .expect("valid");
        assert_eq!(cfg.measure, DeviationMeasure::StdDev);
        assert_eq!(cfg.penalty_weight, Some(0.5));
        assert!(!cfg.penalize_insertions);
    }

    #[test]
    fn test_balance_infinite_weight_ignored() {
        let cfg = BalanceConfig::default().with_penalty_weight(f64::INFINITY);
        assert_eq!(cfg.penalty_weight, None);
    }

    #[test]
    fn test_noise_config() {
        let cfg = NoiseConfig::from_eta(0.1, 50.0);
        assert!((cfg.max_noise - 5.0).abs() < 1e-12);
        let back: NoiseConfig =
            serde_json::from_str(&serde_json::to_string(&cfg).expect("valid")).expect("valid");
        assert_eq!(back, cfg);
    }
}
