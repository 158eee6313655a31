//! Parameter metadata for the engine's tuning constants
//!
//! This module describes the tunable heuristics of [`EngineConfig`], enabling:
//! - Grid search over weights and thresholds
//! - Parameter documentation
//! - Building a config from a flat `name -> value` map
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use signalcore::params::Parameterized;
//! use signalcore::prelude::*;
//!
//! for param in EngineConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut overrides = HashMap::new();
//! overrides.insert("fusion.strong_threshold", 75.0);
//! let config = EngineConfig::with_params(&overrides).unwrap();
//! assert_eq!(config.fusion.strong_threshold, 75.0);
//! ```

use std::collections::HashMap;

use crate::{config::EngineConfig, Period, Ratio, Result, SignalError};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value in 0.0..=1.0 (fusion weights)
  Ratio,
  /// Period value (positive integer, bars)
  Period,
  /// Free-form score or percentage threshold
  Threshold,
}

/// Metadata for a single tunable parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Dotted parameter name (e.g., "fusion.volume_weight")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn threshold(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Threshold, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(SignalError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio | ParamType::Threshold => Ok(()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(SignalError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Trait for configs that expose their tunables
pub trait Parameterized: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a value from a flat parameter map.
  ///
  /// Missing parameters use their default values; unknown names are rejected.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

static ENGINE_PARAMS: [ParamMeta; 14] = [
  ParamMeta::ratio("fusion.fibonacci_weight", 0.25, (0.0, 1.0, 0.05), "Weight of the Fibonacci signal"),
  ParamMeta::ratio(
    "fusion.support_resistance_weight",
    0.30,
    (0.0, 1.0, 0.05),
    "Weight of the support/resistance signal",
  ),
  ParamMeta::ratio("fusion.volume_weight", 0.20, (0.0, 1.0, 0.05), "Weight of the volume signal"),
  ParamMeta::ratio(
    "fusion.moving_average_weight",
    0.15,
    (0.0, 1.0, 0.05),
    "Weight of the moving-average signal",
  ),
  ParamMeta::ratio("fusion.candlestick_weight", 0.10, (0.0, 1.0, 0.05), "Weight of the candlestick signal"),
  ParamMeta::threshold("fusion.strong_threshold", 70.0, (55.0, 90.0, 5.0), "Strength for strong buy/sell"),
  ParamMeta::threshold("fusion.action_threshold", 50.0, (40.0, 70.0, 5.0), "Strength for buy/sell"),
  ParamMeta::threshold("retracement.golden_ratio", 0.618, (0.5, 0.786, 0.001), "Peak of the level strength curve"),
  ParamMeta::period("levels.extreme_window", 20.0, (5.0, 40.0, 5.0), "Half-width of the local-extreme window"),
  ParamMeta::threshold("levels.merge_tolerance_pct", 1.0, (0.25, 3.0, 0.25), "Percent distance merging levels"),
  ParamMeta::threshold("combination.consensus_bonus", 12.0, (0.0, 25.0, 1.0), "Bonus for 4-of-5 agreement"),
  ParamMeta::threshold("combination.very_high_bonus", 15.0, (0.0, 25.0, 1.0), "Bonus for very-high-reliability pairs"),
  ParamMeta::threshold("calculus.volume_sigma", 2.0, (1.0, 4.0, 0.5), "Std-devs above mean for a volume shift"),
  ParamMeta::threshold("insider.max_overall", 15.0, (0.0, 30.0, 1.0), "Bound of the overall insider adjustment"),
];

impl Parameterized for EngineConfig {
  fn param_meta() -> &'static [ParamMeta] {
    &ENGINE_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    for (name, value) in params {
      let meta = ENGINE_PARAMS
        .iter()
        .find(|m| m.name == *name)
        .ok_or_else(|| SignalError::InvalidConfig(format!("unknown parameter '{name}'")))?;
      meta.validate(*value)?;
    }

    let mut config = EngineConfig::default();
    let fusion = &mut config.fusion;
    fusion.fibonacci_weight = get_ratio(params, "fusion.fibonacci_weight", 0.25)?;
    fusion.support_resistance_weight = get_ratio(params, "fusion.support_resistance_weight", 0.30)?;
    fusion.volume_weight = get_ratio(params, "fusion.volume_weight", 0.20)?;
    fusion.moving_average_weight = get_ratio(params, "fusion.moving_average_weight", 0.15)?;
    fusion.candlestick_weight = get_ratio(params, "fusion.candlestick_weight", 0.10)?;
    fusion.strong_threshold = get_value(params, "fusion.strong_threshold", 70.0);
    fusion.action_threshold = get_value(params, "fusion.action_threshold", 50.0);
    config.retracement.golden_ratio = get_value(params, "retracement.golden_ratio", 0.618);
    config.levels.extreme_window = get_period(params, "levels.extreme_window", 20)?;
    config.levels.merge_tolerance_pct = get_value(params, "levels.merge_tolerance_pct", 1.0);
    config.combination.consensus_bonus = get_value(params, "combination.consensus_bonus", 12.0);
    config.combination.very_high_bonus = get_value(params, "combination.very_high_bonus", 15.0);
    config.calculus.volume_sigma = get_value(params, "calculus.volume_sigma", 2.0);
    config.insider.max_overall = get_value(params, "insider.max_overall", 15.0);

    config.validate()?;
    Ok(config)
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  Period::new(value as usize)
}

fn get_value(params: &HashMap<&str, f64>, key: &str, default: f64) -> f64 {
  params.get(key).copied().unwrap_or(default)
}

// ============================================================
// TESTS
// ============================================================
