//! Engine configuration
//!
//! Every analyzer reads its thresholds from one of the structs below. The
//! defaults are the hand-tuned heuristics the engine ships with; change them
//! for experiments, not for production parity.

use serde::{Deserialize, Serialize};

use crate::{Period, Ratio, Result, SignalError};

/// Fixed Fibonacci retracement ratios
pub const FIB_RATIOS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];

/// Forward horizons (in bars) measured for every historical pattern
pub const OUTCOME_HORIZONS: [usize; 4] = [1, 3, 5, 10];

// ============================================================
// PER-ANALYZER CONFIGS
// ============================================================

/// Fibonacci retracement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetracementConfig {
    /// Bars required by the full pipeline
    pub min_bars: Period,
    /// Trailing bars searched for the swing high/low
    pub swing_lookback: Period,
    /// Ratio the strength curve peaks at
    pub golden_ratio: f64,
}

impl Default for RetracementConfig {
    fn default() -> Self {
        Self {
            min_bars: Period::new_const(200),
            swing_lookback: Period::new_const(100),
            golden_ratio: 0.618,
        }
    }
}

/// Support/resistance extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Half-width of the local-extreme window (bar i vs i-w..=i+w)
    pub extreme_window: Period,
    /// A bar touches a level when its high or low is within this percent
    pub touch_tolerance_pct: f64,
    /// Levels within this percent of each other are merged
    pub merge_tolerance_pct: f64,
    /// Strength granted per touch
    pub touch_weight: f64,
    /// Strength share (0..=100) granted for recency
    pub recency_weight: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            extreme_window: Period::new_const(20),
            touch_tolerance_pct: 1.0,
            merge_tolerance_pct: 1.0,
            touch_weight: 10.0,
            recency_weight: 30.0,
        }
    }
}

/// Volume regime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub lookback: Period,
    pub spike_window: Period,
    pub accumulation_window: Period,
    /// |slope| above this (volume units per bar) is a trend
    pub trend_slope_threshold: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(50),
            spike_window: Period::new_const(10),
            accumulation_window: Period::new_const(20),
            trend_slope_threshold: 0.1,
        }
    }
}

/// Moving-average trend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub short_period: Period,
    pub medium_period: Period,
    pub long_period: Period,
    /// Close change over `medium_period` bars (percent) needed for a trend
    pub change_threshold_pct: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            short_period: Period::new_const(20),
            medium_period: Period::new_const(50),
            long_period: Period::new_const(200),
            change_threshold_pct: 2.0,
        }
    }
}

/// Pattern classifier output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Most recent occurrences kept in the capped output
    pub capacity: Period,
    /// First bar index scanned (the 5th bar)
    pub scan_start: usize,
    /// Drop occurrences weaker than this
    pub min_strength: Option<f64>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            capacity: Period::new_const(15),
            scan_start: 4,
            min_strength: None,
        }
    }
}

/// Combination bonus table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinationConfig {
    pub window: Period,
    pub very_high_threshold: f64,
    pub very_high_bonus: f64,
    pub reversal_confirmation_bonus: f64,
    pub continuation_bonus: f64,
    pub support_resistance_bonus: f64,
    pub consensus_bonus: f64,
    pub consensus_min: usize,
    pub mixed_confidence_cap: f64,
    pub max_confidence: f64,
    pub agreement_max: f64,
    pub reliability_presence_max: f64,
    /// Reliability at or above which an occurrence counts toward the
    /// presence bonus
    pub reliability_presence_threshold: f64,
    pub rule_bonus: f64,
    pub multi_candle_bonus: f64,
}

impl Default for CombinationConfig {
    fn default() -> Self {
        Self {
            window: Period::new_const(5),
            very_high_threshold: 85.0,
            very_high_bonus: 15.0,
            reversal_confirmation_bonus: 10.0,
            continuation_bonus: 8.0,
            support_resistance_bonus: 7.0,
            consensus_bonus: 12.0,
            consensus_min: 4,
            mixed_confidence_cap: 60.0,
            max_confidence: 95.0,
            agreement_max: 40.0,
            reliability_presence_max: 25.0,
            reliability_presence_threshold: 75.0,
            rule_bonus: 5.0,
            multi_candle_bonus: 15.0,
        }
    }
}

/// Temporal adaptive scoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Horizon (bars) that decides whether an occurrence was correct
    pub evaluation_horizon: usize,
    /// |move| below this percent counts as a correct sideways call
    pub sideways_tolerance_pct: f64,
    pub min_occurrences: usize,
    pub min_frequency_window: usize,
    pub frequency_change_pct: f64,
    pub regime_shift_kinds: usize,
    pub dominance_ratio: f64,
    pub recent_count: usize,
    pub base_spread: f64,
    pub trend_following_max: f64,
    pub frequency_max: f64,
    pub evolution_max: f64,
    /// Tolerance (score points) for the evolution trend comparisons
    pub evolution_tolerance: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            evaluation_horizon: 5,
            sideways_tolerance_pct: 1.0,
            min_occurrences: 5,
            min_frequency_window: 5,
            frequency_change_pct: 50.0,
            regime_shift_kinds: 3,
            dominance_ratio: 1.5,
            recent_count: 10,
            base_spread: 30.0,
            trend_following_max: 15.0,
            frequency_max: 10.0,
            evolution_max: 10.0,
            evolution_tolerance: 1.0,
        }
    }
}

/// Calculus detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculusConfig {
    /// Derivatives smaller than this fraction of the price count as zero
    pub derivative_tolerance: f64,
    pub volume_window: Period,
    pub volume_sigma: f64,
    pub entry_proximity_pct: f64,
    /// Bars back from the end a local minimum must lie within to be "recent"
    pub recent_min_lookback: usize,
    pub holding_fraction: f64,
    pub optimistic_pct: f64,
    pub realistic_pct: f64,
    pub pessimistic_pct: f64,
}

impl Default for CalculusConfig {
    fn default() -> Self {
        Self {
            derivative_tolerance: 1e-9,
            volume_window: Period::new_const(20),
            volume_sigma: 2.0,
            entry_proximity_pct: 3.0,
            recent_min_lookback: 30,
            holding_fraction: 0.6,
            optimistic_pct: 15.0,
            realistic_pct: 5.0,
            pessimistic_pct: -10.0,
        }
    }
}

/// Insider influence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsiderConfig {
    pub window_days: i64,
    /// Share of the combined imbalance taken from weighted volume (rest from trade counts)
    pub volume_share: Ratio,
    /// |combined imbalance| above this is directional
    pub sentiment_threshold: f64,
    pub max_overall: f64,
    pub max_candlestick: f64,
    pub max_moving_average: f64,
    pub max_fibonacci: f64,
}

impl Default for InsiderConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            volume_share: Ratio::new_const(0.7),
            sentiment_threshold: 0.2,
            max_overall: 15.0,
            max_candlestick: 15.0,
            max_moving_average: 10.0,
            max_fibonacci: 8.0,
        }
    }
}

/// Fusion weights and recommendation thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub fibonacci_weight: Ratio,
    pub support_resistance_weight: Ratio,
    pub volume_weight: Ratio,
    pub moving_average_weight: Ratio,
    pub candlestick_weight: Ratio,
    pub strong_threshold: f64,
    pub action_threshold: f64,
    /// Target/stop distance (percent) when no level qualifies
    pub fallback_pct: f64,
    /// Dead band around 50 for score-derived directions
    pub score_dead_band: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            fibonacci_weight: Ratio::new_const(0.25),
            support_resistance_weight: Ratio::new_const(0.30),
            volume_weight: Ratio::new_const(0.20),
            moving_average_weight: Ratio::new_const(0.15),
            candlestick_weight: Ratio::new_const(0.10),
            strong_threshold: 70.0,
            action_threshold: 50.0,
            fallback_pct: 10.0,
            score_dead_band: 5.0,
        }
    }
}

impl FusionConfig {
    pub fn total_weight(&self) -> f64 {
        self.fibonacci_weight.get()
            + self.support_resistance_weight.get()
            + self.volume_weight.get()
            + self.moving_average_weight.get()
            + self.candlestick_weight.get()
    }
}

// ============================================================
// ENGINE CONFIG
// ============================================================

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reject NaN / inverted / out-of-order bars before analysis
    pub validate_data: bool,
    pub retracement: RetracementConfig,
    pub levels: LevelConfig,
    pub volume: VolumeConfig,
    pub trend: TrendConfig,
    pub patterns: PatternConfig,
    pub combination: CombinationConfig,
    pub adaptive: AdaptiveConfig,
    pub calculus: CalculusConfig,
    pub insider: InsiderConfig,
    pub fusion: FusionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validate_data: true,
            retracement: RetracementConfig::default(),
            levels: LevelConfig::default(),
            volume: VolumeConfig::default(),
            trend: TrendConfig::default(),
            patterns: PatternConfig::default(),
            combination: CombinationConfig::default(),
            adaptive: AdaptiveConfig::default(),
            calculus: CalculusConfig::default(),
            insider: InsiderConfig::default(),
            fusion: FusionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Check cross-field invariants the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        let total = self.fusion.total_weight();
        if (total - 1.0).abs() > 1e-6 {
            return Err(SignalError::InvalidConfig(format!(
                "fusion weights must sum to 1.0, got {total:.4}"
            )));
        }
        if self.fusion.strong_threshold < self.fusion.action_threshold {
            return Err(SignalError::InvalidConfig(
                "strong_threshold must be >= action_threshold".to_string(),
            ));
        }
        if self.retracement.swing_lookback > self.retracement.min_bars {
            return Err(SignalError::InvalidConfig(
                "swing_lookback cannot exceed min_bars".to_string(),
            ));
        }
        if self.trend.long_period > self.retracement.min_bars {
            return Err(SignalError::InvalidConfig(
                "long moving average cannot exceed min_bars".to_string(),
            ));
        }
        if self.volume.spike_window > self.volume.lookback
            || self.volume.accumulation_window > self.volume.lookback
        {
            return Err(SignalError::InvalidConfig(
                "volume sub-windows cannot exceed the lookback".to_string(),
            ));
        }
        if self.patterns.scan_start > 4 {
            return Err(SignalError::OutOfRange {
                field: "patterns.scan_start",
                value: self.patterns.scan_start as f64,
                min: 0.0,
                max: 4.0,
            });
        }
        if !(0.0..=100.0).contains(&self.combination.max_confidence) {
            return Err(SignalError::OutOfRange {
                field: "combination.max_confidence",
                value: self.combination.max_confidence,
                min: 0.0,
                max: 100.0,
            });
        }
        if self.adaptive.evaluation_horizon == 0 {
            return Err(SignalError::InvalidValue("evaluation_horizon must be > 0"));
        }
        if self.adaptive.dominance_ratio < 1.0 {
            return Err(SignalError::InvalidConfig(
                "dominance_ratio must be >= 1.0".to_string(),
            ));
        }
        if self.calculus.derivative_tolerance < 0.0 || self.calculus.volume_sigma <= 0.0 {
            return Err(SignalError::InvalidConfig(
                "derivative_tolerance must be >= 0 and volume_sigma > 0".to_string(),
            ));
        }
        if self.insider.window_days <= 0 {
            return Err(SignalError::InvalidValue("insider window_days must be > 0"));
        }
        Ok(())
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let fusion = FusionConfig::default();
        assert!((fusion.total_weight() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = EngineConfig::default();
        config.fusion.candlestick_weight = Ratio::new_const(0.5);
        assert!(matches!(
            config.validate(),
            Err(SignalError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_thresholds_ordering() {
        let mut config = EngineConfig::default();
        config.fusion.strong_threshold = 40.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "fusion": { "strong_threshold": 80.0 }, "validate_data": false }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!(!config.validate_data);
        assert_eq!(config.fusion.strong_threshold, 80.0);
        assert_eq!(config.fusion.action_threshold, 50.0);
        assert_eq!(config.levels.extreme_window.get(), 20);
    }

    #[test]
    fn test_invalid_ratio_rejected_on_deserialize() {
        let json = r#"{ "fusion": { "volume_weight": 1.5 } }"#;
        assert!(serde_json::from_str::<EngineConfig>(json).is_err());
    }
}
