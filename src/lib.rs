//! # signalcore - technical-signal engine
//!
//! Computes independent analytical signals over a price series (Fibonacci
//! retracements, support/resistance zones, volume regime, moving-average trend,
//! candlestick patterns, calculus-derived extrema with an insider-activity
//! influence model) and fuses them into one weighted recommendation.
//!
//! ## Quick Start
//!
//! ```rust
//! use signalcore::prelude::*;
//!
//! let bars: Vec<Bar> = (0..252)
//!     .map(|t| {
//!         let close = 100.0 * 1.0005_f64.powi(t);
//!         Bar::new(t as i64 * 86_400_000, close, close * 1.002, close * 0.998, close, 1_000.0)
//!     })
//!     .collect();
//!
//! let engine = EngineBuilder::new().build().unwrap();
//! let analysis = engine.analyze(&bars, &SyntheticFeed::default()).unwrap();
//! println!("{:?}", analysis.recommendation.action);
//! ```

pub mod adaptive;
pub mod calculus;
pub mod classifier;
pub mod combination;
pub mod config;
pub mod detectors;
pub mod engine;
pub mod fusion;
pub mod insider;
pub mod levels;
pub mod params;
pub mod stats;
pub mod trend;
pub mod volume;

pub use engine::{analyze_parallel, AnalysisError, EngineBuilder, SignalEngine, SymbolAnalysis};

pub mod prelude {
    pub use crate::{
        // Analyzers
        adaptive::{AdaptiveScore, AdaptiveScorer, PatternOutcome},
        calculus::{
            CalculusAnalysis, CalculusDetector, CriticalKind, CriticalPoint, InflectionKind,
            InflectionPoint, OptimalTrade, ScenarioPrediction, VolumeShift,
        },
        classifier::{
            BuiltinDetector, ClassifierBuilder, ContextProvider, DefaultContextProvider, MarketContext,
            PatternClass, PatternClassifier, PatternDetector, PatternKind, PatternMatch,
            PatternOccurrence, Reliability, RequiredContext,
        },
        combination::{CombinationRule, CombinationScore, CombinationScorer},
        // Configuration
        config::EngineConfig,
        // Detectors
        detectors::*,
        // Engine
        engine::{analyze_parallel, AnalysisError, EngineBuilder, SignalEngine, SymbolAnalysis},
        fusion::{
            FusionEngine, FusionInputs, OverallSignal, Recommendation, RecommendationAction, SignalKind,
            TimeHorizon, Timeframe, WeightedSignal,
        },
        insider::{
            FeedRequest, InsiderAction, InsiderAdjustments, InsiderAnalyzer, InsiderFeedProvider,
            InsiderInfluence, InsiderRole, InsiderTrade, RealFeed, SyntheticFeed,
        },
        levels::{FibonacciAnalysis, FibonacciLevel, LevelAnalyzer, LevelKind, SupportResistanceLevel},
        // Parameters
        params::{get_period, get_ratio, ParamMeta, ParamType, Parameterized},
        trend::{MaAlignment, TrendAnalysis, TrendAnalyzer},
        volume::{VolumeAnalysis, VolumeAnalyzer},
        // Types
        Bar,
        Direction,
        OHLCVExt,
        Period,
        Ratio,
        TechnicalAnalysis,
        OHLCV,
        // Errors
        Result,
        SignalError,
    };
}

pub use engine::TechnicalAnalysis;

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, SignalError>;

/// Errors that can occur during signal generation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("Insider feed unavailable: {0}")]
    FeedUnavailable(String),
}

/// Fails with [`SignalError::InsufficientData`] when `bars` is shorter than `need`.
#[inline]
pub fn require_bars<T>(bars: &[T], need: usize) -> Result<()> {
    if bars.len() < need {
        return Err(SignalError::InsufficientData {
            need,
            got: bars.len(),
        });
    }
    Ok(())
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(SignalError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(SignalError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(SignalError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    /// Bar open time, epoch milliseconds
    fn timestamp(&self) -> i64;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

impl<B: OHLCV + ?Sized> OHLCV for &B {
    fn timestamp(&self) -> i64 {
        (**self).timestamp()
    }

    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }

    fn volume(&self) -> f64 {
        (**self).volume()
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn body_top(&self) -> f64 {
        self.open().max(self.close())
    }

    #[inline]
    fn body_bottom(&self) -> f64 {
        self.open().min(self.close())
    }

    #[inline]
    fn midpoint(&self) -> f64 {
        (self.open() + self.close()) / 2.0
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None if range ~ 0
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let values = [self.open(), self.high(), self.low(), self.close(), self.volume()];
        if values.iter().any(|v| v.is_nan()) {
            return Err(SignalError::InvalidBar {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(SignalError::InvalidBar {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(SignalError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        if self.volume() < 0.0 {
            return Err(SignalError::InvalidBar {
                index: 0,
                reason: "negative volume",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

/// Owned OHLCV observation for one interval
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Validate every bar and require strictly increasing timestamps.
pub fn validate_bars<T: OHLCV>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            SignalError::InvalidBar { reason, .. } => SignalError::InvalidBar { index: i, reason },
            other => other,
        })?;
    }
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].timestamp() <= pair[0].timestamp() {
            return Err(SignalError::InvalidBar {
                index: i + 1,
                reason: "timestamps must be strictly increasing",
            });
        }
    }
    Ok(())
}

// ============================================================
// DIRECTION
// ============================================================

/// Directional bias shared by patterns, signals and the final verdict
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
    #[default]
    Sideways,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::Bullish, Direction::Bearish, Direction::Sideways];

    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    /// +1 for bullish, -1 for bearish, 0 for sideways
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Bearish => -1.0,
            Direction::Sideways => 0.0,
        }
    }

    /// Mirror image: bullish <-> bearish, sideways unchanged
    #[inline]
    pub fn reflect(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
            Direction::Sideways => Direction::Sideways,
        }
    }

    /// Opposite directional bias, `None` for sideways
    #[inline]
    pub fn opposite(self) -> Option<Self> {
        match self {
            Direction::Sideways => None,
            other => Some(other.reflect()),
        }
    }

    /// Direction of a 0..=100 bullishness score with a dead band around 50.
    pub fn from_score(score: f64, dead_band: f64) -> Self {
        if score > 50.0 + dead_band {
            Direction::Bullish
        } else if score < 50.0 - dead_band {
            Direction::Bearish
        } else {
            Direction::Sideways
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Bullish => "bullish",
            Direction::Bearish => "bearish",
            Direction::Sideways => "sideways",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// TESTS
// ============================================================
