//! Candlestick pattern classifier
//!
//! A fixed catalog of [`PatternKind`]s, each with a base strength, a
//! reliability prior, a direction, an arity and a class. Detectors in
//! [`crate::detectors`] evaluate the candle-shape predicates; the
//! [`PatternClassifier`] scans every bar from the 5th onward and emits every
//! kind that applies (kinds are not mutually exclusive).

use serde::Serialize;

use crate::{config::PatternConfig, detectors::*, Direction, OHLCVExt, Period, Result, OHLCV};

// ============================================================
// CATALOG
// ============================================================

/// Reliability prior of a pattern kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Reliability {
    #[inline]
    pub fn score(self) -> f64 {
        match self {
            Reliability::VeryHigh => 85.0,
            Reliability::High => 75.0,
            Reliability::Medium => 65.0,
            Reliability::Low => 55.0,
        }
    }
}

/// Role a pattern plays when occurrences are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternClass {
    /// Signals a turn of the prevailing move
    Reversal,
    /// Confirms a move already under way
    Confirmation,
    /// Pause inside a trend that resumes
    Continuation,
    /// Single-candle rejection at a support or resistance zone
    SupportResistance,
    Indecision,
}

/// Market context a pattern is documented to need. Declared only; the
/// classifier does not verify it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredContext {
    Any,
    Uptrend,
    Downtrend,
}

/// Every pattern type the classifier knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    // Single bar
    Doji,
    DragonflyDoji,
    GravestoneDoji,
    Hammer,
    HangingMan,
    InvertedHammer,
    ShootingStar,
    SpinningTop,
    BullishMarubozu,
    BearishMarubozu,
    // Two bar
    BullishEngulfing,
    BearishEngulfing,
    PiercingLine,
    DarkCloudCover,
    BullishHarami,
    BearishHarami,
    TweezerTop,
    TweezerBottom,
    // Three bar
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    ThreeInsideUp,
    ThreeInsideDown,
    // Five bar
    RisingThreeMethods,
    FallingThreeMethods,
}

/// Static attributes of one catalog entry
#[derive(Debug, Clone, Copy)]
pub struct PatternSpec {
    pub base_strength: f64,
    pub reliability: Reliability,
    pub direction: Direction,
    pub arity: usize,
    pub class: PatternClass,
    pub context: RequiredContext,
}

const fn spec(
    base_strength: f64,
    reliability: Reliability,
    direction: Direction,
    arity: usize,
    class: PatternClass,
    context: RequiredContext,
) -> PatternSpec {
    PatternSpec { base_strength, reliability, direction, arity, class, context }
}

impl PatternKind {
    pub const ALL: [PatternKind; 26] = [
        PatternKind::Doji,
        PatternKind::DragonflyDoji,
        PatternKind::GravestoneDoji,
        PatternKind::Hammer,
        PatternKind::HangingMan,
        PatternKind::InvertedHammer,
        PatternKind::ShootingStar,
        PatternKind::SpinningTop,
        PatternKind::BullishMarubozu,
        PatternKind::BearishMarubozu,
        PatternKind::BullishEngulfing,
        PatternKind::BearishEngulfing,
        PatternKind::PiercingLine,
        PatternKind::DarkCloudCover,
        PatternKind::BullishHarami,
        PatternKind::BearishHarami,
        PatternKind::TweezerTop,
        PatternKind::TweezerBottom,
        PatternKind::MorningStar,
        PatternKind::EveningStar,
        PatternKind::ThreeWhiteSoldiers,
        PatternKind::ThreeBlackCrows,
        PatternKind::ThreeInsideUp,
        PatternKind::ThreeInsideDown,
        PatternKind::RisingThreeMethods,
        PatternKind::FallingThreeMethods,
    ];

    /// Catalog entry for this kind
    pub const fn spec(self) -> PatternSpec {
        use Direction::{Bearish, Bullish, Sideways};
        use PatternClass::*;
        use Reliability::*;
        use RequiredContext::{Any, Downtrend, Uptrend};

        match self {
            PatternKind::Doji => spec(50.0, Low, Sideways, 1, Indecision, Any),
            PatternKind::DragonflyDoji => spec(60.0, Medium, Bullish, 1, SupportResistance, Downtrend),
            PatternKind::GravestoneDoji => spec(60.0, Medium, Bearish, 1, SupportResistance, Uptrend),
            PatternKind::Hammer => spec(65.0, High, Bullish, 1, SupportResistance, Downtrend),
            PatternKind::HangingMan => spec(60.0, Medium, Bearish, 1, SupportResistance, Uptrend),
            PatternKind::InvertedHammer => spec(55.0, Medium, Bullish, 1, SupportResistance, Downtrend),
            PatternKind::ShootingStar => spec(65.0, High, Bearish, 1, SupportResistance, Uptrend),
            PatternKind::SpinningTop => spec(40.0, Low, Sideways, 1, Indecision, Any),
            PatternKind::BullishMarubozu => spec(70.0, High, Bullish, 1, Confirmation, Any),
            PatternKind::BearishMarubozu => spec(70.0, High, Bearish, 1, Confirmation, Any),
            PatternKind::BullishEngulfing => spec(75.0, VeryHigh, Bullish, 2, Reversal, Downtrend),
            PatternKind::BearishEngulfing => spec(75.0, VeryHigh, Bearish, 2, Reversal, Uptrend),
            PatternKind::PiercingLine => spec(70.0, High, Bullish, 2, Reversal, Downtrend),
            PatternKind::DarkCloudCover => spec(70.0, High, Bearish, 2, Reversal, Uptrend),
            PatternKind::BullishHarami => spec(55.0, Medium, Bullish, 2, Reversal, Downtrend),
            PatternKind::BearishHarami => spec(55.0, Medium, Bearish, 2, Reversal, Uptrend),
            PatternKind::TweezerTop => spec(60.0, Medium, Bearish, 2, Reversal, Uptrend),
            PatternKind::TweezerBottom => spec(60.0, Medium, Bullish, 2, Reversal, Downtrend),
            PatternKind::MorningStar => spec(80.0, VeryHigh, Bullish, 3, Reversal, Downtrend),
            PatternKind::EveningStar => spec(80.0, VeryHigh, Bearish, 3, Reversal, Uptrend),
            PatternKind::ThreeWhiteSoldiers => spec(85.0, VeryHigh, Bullish, 3, Confirmation, Any),
            PatternKind::ThreeBlackCrows => spec(85.0, VeryHigh, Bearish, 3, Confirmation, Any),
            PatternKind::ThreeInsideUp => spec(70.0, High, Bullish, 3, Confirmation, Downtrend),
            PatternKind::ThreeInsideDown => spec(70.0, High, Bearish, 3, Confirmation, Uptrend),
            PatternKind::RisingThreeMethods => spec(75.0, High, Bullish, 5, Continuation, Uptrend),
            PatternKind::FallingThreeMethods => spec(75.0, High, Bearish, 5, Continuation, Downtrend),
        }
    }

    #[inline]
    pub fn direction(self) -> Direction {
        self.spec().direction
    }

    #[inline]
    pub fn arity(self) -> usize {
        self.spec().arity
    }

    #[inline]
    pub fn class(self) -> PatternClass {
        self.spec().class
    }

    #[inline]
    pub fn reliability(self) -> Reliability {
        self.spec().reliability
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::Doji => "doji",
            PatternKind::DragonflyDoji => "dragonfly_doji",
            PatternKind::GravestoneDoji => "gravestone_doji",
            PatternKind::Hammer => "hammer",
            PatternKind::HangingMan => "hanging_man",
            PatternKind::InvertedHammer => "inverted_hammer",
            PatternKind::ShootingStar => "shooting_star",
            PatternKind::SpinningTop => "spinning_top",
            PatternKind::BullishMarubozu => "bullish_marubozu",
            PatternKind::BearishMarubozu => "bearish_marubozu",
            PatternKind::BullishEngulfing => "bullish_engulfing",
            PatternKind::BearishEngulfing => "bearish_engulfing",
            PatternKind::PiercingLine => "piercing_line",
            PatternKind::DarkCloudCover => "dark_cloud_cover",
            PatternKind::BullishHarami => "bullish_harami",
            PatternKind::BearishHarami => "bearish_harami",
            PatternKind::TweezerTop => "tweezer_top",
            PatternKind::TweezerBottom => "tweezer_bottom",
            PatternKind::MorningStar => "morning_star",
            PatternKind::EveningStar => "evening_star",
            PatternKind::ThreeWhiteSoldiers => "three_white_soldiers",
            PatternKind::ThreeBlackCrows => "three_black_crows",
            PatternKind::ThreeInsideUp => "three_inside_up",
            PatternKind::ThreeInsideDown => "three_inside_down",
            PatternKind::RisingThreeMethods => "rising_three_methods",
            PatternKind::FallingThreeMethods => "falling_three_methods",
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, time-stamped match of a catalog entry. Immutable once emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatternOccurrence {
    pub kind: PatternKind,
    /// Index of the last bar of the pattern
    pub index: usize,
    pub timestamp: i64,
    pub strength: f64,
    pub reliability: f64,
    pub direction: Direction,
    pub arity: usize,
    pub required_context: RequiredContext,
}

impl PatternOccurrence {
    pub fn new(kind: PatternKind, index: usize, timestamp: i64) -> Self {
        let spec = kind.spec();
        Self {
            kind,
            index,
            timestamp,
            strength: spec.base_strength,
            reliability: spec.reliability.score(),
            direction: spec.direction,
            arity: spec.arity,
            required_context: spec.context,
        }
    }

    #[inline]
    pub fn class(&self) -> PatternClass {
        self.kind.class()
    }

    #[inline]
    pub fn is_multi_candle(&self) -> bool {
        self.arity > 1
    }
}

// ============================================================
// DETECTOR TRAIT
// ============================================================

/// Raw detector hit - Copy, no allocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch {
    pub kind: PatternKind,
    pub start_index: usize,
    pub end_index: usize,
}

/// Candle-shape predicate for one pattern family
pub trait PatternDetector: Send + Sync {
    /// Kinds this detector may emit
    fn kinds(&self) -> &'static [PatternKind];

    fn min_bars(&self) -> usize {
        self.kinds().first().map_or(1, |k| k.arity())
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Option<PatternMatch>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// MARKET CONTEXT
// ============================================================

/// Trailing candle averages at a specific bar
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarketContext {
    /// Average body size over the lookback (current bar excluded)
    pub avg_body: f64,
    /// Average range (high - low) over the lookback
    pub avg_range: f64,
}

/// Provider of market context - precomputes context for all bars
pub trait ContextProvider: Send + Sync {
    fn compute_all<T: OHLCV>(&self, bars: &[T]) -> Vec<MarketContext>;
}

/// Trailing simple averages over `candle_period` bars
#[derive(Debug, Clone)]
pub struct DefaultContextProvider {
    pub candle_period: Period,
}

impl Default for DefaultContextProvider {
    fn default() -> Self {
        Self {
            candle_period: Period::new_const(10),
        }
    }
}

impl ContextProvider for DefaultContextProvider {
    fn compute_all<T: OHLCV>(&self, bars: &[T]) -> Vec<MarketContext> {
        let period = self.candle_period.get();
        let mut contexts = Vec::with_capacity(bars.len());

        for i in 0..bars.len() {
            // Averages cover bars[i-period..i]; bar i is judged against its past.
            let ctx = if i == 0 {
                MarketContext {
                    avg_body: bars[0].body(),
                    avg_range: bars[0].range(),
                }
            } else {
                let trail = &bars[i.saturating_sub(period)..i];
                let n = trail.len() as f64;
                let (body, range) = trail
                    .iter()
                    .fold((0.0, 0.0), |(b, r), bar| (b + bar.body(), r + bar.range()));
                MarketContext {
                    avg_body: body / n,
                    avg_range: range / n,
                }
            };
            contexts.push(ctx);
        }

        contexts
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - enum dispatch, no vtable
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(
                &self,
                bars: &[T],
                index: usize,
                ctx: &MarketContext,
            ) -> Option<PatternMatch> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars, index, ctx)),*
                }
            }

            #[inline]
            pub fn kinds(&self) -> &'static [PatternKind] {
                match self {
                    $(Self::$variant(d) => PatternDetector::kinds(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    // Single bar
    Doji(DojiDetector),
    DragonflyDoji(DragonflyDojiDetector),
    GravestoneDoji(GravestoneDojiDetector),
    Hammer(HammerDetector),
    HangingMan(HangingManDetector),
    InvertedHammer(InvertedHammerDetector),
    ShootingStar(ShootingStarDetector),
    SpinningTop(SpinningTopDetector),
    Marubozu(MarubozuDetector),

    // Two bar
    Engulfing(EngulfingDetector),
    Piercing(PiercingDetector),
    DarkCloudCover(DarkCloudCoverDetector),
    Harami(HaramiDetector),
    TweezerTop(TweezerTopDetector),
    TweezerBottom(TweezerBottomDetector),

    // Three bar
    MorningStar(MorningStarDetector),
    EveningStar(EveningStarDetector),
    ThreeWhiteSoldiers(ThreeWhiteSoldiersDetector),
    ThreeBlackCrows(ThreeBlackCrowsDetector),
    ThreeInside(ThreeInsideDetector),

    // Five bar
    RiseFallThreeMethods(RiseFallThreeMethodsDetector),
}

// ============================================================
// CLASSIFIER
// ============================================================

/// Stateless pattern scanner
#[derive(Debug, Clone)]
pub struct PatternClassifier<C: ContextProvider = DefaultContextProvider> {
    detectors: Vec<BuiltinDetector>,
    context_provider: C,
    config: PatternConfig,
}

impl<C: ContextProvider> PatternClassifier<C> {
    /// Precompute trailing candle averages for all bars.
    #[inline]
    pub fn compute_contexts<T: OHLCV>(&self, bars: &[T]) -> Vec<MarketContext> {
        self.context_provider.compute_all(bars)
    }

    /// Every pattern whose last bar is `index`.
    pub fn scan_at<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Vec<PatternOccurrence> {
        let Some(bar) = bars.get(index) else {
            return Vec::new();
        };
        let mut results = Vec::new();

        for detector in &self.detectors {
            if index + 1 < detector.min_bars() {
                continue;
            }
            if let Some(m) = detector.detect(bars, index, ctx) {
                let occurrence = PatternOccurrence::new(m.kind, m.end_index, bar.timestamp());
                if self.should_include(&occurrence) {
                    results.push(occurrence);
                }
            }
        }

        results
    }

    /// Full occurrence history, oldest first, scanning from the 5th bar.
    pub fn scan_history<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternOccurrence> {
        let contexts = self.compute_contexts(bars);
        let mut history = Vec::new();
        for i in self.config.scan_start..bars.len() {
            history.extend(self.scan_at(bars, i, &contexts[i]));
        }
        history
    }

    /// Most recent occurrences, capped at the configured capacity.
    pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternOccurrence> {
        self.recent(&self.scan_history(bars)).to_vec()
    }

    /// Tail of `history` that fits the output capacity
    pub fn recent<'a>(&self, history: &'a [PatternOccurrence]) -> &'a [PatternOccurrence] {
        let cap = self.config.capacity.get();
        &history[history.len().saturating_sub(cap)..]
    }

    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    fn should_include(&self, occurrence: &PatternOccurrence) -> bool {
        match self.config.min_strength {
            Some(min) => occurrence.strength >= min,
            None => true,
        }
    }

    fn validate(&self) -> Result<()> {
        for d in &self.detectors {
            d.validate_config()?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating PatternClassifier instances
pub struct ClassifierBuilder<C: ContextProvider = DefaultContextProvider> {
    context_provider: C,
    detectors: Vec<BuiltinDetector>,
    config: PatternConfig,
}

impl Default for ClassifierBuilder<DefaultContextProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBuilder<DefaultContextProvider> {
    pub fn new() -> Self {
        Self {
            context_provider: DefaultContextProvider::default(),
            detectors: Vec::new(),
            config: PatternConfig::default(),
        }
    }
}

/// Generate an array of `BuiltinDetector` variants using `Default::default()` for each inner type.
macro_rules! builtin_defaults {
  ($($variant:ident),* $(,)?) => {
    [$(BuiltinDetector::$variant(Default::default())),*]
  };
}

impl<C: ContextProvider> ClassifierBuilder<C> {
    /// Change context provider
    pub fn context_provider<C2: ContextProvider>(self, provider: C2) -> ClassifierBuilder<C2> {
        ClassifierBuilder {
            context_provider: provider,
            detectors: self.detectors,
            config: self.config,
        }
    }

    /// Add the full catalog with default thresholds
    pub fn with_all_defaults(self) -> Self {
        self.with_single_bar_defaults()
            .with_two_bar_defaults()
            .with_three_bar_defaults()
            .with_five_bar_defaults()
    }

    /// Single-bar detectors (9 detectors, 10 kinds)
    pub fn with_single_bar_defaults(mut self) -> Self {
        self.detectors.extend(builtin_defaults![
            Doji,
            DragonflyDoji,
            GravestoneDoji,
            Hammer,
            HangingMan,
            InvertedHammer,
            ShootingStar,
            SpinningTop,
            Marubozu,
        ]);
        self
    }

    /// Two-bar detectors (6 detectors, 8 kinds)
    pub fn with_two_bar_defaults(mut self) -> Self {
        self.detectors.extend(builtin_defaults![
            Engulfing,
            Piercing,
            DarkCloudCover,
            Harami,
            TweezerTop,
            TweezerBottom,
        ]);
        self
    }

    /// Three-bar detectors (5 detectors, 6 kinds)
    pub fn with_three_bar_defaults(mut self) -> Self {
        self.detectors.extend(builtin_defaults![
            MorningStar,
            EveningStar,
            ThreeWhiteSoldiers,
            ThreeBlackCrows,
            ThreeInside,
        ]);
        self
    }

    /// Five-bar detectors
    pub fn with_five_bar_defaults(mut self) -> Self {
        self.detectors.extend(builtin_defaults![RiseFallThreeMethods]);
        self
    }

    /// Add a builtin detector
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, detector: BuiltinDetector) -> Result<Self> {
        detector.validate_config()?;
        self.detectors.push(detector);
        Ok(self)
    }

    /// Replace output settings (capacity, scan start, strength filter)
    pub fn config(mut self, config: PatternConfig) -> Self {
        self.config = config;
        self
    }

    /// Set minimum strength filter
    pub fn min_strength(mut self, strength: f64) -> Self {
        self.config.min_strength = Some(strength);
        self
    }

    /// Build the classifier
    pub fn build(self) -> Result<PatternClassifier<C>> {
        let classifier = PatternClassifier {
            detectors: self.detectors,
            context_provider: self.context_provider,
            config: self.config,
        };
        classifier.validate()?;
        Ok(classifier)
    }
}

/// Default classifier with DefaultContextProvider
pub type DefaultClassifier = PatternClassifier<DefaultContextProvider>;

// ============================================================
// TESTS
// ============================================================
