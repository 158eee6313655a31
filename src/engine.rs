//! Orchestrating engine
//!
//! [`SignalEngine`] owns one instance of every analyzer and runs them over a
//! bar series in dependency order. It holds no state between calls and is
//! `Send + Sync`, so one engine can serve many threads. [`analyze_parallel`]
//! fans a set of symbols out over rayon.

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::{
    adaptive::{AdaptiveScore, AdaptiveScorer},
    calculus::{CalculusAnalysis, CalculusDetector},
    classifier::{ClassifierBuilder, DefaultClassifier, PatternOccurrence},
    combination::{CombinationScore, CombinationScorer},
    config::{EngineConfig, FusionConfig},
    fusion::{FusionEngine, FusionInputs, OverallSignal, Recommendation, WeightedSignal},
    insider::{InsiderAnalyzer, InsiderFeedProvider, InsiderInfluence},
    levels::{FibonacciAnalysis, LevelAnalyzer, SupportResistanceLevel},
    require_bars,
    trend::{TrendAnalysis, TrendAnalyzer},
    validate_bars,
    volume::{VolumeAnalysis, VolumeAnalyzer},
    Result, SignalError, OHLCV,
};

// ============================================================
// OUTPUT
// ============================================================

/// Everything one call computes, ending in the recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalAnalysis {
    pub symbol: Option<String>,
    pub timestamp: i64,
    pub current_price: f64,
    pub fibonacci: FibonacciAnalysis,
    pub support_resistance: Vec<SupportResistanceLevel>,
    pub volume: VolumeAnalysis,
    pub trend: TrendAnalysis,
    /// Most recent occurrences, oldest first
    pub patterns: Vec<PatternOccurrence>,
    pub combination: CombinationScore,
    /// Present once enough history exists to score outcomes
    pub adaptive: Option<AdaptiveScore>,
    pub calculus: CalculusAnalysis,
    pub insider: InsiderInfluence,
    pub signals: Vec<WeightedSignal>,
    pub overall: OverallSignal,
    pub recommendation: Recommendation,
}

// ============================================================
// ENGINE
// ============================================================

/// Stateless signal engine. Build with [`EngineBuilder`].
#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: EngineConfig,
    levels: LevelAnalyzer,
    volume: VolumeAnalyzer,
    trend: TrendAnalyzer,
    classifier: DefaultClassifier,
    combination: CombinationScorer,
    adaptive: AdaptiveScorer,
    calculus: CalculusDetector,
    insider: InsiderAnalyzer,
    fusion: FusionEngine,
}

impl SignalEngine {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bars the full pipeline needs
    #[inline]
    pub fn min_bars(&self) -> usize {
        self.config.retracement.min_bars.get()
    }

    /// Analyze an unnamed series. Insider trades are requested without a symbol.
    pub fn analyze<T, P>(&self, bars: &[T], provider: &P) -> Result<TechnicalAnalysis>
    where
        T: OHLCV + Sync,
        P: InsiderFeedProvider + ?Sized,
    {
        self.run(None, bars, provider)
    }

    pub fn analyze_symbol<T, P>(&self, symbol: &str, bars: &[T], provider: &P) -> Result<TechnicalAnalysis>
    where
        T: OHLCV + Sync,
        P: InsiderFeedProvider + ?Sized,
    {
        self.run(Some(symbol), bars, provider)
    }

    fn run<T, P>(&self, symbol: Option<&str>, bars: &[T], provider: &P) -> Result<TechnicalAnalysis>
    where
        T: OHLCV + Sync,
        P: InsiderFeedProvider + ?Sized,
    {
        if self.config.validate_data {
            validate_bars(bars)?;
        }
        require_bars(bars, self.min_bars())?;

        // Geometry, volume, trend and the pattern scan only read the bars
        let ((fibonacci, support_resistance), ((volume, trend), history)) = rayon::join(
            || rayon::join(|| self.levels.fibonacci(bars), || self.levels.support_resistance(bars)),
            || {
                rayon::join(
                    || rayon::join(|| self.volume.analyze(bars), || self.trend.analyze(bars)),
                    || self.classifier.scan_history(bars),
                )
            },
        );
        let fibonacci = fibonacci?;
        let support_resistance = support_resistance?;
        let volume = volume?;
        let trend = trend?;

        let patterns = self.classifier.recent(&history).to_vec();
        let combination = self.combination.score(&patterns);
        let adaptive = self.adaptive.score(&history, bars);

        let insider = self.insider.influence(provider, symbol, bars);
        let calculus = self.calculus.analyze(bars, insider.adjustments.overall);

        let last = &bars[bars.len() - 1];
        let current_price = last.close();
        let fused = self.fusion.fuse(&FusionInputs {
            current_price,
            fibonacci: &fibonacci,
            support_resistance: &support_resistance,
            volume: &volume,
            trend: &trend,
            combination: &combination,
            adaptive: adaptive.as_ref(),
            insider: &insider,
        });

        debug!(
            "Analyzed {} ({} bars): {} patterns, {} levels, {} critical points, {} -> {} ({:.1} strength, {:.1} confidence)",
            symbol.unwrap_or("<unnamed>"),
            bars.len(),
            history.len(),
            support_resistance.len(),
            calculus.critical_points.len(),
            fused.overall.direction,
            fused.recommendation.action,
            fused.overall.strength,
            fused.recommendation.confidence
        );

        Ok(TechnicalAnalysis {
            symbol: symbol.map(str::to_string),
            timestamp: last.timestamp(),
            current_price,
            fibonacci,
            support_resistance,
            volume,
            trend,
            patterns,
            combination,
            adaptive,
            calculus,
            insider,
            signals: fused.signals,
            overall: fused.overall,
            recommendation: fused.recommendation,
        })
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`SignalEngine`]
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn fusion(mut self, fusion: FusionConfig) -> Self {
        self.config.fusion = fusion;
        self
    }

    /// Toggle bar validation (on by default)
    pub fn validate_data(mut self, enabled: bool) -> Self {
        self.config.validate_data = enabled;
        self
    }

    /// Validate the configuration and build the engine
    pub fn build(self) -> Result<SignalEngine> {
        let config = self.config;
        config.validate()?;

        let classifier = ClassifierBuilder::new()
            .with_all_defaults()
            .config(config.patterns.clone())
            .build()?;

        Ok(SignalEngine {
            levels: LevelAnalyzer::new(config.retracement.clone(), config.levels.clone()),
            volume: VolumeAnalyzer::new(config.volume.clone()),
            trend: TrendAnalyzer::new(config.trend.clone()),
            classifier,
            combination: CombinationScorer::new(config.combination.clone()),
            adaptive: AdaptiveScorer::new(config.adaptive.clone()),
            calculus: CalculusDetector::new(config.calculus.clone()),
            insider: InsiderAnalyzer::new(config.insider.clone()),
            fusion: FusionEngine::new(config.fusion.clone()),
            config,
        })
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

/// Result of analyzing a single instrument
#[derive(Debug, Clone, Serialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub analysis: TechnicalAnalysis,
}

/// Error from analyzing a single instrument
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisError {
    pub symbol: String,
    pub error: SignalError,
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.symbol, self.error)
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Analyze many instruments in parallel, splitting successes from failures.
pub fn analyze_parallel<'a, T, I, P>(
    engine: &SignalEngine,
    instruments: I,
    provider: &P,
) -> (Vec<SymbolAnalysis>, Vec<AnalysisError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
    P: InsiderFeedProvider + ?Sized,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .analyze_symbol(symbol, bars, provider)
                .map(|analysis| SymbolAnalysis {
                    symbol: symbol.to_string(),
                    analysis,
                })
                .map_err(|error| AnalysisError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{insider::SyntheticFeed, Bar};

    fn assert_send_sync<T: Send + Sync>() {}

    fn flat(n: usize) -> Vec<Bar> {
        (0..n).map(|i| Bar::new(i as i64 * 60_000, 10.0, 10.0, 10.0, 10.0, 100.0)).collect()
    }

    #[test]
    fn test_engine_is_send_sync() {
        assert_send_sync::<SignalEngine>();
    }

    #[test]
    fn test_builder_rejects_bad_weights() {
        let mut config = EngineConfig::default();
        config.fusion.volume_weight = crate::Ratio::new_const(0.9);
        assert!(matches!(
            EngineBuilder::new().config(config).build(),
            Err(SignalError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_insufficient_bars() {
        let engine = EngineBuilder::new().build().unwrap();
        let err = engine.analyze(&flat(150), &SyntheticFeed::default()).unwrap_err();
        assert_eq!(err, SignalError::InsufficientData { need: 200, got: 150 });
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let mut bars = flat(210);
        bars[5].timestamp = bars[4].timestamp;

        let strict = EngineBuilder::new().build().unwrap();
        assert!(matches!(
            strict.analyze(&bars, &SyntheticFeed::default()),
            Err(SignalError::InvalidBar { index: 5, .. })
        ));

        let lenient = EngineBuilder::new().validate_data(false).build().unwrap();
        assert!(lenient.analyze(&bars, &SyntheticFeed::default()).is_ok());
    }

    #[test]
    fn test_parallel_splits_errors() {
        let engine = EngineBuilder::new().build().unwrap();
        let good = flat(220);
        let short = flat(20);
        let instruments = vec![("GOOD", good.as_slice()), ("SHORT", short.as_slice())];

        let (ok, errors) = analyze_parallel(&engine, instruments, &SyntheticFeed::default());
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].symbol, "GOOD");
        assert_eq!(ok[0].analysis.symbol.as_deref(), Some("GOOD"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "SHORT");
    }
}
