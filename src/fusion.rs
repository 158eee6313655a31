//! Signal fusion
//!
//! Turns the five analyzer outputs into weighted signals, folds them into one
//! overall signal and derives the final recommendation with target, stop and
//! reasoning.

use serde::Serialize;

use crate::{
    adaptive::AdaptiveScore,
    combination::CombinationScore,
    config::FusionConfig,
    insider::InsiderInfluence,
    levels::{FibonacciAnalysis, SupportResistanceLevel},
    trend::TrendAnalysis,
    volume::VolumeAnalysis,
    Direction,
};

const TIE_EPSILON: f64 = 1e-9;

// ============================================================
// TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Fibonacci,
    SupportResistance,
    Volume,
    MovingAverage,
    Candlestick,
}

impl SignalKind {
    pub const ALL: [SignalKind; 5] = [
        SignalKind::Fibonacci,
        SignalKind::SupportResistance,
        SignalKind::Volume,
        SignalKind::MovingAverage,
        SignalKind::Candlestick,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Fibonacci => "fibonacci",
            SignalKind::SupportResistance => "support_resistance",
            SignalKind::Volume => "volume",
            SignalKind::MovingAverage => "moving_average",
            SignalKind::Candlestick => "candlestick",
        }
    }

    /// Horizon the signal speaks to
    pub fn timeframe(self) -> Timeframe {
        match self {
            SignalKind::Volume | SignalKind::Candlestick => Timeframe::Short,
            SignalKind::Fibonacci | SignalKind::MovingAverage => Timeframe::Medium,
            SignalKind::SupportResistance => Timeframe::Long,
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Short,
    Medium,
    Long,
}

/// One analyzer's vote
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedSignal {
    pub kind: SignalKind,
    /// 0..=100
    pub strength: f64,
    pub direction: Direction,
    /// 0..=100
    pub confidence: f64,
    pub timeframe: Timeframe,
    pub weight: f64,
}

impl WeightedSignal {
    pub fn new(kind: SignalKind, direction: Direction, strength: f64, confidence: f64, weight: f64) -> Self {
        Self {
            kind,
            strength: strength.clamp(0.0, 100.0),
            direction,
            confidence: confidence.clamp(0.0, 100.0),
            timeframe: kind.timeframe(),
            weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverallSignal {
    pub direction: Direction,
    pub strength: f64,
    pub confidence: f64,
    /// Sum of strength x weight over signals of each direction
    pub bullish_score: f64,
    pub bearish_score: f64,
    pub sideways_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationAction {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl RecommendationAction {
    pub fn is_strong(self) -> bool {
        matches!(self, RecommendationAction::StrongBuy | RecommendationAction::StrongSell)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecommendationAction::StrongBuy => "strong_buy",
            RecommendationAction::Buy => "buy",
            RecommendationAction::Hold => "hold",
            RecommendationAction::Sell => "sell",
            RecommendationAction::StrongSell => "strong_sell",
        }
    }
}

impl std::fmt::Display for RecommendationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeHorizon {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub action: RecommendationAction,
    pub confidence: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    /// |target - price| / |price - stop|; 0 when the stop sits at price
    pub risk_reward: f64,
    pub time_horizon: TimeHorizon,
    pub reasoning: Vec<String>,
}

/// Borrowed analyzer outputs the fusion step reads
#[derive(Debug, Clone, Copy)]
pub struct FusionInputs<'a> {
    pub current_price: f64,
    pub fibonacci: &'a FibonacciAnalysis,
    pub support_resistance: &'a [SupportResistanceLevel],
    pub volume: &'a VolumeAnalysis,
    pub trend: &'a TrendAnalysis,
    pub combination: &'a CombinationScore,
    pub adaptive: Option<&'a AdaptiveScore>,
    pub insider: &'a InsiderInfluence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionOutput {
    pub signals: Vec<WeightedSignal>,
    pub overall: OverallSignal,
    pub recommendation: Recommendation,
}

// ============================================================
// ENGINE
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    pub config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn fuse(&self, inputs: &FusionInputs<'_>) -> FusionOutput {
        let signals = self.signals(inputs);
        let overall = self.overall(&signals, inputs.insider);
        let recommendation = self.recommend(&overall, &signals, inputs);
        FusionOutput {
            signals,
            overall,
            recommendation,
        }
    }

    /// The five weighted signals, insider adjustments applied.
    pub fn signals(&self, inputs: &FusionInputs<'_>) -> Vec<WeightedSignal> {
        let cfg = &self.config;
        let adj = if inputs.insider.available {
            inputs.insider.adjustments
        } else {
            Default::default()
        };

        let (fib_dir, fib_strength) = inputs.fibonacci.signal();
        let fib_confidence = if inputs.fibonacci.is_degenerate() { 0.0 } else { fib_strength };

        let (sr_dir, sr_strength) = crate::levels::level_signal(inputs.support_resistance, inputs.current_price);
        let sr_confidence = if inputs.support_resistance.is_empty() { 0.0 } else { sr_strength };

        let (vol_dir, vol_strength) = inputs.volume.signal();
        let vol_confidence = 50.0 + inputs.volume.price_volume_correlation.abs() * 50.0;

        let (ma_dir, ma_strength) = inputs.trend.signal();

        let candle_score = match (inputs.adaptive, inputs.combination.window_size) {
            (Some(adaptive), _) => adaptive.score,
            (None, n) if n > 0 => inputs.combination.raw_score,
            _ => 50.0,
        };
        let candle_dir = Direction::from_score(candle_score, cfg.score_dead_band);
        let candle_strength = 50.0 + (candle_score - 50.0).abs();

        vec![
            WeightedSignal::new(
                SignalKind::Fibonacci,
                fib_dir,
                nudge(fib_strength, fib_dir, adj.fibonacci),
                fib_confidence,
                cfg.fibonacci_weight.get(),
            ),
            WeightedSignal::new(
                SignalKind::SupportResistance,
                sr_dir,
                sr_strength,
                sr_confidence,
                cfg.support_resistance_weight.get(),
            ),
            WeightedSignal::new(SignalKind::Volume, vol_dir, vol_strength, vol_confidence, cfg.volume_weight.get()),
            WeightedSignal::new(
                SignalKind::MovingAverage,
                ma_dir,
                nudge(ma_strength, ma_dir, adj.moving_average),
                ma_strength,
                cfg.moving_average_weight.get(),
            ),
            WeightedSignal::new(
                SignalKind::Candlestick,
                candle_dir,
                nudge(candle_strength, candle_dir, adj.candlestick),
                inputs.combination.confidence,
                cfg.candlestick_weight.get(),
            ),
        ]
    }

    /// Weighted fold of `signals`.
    pub fn overall(&self, signals: &[WeightedSignal], insider: &InsiderInfluence) -> OverallSignal {
        let total_weight: f64 = signals.iter().map(|s| s.weight).sum();
        let weighted = |f: fn(&WeightedSignal) -> f64| {
            if total_weight > f64::EPSILON {
                signals.iter().map(|s| f(s) * s.weight).sum::<f64>() / total_weight
            } else {
                0.0
            }
        };
        let strength = weighted(|s| s.strength);
        let mut confidence = weighted(|s| s.confidence);

        let score_of = |d: Direction| -> f64 {
            signals
                .iter()
                .filter(|s| s.direction == d)
                .map(|s| s.strength * s.weight)
                .sum()
        };
        let direction = overall_direction(signals);
        if insider.available {
            confidence += insider.adjustments.overall * direction.sign();
        }

        OverallSignal {
            direction,
            strength,
            confidence: confidence.clamp(0.0, 100.0),
            bullish_score: score_of(Direction::Bullish),
            bearish_score: score_of(Direction::Bearish),
            sideways_score: score_of(Direction::Sideways),
        }
    }

    pub fn recommend(
        &self,
        overall: &OverallSignal,
        signals: &[WeightedSignal],
        inputs: &FusionInputs<'_>,
    ) -> Recommendation {
        let cfg = &self.config;
        let action = match overall.direction {
            Direction::Sideways => RecommendationAction::Hold,
            Direction::Bullish if overall.strength > cfg.strong_threshold => RecommendationAction::StrongBuy,
            Direction::Bullish if overall.strength > cfg.action_threshold => RecommendationAction::Buy,
            Direction::Bearish if overall.strength > cfg.strong_threshold => RecommendationAction::StrongSell,
            Direction::Bearish if overall.strength > cfg.action_threshold => RecommendationAction::Sell,
            _ => RecommendationAction::Hold,
        };

        let price = inputs.current_price;
        let level_prices: Vec<f64> = inputs
            .support_resistance
            .iter()
            .map(|l| l.price)
            .chain(inputs.fibonacci.levels.iter().map(|l| l.price))
            .collect();
        let above = level_prices.iter().copied().filter(|&p| p > price).min_by(f64::total_cmp);
        let below = level_prices.iter().copied().filter(|&p| p < price).max_by(f64::total_cmp);
        let up = price * (1.0 + cfg.fallback_pct / 100.0);
        let down = price * (1.0 - cfg.fallback_pct / 100.0);
        let (target_price, stop_loss) = match overall.direction {
            Direction::Bearish => (below.unwrap_or(down), above.unwrap_or(up)),
            Direction::Bullish | Direction::Sideways => (above.unwrap_or(up), below.unwrap_or(down)),
        };

        let risk = (price - stop_loss).abs();
        let risk_reward = if risk > f64::EPSILON {
            (target_price - price).abs() / risk
        } else {
            0.0
        };

        let time_horizon = match action {
            RecommendationAction::StrongBuy | RecommendationAction::StrongSell => TimeHorizon::Short,
            RecommendationAction::Buy | RecommendationAction::Sell => TimeHorizon::Medium,
            RecommendationAction::Hold => TimeHorizon::Long,
        };

        let mut reasoning: Vec<String> = signals
            .iter()
            .map(|s| {
                format!(
                    "{}: {} at {:.0} strength ({:.0}% weight, {:.0} confidence)",
                    s.kind,
                    s.direction,
                    s.strength,
                    s.weight * 100.0,
                    s.confidence
                )
            })
            .collect();
        let insider = inputs.insider;
        if insider.available {
            let source = if insider.simulated { "simulated" } else { "filed" };
            reasoning.push(format!(
                "insider: {} from {} {} trades (overall adjustment {:+.1})",
                insider.sentiment, insider.trade_count, source, insider.adjustments.overall
            ));
        }

        Recommendation {
            action,
            confidence: overall.confidence,
            target_price,
            stop_loss,
            risk_reward,
            time_horizon,
            reasoning,
        }
    }
}

/// Direction of a signal set.
///
/// A set agreeing on one direction returns it. Otherwise the direction with
/// the largest summed strength x weight wins; any tie for the lead is
/// sideways.
pub fn overall_direction(signals: &[WeightedSignal]) -> Direction {
    let Some(first) = signals.first() else {
        return Direction::Sideways;
    };
    if signals.iter().all(|s| s.direction == first.direction) {
        return first.direction;
    }

    let totals = Direction::ALL.map(|d| {
        let total: f64 = signals
            .iter()
            .filter(|s| s.direction == d)
            .map(|s| s.strength * s.weight)
            .sum();
        (d, total)
    });
    let best = totals.iter().map(|&(_, t)| t).fold(f64::NEG_INFINITY, f64::max);
    let leaders: Vec<Direction> = totals
        .iter()
        .filter(|&&(_, t)| (best - t).abs() <= TIE_EPSILON)
        .map(|&(d, _)| d)
        .collect();
    match leaders.as_slice() {
        [only] => *only,
        _ => Direction::Sideways,
    }
}

/// Push a strength by an insider adjustment signed by the signal direction
#[inline]
fn nudge(strength: f64, direction: Direction, adjustment: f64) -> f64 {
    (strength + adjustment * direction.sign()).clamp(0.0, 100.0)
}
