//! Temporal adaptive scoring
//!
//! Re-scores the candlestick evidence using what the series itself says
//! about past patterns:
//!
//! - **Trend following**: did earlier occurrences call the next 5 bars right?
//! - **Frequency regime**: which side dominates recently, and did the mix of
//!   pattern kinds shift?
//! - **Evolution**: is the quality of patterns improving across the history?
//!
//! The result is a 0..=100 bullishness score, available once the history
//! holds at least `min_occurrences` patterns.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    classifier::{PatternKind, PatternOccurrence},
    config::{AdaptiveConfig, OUTCOME_HORIZONS},
    stats, Direction, OHLCV,
};

// ============================================================
// OUTCOMES
// ============================================================

/// Realized forward moves after one historical occurrence
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatternOutcome {
    pub occurrence: PatternOccurrence,
    /// Percent close change at +1/+3/+5/+10 bars; `None` past the series end
    pub moves: [Option<f64>; 4],
    /// Judged on the evaluation horizon; `None` when it is not yet known
    pub direction_correct: Option<bool>,
}

impl PatternOutcome {
    /// Move at `horizon` bars, if that horizon is tracked and realized
    pub fn move_at(&self, horizon: usize) -> Option<f64> {
        OUTCOME_HORIZONS
            .iter()
            .position(|&h| h == horizon)
            .and_then(|i| self.moves[i])
    }
}

// ============================================================
// COMPONENT RESULTS
// ============================================================

/// Hit rate of past calls
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendFollowing {
    pub evaluated: usize,
    pub success_rate: f64,
    /// Mean evaluation-horizon move per direction, in percent
    pub mean_move_bullish: Option<f64>,
    pub mean_move_bearish: Option<f64>,
    pub mean_move_sideways: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    BullishDominant,
    BearishDominant,
    Mixed,
}

/// Recent vs earlier pattern mix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyAnalysis {
    pub window: usize,
    /// Percent change of each kind's frequency, recent over earlier
    pub changes: Vec<(PatternKind, f64)>,
    pub regime_shift: bool,
    pub regime: Regime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionTrend {
    /// Each third better than the previous one
    Increasing,
    /// Each third worse than the previous one
    Decreasing,
    /// Last third better than the first
    Improving,
    /// Last third worse than the first
    Declining,
    Stable,
}

/// Pattern quality across three equal thirds of the history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evolution {
    pub avg_reliability: [f64; 3],
    pub avg_strength: [f64; 3],
    pub trend: EvolutionTrend,
    /// Percent change of the last third's reliability over the mean of the
    /// first two
    pub reliability_adjustment_pct: f64,
}

/// Final adaptive score and its parts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptiveScore {
    pub score: f64,
    pub base: f64,
    pub trend_following_adjustment: f64,
    pub frequency_adjustment: f64,
    pub evolution_adjustment: f64,
    pub occurrences: usize,
    pub trend_following: TrendFollowing,
    pub frequency: Option<FrequencyAnalysis>,
    pub evolution: Evolution,
}

// ============================================================
// SCORER
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct AdaptiveScorer {
    pub config: AdaptiveConfig,
}

impl AdaptiveScorer {
    pub fn new(config: AdaptiveConfig) -> Self {
        Self { config }
    }

    /// Forward moves for every occurrence in `history`
    pub fn outcomes<T: OHLCV>(&self, history: &[PatternOccurrence], bars: &[T]) -> Vec<PatternOutcome> {
        let horizon = self.config.evaluation_horizon;
        history
            .iter()
            .map(|occ| {
                let start = bars.get(occ.index).map(|b| b.close());
                let forward = |h: usize| -> Option<f64> {
                    let from = start?;
                    let to = bars.get(occ.index + h)?.close();
                    Some(stats::pct_change(from, to))
                };

                let mut moves = [None; 4];
                for (slot, &h) in moves.iter_mut().zip(OUTCOME_HORIZONS.iter()) {
                    *slot = forward(h);
                }

                let direction_correct = forward(horizon).map(|m| match occ.direction {
                    Direction::Bullish => m > 0.0,
                    Direction::Bearish => m < 0.0,
                    Direction::Sideways => m.abs() < self.config.sideways_tolerance_pct,
                });

                PatternOutcome {
                    occurrence: *occ,
                    moves,
                    direction_correct,
                }
            })
            .collect()
    }

    /// Adaptive bullishness score, `None` with too little history
    pub fn score<T: OHLCV>(&self, history: &[PatternOccurrence], bars: &[T]) -> Option<AdaptiveScore> {
        let cfg = &self.config;
        if history.len() < cfg.min_occurrences {
            return None;
        }

        let recent = &history[history.len().saturating_sub(cfg.recent_count)..];
        let bulls = recent.iter().filter(|o| o.direction.is_bullish()).count() as f64;
        let bears = recent.iter().filter(|o| o.direction.is_bearish()).count() as f64;
        let base = if bulls + bears > 0.0 {
            50.0 + cfg.base_spread * (bulls - bears) / (bulls + bears)
        } else {
            50.0
        };
        // Adjustments lean the same way as the base; a neutral base takes none
        let bias = if base > 50.0 + f64::EPSILON {
            1.0
        } else if base < 50.0 - f64::EPSILON {
            -1.0
        } else {
            0.0
        };

        let outcomes = self.outcomes(history, bars);
        let trend_following = self.trend_following(&outcomes);
        let trend_following_adjustment = if trend_following.evaluated > 0 {
            let raw = (trend_following.success_rate - 0.5) * 2.0 * cfg.trend_following_max;
            bias * raw.clamp(-cfg.trend_following_max, cfg.trend_following_max)
        } else {
            0.0
        };

        let frequency = self.frequency(history);
        let frequency_adjustment = frequency.as_ref().map_or(0.0, |f| {
            let adj = match f.regime {
                Regime::BullishDominant => cfg.frequency_max,
                Regime::BearishDominant => -cfg.frequency_max,
                Regime::Mixed => 0.0,
            };
            if f.regime_shift {
                adj / 2.0
            } else {
                adj
            }
        });

        let evolution = self.evolution(history);
        let evolution_adjustment =
            bias * (evolution.reliability_adjustment_pct / 10.0).clamp(-cfg.evolution_max, cfg.evolution_max);

        let score = (base + trend_following_adjustment + frequency_adjustment + evolution_adjustment).clamp(0.0, 100.0);

        Some(AdaptiveScore {
            score,
            base,
            trend_following_adjustment,
            frequency_adjustment,
            evolution_adjustment,
            occurrences: history.len(),
            trend_following,
            frequency,
            evolution,
        })
    }

    fn trend_following(&self, outcomes: &[PatternOutcome]) -> TrendFollowing {
        let horizon = self.config.evaluation_horizon;
        let judged: Vec<&PatternOutcome> = outcomes.iter().filter(|o| o.direction_correct.is_some()).collect();
        let hits = judged.iter().filter(|o| o.direction_correct == Some(true)).count();

        let mean_for = |d: Direction| -> Option<f64> {
            let moves: Vec<f64> = outcomes
                .iter()
                .filter(|o| o.occurrence.direction == d)
                .filter_map(|o| o.move_at(horizon))
                .collect();
            (!moves.is_empty()).then(|| stats::mean(&moves))
        };

        TrendFollowing {
            evaluated: judged.len(),
            success_rate: if judged.is_empty() {
                0.0
            } else {
                hits as f64 / judged.len() as f64
            },
            mean_move_bullish: mean_for(Direction::Bullish),
            mean_move_bearish: mean_for(Direction::Bearish),
            mean_move_sideways: mean_for(Direction::Sideways),
        }
    }

    fn frequency(&self, history: &[PatternOccurrence]) -> Option<FrequencyAnalysis> {
        let cfg = &self.config;
        let n = history.len();
        let window = (n / 3).max(cfg.min_frequency_window);
        if n < 2 * window {
            return None;
        }

        let recent = &history[n - window..];
        let earlier = &history[n - 2 * window..n - window];

        let mut counts: BTreeMap<PatternKind, (usize, usize)> = BTreeMap::new();
        for o in earlier {
            counts.entry(o.kind).or_default().0 += 1;
        }
        for o in recent {
            counts.entry(o.kind).or_default().1 += 1;
        }

        let changes: Vec<(PatternKind, f64)> = counts
            .into_iter()
            .map(|(kind, (before, after))| {
                let change = if before == 0 {
                    100.0
                } else {
                    (after as f64 - before as f64) / before as f64 * 100.0
                };
                (kind, change)
            })
            .collect();
        let shifted = changes.iter().filter(|(_, c)| c.abs() > cfg.frequency_change_pct).count();

        let bulls = recent.iter().filter(|o| o.direction.is_bullish()).count() as f64;
        let bears = recent.iter().filter(|o| o.direction.is_bearish()).count() as f64;
        let regime = if bulls > bears * cfg.dominance_ratio {
            Regime::BullishDominant
        } else if bears > bulls * cfg.dominance_ratio {
            Regime::BearishDominant
        } else {
            Regime::Mixed
        };

        Some(FrequencyAnalysis {
            window,
            changes,
            regime_shift: shifted >= cfg.regime_shift_kinds,
            regime,
        })
    }

    fn evolution(&self, history: &[PatternOccurrence]) -> Evolution {
        let third = (history.len() / 3).max(1);
        let mut avg_reliability = [0.0; 3];
        let mut avg_strength = [0.0; 3];
        for k in 0..3 {
            let start = (k * third).min(history.len());
            let end = if k == 2 { history.len() } else { ((k + 1) * third).min(history.len()) };
            let part = &history[start..end];
            let rel: Vec<f64> = part.iter().map(|o| o.reliability).collect();
            let strength: Vec<f64> = part.iter().map(|o| o.strength).collect();
            avg_reliability[k] = stats::mean(&rel);
            avg_strength[k] = stats::mean(&strength);
        }

        let quality: Vec<f64> = (0..3).map(|k| (avg_reliability[k] + avg_strength[k]) / 2.0).collect();
        let trend = classify_trend(quality[0], quality[1], quality[2], self.config.evolution_tolerance);

        let earlier = (avg_reliability[0] + avg_reliability[1]) / 2.0;
        let reliability_adjustment_pct = if earlier.abs() > f64::EPSILON {
            (avg_reliability[2] - earlier) / earlier * 100.0
        } else {
            0.0
        };

        Evolution {
            avg_reliability,
            avg_strength,
            trend,
            reliability_adjustment_pct,
        }
    }
}

fn classify_trend(a: f64, b: f64, c: f64, tol: f64) -> EvolutionTrend {
    if b > a + tol && c > b + tol {
        EvolutionTrend::Increasing
    } else if b < a - tol && c < b - tol {
        EvolutionTrend::Decreasing
    } else if c > a + tol {
        EvolutionTrend::Improving
    } else if c < a - tol {
        EvolutionTrend::Declining
    } else {
        EvolutionTrend::Stable
    }
}
