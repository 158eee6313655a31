//! Pattern combination scoring
//!
//! Looks at the most recent occurrences together. Patterns that corroborate
//! each other earn strength bonuses; the bonuses feed a 0..=100 bullishness
//! score and a confidence that is capped when the window is split between
//! bulls and bears.
//!
//! Every rule only compares directions for equality, so mirroring all
//! directions mirrors the score (`s -> 100 - s`) and leaves the confidence
//! unchanged.

use serde::Serialize;

use crate::{
    classifier::{PatternClass, PatternOccurrence},
    config::CombinationConfig,
    Direction,
};

/// Bonus rules that can fire on a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationRule {
    /// Two or more very-high-reliability patterns pointing the same way
    VeryHighReliability,
    /// A reversal later confirmed in the same direction
    ReversalConfirmation,
    ContinuationPresent,
    /// Two or more single-candle support/resistance patterns
    SupportResistanceCluster,
    /// Near-unanimous window with no opposing pattern
    Consensus,
}

/// Scored window of occurrences
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinationScore {
    pub window_size: usize,
    pub bullish_count: usize,
    pub bearish_count: usize,
    /// Base strength plus bonuses per occurrence, capped at 100, oldest first
    pub adjusted_strengths: Vec<f64>,
    pub rules: Vec<CombinationRule>,
    /// Both sides present with counts within one of each other
    pub mixed: bool,
    /// 0..=100, above 50 is bullish
    pub raw_score: f64,
    pub confidence: f64,
}

impl CombinationScore {
    fn empty() -> Self {
        Self {
            window_size: 0,
            bullish_count: 0,
            bearish_count: 0,
            adjusted_strengths: Vec::new(),
            rules: Vec::new(),
            mixed: false,
            raw_score: 50.0,
            confidence: 0.0,
        }
    }

    pub fn direction(&self) -> Direction {
        match self.bullish_count.cmp(&self.bearish_count) {
            std::cmp::Ordering::Greater => Direction::Bullish,
            std::cmp::Ordering::Less => Direction::Bearish,
            std::cmp::Ordering::Equal => Direction::Sideways,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CombinationScorer {
    pub config: CombinationConfig,
}

impl CombinationScorer {
    pub fn new(config: CombinationConfig) -> Self {
        Self { config }
    }

    /// Score the last `window` occurrences of `occurrences` (oldest first).
    pub fn score(&self, occurrences: &[PatternOccurrence]) -> CombinationScore {
        let cfg = &self.config;
        let window = &occurrences[occurrences.len().saturating_sub(cfg.window.get())..];
        if window.is_empty() {
            return CombinationScore::empty();
        }

        let n = window.len();
        let count = |d: Direction| window.iter().filter(|o| o.direction == d).count();
        let bullish = count(Direction::Bullish);
        let bearish = count(Direction::Bearish);
        let mixed = bullish > 0 && bearish > 0 && bullish.abs_diff(bearish) <= 1;

        let mut bonus = vec![0.0; n];
        let mut rules = Vec::new();

        // Very-high reliability pairs, per direction
        let mut very_high_fired = false;
        for dir in [Direction::Bullish, Direction::Bearish] {
            let hits: Vec<usize> = (0..n)
                .filter(|&i| window[i].direction == dir && window[i].reliability >= cfg.very_high_threshold)
                .collect();
            if hits.len() >= 2 {
                very_high_fired = true;
                for i in hits {
                    bonus[i] += cfg.very_high_bonus;
                }
            }
        }
        if very_high_fired {
            rules.push(CombinationRule::VeryHighReliability);
        }

        // Reversal followed by a confirmation of the same direction
        let mut confirmed = vec![false; n];
        for i in 0..n {
            let rev = &window[i];
            if rev.class() != PatternClass::Reversal || rev.direction == Direction::Sideways {
                continue;
            }
            let confirmation = (i + 1..n)
                .find(|&j| window[j].class() == PatternClass::Confirmation && window[j].direction == rev.direction);
            if let Some(j) = confirmation {
                confirmed[i] = true;
                confirmed[j] = true;
            }
        }
        if confirmed.iter().any(|&c| c) {
            rules.push(CombinationRule::ReversalConfirmation);
            for (b, &c) in bonus.iter_mut().zip(&confirmed) {
                if c {
                    *b += cfg.reversal_confirmation_bonus;
                }
            }
        }

        let continuations: Vec<usize> = (0..n)
            .filter(|&i| window[i].class() == PatternClass::Continuation)
            .collect();
        if !continuations.is_empty() {
            rules.push(CombinationRule::ContinuationPresent);
            for i in continuations {
                bonus[i] += cfg.continuation_bonus;
            }
        }

        let sr: Vec<usize> = (0..n)
            .filter(|&i| window[i].class() == PatternClass::SupportResistance && !window[i].is_multi_candle())
            .collect();
        if sr.len() >= 2 {
            rules.push(CombinationRule::SupportResistanceCluster);
            for i in sr {
                bonus[i] += cfg.support_resistance_bonus;
            }
        }

        // Consensus: one side holds consensus_min or more, the other none
        let consensus = if bullish >= cfg.consensus_min && bearish == 0 {
            Some(Direction::Bullish)
        } else if bearish >= cfg.consensus_min && bullish == 0 {
            Some(Direction::Bearish)
        } else {
            None
        };
        if let (Some(dir), false) = (consensus, mixed) {
            rules.push(CombinationRule::Consensus);
            for (i, b) in bonus.iter_mut().enumerate() {
                if window[i].direction == dir {
                    *b += cfg.consensus_bonus;
                }
            }
        }

        let adjusted_strengths: Vec<f64> = window
            .iter()
            .zip(&bonus)
            .map(|(o, b)| (o.strength + b).min(100.0))
            .collect();

        let mut bull_sum = 0.0;
        let mut bear_sum = 0.0;
        for (o, s) in window.iter().zip(&adjusted_strengths) {
            match o.direction {
                Direction::Bullish => bull_sum += s,
                Direction::Bearish => bear_sum += s,
                Direction::Sideways => {}
            }
        }
        let total: f64 = adjusted_strengths.iter().sum();
        let raw_score = if total > f64::EPSILON {
            (50.0 + 50.0 * (bull_sum - bear_sum) / total).clamp(0.0, 100.0)
        } else {
            50.0
        };

        let agreement = bullish.max(bearish) as f64 / n as f64 * cfg.agreement_max;
        let reliable = window.iter().filter(|o| o.reliability >= cfg.reliability_presence_threshold).count();
        let presence = reliable as f64 / n as f64 * cfg.reliability_presence_max;
        let multi = window.iter().filter(|o| o.is_multi_candle()).count();
        let mut confidence = agreement + presence + rules.len() as f64 * cfg.rule_bonus;
        if multi >= 2 {
            confidence += cfg.multi_candle_bonus;
        }
        confidence = confidence.min(cfg.max_confidence);
        if mixed {
            confidence = confidence.min(cfg.mixed_confidence_cap);
        }

        CombinationScore {
            window_size: n,
            bullish_count: bullish,
            bearish_count: bearish,
            adjusted_strengths,
            rules,
            mixed,
            raw_score,
            confidence,
        }
    }
}
