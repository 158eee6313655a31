//! Fibonacci retracements and support/resistance zones
//!
//! Both analyses look at price geometry only. Retracements come from the
//! swing of the trailing `swing_lookback` bars; support/resistance zones come
//! from local extremes over the whole series, scored by how often price came
//! back to them and how recently.

use serde::Serialize;

use crate::{
    config::{LevelConfig, RetracementConfig, FIB_RATIOS},
    require_bars, stats, Direction, Result, OHLCV,
};

// ============================================================
// TYPES
// ============================================================

/// One retracement level of the current swing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FibonacciLevel {
    pub ratio: f64,
    pub price: f64,
    /// Non-zero when the level sits at or below the current price
    pub support_strength: f64,
    /// Non-zero when the level sits at or above the current price
    pub resistance_strength: f64,
}

impl FibonacciLevel {
    #[inline]
    pub fn strength(&self) -> f64 {
        self.support_strength.max(self.resistance_strength)
    }
}

/// Swing geometry and the five retracement levels derived from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibonacciAnalysis {
    pub swing_high: f64,
    pub swing_low: f64,
    pub swing_high_index: usize,
    pub swing_low_index: usize,
    /// Bullish when the swing high came after the swing low
    pub direction: Direction,
    pub current_price: f64,
    pub levels: Vec<FibonacciLevel>,
}

impl FibonacciAnalysis {
    #[inline]
    pub fn range(&self) -> f64 {
        self.swing_high - self.swing_low
    }

    /// Zero-range swing: every level collapses onto one price
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.range() <= f64::EPSILON
    }

    /// Direction and 0..=100 strength of the retracement signal
    pub fn signal(&self) -> (Direction, f64) {
        if self.is_degenerate() {
            return (Direction::Sideways, 50.0);
        }
        let strength = self
            .levels
            .iter()
            .map(FibonacciLevel::strength)
            .fold(0.0, f64::max);
        (self.direction, strength.clamp(0.0, 100.0))
    }
}

/// Which side of price a zone was formed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Support,
    Resistance,
}

/// A horizontal price zone price has reacted to
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SupportResistanceLevel {
    pub price: f64,
    pub strength: f64,
    pub touch_count: usize,
    /// Timestamp of the last bar touching the zone
    pub last_touch: i64,
    pub kind: LevelKind,
}

// ============================================================
// ANALYZER
// ============================================================

/// Computes retracements and support/resistance zones
#[derive(Debug, Clone, Default)]
pub struct LevelAnalyzer {
    pub retracement: RetracementConfig,
    pub levels: LevelConfig,
}

impl LevelAnalyzer {
    pub fn new(retracement: RetracementConfig, levels: LevelConfig) -> Self {
        Self { retracement, levels }
    }

    /// Retracement levels of the trailing swing.
    ///
    /// Fails with `InsufficientData` below `min_bars`.
    pub fn fibonacci<T: OHLCV>(&self, bars: &[T]) -> Result<FibonacciAnalysis> {
        require_bars(bars, self.retracement.min_bars.get())?;

        let lookback = self.retracement.swing_lookback.get();
        let start = bars.len().saturating_sub(lookback);
        let current = bars[bars.len() - 1].close();

        let mut high_idx = start;
        let mut low_idx = start;
        for (i, bar) in bars.iter().enumerate().skip(start) {
            if bar.high() > bars[high_idx].high() {
                high_idx = i;
            }
            if bar.low() < bars[low_idx].low() {
                low_idx = i;
            }
        }

        let swing_high = bars[high_idx].high();
        let swing_low = bars[low_idx].low();
        let range = swing_high - swing_low;
        let direction = if range <= f64::EPSILON {
            Direction::Sideways
        } else if high_idx > low_idx {
            Direction::Bullish
        } else {
            Direction::Bearish
        };

        let levels = FIB_RATIOS
            .iter()
            .map(|&ratio| {
                let price = match direction {
                    Direction::Bearish => swing_low + range * ratio,
                    _ => swing_high - range * ratio,
                };
                self.fib_level(ratio, price, current)
            })
            .collect();

        Ok(FibonacciAnalysis {
            swing_high,
            swing_low,
            swing_high_index: high_idx,
            swing_low_index: low_idx,
            direction,
            current_price: current,
            levels,
        })
    }

    fn fib_level(&self, ratio: f64, price: f64, current: f64) -> FibonacciLevel {
        let distance = if current.abs() <= f64::EPSILON {
            1.0
        } else {
            ((price - current).abs() / current.abs()).clamp(0.0, 1.0)
        };
        let proximity = 1.0 / (1.0 + (ratio - self.retracement.golden_ratio).abs());
        let strength = ((1.0 - distance) * proximity * 100.0).clamp(0.0, 100.0);

        FibonacciLevel {
            ratio,
            price,
            support_strength: if price <= current { strength } else { 0.0 },
            resistance_strength: if price >= current { strength } else { 0.0 },
        }
    }

    /// Consolidated support/resistance zones from local extremes.
    ///
    /// A bar is a local extreme when its high (low) dominates the full
    /// `±extreme_window` neighbourhood, so the first and last `window` bars
    /// never qualify.
    pub fn support_resistance<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<SupportResistanceLevel>> {
        let w = self.levels.extreme_window.get();
        require_bars(bars, 2 * w + 1)?;

        let n = bars.len();
        let mut raw = Vec::new();
        for i in w..n - w {
            let window = &bars[i - w..=i + w];
            let high = bars[i].high();
            let low = bars[i].low();
            if window.iter().all(|b| b.high() <= high) {
                raw.push(self.score_level(bars, high, LevelKind::Resistance));
            }
            if window.iter().all(|b| b.low() >= low) {
                raw.push(self.score_level(bars, low, LevelKind::Support));
            }
        }

        Ok(consolidate(raw, self.levels.merge_tolerance_pct))
    }

    fn score_level<T: OHLCV>(&self, bars: &[T], price: f64, kind: LevelKind) -> SupportResistanceLevel {
        let tol = self.levels.touch_tolerance_pct;
        let n = bars.len();

        let mut touches = 0;
        let mut last = 0;
        for (i, bar) in bars.iter().enumerate() {
            if stats::within_pct(bar.high(), price, tol) || stats::within_pct(bar.low(), price, tol) {
                touches += 1;
                last = i;
            }
        }

        let recency = 1.0 - (n - 1 - last) as f64 / n as f64;
        let touch_score = (touches as f64 * self.levels.touch_weight).min(100.0);
        let recency_share = self.levels.recency_weight / 100.0;
        let strength = (touch_score * (1.0 - recency_share) + recency * self.levels.recency_weight).clamp(0.0, 100.0);

        SupportResistanceLevel {
            price,
            strength,
            touch_count: touches,
            last_touch: bars[last].timestamp(),
            kind,
        }
    }
}

// ============================================================
// LEVEL HELPERS
// ============================================================

/// Merge zones within `tolerance_pct` of each other, keeping the stronger
/// one. Repeats until no pair is left to merge, so applying it twice yields
/// the same set. Output is sorted by price.
pub fn consolidate(mut levels: Vec<SupportResistanceLevel>, tolerance_pct: f64) -> Vec<SupportResistanceLevel> {
    levels.sort_by(|a, b| a.price.total_cmp(&b.price));

    loop {
        let before = levels.len();
        let mut merged: Vec<SupportResistanceLevel> = Vec::with_capacity(before);
        for level in levels {
            match merged.last_mut() {
                Some(last) if stats::within_pct(last.price, level.price, tolerance_pct) => {
                    if level.strength > last.strength {
                        *last = level;
                    }
                }
                _ => merged.push(level),
            }
        }
        levels = merged;
        if levels.len() == before {
            return levels;
        }
    }
}

/// Highest zone at or below `price`
pub fn nearest_support(levels: &[SupportResistanceLevel], price: f64) -> Option<&SupportResistanceLevel> {
    levels
        .iter()
        .filter(|l| l.price <= price)
        .max_by(|a, b| a.price.total_cmp(&b.price))
}

/// Lowest zone at or above `price`
pub fn nearest_resistance(levels: &[SupportResistanceLevel], price: f64) -> Option<&SupportResistanceLevel> {
    levels
        .iter()
        .filter(|l| l.price >= price)
        .min_by(|a, b| a.price.total_cmp(&b.price))
}

/// Direction and strength implied by where price sits between the nearest
/// support and resistance.
///
/// Bottom 30% of the channel is bullish, top 30% bearish. A zone sitting
/// exactly at price counts as both support and resistance, which leaves a
/// zero-width channel and a neutral signal.
pub fn level_signal(levels: &[SupportResistanceLevel], price: f64) -> (Direction, f64) {
    match (nearest_support(levels, price), nearest_resistance(levels, price)) {
        (None, None) => (Direction::Sideways, 50.0),
        (Some(s), None) => (Direction::Bullish, s.strength),
        (None, Some(r)) => (Direction::Bearish, r.strength),
        (Some(s), Some(r)) => {
            let width = r.price - s.price;
            if width <= f64::EPSILON {
                return (Direction::Sideways, 50.0);
            }
            let position = (price - s.price) / width;
            if position < 0.3 {
                (Direction::Bullish, s.strength)
            } else if position > 0.7 {
                (Direction::Bearish, r.strength)
            } else {
                (Direction::Sideways, (s.strength + r.strength) / 2.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn series(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * 1_000, c, c * 1.001, c * 0.999, c, 1_000.0))
            .collect()
    }

    fn level(price: f64, strength: f64) -> SupportResistanceLevel {
        SupportResistanceLevel {
            price,
            strength,
            touch_count: 1,
            last_touch: 0,
            kind: LevelKind::Support,
        }
    }

    #[test]
    fn test_fibonacci_requires_min_bars() {
        let analyzer = LevelAnalyzer::default();
        let bars = series(&[100.0; 199]);
        assert!(matches!(
            analyzer.fibonacci(&bars),
            Err(crate::SignalError::InsufficientData { need: 200, got: 199 })
        ));
    }

    #[test]
    fn test_bullish_swing_levels() {
        // Falls to 90 then climbs to 120; high follows low
        let mut closes = vec![100.0; 150];
        closes.extend((0..25).map(|i| 100.0 - i as f64 * 0.4));
        closes.extend((0..25).map(|i| 90.0 + i as f64 * 1.25));
        let bars = series(&closes);

        let fib = LevelAnalyzer::default().fibonacci(&bars).unwrap();
        assert_eq!(fib.direction, Direction::Bullish);
        assert!(fib.swing_high_index > fib.swing_low_index);
        assert_eq!(fib.levels.len(), 5);

        let range = fib.range();
        for (lvl, ratio) in fib.levels.iter().zip(FIB_RATIOS) {
            assert!((lvl.price - (fib.swing_high - range * ratio)).abs() < 1e-9);
            assert!(lvl.price >= fib.swing_low && lvl.price <= fib.swing_high);
            // Every level is below the last close: support only
            assert_eq!(lvl.resistance_strength, 0.0);
            assert!(lvl.support_strength > 0.0);
        }

        // Golden ratio carries the largest proximity weight
        let golden = fib.levels[3];
        assert!(golden.support_strength > fib.levels[4].support_strength);
    }

    #[test]
    fn test_flat_swing_is_degenerate() {
        let bars: Vec<Bar> = (0..200).map(|i| Bar::new(i, 50.0, 50.0, 50.0, 50.0, 10.0)).collect();
        let fib = LevelAnalyzer::default().fibonacci(&bars).unwrap();
        assert!(fib.is_degenerate());
        assert_eq!(fib.signal(), (Direction::Sideways, 50.0));
        assert!(fib.levels.iter().all(|l| l.price == 50.0));
    }

    #[test]
    fn test_single_peak_is_resistance() {
        let mut closes = vec![100.0; 30];
        closes.push(110.0);
        closes.extend(vec![100.0; 30]);
        let bars = series(&closes);

        let levels = LevelAnalyzer::default().support_resistance(&bars).unwrap();
        let peak = levels
            .iter()
            .find(|l| l.kind == LevelKind::Resistance && l.price > 109.0)
            .unwrap();
        assert_eq!(peak.touch_count, 1);
        assert!(peak.strength > 0.0 && peak.strength <= 100.0);
    }

    #[test]
    fn test_consolidate_keeps_stronger() {
        let merged = consolidate(vec![level(100.0, 40.0), level(100.5, 70.0), level(120.0, 10.0)], 1.0);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].price, 100.5);
        assert_eq!(merged[1].price, 120.0);
        assert_eq!(consolidate(merged.clone(), 1.0), merged);
    }

    #[test]
    fn test_level_signal_positions() {
        let levels = vec![level(90.0, 60.0), level(110.0, 80.0)];
        assert_eq!(level_signal(&levels, 92.0), (Direction::Bullish, 60.0));
        assert_eq!(level_signal(&levels, 108.0), (Direction::Bearish, 80.0));
        assert_eq!(level_signal(&levels, 100.0), (Direction::Sideways, 70.0));
        assert_eq!(level_signal(&levels[..1], 95.0), (Direction::Bullish, 60.0));
        assert_eq!(level_signal(&[], 95.0), (Direction::Sideways, 50.0));
        assert_eq!(level_signal(&[level(95.0, 90.0)], 95.0), (Direction::Sideways, 50.0));
    }
}
