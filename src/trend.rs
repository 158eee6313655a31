//! Moving-average trend
//!
//! Stacking order of the 20/50/200 simple moving averages against price,
//! plus the medium-horizon close change.

use serde::Serialize;

use crate::{config::TrendConfig, require_bars, stats, Direction, Result, OHLCV};

/// Ordering of price and the three moving averages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaAlignment {
    /// price > short > medium > long
    StronglyBullish,
    /// price > medium and short > medium
    Bullish,
    Neutral,
    Bearish,
    StronglyBearish,
}

impl MaAlignment {
    pub fn direction(self) -> Direction {
        match self {
            MaAlignment::StronglyBullish | MaAlignment::Bullish => Direction::Bullish,
            MaAlignment::StronglyBearish | MaAlignment::Bearish => Direction::Bearish,
            MaAlignment::Neutral => Direction::Sideways,
        }
    }

    pub fn strength(self) -> f64 {
        match self {
            MaAlignment::StronglyBullish | MaAlignment::StronglyBearish => 85.0,
            MaAlignment::Bullish | MaAlignment::Bearish => 70.0,
            MaAlignment::Neutral => 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub sma_short: f64,
    pub sma_medium: f64,
    pub sma_long: f64,
    pub ma_alignment: MaAlignment,
    /// Percent close change over the medium period
    pub change_pct: f64,
    pub trend_direction: Direction,
}

impl TrendAnalysis {
    /// The moving-average signal follows the alignment
    #[inline]
    pub fn signal(&self) -> (Direction, f64) {
        (self.ma_alignment.direction(), self.ma_alignment.strength())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    pub config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> Result<TrendAnalysis> {
        let long = self.config.long_period.get();
        let medium = self.config.medium_period.get();
        require_bars(bars, long.max(medium + 1))?;

        let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();
        let price = closes[closes.len() - 1];
        // Lengths were checked above
        let sma_short = stats::sma_last(&closes, self.config.short_period.get()).unwrap_or(price);
        let sma_medium = stats::sma_last(&closes, medium).unwrap_or(price);
        let sma_long = stats::sma_last(&closes, long).unwrap_or(price);

        let ma_alignment = if price > sma_short && sma_short > sma_medium && sma_medium > sma_long {
            MaAlignment::StronglyBullish
        } else if price < sma_short && sma_short < sma_medium && sma_medium < sma_long {
            MaAlignment::StronglyBearish
        } else if price > sma_medium && sma_short > sma_medium {
            MaAlignment::Bullish
        } else if price < sma_medium && sma_short < sma_medium {
            MaAlignment::Bearish
        } else {
            MaAlignment::Neutral
        };

        let change_pct = stats::pct_change(closes[closes.len() - 1 - medium], price);
        let threshold = self.config.change_threshold_pct;
        let trend_direction = if change_pct > threshold && sma_short >= sma_medium {
            Direction::Bullish
        } else if change_pct < -threshold && sma_short <= sma_medium {
            Direction::Bearish
        } else {
            Direction::Sideways
        };

        Ok(TrendAnalysis {
            sma_short,
            sma_medium,
            sma_long,
            ma_alignment,
            change_pct,
            trend_direction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn closes(f: impl Fn(usize) -> f64, n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = f(i);
                Bar::new(i as i64, c, c, c, c, 1.0)
            })
            .collect()
    }

    #[test]
    fn test_uptrend_strongly_bullish() {
        let bars = closes(|i| 100.0 * 1.001_f64.powi(i as i32), 250);
        let t = TrendAnalyzer::default().analyze(&bars).unwrap();
        assert_eq!(t.ma_alignment, MaAlignment::StronglyBullish);
        assert_eq!(t.trend_direction, Direction::Bullish);
        assert_eq!(t.signal(), (Direction::Bullish, 85.0));
    }

    #[test]
    fn test_downtrend_strongly_bearish() {
        let bars = closes(|i| 300.0 - i as f64 * 0.5, 250);
        let t = TrendAnalyzer::default().analyze(&bars).unwrap();
        assert_eq!(t.ma_alignment, MaAlignment::StronglyBearish);
        assert_eq!(t.trend_direction, Direction::Bearish);
    }

    #[test]
    fn test_flat_is_neutral() {
        let bars = closes(|_| 42.0, 200);
        let t = TrendAnalyzer::default().analyze(&bars).unwrap();
        assert_eq!(t.ma_alignment, MaAlignment::Neutral);
        assert_eq!(t.trend_direction, Direction::Sideways);
        assert_eq!(t.signal(), (Direction::Sideways, 50.0));
    }

    #[test]
    fn test_insufficient_data() {
        let bars = closes(|_| 1.0, 150);
        assert!(matches!(
            TrendAnalyzer::default().analyze(&bars),
            Err(crate::SignalError::InsufficientData { need: 200, .. })
        ));
    }
}
