//! Five-bar candlestick pattern detectors
//!
//! Rising/Falling Three Methods: a long candle, three small counter-trend
//! candles held inside its range, then a long candle resuming the trend.

use super::helpers::{self, is_long_at, is_short_at};
use crate::{
    classifier::{MarketContext, PatternDetector, PatternKind, PatternMatch},
    OHLCVExt, OHLCV,
};

impl_with_defaults!(RiseFallThreeMethodsDetector);

/// +1 for white (close >= open), -1 for black
#[inline]
fn colour<T: OHLCV>(bar: &T) -> i32 {
    if bar.close() >= bar.open() {
        1
    } else {
        -1
    }
}

// ============================================================
// RISING/FALLING THREE METHODS
// ============================================================

/// Rising Three Methods (bullish) and Falling Three Methods (bearish)
#[derive(Debug, Clone)]
pub struct RiseFallThreeMethodsDetector {
    pub body_long_factor: f64,
    pub body_short_factor: f64,
}

impl Default for RiseFallThreeMethodsDetector {
    fn default() -> Self {
        Self {
            body_long_factor: helpers::BODY_LONG_FACTOR,
            body_short_factor: helpers::BODY_SHORT_FACTOR,
        }
    }
}

impl PatternDetector for RiseFallThreeMethodsDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::RisingThreeMethods, PatternKind::FallingThreeMethods]
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        _ctx: &MarketContext,
    ) -> Option<PatternMatch> {
        if index < 4 {
            return None;
        }
        let first = bars.get(index - 4)?;
        let middle = bars.get(index - 3..index)?;
        let fifth = bars.get(index)?;

        // First and fifth share a colour, the middle three take the other one
        let c = colour(first);
        if colour(fifth) != c || middle.iter().any(|b| colour(b) != -c) {
            return None;
        }

        if !is_long_at(bars, index - 4, self.body_long_factor)
            || !is_long_at(bars, index, self.body_long_factor)
        {
            return None;
        }
        if (index - 3..index).any(|at| !is_short_at(bars, at, self.body_short_factor)) {
            return None;
        }

        // Middle bodies overlap the first bar's high-low range
        if middle
            .iter()
            .any(|b| b.body_bottom() >= first.high() || b.body_top() <= first.low())
        {
            return None;
        }

        // Middle closes drift against the trend
        let cf = c as f64;
        if middle[1].close() * cf >= middle[0].close() * cf
            || middle[2].close() * cf >= middle[1].close() * cf
        {
            return None;
        }

        // Fifth opens past the fourth close and closes past the first close
        if fifth.open() * cf <= middle[2].close() * cf {
            return None;
        }
        if fifth.close() * cf <= first.close() * cf {
            return None;
        }

        let kind = if c == 1 {
            PatternKind::RisingThreeMethods
        } else {
            PatternKind::FallingThreeMethods
        };

        Some(PatternMatch {
            kind,
            start_index: index - 4,
            end_index: index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn bar(t: i64, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(t, o, h, l, c, 1000.0)
    }

    fn prefix() -> Vec<Bar> {
        (0..5).map(|t| bar(t, 100.0, 101.5, 99.5, 101.0)).collect()
    }

    #[test]
    fn test_rising_three_methods() {
        let mut bars = prefix();
        bars.push(bar(5, 100.0, 106.5, 99.5, 106.0));
        bars.push(bar(6, 105.5, 105.8, 104.8, 105.0));
        bars.push(bar(7, 105.0, 105.3, 104.3, 104.5));
        bars.push(bar(8, 104.5, 104.8, 103.8, 104.0));
        bars.push(bar(9, 104.5, 110.5, 104.2, 110.0));

        let ctx = MarketContext::default();
        let m = RiseFallThreeMethodsDetector::with_defaults().detect(&bars, 9, &ctx).unwrap();
        assert_eq!(m.kind, PatternKind::RisingThreeMethods);
        assert_eq!((m.start_index, m.end_index), (5, 9));
    }

    #[test]
    fn test_falling_three_methods() {
        let mut bars = prefix();
        bars.push(bar(5, 106.0, 106.5, 99.5, 100.0));
        bars.push(bar(6, 100.5, 101.2, 100.2, 101.0));
        bars.push(bar(7, 101.0, 101.7, 100.7, 101.5));
        bars.push(bar(8, 101.5, 102.2, 101.2, 102.0));
        bars.push(bar(9, 101.5, 101.8, 95.5, 96.0));

        let ctx = MarketContext::default();
        let m = RiseFallThreeMethodsDetector::with_defaults().detect(&bars, 9, &ctx).unwrap();
        assert_eq!(m.kind, PatternKind::FallingThreeMethods);
    }

    #[test]
    fn test_rejects_when_middle_breaks_range() {
        let mut bars = prefix();
        bars.push(bar(5, 100.0, 106.5, 99.5, 106.0));
        bars.push(bar(6, 107.5, 108.0, 106.8, 107.0));
        bars.push(bar(7, 105.0, 105.3, 104.3, 104.5));
        bars.push(bar(8, 104.5, 104.8, 103.8, 104.0));
        bars.push(bar(9, 104.5, 110.5, 104.2, 110.0));

        let ctx = MarketContext::default();
        assert!(RiseFallThreeMethodsDetector::with_defaults().detect(&bars, 9, &ctx).is_none());
    }
}
