//! Common helper functions for candlestick pattern detection
//!
//! Candle-shape thresholds shared across all detector modules. Comparisons
//! are made against trailing averages from [`crate::classifier::MarketContext`]
//! and fall back to range ratios when the averages are zero (flat history).

use crate::{OHLCVExt, OHLCV};

// ============================================================
// THRESHOLDS
// ============================================================

/// Body is doji-like: body <= avg_range * DOJI_FACTOR
pub const DOJI_FACTOR: f64 = 0.1;
/// Body is short: body < avg_body * BODY_SHORT_FACTOR
pub const BODY_SHORT_FACTOR: f64 = 1.0;
/// Body is long: body > avg_body * BODY_LONG_FACTOR
pub const BODY_LONG_FACTOR: f64 = 1.0;
/// Shadow is long relative to the bar's own body
pub const SHADOW_LONG_FACTOR: f64 = 2.0;
/// Shadow very short: shadow < avg_range * SHADOW_VERYSHORT_FACTOR
pub const SHADOW_VERYSHORT_FACTOR: f64 = 0.1;
/// Two prices are "equal" within avg_range * EQUAL_FACTOR
pub const EQUAL_FACTOR: f64 = 0.05;

// Fallback ratio-based thresholds (when averages are not meaningful)
pub const DOJI_RATIO: f64 = 0.1;
pub const BODY_SHORT_RATIO: f64 = 0.3;
pub const BODY_LONG_RATIO: f64 = 0.7;
pub const SHADOW_SHORT_RATIO: f64 = 0.1;

/// Trailing window for per-position body averages in multi-bar patterns
pub const CANDLE_AVG_PERIOD: usize = 10;

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// Check if body is doji-like. A zero body is always a doji.
#[inline]
pub fn is_doji(body: f64, avg_range: f64, range: f64, factor: f64) -> bool {
    if body <= 0.0 {
        return true;
    }
    if avg_range > 0.0 {
        body <= avg_range * factor
    } else {
        range > 0.0 && body / range <= DOJI_RATIO
    }
}

/// Check if body is short
#[inline]
pub fn is_body_short(body: f64, avg_body: f64, range: f64, factor: f64) -> bool {
    if avg_body > 0.0 {
        body < avg_body * factor
    } else {
        range > 0.0 && body / range <= BODY_SHORT_RATIO
    }
}

/// Check if body is long
#[inline]
pub fn is_body_long(body: f64, avg_body: f64, range: f64, factor: f64) -> bool {
    if avg_body > 0.0 {
        body > avg_body * factor
    } else {
        range > 0.0 && body / range >= BODY_LONG_RATIO
    }
}

/// Shadow at least `factor` times the body and strictly positive
#[inline]
pub fn is_shadow_long(shadow: f64, body: f64, factor: f64) -> bool {
    shadow > 0.0 && shadow >= body * factor
}

/// Check if shadow is very short
#[inline]
pub fn is_shadow_very_short(shadow: f64, avg_range: f64, range: f64, factor: f64) -> bool {
    if avg_range > 0.0 {
        shadow < avg_range * factor
    } else {
        range > 0.0 && shadow / range <= SHADOW_SHORT_RATIO
    }
}

/// Inverse of [`is_shadow_very_short`]: the shadow is meaningfully long
/// (e.g. the lower shadow of a Dragonfly Doji).
#[inline]
pub fn shadow_exceeds_veryshort(shadow: f64, avg_range: f64, range: f64, factor: f64) -> bool {
    let threshold = avg_range * factor;
    if threshold > 0.0 {
        shadow > threshold
    } else if range > 0.0 {
        shadow / range > SHADOW_SHORT_RATIO
    } else {
        false
    }
}

/// Two prices are equal within a fraction of the average range
#[inline]
pub fn is_near_equal(a: f64, b: f64, avg_range: f64, factor: f64) -> bool {
    let tolerance = if avg_range > 0.0 {
        avg_range * factor
    } else {
        a.abs().max(b.abs()) * 0.001
    };
    (a - b).abs() <= tolerance
}

/// Trailing average body ending just before `at`.
/// Multi-bar patterns judge each candle against its own past.
#[inline]
pub fn trailing_avg_body<T: OHLCV>(bars: &[T], at: usize, period: usize) -> f64 {
    if at == 0 {
        return bars[0].body();
    }
    let slice = &bars[at.saturating_sub(period)..at];
    slice.iter().map(|b| b.body()).sum::<f64>() / slice.len() as f64
}

/// Trailing average range ending just before `at`
#[inline]
pub fn trailing_avg_range<T: OHLCV>(bars: &[T], at: usize, period: usize) -> f64 {
    if at == 0 {
        return bars[0].range();
    }
    let slice = &bars[at.saturating_sub(period)..at];
    slice.iter().map(|b| b.range()).sum::<f64>() / slice.len() as f64
}

/// Body long against the trailing average at position `at`
#[inline]
pub fn is_long_at<T: OHLCV>(bars: &[T], at: usize, factor: f64) -> bool {
    let bar = &bars[at];
    is_body_long(
        bar.body(),
        trailing_avg_body(bars, at, CANDLE_AVG_PERIOD),
        bar.range(),
        factor,
    )
}

/// Body short against the trailing average at position `at`
#[inline]
pub fn is_short_at<T: OHLCV>(bars: &[T], at: usize, factor: f64) -> bool {
    let bar = &bars[at];
    is_body_short(
        bar.body(),
        trailing_avg_body(bars, at, CANDLE_AVG_PERIOD),
        bar.range(),
        factor,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    #[test]
    fn test_zero_body_is_doji() {
        assert!(is_doji(0.0, 0.0, 0.0, DOJI_FACTOR));
        assert!(is_doji(0.5, 10.0, 20.0, DOJI_FACTOR));
        assert!(!is_doji(5.0, 10.0, 20.0, DOJI_FACTOR));
    }

    #[test]
    fn test_ratio_fallbacks() {
        // avg_body == 0 falls back to body/range
        assert!(is_body_short(1.0, 0.0, 10.0, BODY_SHORT_FACTOR));
        assert!(is_body_long(8.0, 0.0, 10.0, BODY_LONG_FACTOR));
        assert!(!is_body_long(0.0, 0.0, 0.0, BODY_LONG_FACTOR));
        assert!(!shadow_exceeds_veryshort(0.0, 0.0, 0.0, SHADOW_VERYSHORT_FACTOR));
    }

    #[test]
    fn test_shadow_long_requires_positive_shadow() {
        assert!(!is_shadow_long(0.0, 0.0, SHADOW_LONG_FACTOR));
        assert!(is_shadow_long(2.0, 1.0, SHADOW_LONG_FACTOR));
        assert!(!is_shadow_long(1.5, 1.0, SHADOW_LONG_FACTOR));
    }

    #[test]
    fn test_trailing_avg_body_excludes_current() {
        let bars = vec![
            Bar::new(0, 100.0, 101.0, 99.0, 101.0, 1.0),
            Bar::new(1, 100.0, 103.0, 99.0, 103.0, 1.0),
            Bar::new(2, 100.0, 120.0, 90.0, 120.0, 1.0),
        ];
        assert_eq!(trailing_avg_body(&bars, 2, 10), 2.0);
        assert_eq!(trailing_avg_range(&bars, 2, 10), 3.0);
        assert_eq!(trailing_avg_body(&bars, 0, 10), 1.0);
    }

    #[test]
    fn test_near_equal() {
        assert!(is_near_equal(100.0, 100.05, 2.0, EQUAL_FACTOR));
        assert!(!is_near_equal(100.0, 100.5, 2.0, EQUAL_FACTOR));
    }
}
