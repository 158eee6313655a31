//! Single-bar candlestick pattern detectors
//!
//! Doji, Dragonfly Doji, Gravestone Doji, Hammer, Hanging Man, Inverted Hammer,
//! Shooting Star, Spinning Top, Marubozu (bullish/bearish).
//!
//! Hammer/Hanging Man and Inverted Hammer/Shooting Star share a shape and
//! differ only in the trend they are documented for. That context is not
//! verified, so both members of a pair fire on the same bar.

use super::helpers::{
    self, is_body_long, is_body_short, is_doji, is_shadow_long, is_shadow_very_short,
    shadow_exceeds_veryshort,
};
use crate::{
    classifier::{MarketContext, PatternDetector, PatternKind, PatternMatch},
    OHLCVExt, Ratio, Result, SignalError, OHLCV,
};

impl_with_defaults!(
    DojiDetector,
    DragonflyDojiDetector,
    GravestoneDojiDetector,
    HammerDetector,
    HangingManDetector,
    InvertedHammerDetector,
    ShootingStarDetector,
    SpinningTopDetector,
    MarubozuDetector,
);

#[inline]
fn single(kind: PatternKind, index: usize) -> PatternMatch {
    PatternMatch {
        kind,
        start_index: index,
        end_index: index,
    }
}

// ============================================================
// DOJI FAMILY
// ============================================================

/// Doji - open and close (nearly) equal
#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub doji_factor: f64,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            doji_factor: helpers::DOJI_FACTOR,
        }
    }
}

impl PatternDetector for DojiDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::Doji]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        is_doji(bar.body(), ctx.avg_range, bar.range(), self.doji_factor)
            .then(|| single(PatternKind::Doji, index))
    }
}

/// Dragonfly Doji - doji at the top of a long lower shadow
#[derive(Debug, Clone, Copy)]
pub struct DragonflyDojiDetector {
    pub doji_factor: f64,
    pub shadow_veryshort_factor: f64,
}

impl Default for DragonflyDojiDetector {
    fn default() -> Self {
        Self {
            doji_factor: helpers::DOJI_FACTOR,
            shadow_veryshort_factor: helpers::SHADOW_VERYSHORT_FACTOR,
        }
    }
}

impl PatternDetector for DragonflyDojiDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::DragonflyDoji]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let range = bar.range();

        if !is_doji(bar.body(), ctx.avg_range, range, self.doji_factor) {
            return None;
        }
        if !is_shadow_very_short(bar.upper_shadow(), ctx.avg_range, range, self.shadow_veryshort_factor) {
            return None;
        }
        if !shadow_exceeds_veryshort(bar.lower_shadow(), ctx.avg_range, range, self.shadow_veryshort_factor) {
            return None;
        }

        Some(single(PatternKind::DragonflyDoji, index))
    }
}

/// Gravestone Doji - doji at the bottom of a long upper shadow
#[derive(Debug, Clone, Copy)]
pub struct GravestoneDojiDetector {
    pub doji_factor: f64,
    pub shadow_veryshort_factor: f64,
}

impl Default for GravestoneDojiDetector {
    fn default() -> Self {
        Self {
            doji_factor: helpers::DOJI_FACTOR,
            shadow_veryshort_factor: helpers::SHADOW_VERYSHORT_FACTOR,
        }
    }
}

impl PatternDetector for GravestoneDojiDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::GravestoneDoji]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let range = bar.range();

        if !is_doji(bar.body(), ctx.avg_range, range, self.doji_factor) {
            return None;
        }
        if !is_shadow_very_short(bar.lower_shadow(), ctx.avg_range, range, self.shadow_veryshort_factor) {
            return None;
        }
        if !shadow_exceeds_veryshort(bar.upper_shadow(), ctx.avg_range, range, self.shadow_veryshort_factor) {
            return None;
        }

        Some(single(PatternKind::GravestoneDoji, index))
    }
}

// ============================================================
// HAMMER FAMILY
// ============================================================

/// Shared thresholds of the hammer-shaped candles
#[derive(Debug, Clone, Copy)]
pub struct HammerShape {
    pub body_short_factor: f64,
    pub shadow_long_factor: f64,
    pub shadow_veryshort_factor: f64,
}

impl Default for HammerShape {
    fn default() -> Self {
        Self {
            body_short_factor: helpers::BODY_SHORT_FACTOR,
            shadow_long_factor: helpers::SHADOW_LONG_FACTOR,
            shadow_veryshort_factor: helpers::SHADOW_VERYSHORT_FACTOR,
        }
    }
}

impl HammerShape {
    /// Small body, long lower shadow, (almost) no upper shadow
    fn lower_wick<T: OHLCV>(&self, bar: &T, ctx: &MarketContext) -> bool {
        let (body, range) = (bar.body(), bar.range());
        is_body_short(body, ctx.avg_body, range, self.body_short_factor)
            && is_shadow_long(bar.lower_shadow(), body, self.shadow_long_factor)
            && is_shadow_very_short(bar.upper_shadow(), ctx.avg_range, range, self.shadow_veryshort_factor)
    }

    /// Small body, long upper shadow, (almost) no lower shadow
    fn upper_wick<T: OHLCV>(&self, bar: &T, ctx: &MarketContext) -> bool {
        let (body, range) = (bar.body(), bar.range());
        is_body_short(body, ctx.avg_body, range, self.body_short_factor)
            && is_shadow_long(bar.upper_shadow(), body, self.shadow_long_factor)
            && is_shadow_very_short(bar.lower_shadow(), ctx.avg_range, range, self.shadow_veryshort_factor)
    }
}

/// Hammer - bullish lower-wick rejection
#[derive(Debug, Clone, Copy, Default)]
pub struct HammerDetector {
    pub shape: HammerShape,
}

impl PatternDetector for HammerDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::Hammer]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        self.shape
            .lower_wick(bar, ctx)
            .then(|| single(PatternKind::Hammer, index))
    }
}

/// Hanging Man - hammer shape read as bearish
#[derive(Debug, Clone, Copy, Default)]
pub struct HangingManDetector {
    pub shape: HammerShape,
}

impl PatternDetector for HangingManDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::HangingMan]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        self.shape
            .lower_wick(bar, ctx)
            .then(|| single(PatternKind::HangingMan, index))
    }
}

/// Inverted Hammer - bullish upper-wick candle
#[derive(Debug, Clone, Copy, Default)]
pub struct InvertedHammerDetector {
    pub shape: HammerShape,
}

impl PatternDetector for InvertedHammerDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::InvertedHammer]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        self.shape
            .upper_wick(bar, ctx)
            .then(|| single(PatternKind::InvertedHammer, index))
    }
}

/// Shooting Star - upper-wick rejection read as bearish
#[derive(Debug, Clone, Copy, Default)]
pub struct ShootingStarDetector {
    pub shape: HammerShape,
}

impl PatternDetector for ShootingStarDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::ShootingStar]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        self.shape
            .upper_wick(bar, ctx)
            .then(|| single(PatternKind::ShootingStar, index))
    }
}

// ============================================================
// BODY-SHAPE PATTERNS
// ============================================================

/// Spinning Top - short body with shadows longer than the body on both sides
#[derive(Debug, Clone, Copy)]
pub struct SpinningTopDetector {
    pub body_short_factor: f64,
    pub doji_factor: f64,
}

impl Default for SpinningTopDetector {
    fn default() -> Self {
        Self {
            body_short_factor: helpers::BODY_SHORT_FACTOR,
            doji_factor: helpers::DOJI_FACTOR,
        }
    }
}

impl PatternDetector for SpinningTopDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::SpinningTop]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let body = bar.body();
        let range = bar.range();

        if is_doji(body, ctx.avg_range, range, self.doji_factor) {
            return None;
        }
        if !is_body_short(body, ctx.avg_body, range, self.body_short_factor) {
            return None;
        }
        if bar.upper_shadow() <= body || bar.lower_shadow() <= body {
            return None;
        }

        Some(single(PatternKind::SpinningTop, index))
    }
}

/// Marubozu - long body with no meaningful shadows; colour picks the kind
#[derive(Debug, Clone, Copy)]
pub struct MarubozuDetector {
    pub body_long_factor: f64,
    /// Max shadow length as a share of the range, on each side
    pub shadow_max_ratio: Ratio,
}

impl Default for MarubozuDetector {
    fn default() -> Self {
        Self {
            body_long_factor: helpers::BODY_LONG_FACTOR,
            shadow_max_ratio: Ratio::new_const(0.05),
        }
    }
}

impl PatternDetector for MarubozuDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::BullishMarubozu, PatternKind::BearishMarubozu]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let range = bar.range();
        if range <= f64::EPSILON {
            return None;
        }
        if !is_body_long(bar.body(), ctx.avg_body, range, self.body_long_factor) {
            return None;
        }
        let max_shadow = range * self.shadow_max_ratio.get();
        if bar.upper_shadow() > max_shadow || bar.lower_shadow() > max_shadow {
            return None;
        }

        if bar.is_bullish() {
            Some(single(PatternKind::BullishMarubozu, index))
        } else if bar.is_bearish() {
            Some(single(PatternKind::BearishMarubozu, index))
        } else {
            None
        }
    }

    fn validate_config(&self) -> Result<()> {
        if self.body_long_factor <= 0.0 {
            return Err(SignalError::InvalidValue("body_long_factor must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn ctx(avg_body: f64, avg_range: f64) -> MarketContext {
        MarketContext { avg_body, avg_range }
    }

    fn bar(o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(0, o, h, l, c, 1000.0)
    }

    #[test]
    fn test_hammer_and_hanging_man_fire_together() {
        let bars = [bar(100.0, 100.1, 95.0, 100.05)];
        let c = ctx(2.0, 4.0);
        assert!(HammerDetector::with_defaults().detect(&bars, 0, &c).is_some());
        assert!(HangingManDetector::with_defaults().detect(&bars, 0, &c).is_some());
        assert!(ShootingStarDetector::with_defaults().detect(&bars, 0, &c).is_none());
    }

    #[test]
    fn test_shooting_star_shape() {
        let bars = [bar(100.0, 105.0, 99.85, 99.9)];
        let c = ctx(2.0, 4.0);
        let m = ShootingStarDetector::with_defaults().detect(&bars, 0, &c).unwrap();
        assert_eq!(m.kind, PatternKind::ShootingStar);
        assert!(InvertedHammerDetector::with_defaults().detect(&bars, 0, &c).is_some());
    }

    #[test]
    fn test_dragonfly_vs_gravestone() {
        let c = ctx(2.0, 4.0);
        let dragonfly = [bar(100.0, 100.0, 95.0, 100.0)];
        assert!(DragonflyDojiDetector::with_defaults().detect(&dragonfly, 0, &c).is_some());
        assert!(GravestoneDojiDetector::with_defaults().detect(&dragonfly, 0, &c).is_none());

        let gravestone = [bar(100.0, 105.0, 100.0, 100.0)];
        assert!(GravestoneDojiDetector::with_defaults().detect(&gravestone, 0, &c).is_some());
        assert!(DragonflyDojiDetector::with_defaults().detect(&gravestone, 0, &c).is_none());
    }

    #[test]
    fn test_flat_bar_is_plain_doji() {
        let flat = [bar(100.0, 100.0, 100.0, 100.0)];
        let c = ctx(0.0, 0.0);
        assert!(DojiDetector::with_defaults().detect(&flat, 0, &c).is_some());
        assert!(DragonflyDojiDetector::with_defaults().detect(&flat, 0, &c).is_none());
        assert!(HammerDetector::with_defaults().detect(&flat, 0, &c).is_none());
        assert!(MarubozuDetector::with_defaults().detect(&flat, 0, &c).is_none());
        assert!(SpinningTopDetector::with_defaults().detect(&flat, 0, &c).is_none());
    }

    #[test]
    fn test_marubozu_colour() {
        let c = ctx(2.0, 4.0);
        let up = [bar(100.0, 105.0, 100.0, 105.0)];
        let down = [bar(105.0, 105.0, 100.0, 100.0)];
        let det = MarubozuDetector::with_defaults();
        assert_eq!(det.detect(&up, 0, &c).unwrap().kind, PatternKind::BullishMarubozu);
        assert_eq!(det.detect(&down, 0, &c).unwrap().kind, PatternKind::BearishMarubozu);
    }

    #[test]
    fn test_spinning_top() {
        let c = ctx(3.0, 6.0);
        let top = [bar(100.0, 103.0, 97.0, 101.0)];
        assert!(SpinningTopDetector::with_defaults().detect(&top, 0, &c).is_some());
    }
}
