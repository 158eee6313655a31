//! Two-bar candlestick pattern detectors
//!
//! Engulfing, Piercing Line, Dark Cloud Cover, Harami, Tweezer Top/Bottom.

use super::helpers::{self, is_long_at, is_near_equal};
use crate::{
    classifier::{MarketContext, PatternDetector, PatternKind, PatternMatch},
    OHLCVExt, Ratio, Result, SignalError, OHLCV,
};

impl_with_defaults!(
    EngulfingDetector,
    PiercingDetector,
    DarkCloudCoverDetector,
    HaramiDetector,
    TweezerTopDetector,
    TweezerBottomDetector,
);

#[inline]
fn pair(kind: PatternKind, index: usize) -> PatternMatch {
    PatternMatch {
        kind,
        start_index: index - 1,
        end_index: index,
    }
}

// ============================================================
// ENGULFING PATTERNS
// ============================================================

/// Engulfing - second body covers the first, opposite colour
#[derive(Debug, Clone, Default)]
pub struct EngulfingDetector;

impl PatternDetector for EngulfingDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::BullishEngulfing, PatternKind::BearishEngulfing]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, _ctx: &MarketContext) -> Option<PatternMatch> {
        if index < 1 {
            return None;
        }
        let prev = bars.get(index - 1)?;
        let curr = bars.get(index)?;

        // Bullish: white engulfs black. One end of the body may coincide.
        if curr.is_bullish() && prev.is_bearish() {
            let case_a = curr.close() >= prev.open() && curr.open() < prev.close();
            let case_b = curr.close() > prev.open() && curr.open() <= prev.close();
            if case_a || case_b {
                return Some(pair(PatternKind::BullishEngulfing, index));
            }
        }

        // Bearish: black engulfs white
        if curr.is_bearish() && prev.is_bullish() {
            let case_a = curr.open() >= prev.close() && curr.close() < prev.open();
            let case_b = curr.open() > prev.close() && curr.close() <= prev.open();
            if case_a || case_b {
                return Some(pair(PatternKind::BearishEngulfing, index));
            }
        }

        None
    }
}

// ============================================================
// PENETRATION PATTERNS
// ============================================================

/// Piercing Line - long black, then a white that opens below the prior
/// close and recovers past the prior body's midpoint
#[derive(Debug, Clone)]
pub struct PiercingDetector {
    pub body_long_factor: f64,
    /// Share of the prior body the close must recover
    pub penetration: Ratio,
}

impl Default for PiercingDetector {
    fn default() -> Self {
        Self {
            body_long_factor: helpers::BODY_LONG_FACTOR,
            penetration: Ratio::new_const(0.5),
        }
    }
}

impl PatternDetector for PiercingDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::PiercingLine]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, _ctx: &MarketContext) -> Option<PatternMatch> {
        if index < 1 {
            return None;
        }
        let prev = bars.get(index - 1)?;
        let curr = bars.get(index)?;

        if !prev.is_bearish() || !curr.is_bullish() {
            return None;
        }
        if !is_long_at(bars, index - 1, self.body_long_factor) {
            return None;
        }
        if curr.open() >= prev.close() {
            return None;
        }

        let threshold = prev.close() + prev.body() * self.penetration.get();
        if curr.close() <= threshold || curr.close() >= prev.open() {
            return None;
        }

        Some(pair(PatternKind::PiercingLine, index))
    }

    fn validate_config(&self) -> Result<()> {
        if self.body_long_factor <= 0.0 {
            return Err(SignalError::InvalidValue("body_long_factor must be > 0"));
        }
        Ok(())
    }
}

/// Dark Cloud Cover - long white, then a black that opens above the prior
/// close and falls below the prior body's midpoint
#[derive(Debug, Clone)]
pub struct DarkCloudCoverDetector {
    pub body_long_factor: f64,
    pub penetration: Ratio,
}

impl Default for DarkCloudCoverDetector {
    fn default() -> Self {
        Self {
            body_long_factor: helpers::BODY_LONG_FACTOR,
            penetration: Ratio::new_const(0.5),
        }
    }
}

impl PatternDetector for DarkCloudCoverDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::DarkCloudCover]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, _ctx: &MarketContext) -> Option<PatternMatch> {
        if index < 1 {
            return None;
        }
        let prev = bars.get(index - 1)?;
        let curr = bars.get(index)?;

        if !prev.is_bullish() || !curr.is_bearish() {
            return None;
        }
        if !is_long_at(bars, index - 1, self.body_long_factor) {
            return None;
        }
        if curr.open() <= prev.close() {
            return None;
        }

        let threshold = prev.close() - prev.body() * self.penetration.get();
        if curr.close() >= threshold || curr.close() <= prev.open() {
            return None;
        }

        Some(pair(PatternKind::DarkCloudCover, index))
    }

    fn validate_config(&self) -> Result<()> {
        if self.body_long_factor <= 0.0 {
            return Err(SignalError::InvalidValue("body_long_factor must be > 0"));
        }
        Ok(())
    }
}

// ============================================================
// HARAMI PATTERNS
// ============================================================

/// Harami - long body followed by a smaller opposite-colour body inside it
#[derive(Debug, Clone)]
pub struct HaramiDetector {
    pub body_long_factor: f64,
}

impl Default for HaramiDetector {
    fn default() -> Self {
        Self {
            body_long_factor: helpers::BODY_LONG_FACTOR,
        }
    }
}

impl PatternDetector for HaramiDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::BullishHarami, PatternKind::BearishHarami]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, _ctx: &MarketContext) -> Option<PatternMatch> {
        if index < 1 {
            return None;
        }
        let prev = bars.get(index - 1)?;
        let curr = bars.get(index)?;

        if !is_long_at(bars, index - 1, self.body_long_factor) {
            return None;
        }
        if curr.body() >= prev.body() {
            return None;
        }
        // Current body inside the previous one; one end may touch
        if curr.body_top() > prev.body_top() || curr.body_bottom() < prev.body_bottom() {
            return None;
        }

        if prev.is_bearish() && curr.is_bullish() {
            Some(pair(PatternKind::BullishHarami, index))
        } else if prev.is_bullish() && curr.is_bearish() {
            Some(pair(PatternKind::BearishHarami, index))
        } else {
            None
        }
    }
}

// ============================================================
// TWEEZERS
// ============================================================

/// Tweezer Top - white then black with matching highs
#[derive(Debug, Clone)]
pub struct TweezerTopDetector {
    pub equal_factor: f64,
}

impl Default for TweezerTopDetector {
    fn default() -> Self {
        Self {
            equal_factor: helpers::EQUAL_FACTOR,
        }
    }
}

impl PatternDetector for TweezerTopDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::TweezerTop]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Option<PatternMatch> {
        if index < 1 {
            return None;
        }
        let prev = bars.get(index - 1)?;
        let curr = bars.get(index)?;

        if !prev.is_bullish() || !curr.is_bearish() {
            return None;
        }
        is_near_equal(prev.high(), curr.high(), ctx.avg_range, self.equal_factor)
            .then(|| pair(PatternKind::TweezerTop, index))
    }
}

/// Tweezer Bottom - black then white with matching lows
#[derive(Debug, Clone)]
pub struct TweezerBottomDetector {
    pub equal_factor: f64,
}

impl Default for TweezerBottomDetector {
    fn default() -> Self {
        Self {
            equal_factor: helpers::EQUAL_FACTOR,
        }
    }
}

impl PatternDetector for TweezerBottomDetector {
    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::TweezerBottom]
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize, ctx: &MarketContext) -> Option<PatternMatch> {
        if index < 1 {
            return None;
        }
        let prev = bars.get(index - 1)?;
        let curr = bars.get(index)?;

        if !prev.is_bearish() || !curr.is_bullish() {
            return None;
        }
        is_near_equal(prev.low(), curr.low(), ctx.avg_range, self.equal_factor)
            .then(|| pair(PatternKind::TweezerBottom, index))
    }
}
