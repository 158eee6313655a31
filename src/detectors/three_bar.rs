//! Three-bar candlestick pattern detectors
//!
//! Morning Star, Evening Star, Three White Soldiers, Three Black Crows,
//! Three Inside Up/Down.
//!
//! Each candle's body is judged against the trailing average ending just
//! before it, not against the context of the final bar.

use super::helpers::{self, is_long_at, is_short_at, trailing_avg_body, trailing_avg_range, CANDLE_AVG_PERIOD};
use crate::{
  classifier::{MarketContext, PatternDetector, PatternKind, PatternMatch},
  OHLCVExt, Result, SignalError, OHLCV,
};

impl_with_defaults!(
  MorningStarDetector,
  EveningStarDetector,
  ThreeWhiteSoldiersDetector,
  ThreeBlackCrowsDetector,
  ThreeInsideDetector,
);

#[inline]
fn triple(kind: PatternKind, index: usize) -> PatternMatch {
  PatternMatch { kind, start_index: index - 2, end_index: index }
}

// ============================================================
// STAR PATTERNS
// ============================================================

/// Morning Star - long black, small body gapping down, white recovering
/// into the first body
#[derive(Debug, Clone)]
pub struct MorningStarDetector {
  pub body_long_factor: f64,
  pub body_short_factor: f64,
  /// Share of the first body the third close must recover
  pub penetration: f64,
}

impl Default for MorningStarDetector {
  fn default() -> Self {
    Self {
      body_long_factor: helpers::BODY_LONG_FACTOR,
      body_short_factor: helpers::BODY_SHORT_FACTOR,
      penetration: 0.3,
    }
  }
}

impl PatternDetector for MorningStarDetector {
  fn kinds(&self) -> &'static [PatternKind] {
    &[PatternKind::MorningStar]
  }

  fn detect<T: OHLCV>(&self, bars: &[T], index: usize, _ctx: &MarketContext) -> Option<PatternMatch> {
    if index < 2 {
      return None;
    }
    let first = bars.get(index - 2)?;
    let second = bars.get(index - 1)?;
    let third = bars.get(index)?;

    if !first.is_bearish() || !third.is_bullish() {
      return None;
    }
    if !is_long_at(bars, index - 2, self.body_long_factor) {
      return None;
    }
    if !is_short_at(bars, index - 1, self.body_short_factor) {
      return None;
    }
    // Star body gaps below the first body
    if second.body_top() >= first.body_bottom() {
      return None;
    }
    if third.body() <= trailing_avg_body(bars, index, CANDLE_AVG_PERIOD) {
      return None;
    }
    if third.close() <= first.close() + first.body() * self.penetration {
      return None;
    }

    Some(triple(PatternKind::MorningStar, index))
  }

  fn validate_config(&self) -> Result<()> {
    validate_penetration(self.penetration)
  }
}

/// Evening Star - long white, small body gapping up, black falling into
/// the first body
#[derive(Debug, Clone)]
pub struct EveningStarDetector {
  pub body_long_factor: f64,
  pub body_short_factor: f64,
  pub penetration: f64,
}

impl Default for EveningStarDetector {
  fn default() -> Self {
    Self {
      body_long_factor: helpers::BODY_LONG_FACTOR,
      body_short_factor: helpers::BODY_SHORT_FACTOR,
      penetration: 0.3,
    }
  }
}

impl PatternDetector for EveningStarDetector {
  fn kinds(&self) -> &'static [PatternKind] {
    &[PatternKind::EveningStar]
  }

  fn detect<T: OHLCV>(&self, bars: &[T], index: usize, _ctx: &MarketContext) -> Option<PatternMatch> {
    if index < 2 {
      return None;
    }
    let first = bars.get(index - 2)?;
    let second = bars.get(index - 1)?;
    let third = bars.get(index)?;

    if !first.is_bullish() || !third.is_bearish() {
      return None;
    }
    if !is_long_at(bars, index - 2, self.body_long_factor) {
      return None;
    }
    if !is_short_at(bars, index - 1, self.body_short_factor) {
      return None;
    }
    if second.body_bottom() <= first.body_top() {
      return None;
    }
    if third.body() <= trailing_avg_body(bars, index, CANDLE_AVG_PERIOD) {
      return None;
    }
    if third.close() >= first.close() - first.body() * self.penetration {
      return None;
    }

    Some(triple(PatternKind::EveningStar, index))
  }

  fn validate_config(&self) -> Result<()> {
    validate_penetration(self.penetration)
  }
}

fn validate_penetration(penetration: f64) -> Result<()> {
  if !(0.0..=1.0).contains(&penetration) {
    return Err(SignalError::OutOfRange { field: "penetration", value: penetration, min: 0.0, max: 1.0 });
  }
  Ok(())
}

// ============================================================
// THREE WHITE SOLDIERS / THREE BLACK CROWS
// ============================================================

/// Three White Soldiers - three rising white candles, each opening inside
/// the previous body and closing near its high
#[derive(Debug, Clone)]
pub struct ThreeWhiteSoldiersDetector {
  pub shadow_veryshort_factor: f64,
  pub body_short_factor: f64,
}

impl Default for ThreeWhiteSoldiersDetector {
  fn default() -> Self {
    Self {
      shadow_veryshort_factor: helpers::SHADOW_VERYSHORT_FACTOR,
      body_short_factor: helpers::BODY_SHORT_FACTOR,
    }
  }
}

impl PatternDetector for ThreeWhiteSoldiersDetector {
  fn kinds(&self) -> &'static [PatternKind] {
    &[PatternKind::ThreeWhiteSoldiers]
  }

  fn detect<T: OHLCV>(&self, bars: &[T], index: usize, _ctx: &MarketContext) -> Option<PatternMatch> {
    if index < 2 {
      return None;
    }
    let first = bars.get(index - 2)?;
    let second = bars.get(index - 1)?;
    let third = bars.get(index)?;

    if !first.is_bullish() || !second.is_bullish() || !third.is_bullish() {
      return None;
    }
    if second.close() <= first.close() || third.close() <= second.close() {
      return None;
    }

    // Opens inside the previous body
    if second.open() <= first.open() || second.open() > first.close() {
      return None;
    }
    if third.open() <= second.open() || third.open() > second.close() {
      return None;
    }

    for at in index - 2..=index {
      let limit = trailing_avg_range(bars, at, CANDLE_AVG_PERIOD) * self.shadow_veryshort_factor;
      if bars[at].upper_shadow() >= limit {
        return None;
      }
    }

    if third.body() < trailing_avg_body(bars, index, CANDLE_AVG_PERIOD) * self.body_short_factor {
      return None;
    }

    Some(triple(PatternKind::ThreeWhiteSoldiers, index))
  }
}

/// Three Black Crows - three falling black candles, each opening inside
/// the previous body and closing near its low
#[derive(Debug, Clone)]
pub struct ThreeBlackCrowsDetector {
  pub shadow_veryshort_factor: f64,
  pub body_short_factor: f64,
}

impl Default for ThreeBlackCrowsDetector {
  fn default() -> Self {
    Self {
      shadow_veryshort_factor: helpers::SHADOW_VERYSHORT_FACTOR,
      body_short_factor: helpers::BODY_SHORT_FACTOR,
    }
  }
}

impl PatternDetector for ThreeBlackCrowsDetector {
  fn kinds(&self) -> &'static [PatternKind] {
    &[PatternKind::ThreeBlackCrows]
  }

  fn detect<T: OHLCV>(&self, bars: &[T], index: usize, _ctx: &MarketContext) -> Option<PatternMatch> {
    if index < 2 {
      return None;
    }
    let first = bars.get(index - 2)?;
    let second = bars.get(index - 1)?;
    let third = bars.get(index)?;

    if !first.is_bearish() || !second.is_bearish() || !third.is_bearish() {
      return None;
    }
    if second.close() >= first.close() || third.close() >= second.close() {
      return None;
    }

    if second.open() >= first.open() || second.open() < first.close() {
      return None;
    }
    if third.open() >= second.open() || third.open() < second.close() {
      return None;
    }

    for at in index - 2..=index {
      let limit = trailing_avg_range(bars, at, CANDLE_AVG_PERIOD) * self.shadow_veryshort_factor;
      if bars[at].lower_shadow() >= limit {
        return None;
      }
    }

    if third.body() < trailing_avg_body(bars, index, CANDLE_AVG_PERIOD) * self.body_short_factor {
      return None;
    }

    Some(triple(PatternKind::ThreeBlackCrows, index))
  }
}

// ============================================================
// THREE INSIDE
// ============================================================

/// Three Inside Up/Down - harami confirmed by a third candle closing
/// beyond the first candle's open
#[derive(Debug, Clone)]
pub struct ThreeInsideDetector {
  pub body_long_factor: f64,
  pub body_short_factor: f64,
}

impl Default for ThreeInsideDetector {
  fn default() -> Self {
    Self { body_long_factor: helpers::BODY_LONG_FACTOR, body_short_factor: helpers::BODY_SHORT_FACTOR }
  }
}

impl PatternDetector for ThreeInsideDetector {
  fn kinds(&self) -> &'static [PatternKind] {
    &[PatternKind::ThreeInsideUp, PatternKind::ThreeInsideDown]
  }

  fn detect<T: OHLCV>(&self, bars: &[T], index: usize, _ctx: &MarketContext) -> Option<PatternMatch> {
    if index < 2 {
      return None;
    }
    let first = bars.get(index - 2)?;
    let second = bars.get(index - 1)?;
    let third = bars.get(index)?;

    if !is_long_at(bars, index - 2, self.body_long_factor) {
      return None;
    }
    if !is_short_at(bars, index - 1, self.body_short_factor) {
      return None;
    }
    // Second body strictly inside the first
    if second.body_top() >= first.body_top() || second.body_bottom() <= first.body_bottom() {
      return None;
    }

    if first.is_bearish() && third.is_bullish() && third.close() > first.open() {
      return Some(triple(PatternKind::ThreeInsideUp, index));
    }
    if first.is_bullish() && third.is_bearish() && third.close() < first.open() {
      return Some(triple(PatternKind::ThreeInsideDown, index));
    }

    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Bar;

  fn bar(t: i64, o: f64, h: f64, l: f64, c: f64) -> Bar {
    Bar::new(t, o, h, l, c, 1000.0)
  }

  /// Small candles giving trailing averages of body 1.0 and range 2.0
  fn prefix(n: i64) -> Vec<Bar> {
    (0..n).map(|t| bar(t, 100.0, 101.5, 99.5, 101.0)).collect()
  }

  fn ctx() -> MarketContext {
    MarketContext { avg_body: 1.0, avg_range: 2.0 }
  }

  #[test]
  fn test_morning_star() {
    let mut bars = prefix(5);
    bars.push(bar(5, 106.0, 106.5, 100.5, 101.0));
    bars.push(bar(6, 100.0, 100.5, 99.0, 99.8));
    bars.push(bar(7, 100.0, 105.5, 99.8, 105.0));
    let m = MorningStarDetector::with_defaults().detect(&bars, 7, &ctx()).unwrap();
    assert_eq!(m.kind, PatternKind::MorningStar);
    assert_eq!(m.start_index, 5);
    assert!(EveningStarDetector::with_defaults().detect(&bars, 7, &ctx()).is_none());
  }

  #[test]
  fn test_evening_star() {
    let mut bars = prefix(5);
    bars.push(bar(5, 101.0, 106.5, 100.8, 106.0));
    bars.push(bar(6, 107.0, 107.8, 106.5, 107.2));
    bars.push(bar(7, 107.0, 107.2, 101.5, 102.0));
    let m = EveningStarDetector::with_defaults().detect(&bars, 7, &ctx()).unwrap();
    assert_eq!(m.kind, PatternKind::EveningStar);
  }

  #[test]
  fn test_three_white_soldiers() {
    let mut bars = prefix(5);
    bars.push(bar(5, 101.0, 103.05, 100.8, 103.0));
    bars.push(bar(6, 102.0, 105.05, 101.8, 105.0));
    bars.push(bar(7, 104.0, 107.05, 103.8, 107.0));
    let m = ThreeWhiteSoldiersDetector::with_defaults().detect(&bars, 7, &ctx()).unwrap();
    assert_eq!(m.kind, PatternKind::ThreeWhiteSoldiers);
    assert!(ThreeBlackCrowsDetector::with_defaults().detect(&bars, 7, &ctx()).is_none());
  }

  #[test]
  fn test_three_black_crows() {
    let mut bars = prefix(5);
    bars.push(bar(5, 107.0, 107.2, 104.95, 105.0));
    bars.push(bar(6, 106.0, 106.2, 102.95, 103.0));
    bars.push(bar(7, 104.0, 104.2, 100.95, 101.0));
    let m = ThreeBlackCrowsDetector::with_defaults().detect(&bars, 7, &ctx()).unwrap();
    assert_eq!(m.kind, PatternKind::ThreeBlackCrows);
  }

  #[test]
  fn test_three_inside_up_and_down() {
    let det = ThreeInsideDetector::with_defaults();

    let mut up = prefix(5);
    up.push(bar(5, 105.0, 105.5, 100.5, 101.0));
    up.push(bar(6, 102.0, 103.0, 101.5, 102.5));
    up.push(bar(7, 102.5, 106.5, 102.0, 106.0));
    assert_eq!(det.detect(&up, 7, &ctx()).unwrap().kind, PatternKind::ThreeInsideUp);

    let mut down = prefix(5);
    down.push(bar(5, 101.0, 105.5, 100.5, 105.0));
    down.push(bar(6, 104.0, 104.5, 103.0, 103.5));
    down.push(bar(7, 103.5, 104.0, 99.5, 100.0));
    assert_eq!(det.detect(&down, 7, &ctx()).unwrap().kind, PatternKind::ThreeInsideDown);
  }

  #[test]
  fn test_invalid_penetration_rejected() {
    let det = MorningStarDetector { penetration: 1.5, ..Default::default() };
    assert!(det.validate_config().is_err());
  }
}
