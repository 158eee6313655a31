//! Integration tests for the candlestick classifier.
//!
//! These drive detectors through the public builder API on small hand-made
//! series and check the catalog attributes the occurrences carry.

use signalcore::prelude::*;

fn bar(t: usize, o: f64, h: f64, l: f64, c: f64) -> Bar {
    Bar::new(t as i64 * 60_000, o, h, l, c, 1_000.0)
}

/// Generate downtrend bars
fn make_downtrend(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let base = 100.0 - (i as f64) * 2.0;
            bar(i, base + 1.0, base + 2.0, base - 1.0, base - 0.5)
        })
        .collect()
}

/// Generate uptrend bars
fn make_uptrend(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let base = 100.0 + (i as f64) * 2.0;
            bar(i, base - 0.5, base + 1.5, base - 1.5, base + 1.0)
        })
        .collect()
}

/// Generate sideways bars
fn make_sideways(n: usize) -> Vec<Bar> {
    (0..n).map(|i| bar(i, 100.0, 102.0, 98.0, 101.0)).collect()
}

fn push(bars: &mut Vec<Bar>, o: f64, h: f64, l: f64, c: f64) {
    let t = bars.len();
    bars.push(bar(t, o, h, l, c));
}

fn only(detector: BuiltinDetector) -> PatternClassifier {
    ClassifierBuilder::new().add(detector).build().unwrap()
}

fn kinds_at(occurrences: &[PatternOccurrence], index: usize) -> Vec<PatternKind> {
    occurrences.iter().filter(|o| o.index == index).map(|o| o.kind).collect()
}

// ============================================================
// SINGLE BAR PATTERN TESTS
// ============================================================

#[test]
fn test_doji_detection() {
    let mut bars = make_downtrend(10);
    // Perfect doji: open = close
    push(&mut bars, 80.0, 85.0, 75.0, 80.0);

    let patterns = only(BuiltinDetector::Doji(DojiDetector::with_defaults())).scan(&bars);
    assert_eq!(kinds_at(&patterns, 10), vec![PatternKind::Doji]);
    assert_eq!(patterns.last().map(|o| o.direction), Some(Direction::Sideways));
}

#[test]
fn test_dragonfly_doji_detection() {
    let mut bars = make_downtrend(10);
    // open = close = high, long lower shadow
    push(&mut bars, 80.0, 80.0, 70.0, 80.0);

    let patterns = only(BuiltinDetector::DragonflyDoji(DragonflyDojiDetector::with_defaults())).scan(&bars);
    assert_eq!(kinds_at(&patterns, 10), vec![PatternKind::DragonflyDoji]);
}

#[test]
fn test_gravestone_doji_detection() {
    let mut bars = make_uptrend(10);
    // open = close = low, long upper shadow
    push(&mut bars, 120.0, 130.0, 120.0, 120.0);

    let patterns = only(BuiltinDetector::GravestoneDoji(GravestoneDojiDetector::with_defaults())).scan(&bars);
    assert_eq!(kinds_at(&patterns, 10), vec![PatternKind::GravestoneDoji]);
}

#[test]
fn test_marubozu_detection() {
    let mut bars = make_sideways(10);
    // open = low, close = high
    push(&mut bars, 100.0, 110.0, 100.0, 110.0);

    let patterns = only(BuiltinDetector::Marubozu(MarubozuDetector::with_defaults())).scan(&bars);
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].kind, PatternKind::BullishMarubozu);
    assert_eq!(patterns[0].class(), PatternClass::Confirmation);
}

// ============================================================
// MULTI BAR PATTERN TESTS
// ============================================================

#[test]
fn test_bullish_engulfing_after_downtrend() {
    let mut bars = make_downtrend(10);
    // Previous bar: open 83, close 81.5
    push(&mut bars, 81.0, 84.5, 80.5, 84.0);

    let patterns = only(BuiltinDetector::Engulfing(EngulfingDetector)).scan(&bars);
    assert_eq!(kinds_at(&patterns, 10), vec![PatternKind::BullishEngulfing]);

    let occ = patterns.last().unwrap();
    assert_eq!(occ.arity, 2);
    assert_eq!(occ.strength, 75.0);
    assert_eq!(occ.reliability, 85.0);
    assert_eq!(occ.required_context, RequiredContext::Downtrend);
}

#[test]
fn test_bearish_engulfing_after_uptrend() {
    let mut bars = make_uptrend(10);
    // Previous bar: open 117.5, close 119
    push(&mut bars, 119.5, 120.0, 116.5, 117.0);

    let patterns = only(BuiltinDetector::Engulfing(EngulfingDetector)).scan(&bars);
    assert_eq!(kinds_at(&patterns, 10), vec![PatternKind::BearishEngulfing]);
    assert_eq!(patterns.last().unwrap().direction, Direction::Bearish);
}

#[test]
fn test_morning_star_after_downtrend() {
    let mut bars = make_downtrend(10);
    push(&mut bars, 82.0, 82.5, 75.5, 76.0);
    push(&mut bars, 74.5, 75.0, 74.0, 74.8);
    push(&mut bars, 75.0, 80.5, 74.8, 80.0);

    let patterns = only(BuiltinDetector::MorningStar(MorningStarDetector::with_defaults())).scan(&bars);
    assert_eq!(kinds_at(&patterns, 12), vec![PatternKind::MorningStar]);
    assert!(patterns.last().unwrap().is_multi_candle());
}

// ============================================================
// CLASSIFIER API TESTS
// ============================================================

#[test]
fn test_full_catalog_scans_without_panicking() {
    let classifier = ClassifierBuilder::new().with_all_defaults().build().unwrap();
    assert_eq!(classifier.detector_count(), 21);

    for bars in [make_downtrend(30), make_uptrend(30), make_sideways(30)] {
        let history = classifier.scan_history(&bars);
        assert!(history.iter().all(|o| o.index >= 4 && o.index < bars.len()));
        assert!(history.windows(2).all(|w| w[0].index <= w[1].index));
    }
}

#[test]
fn test_every_emitted_kind_is_in_catalog_order() {
    let mut bars = make_downtrend(10);
    push(&mut bars, 81.0, 84.5, 80.5, 84.0);
    push(&mut bars, 84.0, 89.0, 80.0, 84.0);

    let classifier = ClassifierBuilder::new().with_all_defaults().build().unwrap();
    for occ in classifier.scan(&bars) {
        assert!(PatternKind::ALL.contains(&occ.kind));
        assert_eq!(occ.arity, occ.kind.arity());
        assert_eq!(occ.direction, occ.kind.direction());
    }
}

#[test]
fn test_output_keeps_most_recent_occurrences() {
    // Zero-range bars are dojis everywhere
    let bars: Vec<Bar> = (0..40).map(|i| bar(i, 10.0, 10.0, 10.0, 10.0)).collect();
    let classifier = only(BuiltinDetector::Doji(DojiDetector::with_defaults()));

    let history = classifier.scan_history(&bars);
    assert_eq!(history.len(), 36);

    let recent = classifier.scan(&bars);
    assert_eq!(recent.len(), 15);
    assert_eq!(recent[0].index, 25);
    assert_eq!(recent[14].index, 39);
}

#[test]
fn test_min_strength_drops_weak_patterns() {
    let bars: Vec<Bar> = (0..10).map(|i| bar(i, 10.0, 10.0, 10.0, 10.0)).collect();
    let classifier = ClassifierBuilder::new()
        .add(BuiltinDetector::Doji(DojiDetector::with_defaults()))
        .min_strength(60.0)
        .build()
        .unwrap();
    assert!(classifier.scan(&bars).is_empty());
}

#[test]
fn test_add_checked_rejects_bad_penetration() {
    let detector = MorningStarDetector {
        penetration: 1.5,
        ..MorningStarDetector::with_defaults()
    };
    let result = ClassifierBuilder::new().add_checked(BuiltinDetector::MorningStar(detector));
    assert!(result.is_err());
}

#[test]
fn test_occurrences_serialize() {
    let mut bars = make_downtrend(10);
    push(&mut bars, 81.0, 84.5, 80.5, 84.0);
    let patterns = only(BuiltinDetector::Engulfing(EngulfingDetector)).scan(&bars);

    let json = serde_json::to_value(&patterns[0]).unwrap();
    assert_eq!(json["kind"], "bullish_engulfing");
    assert_eq!(json["direction"], "bullish");
    assert_eq!(json["index"], 10);
}
