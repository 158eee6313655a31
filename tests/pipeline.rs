//! End-to-end tests for the signal engine.

use signalcore::prelude::*;

const DAY_MS: i64 = 86_400_000;

/// Smooth geometric uptrend with volume rising alongside price
fn make_uptrend(n: usize) -> Vec<Bar> {
    let mut prev = 100.0 / 1.002;
    (0..n)
        .map(|i| {
            let close = 100.0 * 1.002_f64.powi(i as i32);
            let open = prev;
            prev = close;
            Bar::new(i as i64 * DAY_MS, open, close * 1.001, open * 0.999, close, 1_000.0 + 10.0 * i as f64)
        })
        .collect()
}

/// `close_t = 100 * 1.0005^t`, opening at the previous close, volume rising
fn make_slow_uptrend(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let close = 100.0 * 1.0005_f64.powi(i as i32);
            let open = 100.0 * 1.0005_f64.powi(i as i32 - 1);
            Bar::new(i as i64 * DAY_MS, open, close * 1.001, open * 0.999, close, 1_000.0 + 5.0 * i as f64)
        })
        .collect()
}

fn make_flat(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| Bar::new(i as i64 * DAY_MS, 10.0, 10.0, 10.0, 10.0, 500.0))
        .collect()
}

fn engine() -> SignalEngine {
    EngineBuilder::new().build().unwrap()
}

struct OfflineFeed;

impl InsiderFeedProvider for OfflineFeed {
    fn fetch(&self, _request: &FeedRequest<'_>) -> Result<Vec<InsiderTrade>> {
        Err(SignalError::FeedUnavailable("filing service offline".to_string()))
    }
}

// ============================================================
// END-TO-END BEHAVIOUR
// ============================================================

#[test]
fn test_uptrend_recommends_buying() {
    let bars = make_uptrend(260);
    let analysis = engine().analyze(&bars, &SyntheticFeed::default()).unwrap();

    assert_eq!(analysis.trend.ma_alignment, MaAlignment::StronglyBullish);
    assert_eq!(analysis.trend.trend_direction, Direction::Bullish);
    assert_eq!(analysis.volume.volume_trend, Direction::Bullish);
    assert_eq!(analysis.fibonacci.direction, Direction::Bullish);
    assert_eq!(analysis.overall.direction, Direction::Bullish);
    assert!(matches!(
        analysis.recommendation.action,
        RecommendationAction::Buy | RecommendationAction::StrongBuy
    ));

    let price = analysis.current_price;
    assert!(analysis.recommendation.target_price > price);
    assert!(analysis.recommendation.stop_loss < price);
    assert!(analysis.recommendation.risk_reward > 0.0);

    // A convex, always-rising close has no turning points
    assert!(analysis.calculus.critical_points.is_empty());
}

#[test]
fn test_slow_year_long_uptrend_is_bullish() {
    let bars = make_slow_uptrend(252);
    let analysis = engine().analyze(&bars, &SyntheticFeed::default()).unwrap();

    assert_eq!(analysis.trend.trend_direction, Direction::Bullish);
    assert!(matches!(
        analysis.trend.ma_alignment,
        MaAlignment::Bullish | MaAlignment::StronglyBullish
    ));
    assert!(matches!(
        analysis.recommendation.action,
        RecommendationAction::Buy | RecommendationAction::StrongBuy
    ));
}

#[test]
fn test_constant_series_holds() {
    let bars = make_flat(220);
    let analysis = engine().analyze(&bars, &SyntheticFeed::default()).unwrap();

    assert!(analysis.calculus.critical_points.is_empty());
    assert!(analysis.calculus.inflection_points.is_empty());
    assert!(analysis.calculus.volume_shifts.is_empty());
    assert_eq!(analysis.volume.volume_trend, Direction::Sideways);
    assert!(analysis.fibonacci.is_degenerate());
    assert_eq!(analysis.overall.direction, Direction::Sideways);
    assert_eq!(analysis.recommendation.action, RecommendationAction::Hold);
    assert_eq!(analysis.recommendation.time_horizon, TimeHorizon::Long);
}

#[test]
fn test_short_series_is_rejected() {
    let bars = make_uptrend(199);
    let err = engine().analyze(&bars, &SyntheticFeed::default()).unwrap_err();
    assert_eq!(err, SignalError::InsufficientData { need: 200, got: 199 });
}

#[test]
fn test_invalid_bar_is_rejected() {
    let mut bars = make_uptrend(220);
    bars[100].close = f64::NAN;
    let err = engine().analyze(&bars, &SyntheticFeed::default()).unwrap_err();
    assert!(matches!(err, SignalError::InvalidBar { index: 100, .. }));
}

// ============================================================
// INSIDER FEEDS
// ============================================================

#[test]
fn test_failing_feed_degrades_to_neutral() {
    let bars = make_uptrend(220);
    let analysis = engine().analyze_symbol("ACME", &bars, &OfflineFeed).unwrap();

    assert!(!analysis.insider.available);
    assert_eq!(analysis.insider.adjustments, InsiderAdjustments::default());
    // One line per signal, nothing for the missing feed
    assert_eq!(analysis.recommendation.reasoning.len(), 5);
}

#[test]
fn test_real_feed_is_reported_as_filed() {
    let bars = make_uptrend(220);
    let last = bars[bars.len() - 1].timestamp;
    let trades = (1..=3)
        .map(|d| InsiderTrade {
            timestamp: last - d * DAY_MS,
            role: InsiderRole::Director,
            action: InsiderAction::Buy,
            shares: 5_000.0,
            price: 150.0,
        })
        .collect();
    let feed = RealFeed::new().with_trades("ACME", trades);

    let analysis = engine().analyze_symbol("ACME", &bars, &feed).unwrap();
    assert!(analysis.insider.available);
    assert!(!analysis.insider.simulated);
    assert_eq!(analysis.insider.trade_count, 3);
    assert_eq!(analysis.insider.sentiment, Direction::Bullish);
    assert!(analysis.recommendation.reasoning.iter().any(|line| line.contains("filed")));
}

#[test]
fn test_synthetic_feed_is_flagged() {
    let bars = make_uptrend(220);
    let analysis = engine().analyze(&bars, &SyntheticFeed::new(7)).unwrap();
    assert!(analysis.insider.simulated);
    assert!(analysis.recommendation.reasoning.iter().any(|line| line.contains("simulated")));
}

#[test]
fn test_provider_can_be_a_trait_object() {
    let bars = make_uptrend(220);
    let feed: Box<dyn InsiderFeedProvider> = Box::new(SyntheticFeed::default());
    let analysis = engine().analyze(&bars, &*feed).unwrap();
    assert_eq!(analysis.signals.len(), 5);
}

// ============================================================
// OUTPUT & CONFIGURATION
// ============================================================

#[test]
fn test_analysis_serializes_to_json() {
    let bars = make_uptrend(220);
    let analysis = engine().analyze_symbol("ACME", &bars, &SyntheticFeed::default()).unwrap();

    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["symbol"], "ACME");
    assert_eq!(json["signals"].as_array().map(Vec::len), Some(5));
    assert_eq!(json["fibonacci"]["levels"].as_array().map(Vec::len), Some(5));
    assert!(json["recommendation"]["action"].is_string());
    assert_eq!(json["signals"][0]["kind"], "fibonacci");
    assert!(json["calculus"]["optimal_trade"]["action"].is_string());
}

#[test]
fn test_config_from_partial_json() {
    let config: EngineConfig = serde_json::from_str(
        r#"{
            "validate_data": false,
            "fusion": { "strong_threshold": 80.0 },
            "insider": { "window_days": 90 }
        }"#,
    )
    .unwrap();
    assert_eq!(config.fusion.action_threshold, 50.0);
    assert_eq!(config.insider.window_days, 90);

    let engine = EngineBuilder::new().config(config).build().unwrap();
    assert!(!engine.config().validate_data);
    assert_eq!(engine.config().fusion.strong_threshold, 80.0);
}

#[test]
fn test_config_rejects_out_of_range_ratio() {
    let parsed: std::result::Result<EngineConfig, _> =
        serde_json::from_str(r#"{ "fusion": { "volume_weight": 1.5 } }"#);
    assert!(parsed.is_err());
}

#[test]
fn test_repeated_calls_agree() {
    let bars = make_uptrend(230);
    let engine = engine();
    let a = engine.analyze(&bars, &SyntheticFeed::default()).unwrap();
    let b = engine.analyze(&bars, &SyntheticFeed::default()).unwrap();
    assert_eq!(a.recommendation, b.recommendation);
    assert_eq!(a.signals, b.signals);
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

#[test]
fn test_analyze_parallel() {
    let up = make_uptrend(240);
    let flat = make_flat(210);
    let short = make_flat(50);
    let instruments = vec![("UP", up.as_slice()), ("FLAT", flat.as_slice()), ("SHORT", short.as_slice())];

    let (mut ok, errors) = analyze_parallel(&engine(), instruments, &SyntheticFeed::default());
    ok.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    assert_eq!(ok.len(), 2);
    assert_eq!(ok[0].symbol, "FLAT");
    assert_eq!(ok[0].analysis.recommendation.action, RecommendationAction::Hold);
    assert_eq!(ok[1].symbol, "UP");

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].symbol, "SHORT");
    assert!(matches!(errors[0].error, SignalError::InsufficientData { need: 200, got: 50 }));
}
