//! Insider-activity influence
//!
//! Insider filings over a trailing window are weighted by the filer's role
//! and reduced to one imbalance in [-1, 1]. That imbalance drives a sentiment,
//! a 0..=100 score and the bounded adjustments the fusion engine and the
//! calculus scenarios apply.
//!
//! Trades come from an [`InsiderFeedProvider`]. [`RealFeed`] serves filings
//! the caller loaded; [`SyntheticFeed`] fabricates a deterministic sample from
//! the price series when no real data exists and is always reported as
//! simulated.

use std::collections::HashMap;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{config::InsiderConfig, Direction, Result, SignalError, OHLCV};

const MS_PER_DAY: i64 = 86_400_000;

// ============================================================
// TYPES
// ============================================================

/// Filer's relationship to the issuer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsiderRole {
    Ceo,
    Cfo,
    President,
    Director,
    Officer,
    TenPercentOwner,
    Other,
}

impl InsiderRole {
    pub const ALL: [InsiderRole; 7] = [
        InsiderRole::Ceo,
        InsiderRole::Cfo,
        InsiderRole::President,
        InsiderRole::Director,
        InsiderRole::Officer,
        InsiderRole::TenPercentOwner,
        InsiderRole::Other,
    ];

    /// Multiplier applied to the trade's share volume
    pub fn weight(self) -> f64 {
        match self {
            InsiderRole::Ceo => 3.0,
            InsiderRole::Cfo | InsiderRole::President => 2.5,
            InsiderRole::Director => 2.0,
            InsiderRole::Officer | InsiderRole::TenPercentOwner => 1.5,
            InsiderRole::Other => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsiderAction {
    Buy,
    Sell,
}

/// One open-market insider transaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsiderTrade {
    /// Filing date, epoch milliseconds
    pub timestamp: i64,
    pub role: InsiderRole,
    pub action: InsiderAction,
    pub shares: f64,
    pub price: f64,
}

impl InsiderTrade {
    #[inline]
    pub fn weighted_volume(&self) -> f64 {
        self.shares * self.role.weight()
    }
}

/// Signed adjustments (score points) derived from the insider imbalance
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InsiderAdjustments {
    pub candlestick: f64,
    pub moving_average: f64,
    pub fibonacci: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsiderInfluence {
    /// 0..=100, above 50 means net insider buying
    pub score: f64,
    pub sentiment: Direction,
    pub confidence: f64,
    /// False when the provider failed; adjustments are then all zero
    pub available: bool,
    /// True when the trades were fabricated by a synthetic feed
    pub simulated: bool,
    pub trade_count: usize,
    pub adjustments: InsiderAdjustments,
}

impl InsiderInfluence {
    /// Neutral influence used when no feed could be read
    pub fn unavailable() -> Self {
        Self {
            score: 50.0,
            sentiment: Direction::Sideways,
            confidence: 0.0,
            available: false,
            simulated: false,
            trade_count: 0,
            adjustments: InsiderAdjustments::default(),
        }
    }
}

// ============================================================
// FEED PROVIDERS
// ============================================================

/// What a provider is asked for: trades of `symbol` inside
/// `[window_start, window_end]`, with the series for context.
#[derive(Debug, Clone, Copy)]
pub struct FeedRequest<'a> {
    pub symbol: Option<&'a str>,
    pub window_start: i64,
    pub window_end: i64,
    pub timestamps: &'a [i64],
    pub closes: &'a [f64],
}

impl FeedRequest<'_> {
    #[inline]
    pub fn contains(&self, timestamp: i64) -> bool {
        (self.window_start..=self.window_end).contains(&timestamp)
    }
}

/// Source of insider trades
pub trait InsiderFeedProvider: Send + Sync {
    fn fetch(&self, request: &FeedRequest<'_>) -> Result<Vec<InsiderTrade>>;

    /// Whether the trades are fabricated rather than filed
    fn is_simulated(&self) -> bool {
        false
    }
}

/// Filings supplied by the caller, keyed by symbol
#[derive(Debug, Clone, Default)]
pub struct RealFeed {
    trades: HashMap<String, Vec<InsiderTrade>>,
}

impl RealFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trades(mut self, symbol: impl Into<String>, trades: Vec<InsiderTrade>) -> Self {
        self.trades.entry(symbol.into()).or_default().extend(trades);
        self
    }
}

impl InsiderFeedProvider for RealFeed {
    fn fetch(&self, request: &FeedRequest<'_>) -> Result<Vec<InsiderTrade>> {
        let symbol = request
            .symbol
            .ok_or_else(|| SignalError::FeedUnavailable("no symbol given".to_string()))?;
        let trades = self
            .trades
            .get(symbol)
            .ok_or_else(|| SignalError::FeedUnavailable(format!("no filings for {symbol}")))?;
        Ok(trades.iter().filter(|t| request.contains(t.timestamp)).copied().collect())
    }
}

/// Deterministic stand-in for a real feed.
///
/// Places `trades_per_window` trades on random bars of the window. Each trade
/// buys when the close five bars later (or the last close) is higher and
/// sells when it is lower.
#[derive(Debug, Clone)]
pub struct SyntheticFeed {
    pub seed: u64,
    pub trades_per_window: usize,
}

impl Default for SyntheticFeed {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            trades_per_window: 8,
        }
    }
}

impl SyntheticFeed {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    fn rng_for(&self, symbol: Option<&str>) -> StdRng {
        let mixed = symbol
            .unwrap_or_default()
            .bytes()
            .fold(self.seed, |h, b| h.rotate_left(5) ^ u64::from(b));
        StdRng::seed_from_u64(mixed)
    }
}

impl InsiderFeedProvider for SyntheticFeed {
    fn fetch(&self, request: &FeedRequest<'_>) -> Result<Vec<InsiderTrade>> {
        let candidates: Vec<usize> = (0..request.timestamps.len().min(request.closes.len()))
            .filter(|&i| request.contains(request.timestamps[i]))
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let last = request.closes.len() - 1;
        let mut rng = self.rng_for(request.symbol);
        let mut trades: Vec<InsiderTrade> = (0..self.trades_per_window)
            .map(|_| {
                let i = candidates[rng.gen_range(0..candidates.len())];
                // The last bar has no future; it looks one bar back instead
                let (from, to) = if i < last { (i, (i + 5).min(last)) } else { (i.saturating_sub(1), i) };
                let forward = request.closes[to] - request.closes[from];
                let action = if forward > 0.0 {
                    InsiderAction::Buy
                } else if forward < 0.0 {
                    InsiderAction::Sell
                } else if rng.gen_bool(0.5) {
                    InsiderAction::Buy
                } else {
                    InsiderAction::Sell
                };
                InsiderTrade {
                    timestamp: request.timestamps[i],
                    role: InsiderRole::ALL[rng.gen_range(0..InsiderRole::ALL.len())],
                    action,
                    shares: f64::from(rng.gen_range(1_000_u32..50_000)),
                    price: request.closes[i],
                }
            })
            .collect();
        trades.sort_by_key(|t| t.timestamp);
        Ok(trades)
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

// ============================================================
// ANALYZER
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct InsiderAnalyzer {
    pub config: InsiderConfig,
}

impl InsiderAnalyzer {
    pub fn new(config: InsiderConfig) -> Self {
        Self { config }
    }

    /// Fetch the trailing window from `provider` and reduce it.
    ///
    /// A failing provider is logged and yields [`InsiderInfluence::unavailable`].
    pub fn influence<T, P>(&self, provider: &P, symbol: Option<&str>, bars: &[T]) -> InsiderInfluence
    where
        T: OHLCV,
        P: InsiderFeedProvider + ?Sized,
    {
        let Some(last) = bars.last() else {
            return InsiderInfluence::unavailable();
        };
        let timestamps: Vec<i64> = bars.iter().map(|b| b.timestamp()).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();
        let window_end = last.timestamp();
        let request = FeedRequest {
            symbol,
            window_start: window_end.saturating_sub(self.config.window_days.saturating_mul(MS_PER_DAY)),
            window_end,
            timestamps: &timestamps,
            closes: &closes,
        };

        let trades = match provider.fetch(&request) {
            Ok(trades) => trades,
            Err(e) => {
                warn!("Insider feed failed for {}: {}", symbol.unwrap_or("<unnamed>"), e);
                return InsiderInfluence::unavailable();
            }
        };
        let simulated = provider.is_simulated();
        if simulated {
            warn!(
                "Using simulated insider trades for {}; influence is not based on filings",
                symbol.unwrap_or("<unnamed>")
            );
        }

        let in_window: Vec<InsiderTrade> = trades.into_iter().filter(|t| request.contains(t.timestamp)).collect();
        let influence = self.summarize(&in_window, simulated);
        debug!(
            "Insider influence: {} trades, score {:.1}, sentiment {}",
            influence.trade_count, influence.score, influence.sentiment
        );
        influence
    }

    /// Reduce already-windowed trades to an influence.
    pub fn summarize(&self, trades: &[InsiderTrade], simulated: bool) -> InsiderInfluence {
        let mut buy_volume = 0.0;
        let mut sell_volume = 0.0;
        let mut buys = 0usize;
        for t in trades {
            match t.action {
                InsiderAction::Buy => {
                    buy_volume += t.weighted_volume();
                    buys += 1;
                }
                InsiderAction::Sell => sell_volume += t.weighted_volume(),
            }
        }
        let n = trades.len();
        let sells = n - buys;

        let total_volume = buy_volume + sell_volume;
        let volume_imbalance = if total_volume > f64::EPSILON {
            (buy_volume - sell_volume) / total_volume
        } else {
            0.0
        };
        let count_imbalance = if n > 0 {
            (buys as f64 - sells as f64) / n as f64
        } else {
            0.0
        };

        let share = self.config.volume_share.get();
        let combined = (share * volume_imbalance + (1.0 - share) * count_imbalance).clamp(-1.0, 1.0);
        let threshold = self.config.sentiment_threshold;
        let sentiment = if combined > threshold {
            Direction::Bullish
        } else if combined < -threshold {
            Direction::Bearish
        } else {
            Direction::Sideways
        };

        InsiderInfluence {
            score: 50.0 + 50.0 * combined,
            sentiment,
            confidence: (combined.abs() * 70.0 + n.min(10) as f64 * 3.0).min(100.0),
            available: true,
            simulated,
            trade_count: n,
            adjustments: InsiderAdjustments {
                candlestick: combined * self.config.max_candlestick,
                moving_average: combined * self.config.max_moving_average,
                fibonacci: combined * self.config.max_fibonacci,
                overall: combined * self.config.max_overall,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn trade(role: InsiderRole, action: InsiderAction, shares: f64) -> InsiderTrade {
        InsiderTrade {
            timestamp: 0,
            role,
            action,
            shares,
            price: 10.0,
        }
    }

    fn daily(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * MS_PER_DAY, c, c, c, c, 100.0))
            .collect()
    }

    struct FailingFeed;

    impl InsiderFeedProvider for FailingFeed {
        fn fetch(&self, _request: &FeedRequest<'_>) -> Result<Vec<InsiderTrade>> {
            Err(SignalError::FeedUnavailable("offline".to_string()))
        }
    }

    #[test]
    fn test_role_weights() {
        assert_eq!(InsiderRole::Ceo.weight(), 3.0);
        assert_eq!(InsiderRole::President.weight(), 2.5);
        assert_eq!(InsiderRole::TenPercentOwner.weight(), 1.5);
        assert_eq!(InsiderRole::Other.weight(), 1.0);
    }

    #[test]
    fn test_all_buys_is_maximally_bullish() {
        let trades = [
            trade(InsiderRole::Ceo, InsiderAction::Buy, 1_000.0),
            trade(InsiderRole::Director, InsiderAction::Buy, 500.0),
        ];
        let inf = InsiderAnalyzer::default().summarize(&trades, false);
        assert_eq!(inf.sentiment, Direction::Bullish);
        assert!((inf.score - 100.0).abs() < 1e-9);
        assert!((inf.adjustments.overall - 15.0).abs() < 1e-9);
        assert!((inf.adjustments.candlestick - 15.0).abs() < 1e-9);
        assert!((inf.adjustments.moving_average - 10.0).abs() < 1e-9);
        assert!((inf.adjustments.fibonacci - 8.0).abs() < 1e-9);
        // 70 + 2 * 3
        assert!((inf.confidence - 76.0).abs() < 1e-9);
    }

    #[test]
    fn test_role_weight_tilts_balanced_counts() {
        // One CEO buy against one "other" sell of the same size
        let trades = [
            trade(InsiderRole::Ceo, InsiderAction::Buy, 1_000.0),
            trade(InsiderRole::Other, InsiderAction::Sell, 1_000.0),
        ];
        let inf = InsiderAnalyzer::default().summarize(&trades, false);
        // volume imbalance (3000 - 1000) / 4000 = 0.5, count imbalance 0
        assert!((inf.score - (50.0 + 50.0 * 0.35)).abs() < 1e-9);
        assert_eq!(inf.sentiment, Direction::Bullish);
    }

    #[test]
    fn test_no_trades_is_neutral_but_available() {
        let inf = InsiderAnalyzer::default().summarize(&[], false);
        assert!(inf.available);
        assert_eq!(inf.score, 50.0);
        assert_eq!(inf.sentiment, Direction::Sideways);
        assert_eq!(inf.adjustments, InsiderAdjustments::default());
    }

    #[test]
    fn test_failing_provider_is_unavailable() {
        let bars = daily(&[10.0; 40]);
        let inf = InsiderAnalyzer::default().influence(&FailingFeed, Some("ACME"), &bars);
        assert!(!inf.available);
        assert_eq!(inf.adjustments, InsiderAdjustments::default());
    }

    #[test]
    fn test_real_feed_filters_window_and_symbol() {
        let bars = daily(&[10.0; 60]);
        let end = 59 * MS_PER_DAY;
        let old = InsiderTrade {
            timestamp: 0,
            ..trade(InsiderRole::Ceo, InsiderAction::Sell, 9_999.0)
        };
        let fresh = InsiderTrade {
            timestamp: end - MS_PER_DAY,
            ..trade(InsiderRole::Cfo, InsiderAction::Buy, 100.0)
        };
        let feed = RealFeed::new().with_trades("ACME", vec![old, fresh]);

        let inf = InsiderAnalyzer::default().influence(&feed, Some("ACME"), &bars);
        assert!(inf.available);
        assert!(!inf.simulated);
        assert_eq!(inf.trade_count, 1);
        assert_eq!(inf.sentiment, Direction::Bullish);

        let missing = InsiderAnalyzer::default().influence(&feed, Some("OTHER"), &bars);
        assert!(!missing.available);
    }

    #[test]
    fn test_synthetic_feed_is_deterministic_and_follows_price() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let bars = daily(&closes);
        let feed = SyntheticFeed::default();
        let analyzer = InsiderAnalyzer::default();

        let a = analyzer.influence(&feed, Some("ACME"), &bars);
        let b = analyzer.influence(&feed, Some("ACME"), &bars);
        assert_eq!(a, b);
        assert!(a.simulated);
        assert_eq!(a.trade_count, 8);
        // Every forward move is up, so every synthetic trade is a buy
        assert_eq!(a.sentiment, Direction::Bullish);
        assert!((a.score - 100.0).abs() < 1e-9);
    }
}
