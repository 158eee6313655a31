//! Calculus-derived price structure
//!
//! Treats the close series as a sampled function and uses centered finite
//! differences to find turning points (sign change of the first derivative)
//! and inflection points (sign change of the second). Around them it builds
//! volume-shift events, an entry/wait trade suggestion and three forward
//! scenarios scaled by the insider adjustment.

use serde::Serialize;

use crate::{config::CalculusConfig, stats, OHLCV};

// ============================================================
// TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalKind {
    LocalMin,
    LocalMax,
}

/// Bar where the close turns
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalPoint {
    pub timestamp: i64,
    pub index: usize,
    pub price: f64,
    pub kind: CriticalKind,
    /// Second derivative at the point
    pub curvature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InflectionKind {
    UptrendAccelerating,
    UptrendSlowing,
    DowntrendAccelerating,
    DowntrendSlowing,
}

/// Bar where the curvature of the close flips
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InflectionPoint {
    pub timestamp: i64,
    pub index: usize,
    pub price: f64,
    pub kind: InflectionKind,
    pub slope_before: f64,
    pub slope_after: f64,
}

/// Volume far above its trailing distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeShift {
    pub timestamp: i64,
    pub index: usize,
    pub volume: f64,
    /// Trailing mean + `volume_sigma` standard deviations
    pub threshold: f64,
    /// Percent close move 5 bars later, if realized
    pub move_5: Option<f64>,
    pub move_10: Option<f64>,
}

/// Entry suggestion derived from the recent cycle structure
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OptimalTrade {
    Enter {
        entry_price: f64,
        /// The recent local minimum price is trading near
        reference_min: f64,
        predicted_exit: f64,
        expected_gain_pct: f64,
        /// Bars to hold; unknown with fewer than two minima
        holding_period_bars: Option<usize>,
    },
    Wait {
        /// Distance to the latest recent minimum, if there is one
        distance_pct: Option<f64>,
    },
}

impl OptimalTrade {
    #[inline]
    pub fn is_entry(&self) -> bool {
        matches!(self, OptimalTrade::Enter { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Optimistic,
    Realistic,
    Pessimistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioPrediction {
    pub scenario: Scenario,
    pub change_pct: f64,
    pub target_price: f64,
    pub probability: f64,
}

/// Everything the calculus detector derives from one series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculusAnalysis {
    pub critical_points: Vec<CriticalPoint>,
    pub inflection_points: Vec<InflectionPoint>,
    pub volume_shifts: Vec<VolumeShift>,
    pub optimal_trade: OptimalTrade,
    pub scenarios: Vec<ScenarioPrediction>,
}

// ============================================================
// DETECTOR
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct CalculusDetector {
    pub config: CalculusConfig,
}

impl CalculusDetector {
    pub fn new(config: CalculusConfig) -> Self {
        Self { config }
    }

    /// Full analysis; `insider_overall` is the overall insider adjustment
    /// (0 when no feed is available).
    pub fn analyze<T: OHLCV>(&self, bars: &[T], insider_overall: f64) -> CalculusAnalysis {
        let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();
        let (d1, d2) = self.derivatives(&closes);

        let critical_points = self.critical_points(bars, &closes, &d1, &d2);
        let inflection_points = self.inflection_points(bars, &closes, &d1, &d2);
        let volume_shifts = self.volume_shifts(bars);
        let optimal_trade = self.optimal_trade(&closes, &critical_points, insider_overall);
        let scenarios = self.scenarios(closes.last().copied().unwrap_or(0.0), insider_overall);

        CalculusAnalysis {
            critical_points,
            inflection_points,
            volume_shifts,
            optimal_trade,
            scenarios,
        }
    }

    /// Centered first and second differences. End points and values below
    /// `derivative_tolerance * price` are zero.
    fn derivatives(&self, closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let n = closes.len();
        let mut d1 = vec![0.0; n];
        let mut d2 = vec![0.0; n];
        let tol = self.config.derivative_tolerance;

        for i in 1..n.saturating_sub(1) {
            let eps = tol * closes[i].abs();
            let first = (closes[i + 1] - closes[i - 1]) / 2.0;
            let second = closes[i + 1] - 2.0 * closes[i] + closes[i - 1];
            d1[i] = if first.abs() <= eps { 0.0 } else { first };
            d2[i] = if second.abs() <= eps { 0.0 } else { second };
        }

        (d1, d2)
    }

    fn critical_points<T: OHLCV>(&self, bars: &[T], closes: &[f64], d1: &[f64], d2: &[f64]) -> Vec<CriticalPoint> {
        let n = closes.len();
        let mut points = Vec::new();

        for i in 2..n.saturating_sub(2) {
            if d1[i - 1] * d1[i + 1] >= 0.0 {
                continue;
            }
            let (prev, here, next) = (closes[i - 1], closes[i], closes[i + 1]);
            let kind = if d2[i] > 0.0 && here <= prev && here <= next {
                CriticalKind::LocalMin
            } else if d2[i] < 0.0 && here >= prev && here >= next {
                CriticalKind::LocalMax
            } else {
                continue;
            };
            // A flat top or bottom spanning two bars is one turning point
            if here == prev && points.last().is_some_and(|p: &CriticalPoint| p.index + 1 == i && p.kind == kind) {
                continue;
            }

            points.push(CriticalPoint {
                timestamp: bars[i].timestamp(),
                index: i,
                price: here,
                kind,
                curvature: d2[i],
            });
        }

        points
    }

    fn inflection_points<T: OHLCV>(&self, bars: &[T], closes: &[f64], d1: &[f64], d2: &[f64]) -> Vec<InflectionPoint> {
        let n = closes.len();
        let mut points = Vec::new();

        for i in 2..n.saturating_sub(2) {
            let (before, after) = (d2[i - 1], d2[i]);
            if before * after >= 0.0 {
                continue;
            }
            let turning_up = before < 0.0;
            let kind = match (d1[i] > 0.0, d1[i] < 0.0, turning_up) {
                (true, _, true) => InflectionKind::UptrendAccelerating,
                (true, _, false) => InflectionKind::UptrendSlowing,
                (_, true, false) => InflectionKind::DowntrendAccelerating,
                (_, true, true) => InflectionKind::DowntrendSlowing,
                _ => continue,
            };

            points.push(InflectionPoint {
                timestamp: bars[i].timestamp(),
                index: i,
                price: closes[i],
                kind,
                slope_before: d1[i - 1],
                slope_after: d1[i + 1],
            });
        }

        points
    }

    fn volume_shifts<T: OHLCV>(&self, bars: &[T]) -> Vec<VolumeShift> {
        let window = self.config.volume_window.get();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume()).collect();
        let forward = |i: usize, h: usize| -> Option<f64> {
            let to = bars.get(i + h)?.close();
            Some(stats::pct_change(bars[i].close(), to))
        };

        (window..bars.len())
            .filter_map(|i| {
                let trail = &volumes[i - window..i];
                let threshold = stats::mean(trail) + self.config.volume_sigma * stats::std_dev(trail);
                (volumes[i] > threshold).then(|| VolumeShift {
                    timestamp: bars[i].timestamp(),
                    index: i,
                    volume: volumes[i],
                    threshold,
                    move_5: forward(i, 5),
                    move_10: forward(i, 10),
                })
            })
            .collect()
    }

    fn optimal_trade(&self, closes: &[f64], points: &[CriticalPoint], insider_overall: f64) -> OptimalTrade {
        let Some(&current) = closes.last() else {
            return OptimalTrade::Wait { distance_pct: None };
        };
        let last_index = closes.len() - 1;
        let minima: Vec<&CriticalPoint> = points.iter().filter(|p| p.kind == CriticalKind::LocalMin).collect();

        let recent = minima
            .iter()
            .rev()
            .find(|p| last_index - p.index <= self.config.recent_min_lookback);
        let Some(recent) = recent else {
            return OptimalTrade::Wait { distance_pct: None };
        };

        let distance_pct = stats::pct_change(recent.price, current).abs();
        if distance_pct > self.config.entry_proximity_pct {
            return OptimalTrade::Wait {
                distance_pct: Some(distance_pct),
            };
        }

        // Completed cycles: each minimum paired with the first maximum after it
        let gains: Vec<f64> = minima
            .iter()
            .filter_map(|min| {
                points
                    .iter()
                    .find(|p| p.kind == CriticalKind::LocalMax && p.index > min.index)
                    .filter(|_| min.price.abs() > f64::EPSILON)
                    .map(|max| (max.price - min.price) / min.price)
            })
            .collect();
        let avg_gain = if gains.is_empty() {
            self.config.realistic_pct / 100.0
        } else {
            stats::mean(&gains)
        };
        let expected_gain = avg_gain * (1.0 + insider_overall / 100.0);

        let spacings: Vec<f64> = minima.windows(2).map(|w| (w[1].index - w[0].index) as f64).collect();
        let holding_period_bars =
            (!spacings.is_empty()).then(|| (stats::mean(&spacings) * self.config.holding_fraction).round() as usize);

        OptimalTrade::Enter {
            entry_price: current,
            reference_min: recent.price,
            predicted_exit: current * (1.0 + expected_gain),
            expected_gain_pct: expected_gain * 100.0,
            holding_period_bars,
        }
    }

    /// Fixed moves from `current`, each target then scaled by the insider
    /// multiplier. A bullish adjustment lifts every target, including the
    /// pessimistic one.
    fn scenarios(&self, current: f64, insider_overall: f64) -> Vec<ScenarioPrediction> {
        let multiplier = 1.0 + insider_overall / 100.0;
        [
            (Scenario::Optimistic, self.config.optimistic_pct, 0.25),
            (Scenario::Realistic, self.config.realistic_pct, 0.50),
            (Scenario::Pessimistic, self.config.pessimistic_pct, 0.25),
        ]
        .into_iter()
        .map(|(scenario, pct, probability)| {
            let target_price = current * (1.0 + pct / 100.0) * multiplier;
            ScenarioPrediction {
                scenario,
                change_pct: stats::pct_change(current, target_price),
                target_price,
                probability,
            }
        })
        .collect()
    }
}
