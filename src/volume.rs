//! Volume regime
//!
//! Trend of volume, recent spike against the longer average, price/volume
//! correlation and an accumulation/distribution line over the trailing bars.

use serde::Serialize;

use crate::{config::VolumeConfig, require_bars, stats, Direction, OHLCVExt, Result, OHLCV};

/// Volume statistics over the trailing `lookback` bars
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeAnalysis {
    pub average_volume: f64,
    /// Least-squares slope of volume against bar index
    pub volume_slope: f64,
    pub volume_trend: Direction,
    /// avg(last `spike_window`) / avg(lookback); 1.0 when the average is zero
    pub spike_ratio: f64,
    pub price_volume_correlation: f64,
    /// Running money-flow total over the trailing `accumulation_window` bars
    pub accumulation_distribution: f64,
}

impl VolumeAnalysis {
    /// Direction and 0..=100 strength of the volume signal
    pub fn signal(&self) -> (Direction, f64) {
        let strength = 50.0
            + self.price_volume_correlation.abs() * 30.0
            + (self.spike_ratio - 1.0).clamp(-1.0, 1.0) * 20.0;
        (self.volume_trend, strength.clamp(0.0, 100.0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct VolumeAnalyzer {
    pub config: VolumeConfig,
}

impl VolumeAnalyzer {
    pub fn new(config: VolumeConfig) -> Self {
        Self { config }
    }

    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> Result<VolumeAnalysis> {
        let lookback = self.config.lookback.get();
        require_bars(bars, lookback)?;

        let window = &bars[bars.len() - lookback..];
        let volumes: Vec<f64> = window.iter().map(|b| b.volume()).collect();
        let closes: Vec<f64> = window.iter().map(|b| b.close()).collect();

        let average_volume = stats::mean(&volumes);
        let volume_slope = stats::linear_slope(&volumes);
        let volume_trend = if volume_slope > self.config.trend_slope_threshold {
            Direction::Bullish
        } else if volume_slope < -self.config.trend_slope_threshold {
            Direction::Bearish
        } else {
            Direction::Sideways
        };

        let spike_window = self.config.spike_window.get();
        let recent = stats::mean(&volumes[volumes.len() - spike_window..]);
        let spike_ratio = if average_volume > f64::EPSILON {
            recent / average_volume
        } else {
            1.0
        };

        let acc_window = self.config.accumulation_window.get();
        let accumulation_distribution = window[window.len() - acc_window..]
            .iter()
            .map(money_flow)
            .sum();

        Ok(VolumeAnalysis {
            average_volume,
            volume_slope,
            volume_trend,
            spike_ratio,
            price_volume_correlation: stats::pearson(&closes, &volumes),
            accumulation_distribution,
        })
    }
}

/// Close-location value times volume; zero-range bars contribute nothing
#[inline]
fn money_flow<T: OHLCV>(bar: &T) -> f64 {
    let range = bar.range();
    if range <= f64::EPSILON {
        return 0.0;
    }
    ((bar.close() - bar.low()) - (bar.high() - bar.close())) / range * bar.volume()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    #[test]
    fn test_requires_lookback() {
        let bars: Vec<Bar> = (0..49).map(|i| Bar::new(i, 1.0, 1.0, 1.0, 1.0, 1.0)).collect();
        assert!(VolumeAnalyzer::default().analyze(&bars).is_err());
    }

    #[test]
    fn test_constant_series_is_neutral() {
        let bars: Vec<Bar> = (0..60).map(|i| Bar::new(i, 10.0, 10.0, 10.0, 10.0, 500.0)).collect();
        let v = VolumeAnalyzer::default().analyze(&bars).unwrap();
        assert_eq!(v.volume_trend, Direction::Sideways);
        assert_eq!(v.price_volume_correlation, 0.0);
        assert_eq!(v.accumulation_distribution, 0.0);
        assert!((v.spike_ratio - 1.0).abs() < 1e-12);
        assert_eq!(v.signal(), (Direction::Sideways, 50.0));
    }

    #[test]
    fn test_rising_volume_with_price() {
        let bars: Vec<Bar> = (0..80)
            .map(|i| {
                let c = 100.0 + i as f64;
                Bar::new(i, c - 0.5, c + 0.1, c - 1.0, c, 1_000.0 + 10.0 * i as f64)
            })
            .collect();
        let v = VolumeAnalyzer::default().analyze(&bars).unwrap();
        assert_eq!(v.volume_trend, Direction::Bullish);
        assert!((v.volume_slope - 10.0).abs() < 1e-9);
        assert!(v.price_volume_correlation > 0.99);
        assert!(v.spike_ratio > 1.0);
        // Closes near the high every bar: accumulation
        assert!(v.accumulation_distribution > 0.0);

        let (dir, strength) = v.signal();
        assert_eq!(dir, Direction::Bullish);
        assert!(strength > 80.0);
    }

    #[test]
    fn test_zero_volume_spike_defaults_to_one() {
        let bars: Vec<Bar> = (0..50).map(|i| Bar::new(i, 10.0, 11.0, 9.0, 10.5, 0.0)).collect();
        let v = VolumeAnalyzer::default().analyze(&bars).unwrap();
        assert_eq!(v.spike_ratio, 1.0);
        assert_eq!(v.average_volume, 0.0);
    }
}
