use crate::market_data::Bar;
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, Maximum, Minimum, SimpleMovingAverage};

/// Latest smoothed stochastic oscillator values. `None` means the series is
/// too short for that stage to be defined.
#[derive(Debug, Clone, Copy)]
pub struct StochasticResult {
    pub k: Option<f64>,
    pub d: Option<f64>,
}

impl StochasticResult {
    const UNDEFINED: Self = Self { k: None, d: None };
}

/// Exponential moving average of the closes, last value only.
///
/// EMA[0] = close[0], EMA[t] = close[t]·α + EMA[t-1]·(1-α), α = 2/(period+1).
/// Undefined until `period` closes exist.
pub fn calculate_ema(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period {
        return None;
    }

    let mut ema = ExponentialMovingAverage::new(period).ok()?;
    let mut last = None;
    for &price in closes {
        last = Some(ema.next(price));
    }
    last
}

/// Slow stochastic oscillator, last values only.
///
/// %K_raw compares the close to the rolling `period` high-low range; %K is a
/// `smoothing`-bar SMA of %K_raw and %D a `smoothing`-bar SMA of %K. A flat
/// range resolves %K_raw to 0.0 rather than dividing by zero.
pub fn calculate_stochastic(bars: &[Bar], period: usize, smoothing: usize) -> StochasticResult {
    match stochastic_tail(bars, period, smoothing) {
        Some(result) => result,
        None => StochasticResult::UNDEFINED,
    }
}

fn stochastic_tail(bars: &[Bar], period: usize, smoothing: usize) -> Option<StochasticResult> {
    // %K needs a full range window plus a full smoothing window; %D needs
    // one more smoothing window on top of %K.
    let k_defined_at = period + smoothing - 1;
    let d_defined_at = period + 2 * smoothing - 2;
    if bars.len() < k_defined_at {
        return None;
    }

    let mut highest_high = Maximum::new(period).ok()?;
    let mut lowest_low = Minimum::new(period).ok()?;
    let mut k_smoother = SimpleMovingAverage::new(smoothing).ok()?;
    let mut d_smoother = SimpleMovingAverage::new(smoothing).ok()?;

    let mut last_k = 0.0;
    let mut last_d = 0.0;
    for bar in bars {
        let high = highest_high.next(bar.high);
        let low = lowest_low.next(bar.low);
        let range = high - low;
        let raw_k = if range == 0.0 {
            0.0
        } else {
            100.0 * (bar.close - low) / range
        };
        last_k = k_smoother.next(raw_k);
        last_d = d_smoother.next(last_k);
    }

    Some(StochasticResult {
        k: Some(last_k),
        d: (bars.len() >= d_defined_at).then_some(last_d),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(i: usize, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc
                .timestamp_opt(1_700_000_000 + i as i64 * 86_400, 0)
                .unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1_000,
        }
    }

    fn ramp_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                bar(i, close + 1.0, close - 1.0, close)
            })
            .collect()
    }

    #[test]
    fn ema_undefined_below_period() {
        let closes: Vec<f64> = (0..19).map(|i| 100.0 + i as f64).collect();
        assert!(calculate_ema(&closes, 20).is_none());
    }

    #[test]
    fn ema_defined_at_period() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert!(calculate_ema(&closes, 20).is_some());

        let long: Vec<f64> = (0..200).map(|i| 100.0 + (i % 7) as f64).collect();
        assert!(calculate_ema(&long, 200).is_some());
    }

    #[test]
    fn ema_matches_recurrence() {
        let closes = [10.0, 11.0, 13.0, 12.0, 15.0, 14.0, 16.0];
        let period = 3;
        let alpha = 2.0 / (period as f64 + 1.0);

        let mut expected = closes[0];
        for &close in &closes[1..] {
            let next = close * alpha + expected * (1.0 - alpha);
            // Convexity: each step lands between the prior EMA and the close.
            assert!(next >= expected.min(close) && next <= expected.max(close));
            expected = next;
        }

        let got = calculate_ema(&closes, period).unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn stochastic_definedness_cutoffs() {
        // period 14, smoothing 3: %K at 16 bars, %D at 18 bars.
        let result = calculate_stochastic(&ramp_bars(15), 14, 3);
        assert!(result.k.is_none());
        assert!(result.d.is_none());

        let result = calculate_stochastic(&ramp_bars(16), 14, 3);
        assert!(result.k.is_some());
        assert!(result.d.is_none());

        let result = calculate_stochastic(&ramp_bars(18), 14, 3);
        assert!(result.k.is_some());
        assert!(result.d.is_some());
    }

    #[test]
    fn stochastic_stays_in_band() {
        let bars: Vec<Bar> = (0..60)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.7).sin() * 10.0;
                bar(i, close + 2.0, close - 2.0, close)
            })
            .collect();
        let result = calculate_stochastic(&bars, 14, 3);
        let k = result.k.unwrap();
        let d = result.d.unwrap();
        assert!((0.0..=100.0).contains(&k));
        assert!((0.0..=100.0).contains(&d));
    }

    #[test]
    fn flat_range_resolves_to_sentinel() {
        let bars: Vec<Bar> = (0..30).map(|i| bar(i, 50.0, 50.0, 50.0)).collect();
        let result = calculate_stochastic(&bars, 14, 3);
        assert_eq!(result.k, Some(0.0));
        assert_eq!(result.d, Some(0.0));
    }

    #[test]
    fn rising_series_pins_k_high() {
        // Close at the top of every window keeps raw %K at 100.
        let bars: Vec<Bar> = (0..40)
            .map(|i| {
                let close = 100.0 + i as f64;
                bar(i, close, close - 5.0, close)
            })
            .collect();
        let result = calculate_stochastic(&bars, 14, 3);
        assert!(result.k.unwrap() > 90.0);
    }
}
