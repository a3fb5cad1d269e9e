//! Rolling z-score of a spread series and the threshold-crossing signal
//! state machine built on top of it.
//!
//! The generator is deliberately stateful: a position entered when the
//! z-score breaches the entry threshold is held until the score falls
//! back inside the exit band. Between the two thresholds, and wherever
//! the z-score is undefined, the previous state is retained, so the
//! emitted stream can never flip directly from Long to Short.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use common::{CoreError, CoreResult, Signal};

/// Signal generation thresholds and lookback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Rolling window length for spread mean and standard deviation.
    #[serde(default = "default_window")]
    pub window: usize,

    /// Z-score magnitude that opens a position.
    #[serde(default = "default_entry_threshold")]
    pub entry_threshold: f64,

    /// Z-score magnitude below which a position is closed.
    #[serde(default = "default_exit_threshold")]
    pub exit_threshold: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            entry_threshold: default_entry_threshold(),
            exit_threshold: default_exit_threshold(),
        }
    }
}

fn default_window() -> usize {
    30
}

fn default_entry_threshold() -> f64 {
    2.0
}

fn default_exit_threshold() -> f64 {
    0.5
}

impl SignalConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.window < 1 {
            return Err(CoreError::InvalidInput(
                "signal window must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("entry_threshold", self.entry_threshold),
            ("exit_threshold", self.exit_threshold),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(CoreError::InvalidInput(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }
        if self.entry_threshold <= self.exit_threshold {
            return Err(CoreError::InvalidInput(format!(
                "entry threshold {} must exceed exit threshold {}",
                self.entry_threshold, self.exit_threshold
            )));
        }
        Ok(())
    }
}

/// Z-score of each spread value against the trailing `window` observations
/// (current value included).
///
/// `None` for the first `window - 1` indices and wherever the rolling
/// sample standard deviation is zero or not finite.
pub fn rolling_zscore(spread: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut scores = Vec::with_capacity(spread.len());
    for i in 0..spread.len() {
        if i + 1 < window {
            scores.push(None);
            continue;
        }
        let trailing = &spread[i + 1 - window..=i];
        let mean = trailing.mean();
        let std = trailing.std_dev();
        if std.is_finite() && std > 0.0 {
            scores.push(Some((spread[i] - mean) / std));
        } else {
            scores.push(None);
        }
    }
    scores
}

/// Map a spread series to one `Signal` per index.
///
/// Long when the spread is stretched below its rolling mean, short when
/// stretched above, flat once the deviation re-enters the exit band.
pub fn generate_signals(spread: &[f64], config: &SignalConfig) -> CoreResult<Vec<Signal>> {
    config.validate()?;
    if spread.is_empty() {
        return Err(CoreError::InvalidInput("empty spread series".to_string()));
    }
    if let Some(pos) = spread.iter().position(|v| !v.is_finite()) {
        return Err(CoreError::InvalidInput(format!(
            "non-finite spread value at index {pos}"
        )));
    }

    let zscores = rolling_zscore(spread, config.window);
    let mut state = Signal::Flat;
    let mut signals = Vec::with_capacity(spread.len());
    for z in zscores {
        state = match (state, z) {
            (current, None) => current,
            (Signal::Flat, Some(z)) if z < -config.entry_threshold => Signal::Long,
            (Signal::Flat, Some(z)) if z > config.entry_threshold => Signal::Short,
            (Signal::Flat, Some(_)) => Signal::Flat,
            (_, Some(z)) if z.abs() < config.exit_threshold => Signal::Flat,
            (held, Some(_)) => held,
        };
        signals.push(state);
    }
    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zscore_warmup_is_undefined() {
        let scores = rolling_zscore(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(scores[0], None);
        assert_eq!(scores[1], None);
        assert!(scores[2].is_some());
        assert!(scores[3].is_some());
    }

    #[test]
    fn test_zscore_values_match_rolling_stats() {
        let scores = rolling_zscore(&[1.0, 2.0, 3.0, 10.0], 3);
        // Window [1, 2, 3]: mean 2, sample std 1.
        assert!((scores[2].unwrap() - 1.0).abs() < 1e-12);
        // Window [2, 3, 10]: mean 5, sample std sqrt(19).
        let expected = 5.0 / 19.0_f64.sqrt();
        assert!((scores[3].unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zscore_flat_window_is_undefined() {
        let scores = rolling_zscore(&[5.0, 5.0, 5.0, 5.0], 3);
        assert_eq!(scores[2], None);
        assert_eq!(scores[3], None);
    }

    #[test]
    fn test_spike_triggers_short_and_holds() {
        let spread = [1.0, 2.0, 3.0, 10.0, 1.0, 1.0, 1.0];
        let config = SignalConfig {
            window: 3,
            entry_threshold: 1.0,
            exit_threshold: 0.5,
        };
        let signals = generate_signals(&spread, &config).unwrap();

        // Warmup stays flat, the spike index carries the window's maximum
        // positive z-score and opens the short.
        assert_eq!(&signals[..3], &[Signal::Flat, Signal::Flat, Signal::Flat]);
        assert_eq!(signals[3], Signal::Short);
        // Deviation never re-enters the exit band (the trailing window is
        // still dominated by the spike), so the short is held, including
        // through the final flat-window index where z is undefined.
        assert_eq!(&signals[4..], &[Signal::Short, Signal::Short, Signal::Short]);

        let z = rolling_zscore(&spread, 3);
        let spike = z[3].unwrap();
        for score in z.iter().flatten() {
            assert!(*score <= spike);
        }
        assert!(spike > 1.0);
    }

    #[test]
    fn test_long_entry_and_exit_band() {
        // Downward spike opens a long; drifting back to the mean closes it.
        let spread = [0.0, 0.0, -4.0, 0.1, 0.0, 0.0];
        let config = SignalConfig {
            window: 3,
            entry_threshold: 1.0,
            exit_threshold: 0.7,
        };
        let signals = generate_signals(&spread, &config).unwrap();
        assert_eq!(signals[2], Signal::Long);
        assert_eq!(*signals.last().unwrap(), Signal::Flat);
        // No direct Long -> Short flip anywhere in the stream.
        for pair in signals.windows(2) {
            assert!(
                !(pair[0] == Signal::Long && pair[1] == Signal::Short
                    || pair[0] == Signal::Short && pair[1] == Signal::Long),
                "direct flip in {signals:?}"
            );
        }
    }

    #[test]
    fn test_between_thresholds_retains_state() {
        let config = SignalConfig {
            window: 2,
            entry_threshold: 0.7,
            exit_threshold: 0.1,
        };
        // With window 2 the z-score is +-1/sqrt(2) (~0.707) whenever the two
        // values differ, never inside the exit band, so the first entry is
        // held to the end of the stream.
        let spread = [0.0, 10.0, 9.0, 9.5, 9.2];
        let signals = generate_signals(&spread, &config).unwrap();
        assert_eq!(signals[1], Signal::Short);
        assert!(signals[2..].iter().all(|s| *s == Signal::Short));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let config = SignalConfig::default();
        assert!(generate_signals(&[], &config).is_err());
        assert!(generate_signals(&[1.0, f64::NAN], &config).is_err());

        let bad = SignalConfig {
            window: 0,
            ..SignalConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = SignalConfig {
            entry_threshold: 0.5,
            exit_threshold: 0.5,
            window: 10,
        };
        assert!(bad.validate().is_err());
    }
}
