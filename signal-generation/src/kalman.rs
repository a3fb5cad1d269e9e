//! Kalman filter for dynamic hedge ratio estimation.
//!
//! Tracks the two price levels of a pair as a 2-dimensional latent state
//! under an identity transition, coupled only through the scalar
//! measurement of their difference. The hedge ratio is the ratio of the
//! two filtered levels, not a directly-filtered regression coefficient,
//! and the spread follows as `price1 - ratio * price2`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{CoreError, CoreResult, HedgeSample};

/// Filter noise configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Process noise scale. Higher values let the levels drift faster.
    #[serde(default = "default_delta")]
    pub delta: f64,

    /// Measurement noise variance on the observed price difference.
    #[serde(default = "default_ve")]
    pub ve: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            delta: default_delta(),
            ve: default_ve(),
        }
    }
}

fn default_delta() -> f64 {
    1e-4
}

fn default_ve() -> f64 {
    1e-4
}

impl FilterConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.delta.is_finite() && self.delta > 0.0) {
            return Err(CoreError::InvalidInput(format!(
                "filter delta must be a positive finite number, got {}",
                self.delta
            )));
        }
        if !(self.ve.is_finite() && self.ve > 0.0) {
            return Err(CoreError::InvalidInput(format!(
                "filter ve must be a positive finite number, got {}",
                self.ve
            )));
        }
        Ok(())
    }
}

/// Mutable filter state, exclusively owned by one filter instance.
#[derive(Debug, Clone, Copy)]
struct FilterState {
    /// Latent price-level estimates `[x0, x1]`.
    x: [f64; 2],
    /// Error covariance.
    p: [[f64; 2]; 2],
    /// Process noise covariance, `delta * I`.
    q: [[f64; 2]; 2],
    /// Completed update cycles since `initialize`.
    steps: usize,
}

/// Recursive linear-Gaussian filter over one pair's price observations.
///
/// `initialize` must be called exactly once before the first `update`.
/// O(1) per update; no historical data is retained.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    config: FilterConfig,
    state: Option<FilterState>,
}

impl KalmanFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Seed the state with the first observation of each leg.
    ///
    /// State starts at the observed levels with identity error covariance.
    pub fn initialize(&mut self, y1: f64, y2: f64) {
        let delta = self.config.delta;
        self.state = Some(FilterState {
            x: [y1, y2],
            p: [[1.0, 0.0], [0.0, 1.0]],
            q: [[delta, 0.0], [0.0, delta]],
            steps: 0,
        });
    }

    /// Run one predict/correct cycle and return the updated state pair.
    ///
    /// A degenerate innovation covariance is reported with the number of
    /// updates completed so far as the error index.
    pub fn update(&mut self, y1: f64, y2: f64) -> CoreResult<(f64, f64)> {
        if !y1.is_finite() || !y2.is_finite() {
            return Err(CoreError::InvalidInput(format!(
                "non-finite observation ({y1}, {y2})"
            )));
        }
        let state = self.state.as_mut().ok_or(CoreError::UninitializedFilter)?;

        // Predict: identity transition leaves x unchanged, covariance
        // inflates by the process noise.
        let mut p = state.p;
        for i in 0..2 {
            for j in 0..2 {
                p[i][j] += state.q[i][j];
            }
        }

        // Correct against the scalar measurement y1 - y2 with H = [1, -1].
        let innovation = (y1 - y2) - (state.x[0] - state.x[1]);
        let s = p[0][0] - p[0][1] - p[1][0] + p[1][1] + self.config.ve;
        if !(s.is_finite() && s > 0.0) {
            return Err(CoreError::Degenerate {
                index: state.steps,
                reason: format!("innovation covariance {s} is not strictly positive"),
            });
        }

        let k = [(p[0][0] - p[0][1]) / s, (p[1][0] - p[1][1]) / s];
        state.x[0] += k[0] * innovation;
        state.x[1] += k[1] * innovation;

        // P = (I - K H) P_pred with K H = [[k0, -k0], [k1, -k1]].
        state.p = [
            [
                (1.0 - k[0]) * p[0][0] + k[0] * p[1][0],
                (1.0 - k[0]) * p[0][1] + k[0] * p[1][1],
            ],
            [
                -k[1] * p[0][0] + (1.0 + k[1]) * p[1][0],
                -k[1] * p[0][1] + (1.0 + k[1]) * p[1][1],
            ],
        ];
        state.steps += 1;

        Ok((state.x[0], state.x[1]))
    }

    /// Current error covariance, if initialized.
    pub fn error_covariance(&self) -> Option<[[f64; 2]; 2]> {
        self.state.map(|s| s.p)
    }
}

/// Run the filter over two aligned series, deriving a hedge ratio and
/// spread for every observation.
///
/// The filter is seeded from the first observation and then updated over
/// the full series, the first observation included.
pub fn estimate_hedge_ratio(
    prices1: &[f64],
    prices2: &[f64],
    config: &FilterConfig,
) -> CoreResult<Vec<HedgeSample>> {
    config.validate()?;
    if prices1.len() != prices2.len() {
        return Err(CoreError::InvalidInput(format!(
            "price series lengths differ: {} vs {}",
            prices1.len(),
            prices2.len()
        )));
    }
    if prices1.is_empty() {
        return Err(CoreError::InvalidInput("empty price series".to_string()));
    }

    let mut filter = KalmanFilter::new(*config);
    filter.initialize(prices1[0], prices2[0]);

    let mut samples = Vec::with_capacity(prices1.len());
    for (i, (&p1, &p2)) in prices1.iter().zip(prices2).enumerate() {
        let (x0, x1) = filter.update(p1, p2)?;
        if x1 == 0.0 {
            return Err(CoreError::Degenerate {
                index: i,
                reason: "hedge denominator x1 is zero".to_string(),
            });
        }
        let hedge_ratio = x0 / x1;
        samples.push(HedgeSample {
            hedge_ratio,
            spread: p1 - hedge_ratio * p2,
        });
    }
    if let Some(last) = samples.last() {
        debug!(
            samples = samples.len(),
            hedge_ratio = last.hedge_ratio,
            "hedge estimation complete"
        );
    }
    Ok(samples)
}
