// Signal Generation (Layer 1)
// Turns aligned price series into a discrete Long/Short/Flat signal stream

pub mod kalman;
pub mod zscore;

pub use kalman::{estimate_hedge_ratio, FilterConfig, KalmanFilter};
pub use zscore::{generate_signals, rolling_zscore, SignalConfig};
