use thiserror::Error;

/// Errors shared by the estimator, signal generator, and backtest engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Shape or value preconditions violated: mismatched lengths, empty
    /// series, non-finite or non-positive prices.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Per-step arithmetic that cannot produce a meaningful value, such as
    /// a zero price sum in the sizing formula or a zero hedge denominator.
    #[error("degenerate computation at index {index}: {reason}")]
    Degenerate { index: usize, reason: String },

    /// `KalmanFilter::update` called before `initialize`.
    #[error("filter used before initialization")]
    UninitializedFilter,
}
