//! Performance summarizer for completed backtest runs.
//!
//! Pure functions of the trade log and realized-PnL sequence; metrics
//! that cannot be computed are reported as absent rather than NaN.

mod performance;

pub use performance::{evaluate, PerformanceReport};
