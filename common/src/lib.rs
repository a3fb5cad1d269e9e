//! Shared data model for the pairs-trading backtest pipeline.
//!
//! Everything here is produced or consumed by more than one stage:
//! price series flowing into the hedge filter, discrete signals flowing
//! into the backtest engine, and trade records flowing out to the
//! performance summarizer.

mod error;
mod types;

pub use error::CoreError;
pub use types::{HedgeSample, PriceObservation, PricePair, Signal, Trade, TradeKind};

/// Result alias used across the core crates.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
