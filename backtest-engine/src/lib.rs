//! Event-driven backtest engine for a single pairs-trading run.
//!
//! Consumes two aligned price series plus a discrete signal stream and
//! replays the entry/exit state machine under leverage, slippage, and
//! commission constraints, producing a trade log and realized-PnL trace.

mod account;
mod engine;
mod report;

pub use account::{BacktestAccount, Position};
pub use engine::{BacktestConfig, PairsBacktest};
pub use report::BacktestReport;
