use serde::{Deserialize, Serialize};

use common::{Signal, Trade};

/// An open spread position. At most one exists during a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    /// Trade direction; never `Flat` while the position exists.
    pub direction: Signal,
    /// Unsigned size in units of each leg.
    pub size: f64,
    /// Slippage-adjusted entry price of leg 1.
    pub entry_price1: f64,
    /// Slippage-adjusted entry price of leg 2.
    pub entry_price2: f64,
    /// Cash escrowed at entry, returned at settlement.
    pub entry_notional: f64,
}

impl Position {
    /// Signed size: positive long the spread, negative short.
    pub fn signed_size(&self) -> f64 {
        f64::from(self.direction.as_i8()) * self.size
    }
}

/// Run-scoped account state, mutated once per timestep and returned as
/// part of the run's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestAccount {
    pub cash: f64,
    pub open_position: Option<Position>,
    pub trades: Vec<Trade>,
    /// One entry per exit trade, in exit order.
    pub realized_pnl: Vec<f64>,
    /// Signed position size after each processed timestep.
    pub position_trace: Vec<f64>,
}

impl BacktestAccount {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            open_position: None,
            trades: Vec::new(),
            realized_pnl: Vec::new(),
            position_trace: Vec::new(),
        }
    }

    /// Signed size of the open position, zero when flat.
    pub fn position_size(&self) -> f64 {
        self.open_position.map_or(0.0, |p| p.signed_size())
    }
}
