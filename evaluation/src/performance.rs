use std::fmt;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use common::Trade;

/// Trading days per year, used to annualize the Sharpe ratio of daily
/// bars.
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summary statistics of one backtest run.
///
/// Return figures are percentages of the first trade's (signed) size;
/// absent values mean the metric is not computable for this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_return: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub win_rate: Option<f64>,
    pub avg_trade_return: Option<f64>,
    pub trade_count: usize,
}

/// Derive return, risk, and win-rate statistics from a trade log and its
/// realized-PnL sequence. Inputs are not mutated.
pub fn evaluate(trades: &[Trade], pnl: &[f64]) -> PerformanceReport {
    let first_size = trades.first().map(|t| t.size).filter(|s| *s != 0.0);
    let pnl_sum: f64 = pnl.iter().sum();
    let pnl_mean = if pnl.is_empty() { None } else { Some(pnl.iter().mean()) };

    let total_return = first_size.map(|size| pnl_sum / size * 100.0);
    let avg_trade_return = match (first_size, pnl_mean) {
        (Some(size), Some(mean)) => Some(mean / size * 100.0),
        _ => None,
    };

    let sharpe_ratio = if pnl.len() >= 2 {
        let std = pnl.iter().std_dev();
        (std.is_finite() && std > 0.0)
            .then(|| pnl_mean.unwrap_or(0.0) / std * TRADING_DAYS_PER_YEAR.sqrt())
    } else {
        None
    };

    PerformanceReport {
        total_return,
        sharpe_ratio,
        max_drawdown: max_drawdown(pnl),
        win_rate: win_rate(pnl),
        avg_trade_return,
        trade_count: trades.len(),
    }
}

/// Largest peak-to-trough drop of cumulative PnL, as a percentage of the
/// highest running peak. Absent while cumulative PnL has never been
/// positive (no meaningful peak to draw down from).
fn max_drawdown(pnl: &[f64]) -> Option<f64> {
    if pnl.is_empty() {
        return None;
    }
    let mut cumulative = 0.0;
    let mut running_max = f64::NEG_INFINITY;
    let mut worst_drop = f64::INFINITY;
    let mut highest_peak = f64::NEG_INFINITY;
    for value in pnl {
        cumulative += value;
        running_max = running_max.max(cumulative);
        worst_drop = worst_drop.min(cumulative - running_max);
        highest_peak = highest_peak.max(running_max);
    }
    (highest_peak > 0.0).then(|| worst_drop / highest_peak * 100.0)
}

fn win_rate(pnl: &[f64]) -> Option<f64> {
    if pnl.is_empty() {
        return None;
    }
    let wins = pnl.iter().filter(|p| **p > 0.0).count();
    Some(wins as f64 / pnl.len() as f64 * 100.0)
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn cell(value: Option<f64>) -> String {
            value.map_or("n/a".to_string(), |v| format!("{v:.2}"))
        }
        writeln!(f, "Performance Metrics:")?;
        writeln!(f, "  Total Return:          {}%", cell(self.total_return))?;
        writeln!(f, "  Sharpe Ratio:          {}", cell(self.sharpe_ratio))?;
        writeln!(f, "  Maximum Drawdown:      {}%", cell(self.max_drawdown))?;
        writeln!(f, "  Win Rate:              {}%", cell(self.win_rate))?;
        writeln!(f, "  Average Trade Return:  {}%", cell(self.avg_trade_return))?;
        write!(f, "  Trades:                {}", self.trade_count)
    }
}
