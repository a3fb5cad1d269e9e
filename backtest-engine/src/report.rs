use std::fmt::Write as _;
use std::fs::File;
use std::io::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use common::{CoreError, CoreResult, Trade, TradeKind};

use crate::account::BacktestAccount;

/// Output of one backtest run: the full trade log, the realized-PnL log
/// (one value per exit, in exit order), and the per-step position trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub trades: Vec<Trade>,
    pub realized_pnl: Vec<f64>,
    pub position_trace: Vec<f64>,
    pub initial_capital: f64,
    pub final_cash: f64,
}

impl BacktestReport {
    pub(crate) fn from_account(account: BacktestAccount, initial_capital: f64) -> Self {
        Self {
            trades: account.trades,
            realized_pnl: account.realized_pnl,
            position_trace: account.position_trace,
            initial_capital,
            final_cash: account.cash,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.trades.iter().filter(|t| t.kind == TradeKind::Entry).count()
    }

    pub fn exit_count(&self) -> usize {
        self.trades.iter().filter(|t| t.kind == TradeKind::Exit).count()
    }

    /// Trade log in the interchange format consumed by downstream
    /// reporting. The `pnl` column is empty on entry rows.
    pub fn to_csv_string(&self) -> String {
        let mut out = String::from("type,i,signal,price1,price2,size,pnl\n");
        for trade in &self.trades {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{}",
                trade.kind.as_str(),
                trade.index,
                trade.signal.as_i8(),
                trade.price1,
                trade.price2,
                trade.size,
                trade.pnl.map_or(String::new(), |p| p.to_string()),
            );
        }
        out
    }

    /// Write the trade log CSV to `path`.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> CoreResult<()> {
        let mut file = File::create(path.as_ref())
            .map_err(|e| CoreError::InvalidInput(format!("cannot create trade log: {e}")))?;
        file.write_all(self.to_csv_string().as_bytes())
            .map_err(|e| CoreError::InvalidInput(format!("cannot write trade log: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Signal;

    fn sample_report() -> BacktestReport {
        BacktestReport {
            trades: vec![
                Trade {
                    kind: TradeKind::Entry,
                    index: 10,
                    signal: Signal::Long,
                    price1: 98.77,
                    price2: 100.69,
                    size: 1003.63,
                    pnl: None,
                },
                Trade {
                    kind: TradeKind::Exit,
                    index: 11,
                    signal: Signal::Long,
                    price1: 99.53,
                    price2: 99.55,
                    size: 1003.63,
                    pnl: Some(657.57),
                },
            ],
            realized_pnl: vec![657.57],
            position_trace: vec![0.0, 1003.63],
            initial_capital: 100_000.0,
            final_cash: 100_657.57,
        }
    }

    #[test]
    fn test_csv_layout() {
        let csv = sample_report().to_csv_string();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "type,i,signal,price1,price2,size,pnl");
        assert_eq!(lines[1], "entry,10,1,98.77,100.69,1003.63,");
        assert_eq!(lines[2], "exit,11,1,99.53,99.55,1003.63,657.57");
    }

    #[test]
    fn test_counts() {
        let report = sample_report();
        assert_eq!(report.entry_count(), 1);
        assert_eq!(report.exit_count(), 1);
    }
}
