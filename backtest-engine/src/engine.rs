use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use common::{CoreError, CoreResult, Signal, Trade, TradeKind};

use crate::account::{BacktestAccount, Position};
use crate::report::BacktestReport;

/// Backtest cost and sizing parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Starting cash.
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,

    /// Fractional price penalty on every execution.
    #[serde(default = "default_slippage")]
    pub slippage: f64,

    /// Commission charged on the combined notional of both legs.
    #[serde(default = "default_commission")]
    pub commission: f64,

    /// Multiple of cash committed as notional exposure at entry.
    #[serde(default = "default_max_leverage")]
    pub max_leverage: f64,

    /// Carry the previous position through a degenerate sizing step
    /// instead of aborting the run.
    #[serde(default)]
    pub skip_degenerate_steps: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            slippage: default_slippage(),
            commission: default_commission(),
            max_leverage: default_max_leverage(),
            skip_degenerate_steps: false,
        }
    }
}

fn default_initial_capital() -> f64 {
    100_000.0
}

fn default_slippage() -> f64 {
    0.0005
}

fn default_commission() -> f64 {
    0.0005
}

fn default_max_leverage() -> f64 {
    2.0
}

impl BacktestConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(CoreError::InvalidInput(format!(
                "initial capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if !(self.max_leverage.is_finite() && self.max_leverage > 0.0) {
            return Err(CoreError::InvalidInput(format!(
                "max leverage must be positive, got {}",
                self.max_leverage
            )));
        }
        for (name, value) in [("slippage", self.slippage), ("commission", self.commission)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CoreError::InvalidInput(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Single-pair backtest state machine.
///
/// One instance per run; the account it mutates is created inside `run`
/// and returned as the report, so instances can be reused across
/// independent runs.
#[derive(Debug, Clone)]
pub struct PairsBacktest {
    config: BacktestConfig,
}

impl PairsBacktest {
    pub fn new(config: BacktestConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Replay the signal stream against the price series.
    ///
    /// The loop starts at t = 1 and compares each signal with its
    /// predecessor, so a run always begins flat regardless of
    /// `signals[0]`. A signal change to non-flat opens a position sized
    /// from current cash, a change to flat settles the open position.
    pub fn run(
        &self,
        prices1: &[f64],
        prices2: &[f64],
        signals: &[Signal],
    ) -> CoreResult<BacktestReport> {
        self.validate_inputs(prices1, prices2, signals)?;

        let config = &self.config;
        let mut account = BacktestAccount::new(config.initial_capital);

        for t in 1..signals.len() {
            if signals[t] != signals[t - 1] {
                if !signals[t].is_flat() {
                    self.enter(&mut account, t, prices1, prices2, signals)?;
                } else if let Some(position) = account.open_position.take() {
                    self.exit(&mut account, t, prices1, prices2, signals, position);
                }
            }
            account.position_trace.push(account.position_size());
        }

        debug!(
            entries = account.trades.iter().filter(|t| t.kind == TradeKind::Entry).count(),
            exits = account.realized_pnl.len(),
            final_cash = account.cash,
            "backtest run complete"
        );
        Ok(BacktestReport::from_account(account, config.initial_capital))
    }

    fn enter(
        &self,
        account: &mut BacktestAccount,
        t: usize,
        prices1: &[f64],
        prices2: &[f64],
        signals: &[Signal],
    ) -> CoreResult<()> {
        let config = &self.config;
        let price_sum = prices1[t].abs() + prices2[t].abs();
        if price_sum == 0.0 {
            if config.skip_degenerate_steps {
                warn!(index = t, "zero price sum at entry, carrying position forward");
                return Ok(());
            }
            return Err(CoreError::Degenerate {
                index: t,
                reason: "zero price sum in position sizing".to_string(),
            });
        }

        if let Some(stale) = account.open_position.take() {
            // Direct sign flip fed from an external signal source: the
            // reference transition logic replaces the position without
            // settling it. The bundled generator never emits this.
            warn!(
                index = t,
                stale_size = stale.signed_size(),
                "signal flipped sign without passing flat; replacing open position unsettled"
            );
        }

        let size = account.cash * config.max_leverage / price_sum;
        let entry_price1 = prices1[t] * (1.0 + config.slippage);
        let entry_price2 = prices2[t] * (1.0 + config.slippage);
        let notional = size * (entry_price1 + entry_price2);

        account.cash -= notional;
        account.cash -= notional * config.commission;
        account.open_position = Some(Position {
            direction: signals[t],
            size,
            entry_price1,
            entry_price2,
            entry_notional: notional,
        });
        let signed = f64::from(signals[t].as_i8()) * size;
        debug!(index = t, size = signed, price1 = entry_price1, price2 = entry_price2, "entry");
        account.trades.push(Trade {
            kind: TradeKind::Entry,
            index: t,
            signal: signals[t],
            price1: entry_price1,
            price2: entry_price2,
            size: signed,
            pnl: None,
        });
        Ok(())
    }

    fn exit(
        &self,
        account: &mut BacktestAccount,
        t: usize,
        prices1: &[f64],
        prices2: &[f64],
        signals: &[Signal],
        position: Position,
    ) {
        let config = &self.config;
        let exit_price1 = prices1[t] * (1.0 - config.slippage);
        let exit_price2 = prices2[t] * (1.0 - config.slippage);

        // Realized PnL is the first leg's move off the prior close, net of
        // commission on both legs.
        let pnl = position.signed_size() * (exit_price1 - prices1[t - 1])
            - position.size * (exit_price1 + exit_price2) * config.commission;

        account.cash += position.entry_notional + pnl;
        account.realized_pnl.push(pnl);
        debug!(index = t, pnl, cash = account.cash, "exit");
        account.trades.push(Trade {
            kind: TradeKind::Exit,
            index: t,
            signal: signals[t - 1],
            price1: exit_price1,
            price2: exit_price2,
            size: position.signed_size(),
            pnl: Some(pnl),
        });
    }

    fn validate_inputs(
        &self,
        prices1: &[f64],
        prices2: &[f64],
        signals: &[Signal],
    ) -> CoreResult<()> {
        if prices1.len() != prices2.len() || prices1.len() != signals.len() {
            return Err(CoreError::InvalidInput(format!(
                "series lengths differ: prices1={}, prices2={}, signals={}",
                prices1.len(),
                prices2.len(),
                signals.len()
            )));
        }
        if signals.is_empty() {
            return Err(CoreError::InvalidInput("empty input series".to_string()));
        }
        for (name, series) in [("prices1", prices1), ("prices2", prices2)] {
            if let Some(pos) = series.iter().position(|v| !v.is_finite()) {
                return Err(CoreError::InvalidInput(format!(
                    "non-finite value in {name} at index {pos}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frictionless(initial_capital: f64, max_leverage: f64) -> PairsBacktest {
        PairsBacktest::new(BacktestConfig {
            initial_capital,
            slippage: 0.0,
            commission: 0.0,
            max_leverage,
            skip_degenerate_steps: false,
        })
        .unwrap()
    }

    fn signals(values: &[i8]) -> Vec<Signal> {
        values.iter().map(|&v| Signal::from_i8(v).unwrap()).collect()
    }

    #[test]
    fn test_round_trip_scenario() {
        let engine = frictionless(100_000.0, 1.0);
        let report = engine
            .run(
                &[100.0, 101.0, 99.0],
                &[100.0, 99.0, 101.0],
                &signals(&[0, 1, 0]),
            )
            .unwrap();

        assert_eq!(report.trades.len(), 2);
        let entry = &report.trades[0];
        assert_eq!(entry.kind, TradeKind::Entry);
        assert_eq!(entry.index, 1);
        assert_eq!(entry.signal, Signal::Long);
        assert!((entry.size - 500.0).abs() < 1e-9);
        assert!((entry.price1 - 101.0).abs() < 1e-9);

        let exit = &report.trades[1];
        assert_eq!(exit.kind, TradeKind::Exit);
        assert_eq!(exit.index, 2);
        assert_eq!(exit.signal, Signal::Long);
        assert!((exit.price1 - 99.0).abs() < 1e-9);
        assert!((exit.pnl.unwrap() + 1000.0).abs() < 1e-9);

        assert_eq!(report.realized_pnl.len(), 1);
        assert!((report.final_cash - 99_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_cash_conserved_without_costs() {
        let engine = frictionless(50_000.0, 2.0);
        let prices1 = [10.0, 11.0, 12.5, 11.8, 10.9];
        let prices2 = [10.0, 10.5, 11.0, 11.2, 10.7];
        let report = engine
            .run(&prices1, &prices2, &signals(&[0, -1, -1, 0, 0]))
            .unwrap();

        let pnl_sum: f64 = report.realized_pnl.iter().sum();
        assert!((report.final_cash - (50_000.0 + pnl_sum)).abs() < 1e-9);
    }

    #[test]
    fn test_constant_nonzero_signal_never_trades() {
        let engine = frictionless(100_000.0, 1.0);
        let report = engine
            .run(
                &[100.0, 101.0, 102.0, 103.0],
                &[100.0, 100.5, 101.0, 101.5],
                &signals(&[1, 1, 1, 1]),
            )
            .unwrap();
        assert!(report.trades.is_empty());
        assert!(report.realized_pnl.is_empty());
        assert_eq!(report.final_cash, 100_000.0);
        assert!(report.position_trace.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_rise_to_constant_signal_enters_once() {
        let engine = frictionless(100_000.0, 1.0);
        let report = engine
            .run(
                &[100.0, 101.0, 102.0, 103.0],
                &[100.0, 100.5, 101.0, 101.5],
                &signals(&[0, 1, 1, 1]),
            )
            .unwrap();
        assert_eq!(report.entry_count(), 1);
        assert_eq!(report.exit_count(), 0);
        assert!(report.realized_pnl.is_empty());
    }

    #[test]
    fn test_entries_match_exits_when_toggling_through_flat() {
        let engine = PairsBacktest::new(BacktestConfig {
            initial_capital: 100_000.0,
            slippage: 0.001,
            commission: 0.001,
            max_leverage: 2.0,
            skip_degenerate_steps: false,
        })
        .unwrap();

        let n = 12;
        let prices1: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let prices2: Vec<f64> = (0..n).map(|i| 100.0 + 0.5 * i as f64).collect();
        let report = engine
            .run(
                &prices1,
                &prices2,
                &signals(&[0, 1, 1, 0, -1, -1, 0, 0, 1, 0, -1, 0]),
            )
            .unwrap();

        assert_eq!(report.entry_count(), 4);
        assert_eq!(report.exit_count(), 4);
        assert_eq!(report.realized_pnl.len(), 4);
        // Trade log alternates entry/exit in time order.
        for pair in report.trades.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind);
            assert!(pair[0].index < pair[1].index);
        }
    }

    #[test]
    fn test_direct_flip_replaces_position() {
        let engine = frictionless(100_000.0, 1.0);
        let prices1 = [100.0, 101.0, 102.0, 103.0];
        let prices2 = [100.0, 99.0, 98.0, 97.0];
        let report = engine
            .run(&prices1, &prices2, &signals(&[0, 1, -1, 0]))
            .unwrap();

        // Both changes land in the entry branch; only the second position
        // is settled.
        assert_eq!(report.entry_count(), 2);
        assert_eq!(report.exit_count(), 1);
        assert_eq!(report.trades[1].signal, Signal::Short);
    }

    #[test]
    fn test_degenerate_price_sum_aborts() {
        let engine = frictionless(100_000.0, 1.0);
        let result = engine.run(&[1.0, 0.0, 1.0], &[1.0, 0.0, 1.0], &signals(&[0, 1, 0]));
        assert!(matches!(result, Err(CoreError::Degenerate { index: 1, .. })));
    }

    #[test]
    fn test_degenerate_price_sum_skipped_when_configured() {
        let engine = PairsBacktest::new(BacktestConfig {
            initial_capital: 100_000.0,
            slippage: 0.0,
            commission: 0.0,
            max_leverage: 1.0,
            skip_degenerate_steps: true,
        })
        .unwrap();
        let report = engine
            .run(&[1.0, 0.0, 1.0], &[1.0, 0.0, 1.0], &signals(&[0, 1, 0]))
            .unwrap();
        // The skipped entry leaves nothing to exit.
        assert!(report.trades.is_empty());
        assert_eq!(report.final_cash, 100_000.0);
    }

    #[test]
    fn test_identical_runs_are_bit_identical() {
        let engine = PairsBacktest::new(BacktestConfig::default()).unwrap();
        let prices1 = [100.0, 101.5, 99.25, 98.75, 100.5];
        let prices2 = [100.0, 100.25, 100.5, 99.75, 100.0];
        let sig = signals(&[0, -1, -1, 0, 1]);

        let first = engine.run(&prices1, &prices2, &sig).unwrap();
        let second = engine.run(&prices1, &prices2, &sig).unwrap();
        assert_eq!(first.trades, second.trades);
        assert_eq!(first.realized_pnl, second.realized_pnl);
        assert_eq!(first.final_cash.to_bits(), second.final_cash.to_bits());
    }

    #[test]
    fn test_input_validation() {
        let engine = frictionless(100_000.0, 1.0);
        assert!(engine.run(&[], &[], &[]).is_err());
        assert!(engine
            .run(&[1.0, 2.0], &[1.0], &signals(&[0, 0]))
            .is_err());
        assert!(engine
            .run(&[1.0, f64::NAN], &[1.0, 2.0], &signals(&[0, 0]))
            .is_err());
        assert!(PairsBacktest::new(BacktestConfig {
            initial_capital: 0.0,
            ..BacktestConfig::default()
        })
        .is_err());
        assert!(PairsBacktest::new(BacktestConfig {
            slippage: -0.1,
            ..BacktestConfig::default()
        })
        .is_err());
    }
}
