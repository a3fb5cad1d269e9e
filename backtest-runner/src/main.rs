//! Backtest runner: estimator -> signal -> state machine -> summarizer,
//! fanned out across one independent task per pair.
//!
//! Usage: `backtest-runner <prices1.csv> [prices2.csv ...]`, with an
//! optional TOML configuration named by `BACKTEST_CONFIG`.

mod config;
mod loader;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{error, info, Level};
use tracing_subscriber::fmt;

use backtest_engine::{BacktestReport, PairsBacktest};
use common::PricePair;
use evaluation::{evaluate, PerformanceReport};
use signal_generation::{estimate_hedge_ratio, generate_signals};

use crate::config::RunnerConfig;

struct PairOutcome {
    pair_name: String,
    report: BacktestReport,
    metrics: PerformanceReport,
    trade_log_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_max_level(Level::INFO).init();

    let data_files: Vec<String> = std::env::args().skip(1).collect();
    if data_files.is_empty() {
        bail!("usage: backtest-runner <prices1.csv> [prices2.csv ...]");
    }

    let config = match std::env::var("BACKTEST_CONFIG") {
        Ok(path) if Path::new(&path).exists() => {
            info!(path = %path, "loading configuration");
            config::load_config(&path)?
        }
        Ok(path) => {
            config::create_config_template(&path)?;
            bail!("no configuration at {path}; wrote a template there, edit it and rerun");
        }
        Err(_) => RunnerConfig::default(),
    };
    config.validate()?;

    // Each pair's pipeline is self-contained, so the scan is a stateless
    // fan-out: one blocking task per pair, results collected at the end.
    let mut tasks = Vec::with_capacity(data_files.len());
    for file in data_files {
        let config = config.clone();
        tasks.push(tokio::task::spawn_blocking(move || run_pair(&file, &config)));
    }

    let mut failures = 0usize;
    for task in tasks {
        match task.await? {
            Ok(outcome) => {
                info!(
                    pair = %outcome.pair_name,
                    final_cash = outcome.report.final_cash,
                    entries = outcome.report.entry_count(),
                    exits = outcome.report.exit_count(),
                    trade_log = %outcome.trade_log_path.display(),
                    "pair complete"
                );
                for line in outcome.metrics.to_string().lines() {
                    info!("{line}");
                }
            }
            Err(err) => {
                failures += 1;
                error!("pair failed: {err:#}");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} pair(s) failed");
    }
    Ok(())
}

/// Run the full single-pair pipeline for one CSV file.
fn run_pair(file: &str, config: &RunnerConfig) -> Result<PairOutcome> {
    let pair = loader::load_price_pair(file)?;
    let pair_name = format!("{}/{}", pair.symbol1, pair.symbol2);
    let (report, metrics) = run_pipeline(&pair, config)
        .with_context(|| format!("backtest failed for {pair_name}"))?;

    let trade_log_path = trade_log_path(file);
    report.write_csv(&trade_log_path)?;

    Ok(PairOutcome {
        pair_name,
        report,
        metrics,
        trade_log_path,
    })
}

fn run_pipeline(
    pair: &PricePair,
    config: &RunnerConfig,
) -> Result<(BacktestReport, PerformanceReport)> {
    pair.validate()?;
    let prices1 = pair.prices1();
    let prices2 = pair.prices2();

    let samples = estimate_hedge_ratio(&prices1, &prices2, &config.filter)?;
    let spread: Vec<f64> = samples.iter().map(|s| s.spread).collect();
    let signals = generate_signals(&spread, &config.signal)?;

    let engine = PairsBacktest::new(config.backtest)?;
    let report = engine.run(&prices1, &prices2, &signals)?;
    let metrics = evaluate(&report.trades, &report.realized_pnl);
    Ok((report, metrics))
}

fn trade_log_path(data_file: &str) -> PathBuf {
    let path = PathBuf::from(data_file);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backtest".to_string());
    path.with_file_name(format!("{stem}_trades.csv"))
}
