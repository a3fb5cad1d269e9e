//! Runner configuration: filter, signal, and backtest parameter sections
//! loaded from a single TOML file.

use serde::{Deserialize, Serialize};

use backtest_engine::BacktestConfig;
use common::CoreResult;
use signal_generation::{FilterConfig, SignalConfig};

/// Full pipeline configuration. Every section falls back to its defaults,
/// so a partial (or absent) file is fine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub signal: SignalConfig,

    #[serde(default)]
    pub backtest: BacktestConfig,
}

impl RunnerConfig {
    pub fn validate(&self) -> CoreResult<()> {
        self.filter.validate()?;
        self.signal.validate()?;
        self.backtest.validate()?;
        Ok(())
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &str) -> anyhow::Result<RunnerConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: RunnerConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to a TOML file.
pub fn save_config(config: &RunnerConfig, path: &str) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Create a default configuration file template.
pub fn create_config_template(path: &str) -> anyhow::Result<()> {
    let template = "# Pairs backtest configuration

[filter]
# Process noise scale for the hedge filter
delta = 1e-4

# Measurement noise variance on the price difference
ve = 1e-4

[signal]
# Rolling window for spread mean / standard deviation (bars)
window = 30

# Z-score magnitude that opens a position
entry_threshold = 2.0

# Z-score magnitude below which a position is closed
exit_threshold = 0.5

[backtest]
# Starting cash (USD)
initial_capital = 100000.0

# Fractional price penalty per execution (0.0005 = 5 bps)
slippage = 0.0005

# Commission on the combined notional of both legs
commission = 0.0005

# Multiple of cash committed as notional at entry
max_leverage = 2.0

# Carry the previous position through degenerate sizing steps
skip_degenerate_steps = false
";

    std::fs::write(path, template)?;
    Ok(())
}
