use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Discrete position signal for a spread trade.
///
/// `Long` means long the spread (long leg 1, short leg 2), `Short` the
/// opposite, `Flat` no exposure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Long,
    Short,
    #[default]
    Flat,
}

impl Signal {
    /// Numeric encoding used in signal series and CSV output:
    /// `+1` long, `-1` short, `0` flat.
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Long => 1,
            Signal::Short => -1,
            Signal::Flat => 0,
        }
    }

    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            1 => Some(Signal::Long),
            -1 => Some(Signal::Short),
            0 => Some(Signal::Flat),
            _ => None,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Signal::Flat
    }
}

/// One synchronized observation of both legs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceObservation {
    pub timestamp: DateTime<Utc>,
    pub price1: f64,
    pub price2: f64,
}

/// An aligned pair of price series for two co-moving instruments.
///
/// Alignment and gap cleaning are the caller's responsibility; `validate`
/// only checks what the downstream math relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePair {
    pub symbol1: String,
    pub symbol2: String,
    pub observations: Vec<PriceObservation>,
}

impl PricePair {
    pub fn new(symbol1: impl Into<String>, symbol2: impl Into<String>) -> Self {
        Self {
            symbol1: symbol1.into(),
            symbol2: symbol2.into(),
            observations: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Leg 1 prices, index-aligned with `prices2`.
    pub fn prices1(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.price1).collect()
    }

    /// Leg 2 prices, index-aligned with `prices1`.
    pub fn prices2(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.price2).collect()
    }

    /// Checks length and price preconditions: at least two observations,
    /// every price strictly positive and finite.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.observations.len() < 2 {
            return Err(CoreError::InvalidInput(format!(
                "pair {}/{} has {} observations, need at least 2",
                self.symbol1,
                self.symbol2,
                self.observations.len()
            )));
        }
        for (i, obs) in self.observations.iter().enumerate() {
            for price in [obs.price1, obs.price2] {
                if !price.is_finite() || price <= 0.0 {
                    return Err(CoreError::InvalidInput(format!(
                        "pair {}/{} has non-positive or non-finite price {} at index {}",
                        self.symbol1, self.symbol2, price, i
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One output sample of the hedge estimator. Immutable once emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeSample {
    /// Multiplier on leg 2 so that `price1 - hedge_ratio * price2` is the
    /// stationary spread.
    pub hedge_ratio: f64,
    pub spread: f64,
}

/// Whether a trade record opened or closed a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Entry,
    Exit,
}

impl TradeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeKind::Entry => "entry",
            TradeKind::Exit => "exit",
        }
    }
}

/// Immutable record of a completed entry or exit event.
///
/// Prices are the slippage-adjusted execution prices; `size` is the signed
/// position size; `pnl` is present only on exits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub kind: TradeKind,
    /// Timestep index in the input series at which the event occurred.
    pub index: usize,
    pub signal: Signal,
    pub price1: f64,
    pub price2: f64,
    pub size: f64,
    pub pnl: Option<f64>,
}
