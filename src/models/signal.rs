//! Signal record data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Direction of a trading alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalType {
    type Err = String;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(SignalType::Buy),
            "SELL" => Ok(SignalType::Sell),
            other => Err(format!("unsupported signal type '{}'", other)),
        }
    }
}

/// A validated signal that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSignal {
    pub symbol: String,
    pub signal_type: SignalType,
    pub signal_time: String,
    pub entry: Option<f64>,
    pub stoploss: Option<f64>,
    pub target1: Option<f64>,
    pub raw: Value,
}

impl NewSignal {
    /// Finalize with the identity assigned by a store
    pub fn into_signal(self, id: i64, received_at: DateTime<Utc>) -> Signal {
        Signal {
            id,
            symbol: self.symbol,
            signal_type: self.signal_type,
            signal_time: self.signal_time,
            received_at,
            entry: self.entry,
            stoploss: self.stoploss,
            target1: self.target1,
            raw: self.raw,
        }
    }
}

/// A persisted, immutable signal record
///
/// `id` is the only authoritative ordering; `received_at` may tie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: i64,
    pub symbol: String,
    pub signal_type: SignalType,
    pub signal_time: String,
    pub received_at: DateTime<Utc>,
    pub entry: Option<f64>,
    pub stoploss: Option<f64>,
    pub target1: Option<f64>,
    pub raw: Value,
}
