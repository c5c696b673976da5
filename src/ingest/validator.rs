//! Structural validation of inbound webhook payloads.
//!
//! The validator is a pure function of its input: it never de-duplicates and
//! never applies business rules (no price bounds, no symbol whitelist).

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::models::signal::{NewSignal, SignalType};

/// Keys every payload must carry, in the order they are reported when missing
pub const REQUIRED_FIELDS: [&str; 6] = ["symbol", "time", "signal", "entry", "stoploss", "target1"];

/// Parse and normalize a raw payload into a [`NewSignal`]
pub fn validate(body: &[u8]) -> Result<NewSignal, ValidationError> {
    let raw: Value = serde_json::from_slice(body)
        .map_err(|e| ValidationError::MalformedPayload(e.to_string()))?;
    validate_value(raw)
}

/// Validate an already-parsed payload
pub fn validate_value(raw: Value) -> Result<NewSignal, ValidationError> {
    let payload = raw.as_object().ok_or_else(|| {
        ValidationError::MalformedPayload("payload must be a JSON object".to_string())
    })?;

    let missing = missing_fields(payload);
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    let symbol = parse_symbol(&payload["symbol"])?;
    let signal_time = parse_time(&payload["time"])?;
    let signal_type = parse_signal_type(&payload["signal"])?;
    let entry = parse_price("entry", &payload["entry"])?;
    let stoploss = parse_price("stoploss", &payload["stoploss"])?;
    let target1 = parse_price("target1", &payload["target1"])?;

    Ok(NewSignal {
        symbol,
        signal_type,
        signal_time,
        entry,
        stoploss,
        target1,
        raw,
    })
}

/// Every required key absent from the payload (key presence only, `null` counts as present)
pub fn missing_fields(payload: &Map<String, Value>) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| !payload.contains_key(**field))
        .map(|field| field.to_string())
        .collect()
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn parse_symbol(value: &Value) -> Result<String, ValidationError> {
    let symbol = value
        .as_str()
        .ok_or_else(|| invalid("symbol", "expected a string"))?
        .trim();
    if symbol.is_empty() {
        return Err(invalid("symbol", "must not be empty"));
    }
    Ok(symbol.to_string())
}

/// The timestamp is opaque; scalars are kept in their textual form
fn parse_time(value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(invalid("time", "must not be null")),
        Value::Array(_) | Value::Object(_) => Err(invalid("time", "expected a scalar")),
    }
}

fn parse_signal_type(value: &Value) -> Result<SignalType, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| invalid("signal", "expected a string"))?
        .parse::<SignalType>()
        .map_err(|reason| invalid("signal", reason))
}

/// Numbers or numeric strings; `null` means the level was not provided
///
/// Literals beyond `f64` range (`1e400`) survive parsing as text and are
/// rejected here, like their string spelling.
fn parse_price(field: &str, value: &Value) -> Result<Option<f64>, ValidationError> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ValidationError::InvalidNumericField(field.to_string())),
    }
}
