//! Error taxonomy for ingestion, storage and fanout.

use thiserror::Error;

/// Rejection of an inbound webhook payload
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Body is not a JSON object
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Required keys absent from the payload, in canonical field order
    #[error("missing fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// A price level that does not coerce to a finite number
    #[error("invalid numeric field: {0}")]
    InvalidNumericField(String),

    /// A non-numeric field with the wrong shape
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

impl ValidationError {
    /// Short label used for metrics and wire error codes
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MalformedPayload(_) => "invalid_json",
            ValidationError::MissingFields(_) => "missing_fields",
            ValidationError::InvalidNumericField(_) => "invalid_numeric_field",
            ValidationError::InvalidField { .. } => "invalid_field",
        }
    }
}

/// Failure of the underlying storage engine
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        if e.is_closed() {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Persistence(e.to_string())
        }
    }
}

/// Outcome of a failed ingestion request
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// Why the notifier gave up on a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// The subscriber's queue was full
    Lagged,
    /// The subscriber's receiving side was gone
    Disconnected,
}

impl std::fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvictionReason::Lagged => write!(f, "lagged"),
            EvictionReason::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// A subscription can no longer deliver notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubscriptionDeliveryFailure {
    #[error("subscriber evicted: {0}")]
    Evicted(EvictionReason),

    #[error("change notifier closed")]
    Closed,
}
