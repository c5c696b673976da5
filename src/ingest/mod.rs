//! Webhook ingestion: validation and the commit pipeline.

pub mod pipeline;
pub mod validator;

pub use pipeline::SignalPipeline;
pub use validator::{validate, validate_value, REQUIRED_FIELDS};
