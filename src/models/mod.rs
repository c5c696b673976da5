//! Shared data models spanning the pipeline layers.

pub mod signal;

pub use signal::{NewSignal, Signal, SignalType};
