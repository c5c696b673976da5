//! Signalfeed: webhook ingestion, durable storage and live fanout of trading signals.

pub mod auth;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
