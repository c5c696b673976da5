//! Durable, append-only signal storage.

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemorySignalStore;
pub use postgres::PostgresSignalStore;
pub use store::{ReceivedClock, SignalStore};
