//! Integration tests for the PostgreSQL signal store
//!
//! Skipped unless DATABASE_URL points at a reachable database.

use serde_json::json;
use signalfeed::db::{PostgresSignalStore, SignalStore};
use signalfeed::ingest::validate_value;

async fn connect() -> Option<PostgresSignalStore> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => url,
        _ => {
            eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
            return None;
        }
    };
    Some(
        PostgresSignalStore::connect(&url, 2)
            .await
            .expect("connect to PostgreSQL"),
    )
}

#[tokio::test]
async fn postgres_store_appends_and_queries_newest_first() {
    let Some(store) = connect().await else {
        return;
    };
    assert!(store.is_available().await);
    assert_eq!(store.backend(), "postgres");

    let symbol = format!("PGTEST{}", std::process::id());
    let payload = json!({
        "symbol": symbol,
        "time": 1704067200,
        "signal": "buy",
        "entry": "42000.25",
        "stoploss": 41000,
        "target1": 44000,
        "comment": { "source": "integration" }
    });

    let first = store
        .insert(validate_value(payload.clone()).unwrap())
        .await
        .unwrap();
    let second = store
        .insert(validate_value(payload.clone()).unwrap())
        .await
        .unwrap();
    assert!(second.id > first.id);
    assert!(second.received_at >= first.received_at);

    let recent = store.query_recent(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0], second);
    assert_eq!(recent[1], first);

    assert_eq!(recent[0].signal_time, "1704067200");
    assert_eq!(recent[0].entry, Some(42000.25));
    assert_eq!(recent[0].raw, payload);
}
