//! Unit tests for the in-memory signal store

use serde_json::json;
use signalfeed::db::{MemorySignalStore, ReceivedClock, SignalStore};
use signalfeed::error::StoreError;
use signalfeed::models::{NewSignal, SignalType};
use std::sync::Arc;

fn new_signal(symbol: &str) -> NewSignal {
    NewSignal {
        symbol: symbol.to_string(),
        signal_type: SignalType::Sell,
        signal_time: "2024-01-01T00:00:00Z".to_string(),
        entry: Some(100.0),
        stoploss: Some(105.0),
        target1: None,
        raw: json!({ "symbol": symbol }),
    }
}

#[tokio::test]
async fn test_insert_assigns_sequential_ids() {
    let store = MemorySignalStore::new();
    let first = store.insert(new_signal("BTCUSD")).await.unwrap();
    let second = store.insert(new_signal("ETHUSD")).await.unwrap();

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
    assert!(second.received_at >= first.received_at);
    assert_eq!(second.symbol, "ETHUSD");
}

#[tokio::test]
async fn test_query_recent_is_newest_first_and_bounded() {
    let store = MemorySignalStore::new();
    for i in 0..5 {
        store.insert(new_signal(&format!("SYM{}", i))).await.unwrap();
    }

    let recent = store.query_recent(3).await.unwrap();
    let ids: Vec<i64> = recent.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![5, 4, 3]);

    let all = store.query_recent(100).await.unwrap();
    assert_eq!(all.len(), 5);
    assert!(store.query_recent(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_inserts_get_distinct_increasing_ids() {
    let store = Arc::new(MemorySignalStore::new());
    let mut handles = Vec::new();
    for i in 0..50 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.insert(new_signal(&format!("SYM{}", i))).await.unwrap().id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    assert_eq!(ids, (1..=50).collect::<Vec<i64>>());

    let recent = store.query_recent(50).await.unwrap();
    assert!(recent.windows(2).all(|pair| pair[0].id > pair[1].id));
}

#[tokio::test]
async fn test_outage_fails_without_consuming_an_id() {
    let store = MemorySignalStore::new();
    store.insert(new_signal("BTCUSD")).await.unwrap();

    store.set_outage(true);
    assert!(!store.is_available().await);
    let err = store.insert(new_signal("ETHUSD")).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
    assert!(store.query_recent(10).await.is_err());

    store.set_outage(false);
    let next = store.insert(new_signal("SOLUSD")).await.unwrap();
    assert_eq!(next.id, 2);
    assert_eq!(store.len().await, 2);
}

#[test]
fn test_received_clock_never_goes_backwards() {
    let mut clock = ReceivedClock::new();
    let later = chrono::Utc::now();
    let earlier = later - chrono::Duration::seconds(5);

    assert_eq!(clock.stamp_at(later), later);
    assert_eq!(clock.stamp_at(earlier), later);
    assert!(clock.stamp() >= later);
}
