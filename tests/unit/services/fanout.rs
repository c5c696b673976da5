//! Unit tests for the per-viewer window

use chrono::Utc;
use serde_json::Value;
use signalfeed::models::{Signal, SignalType};
use signalfeed::services::{ClientWindow, Merge};

fn signal(id: i64) -> Signal {
    Signal {
        id,
        symbol: format!("SYM{}", id),
        signal_type: SignalType::Sell,
        signal_time: "t".to_string(),
        received_at: Utc::now(),
        entry: None,
        stoploss: None,
        target1: None,
        raw: Value::Null,
    }
}

/// Newest-first snapshot of ids `from..=to`
fn snapshot(from: i64, to: i64) -> Vec<Signal> {
    (from..=to).rev().map(signal).collect()
}

fn ids(window: &ClientWindow) -> Vec<i64> {
    window.iter().map(|s| s.id).collect()
}

#[test]
fn test_live_signal_is_prepended() {
    let mut window = ClientWindow::new(10);
    window.seed(snapshot(1, 3));

    assert_eq!(window.apply(signal(4)), Merge::Prepended);
    assert_eq!(ids(&window), vec![4, 3, 2, 1]);
    assert_eq!(window.newest_id(), Some(4));
}

#[test]
fn test_full_window_drops_oldest() {
    // A full window of 100 grows to 101 and is cut back to 100
    let mut window = ClientWindow::new(100);
    window.seed(snapshot(1, 100));
    assert_eq!(window.len(), 100);

    assert_eq!(window.apply(signal(101)), Merge::Prepended);
    assert_eq!(window.len(), 100);
    assert_eq!(window.newest_id(), Some(101));
    assert!(!window.contains(1));
    assert!(window.contains(2));
}

#[test]
fn test_overlap_with_snapshot_is_deduplicated() {
    let mut window = ClientWindow::new(5);
    window.seed(snapshot(1, 5));

    assert_eq!(window.apply(signal(5)), Merge::Duplicate);
    assert_eq!(window.apply(signal(4)), Merge::Duplicate);
    assert_eq!(ids(&window), vec![5, 4, 3, 2, 1]);
    assert_eq!(window.iter().filter(|s| s.id == 5).count(), 1);
}

#[test]
fn test_signal_older_than_window_is_stale() {
    let mut window = ClientWindow::new(3);
    window.seed(snapshot(5, 7));

    assert_eq!(window.apply(signal(2)), Merge::Stale);
    assert_eq!(ids(&window), vec![7, 6, 5]);
}

#[test]
fn test_never_exceeds_capacity() {
    let mut window = ClientWindow::new(10);
    window.seed(Vec::new());
    for id in 1..=250 {
        window.apply(signal(id));
        assert!(window.len() <= 10);
    }
    assert_eq!(ids(&window), (241..=250).rev().collect::<Vec<i64>>());
}

#[test]
fn test_seed_sorts_dedups_and_truncates() {
    let mut window = ClientWindow::new(3);
    window.seed(vec![signal(2), signal(9), signal(4), signal(9), signal(7)]);
    assert_eq!(ids(&window), vec![9, 7, 4]);
    assert!(!window.contains(2));
}

#[test]
fn test_empty_window_accepts_first_signal() {
    let mut window = ClientWindow::new(2);
    assert!(window.is_empty());
    assert_eq!(window.apply(signal(1)), Merge::Prepended);
    assert_eq!(window.to_vec().len(), 1);
    assert_eq!(window.capacity(), 2);
}
