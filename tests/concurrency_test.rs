mod common;

use common::*;
use retrace::store::SortOrder;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

// ── 1. concurrent_updates_yield_gapless_versions ───────────────────────────
// 16 tasks mutate the same record. Version assignment is serialized per
// record, so the trail must come out 1..=16 with no gaps or duplicates.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_yield_gapless_versions() {
    let trail = Arc::new(engine());
    let record = model_ref();

    let mut handles = Vec::new();
    for i in 0..16 {
        let trail = Arc::clone(&trail);
        let record = record.clone();
        handles.push(tokio::spawn(async move {
            let changes = diff([("position", json!(i), json!(i + 1))]);
            trail
                .recorder()
                .record_updated(&record, changes, None, None)
                .await
                .unwrap()
                .expect("audited update")
        }));
    }

    let mut versions = HashSet::new();
    for h in handles {
        versions.insert(h.await.unwrap().version());
    }

    assert_eq!(versions.len(), 16, "no duplicate versions");
    assert_eq!(*versions.iter().min().unwrap(), 1);
    assert_eq!(*versions.iter().max().unwrap(), 16);

    let entries = trail.audit_trail(&record, SortOrder::VersionAsc).await.unwrap();
    let stored: Vec<i64> = entries.iter().map(|a| a.version()).collect();
    assert_eq!(stored, (1..=16).collect::<Vec<i64>>());
}

// ── 2. concurrent_records_do_not_share_sequences ───────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_do_not_share_sequences() {
    let trail = Arc::new(engine());
    let first = model_ref();
    let second = model_ref();

    let mut handles = Vec::new();
    for record in [&first, &second] {
        for i in 0..8 {
            let trail = Arc::clone(&trail);
            let record = record.clone();
            handles.push(tokio::spawn(async move {
                let changes = diff([("position", json!(i), json!(i + 1))]);
                trail
                    .recorder()
                    .record_updated(&record, changes, None, None)
                    .await
                    .unwrap()
            }));
        }
    }
    for h in handles {
        h.await.unwrap();
    }

    for record in [&first, &second] {
        let entries = trail.audit_trail(record, SortOrder::VersionAsc).await.unwrap();
        let versions: Vec<i64> = entries.iter().map(|a| a.version()).collect();
        assert_eq!(versions, (1..=8).collect::<Vec<i64>>());
    }
}

// ── 3. suppressed_writes_leave_no_gaps ─────────────────────────────────────
// Half the tasks touch only bookkeeping fields and get suppressed; the
// audited half still numbers 1..=8.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn suppressed_writes_leave_no_gaps() {
    let trail = Arc::new(engine());
    let record = model_ref();

    let mut handles = Vec::new();
    for i in 0..16 {
        let trail = Arc::clone(&trail);
        let record = record.clone();
        handles.push(tokio::spawn(async move {
            let changes = if i % 2 == 0 {
                diff([("position", json!(i), json!(i + 1))])
            } else {
                diff([("updated_at", json!(i), json!(i + 1))])
            };
            trail
                .recorder()
                .record_updated(&record, changes, None, None)
                .await
                .unwrap()
        }));
    }

    let mut audited = 0;
    let mut suppressed = 0;
    for h in handles {
        match h.await.unwrap() {
            Some(_) => audited += 1,
            None => suppressed += 1,
        }
    }

    assert_eq!(audited, 8);
    assert_eq!(suppressed, 8);

    let entries = trail.audit_trail(&record, SortOrder::VersionAsc).await.unwrap();
    let versions: Vec<i64> = entries.iter().map(|a| a.version()).collect();
    assert_eq!(versions, (1..=8).collect::<Vec<i64>>());
}
