use super::*;
use crate::audiometry::result::{HearingResult, SeverityLevel};
use crate::history::JsonFilePersistence;

fn session(threshold: f32, timestamp_ms: u64) -> Session {
    let results = [250, 500, 1000, 2000, 4000, 8000]
        .iter()
        .map(|&hz| HearingResult::new(hz, threshold))
        .collect();
    Session::from_results(results, timestamp_ms)
}

#[test]
fn test_append_assigns_increasing_ids() {
    let store = SessionHistoryStore::in_memory(10);
    let a = store.append(session(0.0, 1)).unwrap().session;
    let b = store.append(session(0.0, 2)).unwrap().session;
    assert!(b.id() > a.id());
    assert_eq!(store.len().unwrap(), 2);
    assert_eq!(store.latest().unwrap().unwrap().id(), b.id());
}

#[test]
fn test_eleventh_append_evicts_first() {
    let store = SessionHistoryStore::in_memory(10);
    for i in 1..=11u64 {
        let receipt = store.append(session(i as f32, i)).unwrap();
        if i == 11 {
            assert_eq!(receipt.evicted.len(), 1);
            assert_eq!(receipt.evicted[0].timestamp_ms(), 1);
        } else {
            assert!(receipt.evicted.is_empty());
        }
    }

    let timestamps: Vec<u64> = store
        .sessions()
        .unwrap()
        .iter()
        .map(|s| s.timestamp_ms())
        .collect();
    assert_eq!(timestamps, (2..=11).collect::<Vec<u64>>());
}

#[test]
fn test_history_never_exceeds_capacity() {
    let store = SessionHistoryStore::in_memory(10);
    for i in 0..25u64 {
        store.append(session(0.0, i)).unwrap();
        assert!(store.len().unwrap() <= 10);
    }
    assert_eq!(store.len().unwrap(), 10);
}

#[test]
fn test_languages_are_independent_slots() {
    let store = SessionHistoryStore::in_memory(10);
    let id = store.append(session(30.0, 1)).unwrap().session.id();

    assert!(store.cache_analysis(id, "en", "text-A").unwrap().stored);
    assert!(store.cache_analysis(id, "zh", "text-B").unwrap().stored);

    assert_eq!(
        store.lookup_analysis(id, "en").unwrap().as_deref(),
        Some("text-A")
    );
    assert_eq!(
        store.lookup_analysis(id, "zh").unwrap().as_deref(),
        Some("text-B")
    );
    assert_eq!(store.lookup_analysis(id, "fr").unwrap(), None);
}

#[test]
fn test_cache_never_overwrites_existing_language() {
    let store = SessionHistoryStore::in_memory(10);
    let id = store.append(session(30.0, 1)).unwrap().session.id();

    assert!(store.cache_analysis(id, "en", "first").unwrap().stored);
    assert!(!store.cache_analysis(id, "en", "second").unwrap().stored);
    assert_eq!(
        store.lookup_analysis(id, "en").unwrap().as_deref(),
        Some("first")
    );
}

#[test]
fn test_cache_latest_targets_most_recent_session() {
    let store = SessionHistoryStore::in_memory(10);
    let older = store.append(session(10.0, 1)).unwrap().session.id();
    let newer = store.append(session(20.0, 2)).unwrap().session.id();

    assert!(store.cache_latest_analysis("en", "latest").unwrap().stored);
    assert_eq!(store.lookup_analysis(older, "en").unwrap(), None);
    assert_eq!(
        store.lookup_analysis(newer, "en").unwrap().as_deref(),
        Some("latest")
    );
}

#[test]
fn test_cache_on_evicted_session_fails() {
    let store = SessionHistoryStore::in_memory(1);
    let first = store.append(session(10.0, 1)).unwrap().session.id();
    store.append(session(20.0, 2)).unwrap();

    assert_eq!(
        store.cache_analysis(first, "en", "late").map(|r| r.stored),
        Err(HistoryError::SessionNotFound { session_id: first })
    );
    assert!(store.cache_latest_analysis("en", "x").unwrap().stored);
}

#[test]
fn test_cache_reports_failed_write_through() {
    let persistence = Arc::new(MemoryPersistence::new());
    let store = SessionHistoryStore::open(10, persistence.clone());
    let id = store.append(session(30.0, 1)).unwrap().session.id();

    persistence.set_fail_saves(true);
    let receipt = store.cache_analysis(id, "en", "text").unwrap();
    assert!(receipt.stored);
    assert!(matches!(
        receipt.persistence_error,
        Some(HistoryError::PersistenceFailure { .. })
    ));
    // Memory keeps the text even though storage did not
    assert_eq!(
        store.lookup_analysis(id, "en").unwrap().as_deref(),
        Some("text")
    );

    persistence.set_fail_saves(false);
    let receipt = store.cache_analysis(id, "zh", "text").unwrap();
    assert_eq!(receipt.persistence_error, None);
}

#[test]
fn test_cache_latest_on_empty_store_fails() {
    let store = SessionHistoryStore::in_memory(10);
    assert!(matches!(
        store.cache_latest_analysis("en", "x"),
        Err(HistoryError::SessionNotFound { .. })
    ));
}

#[test]
fn test_reopen_restores_structure() {
    let persistence = Arc::new(MemoryPersistence::new());
    let id = {
        let store = SessionHistoryStore::open(10, persistence.clone());
        store.append(session(45.0, 7)).unwrap();
        let id = store.append(session(65.0, 8)).unwrap().session.id();
        store.cache_analysis(id, "en", "cached").unwrap();
        id
    };

    let reopened = SessionHistoryStore::open(10, persistence);
    let sessions = reopened.sessions().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].severity(), SeverityLevel::Moderate);
    assert_eq!(sessions[1].severity(), SeverityLevel::Severe);
    assert_eq!(
        reopened.lookup_analysis(id, "en").unwrap().as_deref(),
        Some("cached")
    );

    // New ids continue after the loaded ones
    let next = reopened.append(session(0.0, 9)).unwrap().session.id();
    assert!(next > id);
}

#[test]
fn test_reopen_with_smaller_capacity_keeps_most_recent() {
    let persistence = Arc::new(MemoryPersistence::new());
    {
        let store = SessionHistoryStore::open(10, persistence.clone());
        for i in 1..=5u64 {
            store.append(session(0.0, i)).unwrap();
        }
    }
    let reopened = SessionHistoryStore::open(3, persistence);
    let timestamps: Vec<u64> = reopened
        .sessions()
        .unwrap()
        .iter()
        .map(|s| s.timestamp_ms())
        .collect();
    assert_eq!(timestamps, vec![3, 4, 5]);
}

#[test]
fn test_persistence_failure_is_non_fatal() {
    let persistence = Arc::new(MemoryPersistence::new());
    let store = SessionHistoryStore::open(10, persistence.clone());
    persistence.set_fail_saves(true);

    let receipt = store.append(session(25.0, 1)).unwrap();
    assert!(matches!(
        receipt.persistence_error,
        Some(HistoryError::PersistenceFailure { .. })
    ));
    // In-memory data retained
    assert_eq!(store.len().unwrap(), 1);
    assert_eq!(store.latest().unwrap().unwrap().severity(), SeverityLevel::Mild);
}

#[test]
fn test_sorted_views_leave_storage_order() {
    let store = SessionHistoryStore::in_memory(10);
    store.append(session(65.0, 300)).unwrap();
    store.append(session(5.0, 100)).unwrap();
    store.append(session(45.0, 200)).unwrap();

    let by_date: Vec<u64> = store
        .sorted(HistorySort::DateAscending)
        .unwrap()
        .iter()
        .map(|s| s.timestamp_ms())
        .collect();
    assert_eq!(by_date, vec![100, 200, 300]);

    let by_date_desc: Vec<u64> = store
        .sorted(HistorySort::DateDescending)
        .unwrap()
        .iter()
        .map(|s| s.timestamp_ms())
        .collect();
    assert_eq!(by_date_desc, vec![300, 200, 100]);

    let by_severity: Vec<SeverityLevel> = store
        .sorted(HistorySort::SeverityAscending)
        .unwrap()
        .iter()
        .map(|s| s.severity())
        .collect();
    assert_eq!(
        by_severity,
        vec![
            SeverityLevel::Normal,
            SeverityLevel::Moderate,
            SeverityLevel::Severe
        ]
    );

    let by_severity_desc: Vec<SeverityLevel> = store
        .sorted(HistorySort::SeverityDescending)
        .unwrap()
        .iter()
        .map(|s| s.severity())
        .collect();
    assert_eq!(by_severity_desc[0], SeverityLevel::Severe);

    let stored: Vec<u64> = store
        .sessions()
        .unwrap()
        .iter()
        .map(|s| s.timestamp_ms())
        .collect();
    assert_eq!(stored, vec![300, 100, 200]);
}

#[test]
fn test_open_uses_classification_derived_from_results() {
    let path = std::env::temp_dir().join(format!(
        "hearing_store_rederive_{}.json",
        std::process::id()
    ));
    let thresholds = [80.0, 85.0, 90.0, 80.0, 85.0, 90.0];
    let results: Vec<String> = [250, 500, 1000, 2000, 4000, 8000]
        .iter()
        .zip(thresholds)
        .map(|(hz, db)| format!(r#"{{"frequency": {}, "threshold": {:.1}}}"#, hz, db))
        .collect();
    let json = format!(
        r#"[
            {{"id": 1, "timestamp": 1, "results": [{}], "averageThreshold": 85.0, "severity": "NORMAL"}},
            {{"id": 2, "timestamp": 2, "results": [{}], "averageThreshold": 30.0, "severity": "MILD"}}
        ]"#,
        results.join(","),
        [250, 500, 1000, 2000, 4000, 8000]
            .iter()
            .map(|hz| format!(r#"{{"frequency": {}, "threshold": 30.0}}"#, hz))
            .collect::<Vec<_>>()
            .join(",")
    );
    std::fs::write(&path, json).unwrap();

    let store = SessionHistoryStore::open(10, Arc::new(JsonFilePersistence::new(&path)));
    let loaded = store.get(1).unwrap().unwrap();
    assert_eq!(loaded.average_threshold(), 85.0);
    assert_eq!(loaded.severity(), SeverityLevel::Profound);

    let by_severity: Vec<u64> = store
        .sorted(HistorySort::SeverityDescending)
        .unwrap()
        .iter()
        .map(Session::id)
        .collect();
    assert_eq!(by_severity, vec![1, 2]);

    let _ = std::fs::remove_file(&path);
}
