mod common;

use std::collections::BTreeSet;

use common::{search, MemoryStore, RecordingQueue, ScriptedSource};
use pretty_assertions::assert_eq;
use rentwatch_engine::{
    DiscoveryStage, FailureKind, PipelineError, SearchApiSettings, StoreError,
};

const SOURCE_A: &str = "https://search.test/find.html?locationIdentifier=REGION%5E1";
const SOURCE_B: &str = "https://search.test/find.html?locationIdentifier=REGION%5E2";

fn ids(values: &[u64]) -> BTreeSet<u64> {
    values.iter().copied().collect()
}

fn settings() -> SearchApiSettings {
    SearchApiSettings {
        endpoint: "https://search.test/api/_search".to_string(),
        max_pages_per_source: 10,
    }
}

#[tokio::test]
async fn new_listing_is_persisted_and_enqueued() {
    rentwatch_logging::initialize_for_tests();
    let store = MemoryStore::with(vec![search(1, &[SOURCE_A], &[1, 2])]);
    let source = ScriptedSource::default()
        .page(SOURCE_A, "0", &[1, 2], Some("24"))
        .page(SOURCE_A, "24", &[3], None);
    let queue = RecordingQueue::default();
    let stage = DiscoveryStage::new(&store, &source, &queue, &settings());

    let report = stage.run(1).await.unwrap();

    assert_eq!(report.new_listing_ids, vec![3]);
    assert_eq!(report.current_count, 3);
    assert!(!report.is_partial());
    assert_eq!(store.snapshot(1).unwrap().known_listing_ids, ids(&[1, 2, 3]));
    assert_eq!(store.snapshot(1).unwrap().revision, 1);
    assert_eq!(queue.listing_ids(), vec![3]);
    assert_eq!(queue.events.lock().unwrap()[0].search_id, 1);
}

#[tokio::test]
async fn second_run_over_unchanged_results_finds_nothing() {
    let store = MemoryStore::with(vec![search(1, &[SOURCE_A], &[])]);
    let source = ScriptedSource::default().page(SOURCE_A, "0", &[5, 6], None);
    let queue = RecordingQueue::default();
    let stage = DiscoveryStage::new(&store, &source, &queue, &settings());

    let first = stage.run(1).await.unwrap();
    let second = stage.run(1).await.unwrap();

    assert_eq!(first.new_listing_ids, vec![5, 6]);
    assert!(second.new_listing_ids.is_empty());
    assert_eq!(queue.listing_ids(), vec![5, 6]);
    assert_eq!(store.snapshot(1).unwrap().revision, 2);
}

#[tokio::test]
async fn known_set_is_replaced_not_merged() {
    let store = MemoryStore::with(vec![search(1, &[SOURCE_A], &[1, 2, 9])]);
    let source = ScriptedSource::default().page(SOURCE_A, "0", &[1, 2], None);
    let queue = RecordingQueue::default();

    DiscoveryStage::new(&store, &source, &queue, &settings())
        .run(1)
        .await
        .unwrap();

    assert_eq!(store.snapshot(1).unwrap().known_listing_ids, ids(&[1, 2]));
    assert!(queue.listing_ids().is_empty());
}

#[tokio::test]
async fn listing_that_returns_after_leaving_is_new_again() {
    let store = MemoryStore::with(vec![search(1, &[SOURCE_A], &[1, 2])]);
    let queue = RecordingQueue::default();

    let gone = ScriptedSource::default().page(SOURCE_A, "0", &[1], None);
    DiscoveryStage::new(&store, &gone, &queue, &settings())
        .run(1)
        .await
        .unwrap();
    assert!(queue.listing_ids().is_empty());

    let back = ScriptedSource::default().page(SOURCE_A, "0", &[1, 2], None);
    let report = DiscoveryStage::new(&store, &back, &queue, &settings())
        .run(1)
        .await
        .unwrap();
    assert_eq!(report.new_listing_ids, vec![2]);
    assert_eq!(queue.listing_ids(), vec![2]);
}

#[tokio::test]
async fn listings_seen_by_several_sources_are_enqueued_once() {
    let store = MemoryStore::with(vec![search(1, &[SOURCE_A, SOURCE_B], &[])]);
    let source = ScriptedSource::default()
        .page(SOURCE_A, "0", &[1, 2], None)
        .page(SOURCE_B, "0", &[2, 3], None);
    let queue = RecordingQueue::default();

    let report = DiscoveryStage::new(&store, &source, &queue, &settings())
        .run(1)
        .await
        .unwrap();

    assert_eq!(report.new_listing_ids, vec![1, 2, 3]);
    assert_eq!(queue.listing_ids(), vec![1, 2, 3]);
}

#[tokio::test]
async fn failed_source_is_skipped_and_reported() {
    let store = MemoryStore::with(vec![search(1, &[SOURCE_A, SOURCE_B], &[1, 7])]);
    let source = ScriptedSource::default()
        .page(SOURCE_A, "0", &[1, 2], Some("24"))
        .fail(SOURCE_A, "24", FailureKind::Malformed)
        .page(SOURCE_B, "0", &[7, 8], None);
    let queue = RecordingQueue::default();

    let report = DiscoveryStage::new(&store, &source, &queue, &settings())
        .run(1)
        .await
        .unwrap();

    assert!(report.is_partial());
    assert_eq!(report.source_failures.len(), 1);
    assert_eq!(report.source_failures[0].source_url, SOURCE_A);
    // Page one of the failed source is discarded along with the rest of it.
    assert_eq!(store.snapshot(1).unwrap().known_listing_ids, ids(&[7, 8]));
    assert_eq!(queue.listing_ids(), vec![8]);
}

#[tokio::test]
async fn all_sources_failing_leaves_known_set_untouched() {
    let store = MemoryStore::with(vec![search(1, &[SOURCE_A, SOURCE_B], &[1, 2])]);
    let source = ScriptedSource::default()
        .fail(SOURCE_A, "0", FailureKind::Timeout)
        .fail(SOURCE_B, "0", FailureKind::HttpStatus(503));
    let queue = RecordingQueue::default();

    let err = DiscoveryStage::new(&store, &source, &queue, &settings())
        .run(1)
        .await
        .unwrap_err();

    match err {
        PipelineError::AllSourcesFailed { search_id, failures } => {
            assert_eq!(search_id, 1);
            assert_eq!(failures.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    let stored = store.snapshot(1).unwrap();
    assert_eq!(stored.known_listing_ids, ids(&[1, 2]));
    assert_eq!(stored.revision, 0);
    assert!(queue.listing_ids().is_empty());
}

#[tokio::test]
async fn no_sources_persists_an_empty_known_set() {
    let store = MemoryStore::with(vec![search(1, &[], &[1, 2])]);
    let source = ScriptedSource::default();
    let queue = RecordingQueue::default();

    let report = DiscoveryStage::new(&store, &source, &queue, &settings())
        .run(1)
        .await
        .unwrap();

    assert_eq!(report.current_count, 0);
    assert!(store.snapshot(1).unwrap().known_listing_ids.is_empty());
    assert_eq!(store.snapshot(1).unwrap().revision, 1);
}

#[tokio::test]
async fn empty_results_are_persisted_too() {
    let store = MemoryStore::with(vec![search(1, &[SOURCE_A], &[4])]);
    let source = ScriptedSource::default().page(SOURCE_A, "0", &[], None);
    let queue = RecordingQueue::default();

    let report = DiscoveryStage::new(&store, &source, &queue, &settings())
        .run(1)
        .await
        .unwrap();

    assert!(!report.is_partial());
    assert!(store.snapshot(1).unwrap().known_listing_ids.is_empty());
}

#[tokio::test]
async fn missing_search_aborts_without_side_effects() {
    let store = MemoryStore::default();
    let source = ScriptedSource::default();
    let queue = RecordingQueue::default();

    let err = DiscoveryStage::new(&store, &source, &queue, &settings())
        .run(42)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ConfigNotFound(42)));
    assert!(source.requests.lock().unwrap().is_empty());
    assert!(queue.listing_ids().is_empty());
}

#[tokio::test]
async fn enqueue_failure_does_not_stop_other_events_or_roll_back() {
    let store = MemoryStore::with(vec![search(1, &[SOURCE_A], &[])]);
    let source = ScriptedSource::default().page(SOURCE_A, "0", &[1, 2, 3], None);
    let queue = RecordingQueue {
        reject_listing: Some(2),
        ..RecordingQueue::default()
    };

    let report = DiscoveryStage::new(&store, &source, &queue, &settings())
        .run(1)
        .await
        .unwrap();

    assert_eq!(report.enqueue_failures.len(), 1);
    assert_eq!(report.enqueue_failures[0].listing_id, 2);
    assert_eq!(queue.listing_ids(), vec![1, 3]);
    assert_eq!(store.snapshot(1).unwrap().known_listing_ids, ids(&[1, 2, 3]));
}

#[tokio::test]
async fn concurrent_write_is_detected_before_enqueueing() {
    let mut store = MemoryStore::with(vec![search(1, &[SOURCE_A], &[])]);
    store.interfere_on_replace = true;
    let source = ScriptedSource::default().page(SOURCE_A, "0", &[1], None);
    let queue = RecordingQueue::default();

    let err = DiscoveryStage::new(&store, &source, &queue, &settings())
        .run(1)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Store(StoreError::Conflict { search_id: 1, .. })
    ));
    assert!(queue.listing_ids().is_empty());
}

#[tokio::test]
async fn endless_pagination_is_cut_off() {
    let store = MemoryStore::with(vec![search(1, &[SOURCE_A, SOURCE_B], &[])]);
    let source = ScriptedSource::default()
        .page(SOURCE_A, "0", &[1], Some("24"))
        .page(SOURCE_A, "24", &[2], Some("0"))
        .page(SOURCE_B, "0", &[3], None);
    let queue = RecordingQueue::default();

    let report = DiscoveryStage::new(&store, &source, &queue, &settings())
        .run(1)
        .await
        .unwrap();

    assert_eq!(report.source_failures.len(), 1);
    assert!(report.source_failures[0].error.contains("repeated offset"));
    assert_eq!(queue.listing_ids(), vec![3]);
}
