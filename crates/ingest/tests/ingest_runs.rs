//! Integration tests for ingestion runs: page walking, stop conditions, and
//! store interaction, against a scripted page source and a real SQLite file.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use dogmirror_core::config::IngestConfig;
use dogmirror_ingest::{FetchError, IngestError, Ingestor, PageSource, StopReason};
use dogmirror_storage::DogStore;

/// What the scripted source answers for a page.
#[derive(Clone)]
enum Page {
    Items(Vec<Value>),
    Fail,
}

/// Page source with per-page answers, a default for unscripted pages, and a
/// log of every page requested.
struct ScriptedSource {
    pages: HashMap<u32, Page>,
    default: Page,
    requested: Mutex<Vec<u32>>,
}

impl ScriptedSource {
    fn new(default: Page) -> Self {
        Self {
            pages: HashMap::new(),
            default,
            requested: Mutex::new(Vec::new()),
        }
    }

    fn page(mut self, page: u32, answer: Page) -> Self {
        self.pages.insert(page, answer);
        self
    }

    fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_page(&self, page: u32) -> Result<Vec<Value>, FetchError> {
        self.requested.lock().unwrap().push(page);
        match self.pages.get(&page).unwrap_or(&self.default) {
            Page::Items(items) => Ok(items.clone()),
            Page::Fail => Err(FetchError::Status(503)),
        }
    }
}

/// A single valid breed unique to `page`; used as the "has data" default.
fn one_breed() -> Page {
    Page::Items(vec![json!({"breed": "placeholder", "image": "p.jpg"})])
}

fn breeds(page: u32, n: usize) -> Page {
    Page::Items(
        (0..n)
            .map(|i| json!({"breed": format!("Breed {page:02}-{i:02}"), "image": format!("{page}-{i}.jpg")}))
            .collect(),
    )
}

fn empty() -> Page {
    Page::Items(vec![])
}

/// Build a source where pages `1..=last_with_data` each carry `per_page`
/// distinct breeds and every later page answers `after`.
fn catalog(last_with_data: u32, per_page: usize, after: Page) -> ScriptedSource {
    (1..=last_with_data).fold(ScriptedSource::new(after), |source, page| {
        source.page(page, breeds(page, per_page))
    })
}

async fn harness(source: ScriptedSource) -> (Ingestor, Arc<ScriptedSource>, DogStore, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = DogStore::open(dir.path().join("dogs.db")).await.unwrap();
    let source = Arc::new(source);
    let ingestor = Ingestor::new(source.clone(), store.clone(), IngestConfig::default());
    (ingestor, source, store, dir)
}

#[tokio::test]
async fn empty_page_stops_the_run() {
    let (ingestor, source, store, _dir) = harness(catalog(6, 3, empty())).await;

    let report = ingestor.run(1, None).await.unwrap();

    assert_eq!(source.requested(), (1..=7).collect::<Vec<_>>(), "page 8 never requested");
    assert_eq!(report.stop, StopReason::EmptyPage { page: 7 });
    assert_eq!(report.records_stored, 18);
    assert_eq!(store.count().await.unwrap(), 18);
}

#[tokio::test]
async fn ten_consecutive_failures_stop_the_run() {
    let (ingestor, source, _store, _dir) = harness(catalog(2, 2, Page::Fail)).await;

    let report = ingestor.run(1, None).await.unwrap();

    // Pages 3..=12 are the ten failures; page 13 is never requested.
    assert_eq!(source.requested(), (1..=12).collect::<Vec<_>>());
    assert_eq!(report.stop, StopReason::FailureStreak { page: 12 });
    assert_eq!(report.pages_failed, 10);
    assert_eq!(report.records_stored, 4);
}

#[tokio::test]
async fn failure_streak_can_stop_before_late_data() {
    // Known limitation: an outage of ten pages looks exactly like the end of
    // the catalog, so data after it is missed until the next run.
    let mut source = catalog(2, 1, Page::Fail);
    source = source.page(13, breeds(13, 5));
    let (ingestor, source, store, _dir) = harness(source).await;

    ingestor.run(1, None).await.unwrap();

    assert!(!source.requested().contains(&13));
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn sparse_failures_are_skipped_and_streak_resets() {
    let source = catalog(8, 1, empty())
        .page(2, Page::Fail)
        .page(3, Page::Fail)
        .page(5, Page::Fail);
    let (ingestor, source, store, _dir) = harness(source).await;

    let report = ingestor.run(1, None).await.unwrap();

    assert_eq!(source.requested(), (1..=9).collect::<Vec<_>>());
    assert_eq!(report.pages_failed, 3);
    assert_eq!(report.stop, StopReason::EmptyPage { page: 9 });
    assert_eq!(store.count().await.unwrap(), 5);
}

#[tokio::test]
async fn unbounded_run_stops_at_page_bound() {
    let (ingestor, source, _store, _dir) = harness(catalog(60, 1, one_breed())).await;

    let report = ingestor.run(1, None).await.unwrap();

    assert_eq!(source.requested(), (1..=50).collect::<Vec<_>>());
    assert_eq!(report.stop, StopReason::PageBound);
    assert_eq!(report.pages_requested, 50);
}

#[tokio::test]
async fn bounded_run_requests_exactly_max_pages() {
    let (ingestor, source, _store, _dir) = harness(catalog(20, 1, empty())).await;

    let report = ingestor.run(4, Some(5)).await.unwrap();

    assert_eq!(source.requested(), vec![4, 5, 6, 7, 8]);
    assert_eq!(report.start_page, 4);
    assert_eq!(report.stop, StopReason::PageBound);
}

#[tokio::test]
async fn bounded_run_is_clamped_to_page_bound() {
    let (ingestor, source, _store, _dir) = harness(catalog(60, 1, one_breed())).await;

    ingestor.run(48, Some(10)).await.unwrap();

    assert_eq!(source.requested(), vec![48, 49, 50]);
}

#[tokio::test]
async fn zero_max_pages_walks_the_whole_catalog() {
    let (ingestor, source, store, _dir) = harness(catalog(6, 1, empty())).await;

    let report = ingestor.run(1, Some(0)).await.unwrap();

    assert_eq!(source.requested(), (1..=7).collect::<Vec<_>>());
    assert_eq!(report.stop, StopReason::EmptyPage { page: 7 });
    assert_eq!(store.count().await.unwrap(), 6);
}

#[tokio::test]
async fn invalid_items_are_dropped_without_blocking_the_batch() {
    let source = ScriptedSource::new(empty()).page(
        1,
        Page::Items(vec![
            json!({"breed": "Beagle", "image": " b.jpg "}),
            json!({"breed": "https://cdn.example/dog.jpg", "image": "x"}),
            json!({"image": "orphan.png"}),
            json!(42),
            json!({"breed": "Corgi"}),
        ]),
    );
    let (ingestor, _source, store, _dir) = harness(source).await;

    let report = ingestor.run(1, None).await.unwrap();

    assert_eq!(report.records_fetched, 5);
    assert_eq!(report.records_accepted, 2);
    assert_eq!(report.records_rejected, 3);
    assert_eq!(report.records_stored, 2);

    let snapshot = store.snapshot().await.unwrap();
    assert_eq!(snapshot["Beagle"], "b.jpg");
    assert_eq!(snapshot["Corgi"], "");
}

#[tokio::test]
async fn page_of_only_rejects_keeps_going() {
    let source = catalog(3, 2, empty()).page(2, Page::Items(vec![json!({"breed": ""})]));
    let (ingestor, source, store, _dir) = harness(source).await;

    ingestor.run(1, None).await.unwrap();

    assert_eq!(source.requested(), vec![1, 2, 3, 4]);
    assert_eq!(store.count().await.unwrap(), 4);
}

#[tokio::test]
async fn rerun_is_idempotent() {
    let (ingestor, _source, store, _dir) = harness(catalog(3, 4, empty())).await;

    let first = ingestor.run(1, None).await.unwrap();
    let before = store.snapshot().await.unwrap();
    let second = ingestor.run(1, None).await.unwrap();

    assert_eq!(first.records_stored, 12);
    assert_eq!(second.records_stored, 0, "nothing changed upstream");
    assert_eq!(store.snapshot().await.unwrap(), before);
}

#[tokio::test]
async fn completed_run_sets_last_ingestion_time() {
    let (ingestor, _source, _store, _dir) = harness(catalog(1, 1, empty())).await;
    let status = ingestor.status();
    assert!(status.last_completed_at().is_none());

    let report = ingestor.run(1, None).await.unwrap();

    assert!(status.last_completed_at().is_some());
    assert_eq!(status.last_report(), Some(report));
}

#[tokio::test]
async fn failed_run_still_counts_as_completed() {
    let (ingestor, _source, _store, _dir) = harness(ScriptedSource::new(Page::Fail)).await;

    let report = ingestor.run(1, None).await.unwrap();

    assert_eq!(report.stop, StopReason::FailureStreak { page: 10 });
    assert!(ingestor.status().last_completed_at().is_some());
}

#[tokio::test]
async fn store_error_aborts_run_without_marking_completion() {
    let (ingestor, _source, store, _dir) = harness(catalog(3, 1, empty())).await;
    store.close().await;

    let err = ingestor.run(1, None).await.unwrap_err();

    assert!(matches!(err, IngestError::Store(_)), "{err:?}");
    assert!(ingestor.status().last_completed_at().is_none());
}

#[tokio::test]
async fn bootstrap_fills_empty_store_with_first_five_pages() {
    let (ingestor, source, store, _dir) = harness(catalog(20, 15, empty())).await;

    let report = ingestor.bootstrap().await.unwrap().expect("store was empty");

    assert_eq!(source.requested(), vec![1, 2, 3, 4, 5]);
    assert_eq!(report.records_stored, 75);
    assert_eq!(store.count().await.unwrap(), 75);
}

#[tokio::test]
async fn bootstrap_skips_populated_store() {
    let (ingestor, source, _store, _dir) = harness(catalog(20, 2, empty())).await;
    ingestor.run(1, Some(1)).await.unwrap();
    let requested_before = source.requested().len();

    assert!(ingestor.bootstrap().await.unwrap().is_none());
    assert_eq!(source.requested().len(), requested_before);
}

#[tokio::test]
async fn refresh_walks_the_whole_catalog() {
    let (ingestor, source, store, _dir) = harness(catalog(12, 3, empty())).await;
    ingestor.bootstrap().await.unwrap();

    let report = ingestor.refresh().await.unwrap();

    assert_eq!(report.stop, StopReason::EmptyPage { page: 13 });
    assert_eq!(store.count().await.unwrap(), 36);
    assert_eq!(source.requested().iter().filter(|p| **p == 1).count(), 2);
}
