//! Tests for metrics emitted by the label cache and the batch tagger.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use huginn::{
    Attribute, AttributeValue, BatchTagger, ImageClassifier, Label, LabelCache, MemoryStore,
    Record, RecordStream, ReferenceEntityApi, Result, TaggerConfig, telemetry,
};

// ============================================================================
// Mocks
// ============================================================================

/// Labels every image "Lamp" unless its reference contains "plain".
struct LampClassifier;

#[async_trait]
impl ImageClassifier for LampClassifier {
    fn name(&self) -> &str {
        "lamp"
    }

    async fn classify(&self, image: &str) -> Result<Vec<Label>> {
        if image.contains("plain") {
            Ok(vec![Label::new("Surface", 40.0)])
        } else {
            Ok(vec![Label::new("Lamp", 99.0)])
        }
    }
}

struct StaticPim {
    records: Vec<Record>,
    upserts: Mutex<Vec<usize>>,
}

#[async_trait]
impl ReferenceEntityApi for StaticPim {
    async fn list_attributes(&self, _entity: &str) -> Result<Vec<Attribute>> {
        Ok(vec![Attribute::new("photo", "image"), Attribute::new("tags", "text")])
    }

    fn list_records<'a>(&'a self, _entity: &'a str) -> RecordStream<'a> {
        Box::pin(stream::iter(self.records.clone().into_iter().map(Ok)))
    }

    async fn upsert_records(&self, _entity: &str, records: &[Record]) -> Result<()> {
        self.upserts.lock().unwrap().push(records.len());
        Ok(())
    }
}

fn photo(code: &str, image: &str) -> Record {
    Record::new(code).with_value("photo", AttributeValue::unscoped(image))
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_records_hits_and_misses() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let cache = LabelCache::new(Arc::new(LampClassifier), Arc::new(MemoryStore::new()));
                cache.classify("a.jpg").await.unwrap();
                cache.classify("a.jpg").await.unwrap();
                cache.classify("b.jpg").await.unwrap();
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 2);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn tagger_records_outcomes_and_batches() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let pim = Arc::new(StaticPim {
        records: vec![
            photo("r1", "lamp-1.jpg"),
            photo("r2", "plain.jpg"),
            photo("r3", "lamp-2.jpg"),
            Record::new("r4"),
        ],
        upserts: Mutex::new(Vec::new()),
    });

    let report = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let tagger = BatchTagger::new(
                    pim.clone(),
                    Arc::new(LampClassifier),
                    TaggerConfig::new("tags").batch_size(2),
                );
                tagger.run("lighting").await
            })
        })
    })
    .unwrap();

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(report.records_tagged, 2);
    assert_eq!(counter_total(&snapshot, telemetry::RECORDS_TAGGED_TOTAL), 2);
    assert_eq!(counter_total(&snapshot, telemetry::RECORDS_SKIPPED_TOTAL), 2);
    // One full batch plus the final flush.
    assert_eq!(*pim.upserts.lock().unwrap(), [2, 0]);
    assert_eq!(counter_total(&snapshot, telemetry::UPSERT_BATCHES_TOTAL), 2);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let cache = LabelCache::new(Arc::new(LampClassifier), Arc::new(MemoryStore::new()));
    cache.classify("a.jpg").await.unwrap();
}
