//! Persistent label cache.
//!
//! [`LabelCache`] memoizes an [`ImageClassifier`] keyed on the image
//! reference, so the recognition service is called at most once per image
//! across runs.
//!
//! Every [`classify`](ImageClassifier::classify) call reads the whole
//! document from its [`LabelStore`]. A hit returns the stored labels with no
//! write. A miss asks the wrapped classifier, inserts the result and writes
//! the whole document back. A failing classifier leaves the store untouched.
//!
//! The read → mutate → write cycle is not locked. Concurrent misses (in one
//! process or several sharing a file) may each fetch the same image and the
//! last full write wins, dropping keys added by the others.

pub mod store;

pub use store::{JsonFileStore, LabelStore, MemoryStore};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::Result;
use crate::classifier::ImageClassifier;
use crate::telemetry;
use crate::types::Label;

/// Memoizing decorator over an [`ImageClassifier`].
pub struct LabelCache {
    inner: Arc<dyn ImageClassifier>,
    store: Arc<dyn LabelStore>,
}

impl LabelCache {
    pub fn new(inner: Arc<dyn ImageClassifier>, store: Arc<dyn LabelStore>) -> Self {
        Self { inner, store }
    }

    /// Cache backed by a JSON document at `path`.
    pub fn with_file(inner: Arc<dyn ImageClassifier>, path: impl Into<std::path::PathBuf>) -> Self {
        Self::new(inner, Arc::new(JsonFileStore::new(path)))
    }
}

#[async_trait]
impl ImageClassifier for LabelCache {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn classify(&self, image: &str) -> Result<Vec<Label>> {
        let mut labels = self.store.load_all()?;

        if let Some(hit) = labels.remove(image) {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
            debug!(image, count = hit.len(), "label cache hit");
            return Ok(hit);
        }

        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        debug!(image, classifier = self.inner.name(), "label cache miss");

        let fetched = self.inner.classify(image).await?;
        labels.insert(image.to_string(), fetched.clone());
        self.store.save_all(&labels)?;

        Ok(fetched)
    }
}
