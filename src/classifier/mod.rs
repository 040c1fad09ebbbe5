//! Image classifiers.
//!
//! A classifier turns an [`ImageReference`](crate::types::ImageReference)
//! into the raw label sequence the recognition service produced for it.
//! [`LabelCache`](crate::cache::LabelCache) is itself a classifier and
//! wraps any other one.

#[cfg(feature = "rekognition")]
pub mod rekognition;

#[cfg(feature = "rekognition")]
pub use rekognition::{RekognitionClassifier, RekognitionConfig};

use async_trait::async_trait;

use crate::Result;
use crate::types::Label;

/// Provider of label detection for stored images.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Classifier name for logging/metrics.
    fn name(&self) -> &str;

    /// Detect labels for the image stored under `image`.
    ///
    /// Errors are terminal; implementations do not retry.
    async fn classify(&self, image: &str) -> Result<Vec<Label>>;
}
