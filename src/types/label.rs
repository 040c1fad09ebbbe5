//! Label detection results.
//!
//! Labels keep the field names the recognition service produces (`Name`,
//! `Confidence`, …) so the persisted cache document is the raw response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque key under which an image is stored in the PIM.
pub type ImageReference = String;

/// Persisted cache document: image reference → raw labels, in response order.
pub type LabelMap = BTreeMap<ImageReference, Vec<Label>>;

/// A single detected label.
///
/// Only `Name` and `Confidence` are interpreted. Every other field the
/// service returns (parents, instances, categories, …) is carried through
/// untouched in [`extra`](Label::extra).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    #[serde(rename = "Name")]
    pub name: String,
    /// Confidence in percent (0–100).
    #[serde(rename = "Confidence")]
    pub confidence: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Label {
    /// Create a label with no passthrough attributes.
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence,
            extra: serde_json::Map::new(),
        }
    }

    /// Attach a service-specific attribute.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Whether this label clears `threshold`. The boundary is exclusive.
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.confidence > threshold
    }
}
