//! Huginn - image-recognition tagging for PIM reference entities
//!
//! Huginn runs a classification pass over every record of a reference
//! entity: each image attribute is sent to a label-detection service, labels
//! above a confidence threshold become tags, and the tags are written back
//! to a text attribute in batches.
//!
//! Detection results are memoized in a persistent [`LabelCache`] so an image
//! is sent to the service at most once across runs.
//!
//! # Example
//!
//! Requires the `rekognition` feature (on by default).
//!
//! ```rust,no_run
//! # #[cfg(feature = "rekognition")]
//! # mod example {
//! use std::sync::Arc;
//!
//! use huginn::{AkeneoClient, AkeneoCredentials, BatchTagger, LabelCache, TaggerConfig};
//! use huginn::classifier::{RekognitionClassifier, RekognitionConfig};
//!
//! pub async fn run() -> huginn::Result<()> {
//!     let pim = Arc::new(AkeneoClient::new(
//!         "https://pim.example.com",
//!         AkeneoCredentials {
//!             client_id: "client".into(),
//!             client_secret: "secret".into(),
//!             username: "admin".into(),
//!             password: "password".into(),
//!         },
//!     )?);
//!
//!     let rekognition = RekognitionClassifier::new(RekognitionConfig::default(), pim.clone()).await?;
//!     let cache = LabelCache::with_file(Arc::new(rekognition), "labels.json");
//!
//!     let tagger = BatchTagger::new(pim, Arc::new(cache), TaggerConfig::new("tags"));
//!     let report = tagger.run("designers").await?;
//!
//!     println!("tagged {} records", report.records_tagged);
//!     Ok(())
//! }
//! # }
//! # fn main() {}
//! ```

pub mod cache;
pub mod classifier;
#[cfg(feature = "cli")]
pub mod config;
pub mod error;
pub mod pim;
pub mod tagger;
pub mod telemetry;
pub mod types;
mod version;

// Re-export main types at crate root
pub use cache::{JsonFileStore, LabelCache, LabelStore, MemoryStore};
pub use classifier::ImageClassifier;
pub use error::{HuginnError, Result};
pub use pim::{AkeneoClient, AkeneoCredentials, MediaFileApi, RecordStream, ReferenceEntityApi};
pub use tagger::{BatchTagger, TagReport, TaggerConfig};
pub use types::{Attribute, AttributeValue, ImageReference, Label, LabelMap, Record};
pub use version::{PKG_VERSION, version_string};
