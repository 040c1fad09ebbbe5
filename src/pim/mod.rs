//! PIM collaborator traits and the Akeneo REST client.
//!
//! The tagger only needs three operations on a reference entity (list
//! attributes, stream records, bulk upsert); the recognition classifier
//! additionally downloads image bytes. Each concern is its own trait so
//! tests can fake exactly what they exercise.

pub mod akeneo;
mod auth;

pub use akeneo::{AkeneoClient, AkeneoCredentials};

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::Result;
use crate::types::{Attribute, Record};

/// Lazily produced, finite, non-restartable record sequence.
///
/// Pages are fetched as the stream is polled; the stream ends when the
/// collection is exhausted. An `Err` item ends iteration for the caller.
pub type RecordStream<'a> = Pin<Box<dyn Stream<Item = Result<Record>> + Send + 'a>>;

/// Reference entity attribute and record access.
#[async_trait]
pub trait ReferenceEntityApi: Send + Sync {
    /// All attributes of `entity`.
    async fn list_attributes(&self, entity: &str) -> Result<Vec<Attribute>>;

    /// Every record of `entity`, one at a time.
    fn list_records<'a>(&'a self, entity: &'a str) -> RecordStream<'a>;

    /// Create or update `records` in one call. An empty slice is a no-op.
    async fn upsert_records(&self, entity: &str, records: &[Record]) -> Result<()>;
}

/// Binary media stored in the PIM.
#[async_trait]
pub trait MediaFileApi: Send + Sync {
    /// Raw bytes of the media file stored under `code`.
    async fn download(&self, code: &str) -> Result<Vec<u8>>;
}
