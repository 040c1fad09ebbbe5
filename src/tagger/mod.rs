//! Batch classification pass over a reference entity.
//!
//! [`BatchTagger::run`] validates the tag attribute, discovers image
//! attributes, streams every record, derives tags from the classifier and
//! upserts tagged records in fixed-size batches.
//!
//! Failures are not rolled back: batches already upserted stay written,
//! staged records of the failing batch stay untagged.

pub mod tags;

use std::sync::Arc;

use futures_util::TryStreamExt;
use tracing::{debug, info, instrument, warn};

use crate::classifier::ImageClassifier;
use crate::pim::ReferenceEntityApi;
use crate::telemetry;
use crate::types::{Attribute, Record};
use crate::{HuginnError, Result};

/// Records per bulk upsert.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Labels must be strictly more confident than this (percent).
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 90.0;

/// Settings for one tagging pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggerConfig {
    /// Text attribute that receives the comma-joined tags.
    pub tag_attribute: String,
    pub confidence_threshold: f64,
    pub batch_size: usize,
}

impl TaggerConfig {
    pub fn new(tag_attribute: impl Into<String>) -> Self {
        Self {
            tag_attribute: tag_attribute.into(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the upsert batch size (at least 1).
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }
}

/// Outcome of a completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagReport {
    pub records_seen: usize,
    pub records_tagged: usize,
    /// Upsert calls issued, including the final (possibly empty) flush.
    pub batches_written: usize,
}

/// Orchestrates classification and write-back for one reference entity.
pub struct BatchTagger {
    api: Arc<dyn ReferenceEntityApi>,
    classifier: Arc<dyn ImageClassifier>,
    config: TaggerConfig,
}

impl BatchTagger {
    pub fn new(
        api: Arc<dyn ReferenceEntityApi>,
        classifier: Arc<dyn ImageClassifier>,
        config: TaggerConfig,
    ) -> Self {
        Self {
            api,
            classifier,
            config,
        }
    }

    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    /// Run one full pass over `entity`.
    ///
    /// Returns [`HuginnError::InvalidTagTarget`] before any record is read
    /// if the tag attribute cannot hold tags.
    #[instrument(skip(self), fields(tag_attribute = %self.config.tag_attribute))]
    pub async fn run(&self, entity: &str) -> Result<TagReport> {
        let attributes = self.api.list_attributes(entity).await?;
        validate_tag_target(&attributes, &self.config.tag_attribute)?;

        let image_attributes = image_attribute_codes(&attributes);
        if image_attributes.is_empty() {
            warn!(entity, "reference entity has no image attributes, nothing to tag");
        } else {
            debug!(entity, attributes = ?image_attributes, "discovered image attributes");
        }

        let mut report = TagReport::default();
        let mut staged = Vec::with_capacity(self.config.batch_size);
        let mut records = self.api.list_records(entity);

        while let Some(mut record) = records.try_next().await? {
            report.records_seen += 1;

            let tags = self.derive_tags(&record, &image_attributes).await?;
            if tags.is_empty() {
                metrics::counter!(telemetry::RECORDS_SKIPPED_TOTAL).increment(1);
                debug!(record = %record.code, "no label above threshold, skipping");
                continue;
            }

            record.replace_values_with_tags(&self.config.tag_attribute, &tags);
            staged.push(record);
            report.records_tagged += 1;
            metrics::counter!(telemetry::RECORDS_TAGGED_TOTAL).increment(1);

            if staged.len() >= self.config.batch_size {
                self.flush(entity, &mut staged, &mut report).await?;
            }
        }

        self.flush(entity, &mut staged, &mut report).await?;

        info!(
            entity,
            seen = report.records_seen,
            tagged = report.records_tagged,
            batches = report.batches_written,
            "tagging pass complete"
        );
        Ok(report)
    }

    /// Tags for `record`: qualifying label names across its image
    /// attributes, deduplicated in first-seen order.
    pub async fn derive_tags(&self, record: &Record, image_attributes: &[String]) -> Result<Vec<String>> {
        let mut collected = Vec::new();
        for attribute in image_attributes {
            let Some(image) = record.image_reference(attribute) else {
                debug!(record = %record.code, attribute, "no image reference");
                continue;
            };
            let labels = self.classifier.classify(image).await?;
            tags::push_qualifying(&labels, self.config.confidence_threshold, &mut collected);
        }
        Ok(tags::dedupe(collected))
    }

    async fn flush(&self, entity: &str, staged: &mut Vec<Record>, report: &mut TagReport) -> Result<()> {
        self.api.upsert_records(entity, staged.as_slice()).await?;
        report.batches_written += 1;
        metrics::counter!(telemetry::UPSERT_BATCHES_TOTAL).increment(1);
        info!(
            entity,
            count = staged.len(),
            tagged = report.records_tagged,
            "wrote batch"
        );
        staged.clear();
        Ok(())
    }
}

/// Codes of every `image` attribute, in listing order.
pub fn image_attribute_codes(attributes: &[Attribute]) -> Vec<String> {
    attributes
        .iter()
        .filter(|a| a.is_image())
        .map(|a| a.code.clone())
        .collect()
}

/// Check that `code` names an unscoped plain text attribute.
pub fn validate_tag_target<'a>(attributes: &'a [Attribute], code: &str) -> Result<&'a Attribute> {
    let invalid = |reason: String| HuginnError::InvalidTagTarget {
        attribute: code.to_string(),
        reason,
    };

    let attribute = attributes
        .iter()
        .find(|a| a.code == code)
        .ok_or_else(|| invalid("attribute does not exist".to_string()))?;

    if !attribute.is_plain_text() {
        return Err(invalid(format!(
            "expected a text attribute, found '{}'",
            attribute.kind
        )));
    }
    if attribute.value_per_locale {
        return Err(invalid("attribute is localizable".to_string()));
    }
    if attribute.value_per_channel {
        return Err(invalid("attribute is scopable".to_string()));
    }
    Ok(attribute)
}
