//! AWS Rekognition label detection.
//!
//! Images are downloaded from the PIM by reference and sent to
//! `DetectLabels` as raw bytes.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_rekognition::Client;
use aws_sdk_rekognition::config::Credentials;
use aws_sdk_rekognition::error::DisplayErrorContext;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::{Image, Label as SdkLabel};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use super::ImageClassifier;
use crate::pim::MediaFileApi;
use crate::telemetry;
use crate::types::Label;
use crate::{HuginnError, Result};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "eu-west-1";

/// Rekognition client settings.
#[derive(Clone, Default)]
pub struct RekognitionConfig {
    /// AWS region (default: `eu-west-1`).
    pub region: Option<String>,
    /// Endpoint override, e.g. a local emulator.
    pub endpoint_url: Option<String>,
    /// Explicit access key id; without it the default credential chain is used.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// `MaxLabels` request parameter.
    pub max_labels: Option<i32>,
    /// `MinConfidence` request parameter.
    pub min_confidence: Option<f32>,
}

impl fmt::Debug for RekognitionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RekognitionConfig")
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field("max_labels", &self.max_labels)
            .field("min_confidence", &self.min_confidence)
            .finish_non_exhaustive()
    }
}

impl RekognitionConfig {
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }
}

/// Label detection through AWS Rekognition.
pub struct RekognitionClassifier {
    client: Client,
    media: Arc<dyn MediaFileApi>,
    max_labels: Option<i32>,
    min_confidence: Option<f32>,
}

impl RekognitionClassifier {
    /// Build a client from `config`.
    ///
    /// Explicit credentials must be given as a pair; otherwise the AWS
    /// default chain (environment, profile, instance role) is loaded.
    pub async fn new(config: RekognitionConfig, media: Arc<dyn MediaFileApi>) -> Result<Self> {
        let region = Region::new(config.region().to_string());
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);

        match (&config.access_key_id, &config.secret_access_key) {
            (Some(key_id), Some(secret)) => {
                loader = loader.credentials_provider(Credentials::new(
                    key_id.clone(),
                    secret.clone(),
                    None,
                    None,
                    "huginn-config",
                ));
            }
            (None, None) => {}
            _ => {
                return Err(HuginnError::Configuration(
                    "rekognition requires both access_key_id and secret_access_key when either is set"
                        .to_string(),
                ));
            }
        }

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        Ok(Self::from_client(
            Client::new(&sdk_config),
            media,
            config.max_labels,
            config.min_confidence,
        ))
    }

    /// Wrap an already configured SDK client.
    pub fn from_client(
        client: Client,
        media: Arc<dyn MediaFileApi>,
        max_labels: Option<i32>,
        min_confidence: Option<f32>,
    ) -> Self {
        Self {
            client,
            media,
            max_labels,
            min_confidence,
        }
    }

    async fn detect(&self, bytes: Vec<u8>) -> Result<Vec<Label>> {
        let output = self
            .client
            .detect_labels()
            .image(Image::builder().bytes(Blob::new(bytes)).build())
            .set_max_labels(self.max_labels)
            .set_min_confidence(self.min_confidence)
            .send()
            .await
            .map_err(|e| HuginnError::Classification(DisplayErrorContext(e).to_string()))?;

        Ok(output.labels().iter().map(label_from_sdk).collect())
    }
}

#[async_trait]
impl ImageClassifier for RekognitionClassifier {
    fn name(&self) -> &str {
        "rekognition"
    }

    #[instrument(name = "rekognition.classify", skip(self))]
    async fn classify(&self, image: &str) -> Result<Vec<Label>> {
        let bytes = self.media.download(image).await?;
        debug!(size = bytes.len(), "downloaded image");

        let start = Instant::now();
        let result = self.detect(bytes).await;
        metrics::histogram!(telemetry::CLASSIFICATION_DURATION_SECONDS, "classifier" => "rekognition")
            .record(start.elapsed().as_secs_f64());

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::CLASSIFICATIONS_TOTAL, "classifier" => "rekognition", "status" => status)
            .increment(1);

        result
    }
}

/// Convert an SDK label, keeping the service's field names for passthrough data.
fn label_from_sdk(label: &SdkLabel) -> Label {
    let mut extra = Map::new();

    let parents: Vec<Value> = label
        .parents()
        .iter()
        .filter_map(|p| p.name())
        .map(|name| json!({ "Name": name }))
        .collect();
    extra.insert("Parents".to_string(), Value::Array(parents));

    let aliases: Vec<Value> = label
        .aliases()
        .iter()
        .filter_map(|a| a.name())
        .map(|name| json!({ "Name": name }))
        .collect();
    extra.insert("Aliases".to_string(), Value::Array(aliases));

    let categories: Vec<Value> = label
        .categories()
        .iter()
        .filter_map(|c| c.name())
        .map(|name| json!({ "Name": name }))
        .collect();
    extra.insert("Categories".to_string(), Value::Array(categories));

    let instances: Vec<Value> = label
        .instances()
        .iter()
        .map(|instance| {
            let mut value = Map::new();
            if let Some(confidence) = instance.confidence() {
                value.insert("Confidence".to_string(), json!(confidence));
            }
            if let Some(b) = instance.bounding_box() {
                value.insert(
                    "BoundingBox".to_string(),
                    json!({
                        "Width": b.width(),
                        "Height": b.height(),
                        "Left": b.left(),
                        "Top": b.top(),
                    }),
                );
            }
            Value::Object(value)
        })
        .collect();
    extra.insert("Instances".to_string(), Value::Array(instances));

    Label {
        name: label.name().unwrap_or_default().to_string(),
        confidence: label.confidence().map(f64::from).unwrap_or(0.0),
        extra,
    }
}
