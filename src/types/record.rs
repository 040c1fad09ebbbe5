//! Reference entity records and attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attribute type code for image attributes.
pub const IMAGE_TYPE: &str = "image";

/// Attribute type code for plain text attributes.
pub const TEXT_TYPE: &str = "text";

/// An attribute of a reference entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value_per_locale: bool,
    #[serde(default)]
    pub value_per_channel: bool,
    /// Labels, validation rules and other fields we don't interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Attribute {
    /// Create an unscoped attribute.
    pub fn new(code: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            kind: kind.into(),
            value_per_locale: false,
            value_per_channel: false,
            extra: serde_json::Map::new(),
        }
    }

    pub fn localizable(mut self) -> Self {
        self.value_per_locale = true;
        self
    }

    pub fn scopable(mut self) -> Self {
        self.value_per_channel = true;
        self
    }

    pub fn is_image(&self) -> bool {
        self.kind == IMAGE_TYPE
    }

    pub fn is_plain_text(&self) -> bool {
        self.kind == TEXT_TYPE
    }

    /// Whether values are held per channel or per locale.
    pub fn is_scoped(&self) -> bool {
        self.value_per_locale || self.value_per_channel
    }
}

/// One value of an attribute on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub locale: Option<String>,
    pub channel: Option<String>,
    pub data: serde_json::Value,
}

impl AttributeValue {
    /// An unscoped value (`locale` and `channel` both null).
    pub fn unscoped(data: impl Into<serde_json::Value>) -> Self {
        Self {
            locale: None,
            channel: None,
            data: data.into(),
        }
    }
}

/// A reference entity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier.
    pub code: String,
    #[serde(default)]
    pub values: BTreeMap<String, Vec<AttributeValue>>,
}

impl Record {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            values: BTreeMap::new(),
        }
    }

    /// Builder-style helper to set an attribute's values.
    pub fn with_value(mut self, attribute: impl Into<String>, value: AttributeValue) -> Self {
        self.values.entry(attribute.into()).or_default().push(value);
        self
    }

    /// The image reference stored under `attribute`.
    ///
    /// Reads the first value's `data`. Returns `None` when the attribute is
    /// missing, has no values, or its data is not a string.
    pub fn image_reference(&self, attribute: &str) -> Option<&str> {
        self.values
            .get(attribute)
            .and_then(|values| values.first())
            .and_then(|value| value.data.as_str())
    }

    /// Replace every value with a single comma-joined tag value.
    pub fn replace_values_with_tags(&mut self, attribute: &str, tags: &[String]) {
        self.values = BTreeMap::from([(
            attribute.to_string(),
            vec![AttributeValue::unscoped(tags.join(","))],
        )]);
    }
}
