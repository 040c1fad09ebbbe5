//! Huginn error types

use std::path::PathBuf;

/// Huginn error types
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    // PIM/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("not found: {0}")]
    NotFound(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The persisted label document exists but cannot be used.
    #[error("label cache {}: {message}", path.display())]
    CacheStore { path: PathBuf, message: String },

    // Recognition service errors
    #[error("classification failed: {0}")]
    Classification(String),

    /// The configured tag attribute cannot receive tags.
    #[error("invalid tag attribute '{attribute}': {reason}")]
    InvalidTagTarget { attribute: String, reason: String },

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for HuginnError {
    fn from(err: reqwest::Error) -> Self {
        HuginnError::Http(err.to_string())
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_tag_target_names_attribute() {
        let err = HuginnError::InvalidTagTarget {
            attribute: "tags".to_string(),
            reason: "attribute is localizable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid tag attribute 'tags': attribute is localizable"
        );
    }

    #[test]
    fn cache_store_includes_path() {
        let err = HuginnError::CacheStore {
            path: PathBuf::from("/tmp/labels.json"),
            message: "expected value at line 1 column 1".to_string(),
        };
        assert!(err.to_string().contains("/tmp/labels.json"));
    }

    #[test]
    fn json_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: HuginnError = parse.into();
        assert!(matches!(err, HuginnError::Json(_)));
    }
}
