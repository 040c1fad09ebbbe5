//! Configuration loading for the `huginn` CLI.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `./huginn.toml` (working directory)
//! 3. `~/.huginn/config.toml` (user)
//! 4. `/etc/huginn/config.toml` (system)
//!
//! With no file, built-in defaults apply. Secrets are loaded separately with
//! mandatory permission checks:
//! 1. `~/.huginn/secrets.toml` (user, must be 0600)
//! 2. `/etc/huginn/secrets.toml` (system, must be 0600)

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::tagger::{DEFAULT_BATCH_SIZE, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::{HuginnError, Result};

/// CLI configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pim: PimConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub tagging: TaggingConfig,
}

/// PIM connection settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PimConfig {
    /// Base URL of the PIM, e.g. `https://pim.example.com`.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Recognition service settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifierConfig {
    /// AWS region (default: eu-west-1).
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub max_labels: Option<i32>,
    #[serde(default)]
    pub min_confidence: Option<f32>,
}

/// Label cache location.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Path of the JSON label document (default: `~/.cache/huginn/labels.json`).
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

/// Default cache path: `~/.cache/huginn/labels.json`.
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("huginn")
        .join("labels.json")
}

/// Tagging pass settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TaggingConfig {
    /// Destination text attribute.
    #[serde(default)]
    pub tag_attribute: Option<String>,
    /// Labels must be strictly above this confidence (default: 90).
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
    /// Records per upsert call (default: 100).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            tag_attribute: None,
            confidence_threshold: default_threshold(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Secrets (API credentials).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub pim: Option<PimSecrets>,
    #[serde(default)]
    pub aws: Option<AwsSecrets>,
}

/// PIM API user.
#[derive(Clone, Default, Deserialize)]
pub struct PimSecrets {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for PimSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PimSecrets")
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Static AWS credentials.
#[derive(Clone, Deserialize)]
pub struct AwsSecrets {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for AwsSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecrets")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist; otherwise the first file found wins and
    /// no file at all yields defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        let local_config = PathBuf::from("huginn.toml");
        if local_config.exists() {
            return Ok(Some(local_config));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (CLI flags and env vars may
    /// supply everything).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".huginn").join("secrets.toml");
            if user_secrets.exists() {
                Self::check_permissions(&user_secrets)?;
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/huginn/secrets.toml");
        if system_secrets.exists() {
            Self::check_permissions(&system_secrets)?;
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(HuginnError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    fn pim_field(&self, field: impl Fn(&PimSecrets) -> Option<&String>) -> Option<String> {
        self.pim.as_ref().and_then(field).cloned()
    }

    pub fn pim_username(&self) -> Option<String> {
        self.pim_field(|p| p.username.as_ref())
    }

    pub fn pim_password(&self) -> Option<String> {
        self.pim_field(|p| p.password.as_ref())
    }

    pub fn pim_client_id(&self) -> Option<String> {
        self.pim_field(|p| p.client_id.as_ref())
    }

    pub fn pim_client_secret(&self) -> Option<String> {
        self.pim_field(|p| p.client_secret.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert!(config.pim.base_url.is_none());
        assert!(config.cache.path.ends_with("labels.json"));
        assert_eq!(config.tagging.confidence_threshold, 90.0);
        assert_eq!(config.tagging.batch_size, 100);
        assert!(config.tagging.tag_attribute.is_none());
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [pim]
            base_url = "https://pim.example.com"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.pim.base_url.as_deref(), Some("https://pim.example.com"));
        // Defaults preserved
        assert_eq!(config.tagging.confidence_threshold, 90.0);
        assert!(config.cache.path.ends_with("labels.json"));
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [pim]
            base_url = "https://pim.example.com"

            [classifier]
            region = "us-east-1"
            max_labels = 20
            min_confidence = 60.0

            [cache]
            path = "/var/lib/huginn/labels.json"

            [tagging]
            tag_attribute = "tags"
            confidence_threshold = 75.5
            batch_size = 50
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.classifier.region.as_deref(), Some("us-east-1"));
        assert_eq!(config.classifier.max_labels, Some(20));
        assert_eq!(config.classifier.min_confidence, Some(60.0));
        assert_eq!(config.cache.path, PathBuf::from("/var/lib/huginn/labels.json"));
        assert_eq!(config.tagging.tag_attribute.as_deref(), Some("tags"));
        assert_eq!(config.tagging.confidence_threshold, 75.5);
        assert_eq!(config.tagging.batch_size, 50);
    }

    #[test]
    fn parse_secrets() {
        let toml = r#"
            [pim]
            username = "admin"
            password = "admin-password"
            client_id = "1_abc"
            client_secret = "xyz"

            [aws]
            access_key_id = "AKIA123"
            secret_access_key = "shh"
        "#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.pim_username(), Some("admin".to_string()));
        assert_eq!(secrets.pim_client_secret(), Some("xyz".to_string()));
        assert_eq!(secrets.aws.as_ref().unwrap().access_key_id, "AKIA123");
    }

    #[test]
    fn secrets_debug_is_redacted() {
        let secrets = Secrets {
            pim: Some(PimSecrets {
                password: Some("admin-password".to_string()),
                ..Default::default()
            }),
            aws: Some(AwsSecrets {
                access_key_id: "AKIA123".to_string(),
                secret_access_key: "shh-secret".to_string(),
            }),
        };
        let printed = format!("{secrets:?}");
        assert!(!printed.contains("admin-password"));
        assert!(!printed.contains("shh-secret"));
    }

    #[test]
    fn empty_secrets_yield_none() {
        let secrets = Secrets::default();
        assert_eq!(secrets.pim_username(), None);
        assert_eq!(secrets.pim_password(), None);
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huginn.toml");
        fs::write(&path, "[tagging]\ntag_attribute = \"keywords\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.tagging.tag_attribute.as_deref(), Some("keywords"));
    }

    #[test]
    fn invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huginn.toml");
        fs::write(&path, "[tagging\n").unwrap();

        let err = Config::load_from_file(&path).unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }
}
