//! Publication configuration.
//!
//! Deployment settings for one pipeline: where storage and the repository
//! live, where license texts are kept and how long network calls may take.
//! The storage API URL may be left unset; it is then resolved once per
//! config on first use.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::OnceCell;

use crate::metadata::licenses::find_license;
use crate::repository::{Network, DEVELOPMENT_MEMBER_NODE};

/// Storage API reachable from inside the deployment.
pub const INTERNAL_STORAGE_URL: &str = "http://girder:8080/api/v1";

/// Public storage API used when the internal host does not resolve.
pub const PUBLIC_STORAGE_URL: &str = "https://girder.dev.wholetale.org/api/v1";

const INTERNAL_STORAGE_HOST: &str = "girder:8080";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Unsupported license '{0}'; expected one of CC0-1.0, CC-BY-3.0, CC-BY-4.0")]
    UnsupportedLicense(String),
}

/// Configuration for the publication pipeline.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Storage API URL. `None` resolves lazily (see `storage_api_url`).
    pub storage_api_url: Option<String>,
    /// Member node objects are created on.
    pub member_node: String,
    /// Network the member node belongs to. `None` infers it from the node URL.
    pub network: Option<Network>,
    /// Directory holding the license text files.
    pub license_dir: PathBuf,
    /// Timeout applied to every HTTP call.
    pub http_timeout: Duration,
    /// User agent sent to the member node.
    pub user_agent: String,

    resolved_storage_url: OnceCell<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            storage_api_url: None,
            member_node: DEVELOPMENT_MEMBER_NODE.to_string(),
            network: None,
            license_dir: PathBuf::from("./licenses"),
            http_timeout: Duration::from_secs(600),
            user_agent: format!("tale-publish/{}", env!("CARGO_PKG_VERSION")),
            resolved_storage_url: OnceCell::new(),
        }
    }
}

impl PublishConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `GIRDER_API_URL`: Storage API URL (default: resolved at first use)
    /// - `DATAONE_NODE`: Member node URL (default: the development member node)
    /// - `TALE_PUBLISH_NETWORK`: `production` or `development` (default: inferred)
    /// - `TALE_PUBLISH_LICENSE_DIR`: License text directory (default: ./licenses)
    /// - `TALE_PUBLISH_TIMEOUT_SECS`: HTTP timeout in seconds (default: 600)
    /// - `TALE_PUBLISH_USER_AGENT`: User agent for repository calls
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GIRDER_API_URL") {
            if !val.trim().is_empty() {
                config.storage_api_url = Some(val);
            }
        }

        if let Ok(val) = std::env::var("DATAONE_NODE") {
            config.member_node = val;
        }

        if let Ok(val) = std::env::var("TALE_PUBLISH_NETWORK") {
            config.network = Some(parse_env_value(&val, "TALE_PUBLISH_NETWORK")?);
        }

        if let Ok(val) = std::env::var("TALE_PUBLISH_LICENSE_DIR") {
            config.license_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("TALE_PUBLISH_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "TALE_PUBLISH_TIMEOUT_SECS")?;
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("TALE_PUBLISH_USER_AGENT") {
            config.user_agent = val;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.member_node) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "member_node must be an http(s) URL, got '{}'",
                    self.member_node
                )))
            }
        }

        if let Some(storage_url) = &self.storage_api_url {
            if url::Url::parse(storage_url).is_err() {
                return Err(ConfigError::ValidationFailed(format!(
                    "storage_api_url is not a valid URL: '{}'",
                    storage_url
                )));
            }
        }

        if self.http_timeout.as_secs() == 0 {
            return Err(ConfigError::ValidationFailed(
                "http_timeout must be greater than 0".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "user_agent cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Rejects license ids the pipeline has no text for.
    pub fn check_license(&self, license_id: &str) -> Result<(), ConfigError> {
        find_license(license_id)
            .map(|_| ())
            .ok_or_else(|| ConfigError::UnsupportedLicense(license_id.to_string()))
    }

    /// The network objects are published into.
    pub fn network(&self) -> Network {
        self.network
            .unwrap_or_else(|| Network::for_node(&self.member_node))
    }

    /// The storage API URL: the configured one, otherwise the internal
    /// deployment URL when its host resolves, otherwise the public one.
    /// Resolution happens once per config.
    pub async fn storage_api_url(&self) -> &str {
        if let Some(url) = &self.storage_api_url {
            return url;
        }
        self.resolved_storage_url
            .get_or_init(|| async {
                match tokio::net::lookup_host(INTERNAL_STORAGE_HOST).await {
                    Ok(mut addrs) => {
                        if addrs.next().is_some() {
                            INTERNAL_STORAGE_URL.to_string()
                        } else {
                            tracing::debug!("Internal storage host has no addresses, using public API");
                            PUBLIC_STORAGE_URL.to_string()
                        }
                    }
                    Err(_) => {
                        tracing::debug!("Internal storage host unresolvable, using public API");
                        PUBLIC_STORAGE_URL.to_string()
                    }
                }
            })
            .await
    }

    /// Builder method to set the storage API URL.
    pub fn with_storage_api_url(mut self, url: impl Into<String>) -> Self {
        self.storage_api_url = Some(url.into());
        self
    }

    /// Builder method to set the member node.
    pub fn with_member_node(mut self, node: impl Into<String>) -> Self {
        self.member_node = node.into();
        self
    }

    /// Builder method to set the network explicitly.
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    /// Builder method to set the license directory.
    pub fn with_license_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.license_dir = dir.into();
        self
    }

    /// Builder method to set the HTTP timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Builder method to set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
