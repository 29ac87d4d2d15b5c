//! Declarative configuration: which schema properties should exist, and how
//! to reach the service that holds them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use userschema::{PropertySpec, ReconcileOptions, RetryConfig, SchemaProperty, SchemaScope};

/// Default environment variable holding the API token
pub const DEFAULT_TOKEN_ENV: &str = "SCHEMACTL_API_TOKEN";

/// Problems with the contents of an otherwise parseable config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("property '{index}' is declared more than once for {scope}")]
    DuplicateProperty { index: String, scope: SchemaScope },

    #[error("[service] org_url must not be empty")]
    MissingOrgUrl,

    #[error(transparent)]
    Property(#[from] userschema::Error),
}

/// Top-level config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    pub service: ServiceConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default, rename = "property")]
    pub properties: Vec<PropertySpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Organization base URL, e.g. `https://example.okta.com`
    pub org_url: String,

    /// Name of the environment variable that holds the API token
    #[serde(default = "default_token_env")]
    pub api_token_env: String,
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub fetch_attempts: u32,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
    /// Overall limit for one property, 0 for none
    pub timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            fetch_attempts: 3,
            poll_attempts: 5,
            poll_interval_ms: 500,
            timeout_secs: 120,
        }
    }
}

impl RetrySettings {
    /// Translate into the library's per-call options
    pub fn reconcile_options(&self) -> ReconcileOptions {
        let poll_interval = Duration::from_millis(self.poll_interval_ms);
        ReconcileOptions {
            fetch_retry: RetryConfig {
                max_attempts: self.fetch_attempts,
                ..RetryConfig::default()
            },
            poll: {
                let polling = RetryConfig::polling();
                RetryConfig {
                    max_attempts: self.poll_attempts,
                    base_delay: poll_interval,
                    max_delay: poll_interval.max(polling.max_delay),
                    ..polling
                }
            },
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        }
    }
}

impl SchemaConfig {
    /// Load and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!(
            "Loaded {} properties from {}",
            config.properties.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.service.org_url.trim().is_empty() {
            return Err(ConfigError::MissingOrgUrl.into());
        }
        Ok(config)
    }

    /// Validate every declared property and fill in defaults
    ///
    /// Fails on the first invalid or duplicated entry.
    pub fn desired_properties(&self) -> Result<Vec<(SchemaScope, SchemaProperty)>, ConfigError> {
        let mut seen = HashSet::new();
        let mut desired = Vec::with_capacity(self.properties.len());

        for spec in &self.properties {
            let scope = spec.scope();
            if !seen.insert((scope.clone(), spec.index.clone())) {
                return Err(ConfigError::DuplicateProperty {
                    index: spec.index.clone(),
                    scope,
                });
            }
            desired.push((scope, spec.clone().into_property()?));
        }

        Ok(desired)
    }

    /// API token from the configured environment variable, if set
    pub fn api_token(&self) -> Option<String> {
        match std::env::var(&self.service.api_token_env) {
            Ok(token) if !token.trim().is_empty() => Some(token),
            _ => {
                log::warn!(
                    "{} is not set; requests will be sent without credentials",
                    self.service.api_token_env
                );
                None
            }
        }
    }
}
