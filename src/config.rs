//! Configuration management for athena-glance.
//!
//! Handles loading configuration from TOML files and environment variables,
//! with support for named connections (region, workgroup, credentials
//! profile) and polling settings.

use crate::error::{AthenaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Region used when nothing else is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Workgroup used when nothing else is configured.
pub const DEFAULT_WORKGROUP: &str = "primary";

/// Credentials profile used when nothing else is configured.
pub const DEFAULT_PROFILE: &str = "default";

/// Default delay between status polls and between page fetches.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Regions where the query service is offered, with display labels.
pub const KNOWN_REGIONS: &[(&str, &str)] = &[
    ("us-east-1", "US East (N. Virginia)"),
    ("us-east-2", "US East (Ohio)"),
    ("us-west-1", "US West (N. California)"),
    ("us-west-2", "US West (Oregon)"),
    ("ca-central-1", "Canada (Central)"),
    ("eu-west-1", "EU (Ireland)"),
    ("eu-west-2", "EU (London)"),
    ("eu-west-3", "EU (Paris)"),
    ("eu-central-1", "EU (Frankfurt)"),
    ("eu-north-1", "EU (Stockholm)"),
    ("eu-south-1", "Europe (Milan)"),
    ("ap-northeast-1", "Asia Pacific (Tokyo)"),
    ("ap-northeast-2", "Asia Pacific (Seoul)"),
    ("ap-northeast-3", "Asia Pacific (Osaka-Local)"),
    ("ap-southeast-1", "Asia Pacific (Singapore)"),
    ("ap-southeast-2", "Asia Pacific (Sydney)"),
    ("ap-south-1", "Asia Pacific (Mumbai)"),
    ("ap-east-1", "Asia Pacific (Hong Kong)"),
    ("sa-east-1", "South America (São Paulo)"),
    ("me-south-1", "Middle East (Bahrain)"),
    ("af-south-1", "Africa (Cape Town)"),
    ("cn-north-1", "China (Beijing)"),
    ("cn-northwest-1", "China (Ningxia)"),
    ("us-gov-west-1", "AWS GovCloud (US)"),
    ("us-gov-east-1", "AWS GovCloud (US-East)"),
];

/// Returns the display label for a known region id.
pub fn region_label(id: &str) -> Option<&'static str> {
    KNOWN_REGIONS
        .iter()
        .find(|(region, _)| *region == id)
        .map(|(_, label)| *label)
}

/// Main configuration structure for athena-glance.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Polling and pagination settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Named connections.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionConfig>,
}

/// Polling and pagination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between status polls and between page fetches, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
        }
    }
}

impl PollingConfig {
    /// Returns the configured interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Connection configuration: where queries run and with which identity.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Region id (e.g. `us-east-1`).
    pub region: Option<String>,

    /// Workgroup queries are submitted under.
    pub workgroup: Option<String>,

    /// Credentials profile id.
    pub profile: Option<String>,

    /// Endpoint override (e.g. a VPC endpoint or a local test server).
    pub endpoint: Option<String>,
}

impl ConnectionConfig {
    /// Returns the region, falling back to the default.
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Returns the workgroup, falling back to the default.
    pub fn workgroup(&self) -> &str {
        self.workgroup.as_deref().unwrap_or(DEFAULT_WORKGROUP)
    }

    /// Returns the credentials profile, falling back to the default.
    pub fn profile(&self) -> &str {
        self.profile.as_deref().unwrap_or(DEFAULT_PROFILE)
    }

    /// Returns the service endpoint for this connection.
    ///
    /// Uses the configured override when present, otherwise the regional
    /// endpoint.
    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://athena.{}.amazonaws.com/", self.region()),
        };

        let url = Url::parse(&raw)
            .map_err(|e| AthenaError::config(format!("Invalid endpoint '{raw}': {e}")))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(AthenaError::config(format!(
                "Invalid endpoint scheme '{}'. Expected 'https' or 'http'",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(AthenaError::config(format!("Endpoint '{raw}' has no host")));
        }

        Ok(url)
    }

    /// Merges another config into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &ConnectionConfig) {
        if other.region.is_some() {
            self.region = other.region.clone();
        }
        if other.workgroup.is_some() {
            self.workgroup = other.workgroup.clone();
        }
        if other.profile.is_some() {
            self.profile = other.profile.clone();
        }
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint.clone();
        }
    }

    /// Applies environment variables (AWS_REGION, AWS_PROFILE, etc.) as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.region.is_none() {
            self.region = std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .ok();
        }
        if self.profile.is_none() {
            self.profile = std::env::var("AWS_PROFILE").ok();
        }
        if self.workgroup.is_none() {
            self.workgroup = std::env::var("ATHENA_WORKGROUP").ok();
        }
    }

    /// Returns a display string for UI purposes.
    pub fn display_string(&self) -> String {
        format!(
            "{} @ {} (profile: {})",
            self.workgroup(),
            self.region(),
            self.profile()
        )
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("athena-glance")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AthenaError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            AthenaError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named connection, or the default connection if name is None.
    pub fn get_connection(&self, name: Option<&str>) -> Option<&ConnectionConfig> {
        let key = name.unwrap_or("default");
        self.connections.get(key)
    }
}
