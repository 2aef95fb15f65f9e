//! Credential suppliers.
//!
//! Suppliers return `Ok(None)` when they have nothing for the profile and
//! reserve errors for sources that exist but cannot be used.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::profiles::{default_credentials_path, read_ini};
use super::{Credentials, CredentialsProvider};
use crate::error::{AthenaError, Result};

/// Always supplies the same credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentialsProvider {
    credentials: Credentials,
}

impl StaticCredentialsProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn provide(&self, _profile: &str, _region: &str) -> Result<Option<Credentials>> {
        Ok(Some(self.credentials.clone()))
    }
}

/// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`
/// and `AWS_CREDENTIAL_EXPIRATION` (RFC 3339).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentCredentialsProvider;

#[async_trait]
impl CredentialsProvider for EnvironmentCredentialsProvider {
    async fn provide(&self, _profile: &str, _region: &str) -> Result<Option<Credentials>> {
        let (Ok(access_key_id), Ok(secret_access_key)) = (
            std::env::var("AWS_ACCESS_KEY_ID"),
            std::env::var("AWS_SECRET_ACCESS_KEY"),
        ) else {
            return Ok(None);
        };

        let expiration = match std::env::var("AWS_CREDENTIAL_EXPIRATION") {
            Ok(raw) => Some(parse_expiration(&raw)?),
            Err(_) => None,
        };

        debug!("Using credentials from environment");
        Ok(Some(Credentials {
            access_key_id,
            secret_access_key,
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
            expiration,
        }))
    }
}

fn parse_expiration(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AthenaError::credentials(format!("Invalid credential expiration '{raw}': {e}")))
}

/// Reads static keys for a profile from the shared credentials file.
#[derive(Debug, Clone)]
pub struct ProfileFileCredentialsProvider {
    path: Option<PathBuf>,
}

impl ProfileFileCredentialsProvider {
    /// Creates a provider for the default shared credentials file.
    pub fn new() -> Self {
        Self {
            path: default_credentials_path(),
        }
    }

    /// Creates a provider for a specific file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl Default for ProfileFileCredentialsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsProvider for ProfileFileCredentialsProvider {
    async fn provide(&self, profile: &str, _region: &str) -> Result<Option<Credentials>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        let sections = read_ini(path)?;
        let Some(section) = sections.iter().find(|s| s.name == profile) else {
            debug!("Profile '{}' not found in {}", profile, path.display());
            return Ok(None);
        };

        let Some(access_key_id) = section.get("aws_access_key_id") else {
            if section.get("role_arn").is_some() {
                warn!("Profile '{}' uses role assumption, which is not supported", profile);
                return Ok(None);
            }
            return Err(AthenaError::credentials(format!(
                "Profile '{profile}' has no aws_access_key_id"
            )));
        };

        let secret_access_key = section.get("aws_secret_access_key").ok_or_else(|| {
            AthenaError::credentials(format!("Profile '{profile}' has no aws_secret_access_key"))
        })?;

        let expiration = section
            .get("aws_expiration")
            .map(parse_expiration)
            .transpose()?;

        debug!("Using credentials for profile '{}' from {}", profile, path.display());
        Ok(Some(Credentials {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: section.get("aws_session_token").map(String::from),
            expiration,
        }))
    }
}

/// Asks each supplier in turn and returns the first credentials found.
pub struct ChainCredentialsProvider {
    providers: Vec<Box<dyn CredentialsProvider>>,
}

impl ChainCredentialsProvider {
    pub fn new(providers: Vec<Box<dyn CredentialsProvider>>) -> Self {
        Self { providers }
    }

    /// Environment variables first, then the shared credentials file.
    pub fn default_chain() -> Self {
        Self::new(vec![
            Box::new(EnvironmentCredentialsProvider),
            Box::new(ProfileFileCredentialsProvider::new()),
        ])
    }
}

#[async_trait]
impl CredentialsProvider for ChainCredentialsProvider {
    async fn provide(&self, profile: &str, region: &str) -> Result<Option<Credentials>> {
        for provider in &self.providers {
            if let Some(credentials) = provider.provide(profile, region).await? {
                return Ok(Some(credentials));
            }
        }
        Ok(None)
    }
}
