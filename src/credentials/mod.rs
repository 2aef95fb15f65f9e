//! Credential resolution.
//!
//! Credentials are resolved per profile through a [`CredentialsProvider`]
//! and memoized in a [`CredentialsCache`] until they expire.

mod profiles;
mod providers;

pub use profiles::{default_config_path, default_credentials_path, list_profiles, parse_ini, IniSection};
pub use providers::{
    ChainCredentialsProvider, EnvironmentCredentialsProvider, ProfileFileCredentialsProvider,
    StaticCredentialsProvider,
};

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::Result;

/// Signing credentials for one profile.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    /// `None` means the credentials never expire.
    pub expiration: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Creates long-lived credentials from an access key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            expiration: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Returns true if the credentials have expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expiration, Some(expiration) if now >= expiration)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// A source of credentials for a named profile.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Returns credentials for the profile, or `None` if this source has none.
    async fn provide(&self, profile: &str, region: &str) -> Result<Option<Credentials>>;
}

/// Per-profile memo of resolved credentials.
///
/// Entries are replaced wholesale; a cached value is never modified.
#[derive(Debug, Default)]
pub struct CredentialsCache {
    entries: RwLock<HashMap<String, Credentials>>,
}

impl CredentialsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns unexpired cached credentials for a profile.
    pub fn get(&self, profile: &str) -> Option<Credentials> {
        self.get_at(profile, Utc::now())
    }

    /// Returns cached credentials for a profile if still valid at `now`.
    pub fn get_at(&self, profile: &str, now: DateTime<Utc>) -> Option<Credentials> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(profile)
            .filter(|credentials| !credentials.is_expired(now))
            .cloned()
    }

    /// Stores credentials for a profile, replacing any previous entry.
    pub fn insert(&self, profile: &str, credentials: Credentials) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(profile.to_string(), credentials);
    }

    /// Forgets the credentials of a profile.
    pub fn invalidate(&self, profile: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(profile);
    }
}

/// Returns credentials for a profile, from the cache when still valid,
/// otherwise from the provider.
///
/// Returns `Ok(None)` (with a warning) when no source has credentials.
pub async fn resolve(
    cache: &CredentialsCache,
    provider: &dyn CredentialsProvider,
    profile: &str,
    region: &str,
) -> Result<Option<Credentials>> {
    if let Some(credentials) = cache.get(profile) {
        debug!("Using cached credentials for profile '{}'", profile);
        return Ok(Some(credentials));
    }

    match provider.provide(profile, region).await? {
        Some(credentials) => {
            cache.insert(profile, credentials.clone());
            Ok(Some(credentials))
        }
        None => {
            warn!("No credentials found for profile '{}'", profile);
            Ok(None)
        }
    }
}
