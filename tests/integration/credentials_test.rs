//! Integration tests for credential resolution.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use athena_glance::config::ConnectionConfig;
use athena_glance::credentials::{
    list_profiles, resolve, ChainCredentialsProvider, Credentials, CredentialsCache,
    CredentialsProvider, ProfileFileCredentialsProvider, StaticCredentialsProvider,
};
use athena_glance::error::Result;
use athena_glance::service::{MockQueryService, QueryService};
use athena_glance::session::Session;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const CREDENTIALS: &str = "\
[default]
aws_access_key_id = AKIADEFAULT
aws_secret_access_key = default-secret

[analytics]
aws_access_key_id = AKIAANALYTICS
aws_secret_access_key = analytics-secret
aws_session_token = analytics-token

[assumed]
role_arn = arn:aws:iam::123456789012:role/reader
source_profile = default
";

fn credentials_file() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials");
    std::fs::write(&path, CREDENTIALS).unwrap();
    (dir, path)
}

fn connection(profile: &str) -> ConnectionConfig {
    ConnectionConfig {
        region: Some("eu-central-1".to_string()),
        workgroup: None,
        profile: Some(profile.to_string()),
        endpoint: None,
    }
}

/// Session whose factory records the access key it was built with.
fn recording_session(
    connection: ConnectionConfig,
    provider: Arc<dyn CredentialsProvider>,
    seen: Arc<Mutex<Vec<String>>>,
) -> Session {
    Session::new(connection, provider).with_service_factory(Arc::new(
        move |_: &ConnectionConfig, credentials: Credentials| -> Result<Arc<dyn QueryService>> {
            seen.lock().unwrap().push(credentials.access_key_id);
            Ok(Arc::new(MockQueryService::with_sample_data()))
        },
    ))
}

#[tokio::test]
async fn test_session_uses_connection_profile() {
    let (_dir, path) = credentials_file();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let session = recording_session(
        connection("analytics"),
        Arc::new(ProfileFileCredentialsProvider::with_path(path)),
        seen.clone(),
    );

    let catalogs = session.list_catalogs().await.unwrap().unwrap();

    assert_eq!(catalogs[0].name, "AwsDataCatalog");
    assert_eq!(*seen.lock().unwrap(), vec!["AKIAANALYTICS".to_string()]);
}

#[tokio::test]
async fn test_unknown_profile_aborts_silently() {
    let (_dir, path) = credentials_file();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let session = recording_session(
        connection("missing"),
        Arc::new(ProfileFileCredentialsProvider::with_path(path)),
        seen.clone(),
    );

    assert!(session.list_catalogs().await.unwrap().is_none());
    assert!(session
        .list_columns("AwsDataCatalog", "sampledb", "elb_logs")
        .await
        .unwrap()
        .is_none());
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_role_profile_is_skipped_by_chain() {
    let (_dir, path) = credentials_file();
    let chain = ChainCredentialsProvider::new(vec![
        Box::new(ProfileFileCredentialsProvider::with_path(path)),
        Box::new(StaticCredentialsProvider::new(Credentials::new(
            "AKIAFALLBACK",
            "fallback-secret",
        ))),
    ]);

    let credentials = chain.provide("assumed", "eu-central-1").await.unwrap().unwrap();
    assert_eq!(credentials.access_key_id, "AKIAFALLBACK");
}

#[tokio::test]
async fn test_expired_cache_entry_is_rerequested() {
    let (_dir, path) = credentials_file();
    let cache = Arc::new(CredentialsCache::new());
    cache.insert(
        "default",
        Credentials::new("AKIASTALE", "stale-secret")
            .with_expiration(Utc::now() - Duration::minutes(5)),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let session = recording_session(
        connection("default"),
        Arc::new(ProfileFileCredentialsProvider::with_path(path)),
        seen.clone(),
    )
    .with_cache(cache.clone());

    session.list_databases("AwsDataCatalog").await.unwrap().unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["AKIADEFAULT".to_string()]);
    assert_eq!(cache.get("default").unwrap().access_key_id, "AKIADEFAULT");
}

#[tokio::test]
async fn test_valid_cache_entry_skips_provider() {
    let cache = CredentialsCache::new();
    let fresh = Credentials::new("AKIACACHED", "cached-secret")
        .with_expiration(Utc::now() + Duration::hours(1));
    cache.insert("default", fresh.clone());

    let empty = ChainCredentialsProvider::new(Vec::new());
    let credentials = resolve(&cache, &empty, "default", "us-east-1")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(credentials, fresh);
}

#[test]
fn test_list_profiles_merges_both_files() {
    let (dir, credentials) = credentials_file();
    let config = dir.path().join("config");
    std::fs::write(
        &config,
        "[default]\nregion = us-east-1\n\n[profile reporting]\nregion = eu-west-1\n",
    )
    .unwrap();

    let profiles = list_profiles(Some(credentials.as_path()), Some(config.as_path())).unwrap();

    assert_eq!(profiles, vec!["analytics", "assumed", "default", "reporting"]);
}

#[test]
fn test_list_profiles_without_files() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    assert!(list_profiles(Some(missing.as_path()), None).unwrap().is_empty());
}
