//! AWS Signature Version 4 request signing.
//!
//! Only what the JSON protocol needs: header-based signing of requests with
//! an in-memory body.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use crate::credentials::Credentials;
use crate::error::{AthenaError, Result};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// `x-amz-date` timestamp format.
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const SHORT_DATE_FORMAT: &str = "%Y%m%d";

/// Inputs that scope a signature.
#[derive(Debug, Clone, Copy)]
pub struct SigningScope<'a> {
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

impl SigningScope<'_> {
    /// Formats the request timestamp for the `x-amz-date` header.
    pub fn amz_date(&self) -> String {
        self.time.format(AMZ_DATE_FORMAT).to_string()
    }

    fn short_date(&self) -> String {
        self.time.format(SHORT_DATE_FORMAT).to_string()
    }

    fn credential_scope(&self) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            self.short_date(),
            self.region,
            self.service
        )
    }
}

/// Returns the value of the `host` header for a URL.
pub fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Computes the `Authorization` header value for a request.
///
/// `headers` must contain every header to be signed (at least `host` and
/// `x-amz-date`); names are lowercased before signing.
pub fn authorization_header(
    method: &str,
    url: &Url,
    headers: &BTreeMap<String, String>,
    body: &[u8],
    credentials: &Credentials,
    scope: &SigningScope<'_>,
) -> Result<String> {
    let canonical_headers = canonicalize_headers(headers);
    let signed_headers = canonical_headers
        .keys()
        .cloned()
        .collect::<Vec<_>>()
        .join(";");

    let request = canonical_request(method, url, &canonical_headers, &signed_headers, body);
    let to_sign = string_to_sign(&request, scope);
    let key = signing_key(&credentials.secret_access_key, scope)?;
    let signature = hex::encode(hmac_sha256(&key, to_sign.as_bytes())?);

    Ok(format!(
        "{ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={}",
        credentials.access_key_id,
        scope.credential_scope(),
        signed_headers,
        signature
    ))
}

fn canonicalize_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            (name.to_lowercase(), value)
        })
        .collect()
}

fn canonical_request(
    method: &str,
    url: &Url,
    canonical_headers: &BTreeMap<String, String>,
    signed_headers: &str,
    body: &[u8],
) -> String {
    let path = if url.path().is_empty() { "/" } else { url.path() };

    let header_block: String = canonical_headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        path,
        canonical_query(url),
        header_block,
        signed_headers,
        sha256_hex(body)
    )
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn uri_encode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

fn string_to_sign(canonical_request: &str, scope: &SigningScope<'_>) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        scope.amz_date(),
        scope.credential_scope(),
        sha256_hex(canonical_request.as_bytes())
    )
}

fn signing_key(secret: &str, scope: &SigningScope<'_>) -> Result<Vec<u8>> {
    let date_key = hmac_sha256(format!("AWS4{secret}").as_bytes(), scope.short_date().as_bytes())?;
    let region_key = hmac_sha256(&date_key, scope.region.as_bytes())?;
    let service_key = hmac_sha256(&region_key, scope.service.as_bytes())?;
    hmac_sha256(&service_key, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AthenaError::internal(format!("Failed to initialise HMAC: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Hex-encoded SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
