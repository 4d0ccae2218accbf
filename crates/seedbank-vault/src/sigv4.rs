//! AWS Signature Version 4 request signing for the Glacier REST API.
//!
//! Signs with an `Authorization` header over every header passed in, so
//! all `x-amz-*` headers the vault inspects are covered by the signature.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{Result, VaultError};

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: None,
        }
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and optional `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        let access_key_id = read("AWS_ACCESS_KEY_ID")
            .ok_or_else(|| VaultError::Config("AWS_ACCESS_KEY_ID is not set".into()))?;
        let secret_access_key = read("AWS_SECRET_ACCESS_KEY")
            .ok_or_else(|| VaultError::Config("AWS_SECRET_ACCESS_KEY is not set".into()))?;
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: read("AWS_SESSION_TOKEN"),
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

/// Everything that goes into one signature.
pub struct RequestToSign<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Header names must already be lowercase.
    pub headers: &'a mut BTreeMap<String, String>,
    /// Hex SHA-256 of the request body.
    pub payload_hash: &'a str,
}

/// Add `x-amz-date`, the session token (if any) and `authorization` to `req.headers`.
pub fn sign(
    credentials: &Credentials,
    region: &str,
    service: &str,
    time: DateTime<Utc>,
    req: RequestToSign<'_>,
) {
    let date = time.format("%Y%m%d").to_string();
    let amz_date = time.format("%Y%m%dT%H%M%SZ").to_string();

    req.headers.insert("x-amz-date".into(), amz_date.clone());
    if let Some(token) = &credentials.session_token {
        req.headers
            .insert("x-amz-security-token".into(), token.clone());
    }

    let scope = format!("{date}/{region}/{service}/aws4_request");
    let signed_headers = req
        .headers
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";");
    let canonical = canonical_request(req.method, req.path, req.headers, req.payload_hash);
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex_sha256(canonical.as_bytes())
    );
    let key = signing_key(&credentials.secret_access_key, &date, region, service);
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    req.headers.insert(
        "authorization".into(),
        format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            credentials.access_key_id
        ),
    );
}

pub fn canonical_request(
    method: &str,
    path: &str,
    headers: &BTreeMap<String, String>,
    payload_hash: &str,
) -> String {
    let mut canonical_headers = String::new();
    for (name, value) in headers {
        let _ = writeln!(canonical_headers, "{name}:{}", value.trim());
    }
    let signed_headers = headers
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";");
    format!(
        "{method}\n{}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
        uri_encode_path(path)
    )
}

/// Derive the per-day signing key.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

pub fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// URI-encode a path, preserving `/` separators.
fn uri_encode_path(path: &str) -> String {
    let mut result = String::with_capacity(path.len() * 3);
    for b in path.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                result.push(b as char);
            }
            _ => {
                let _ = write!(result, "%{b:02X}");
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn signing_key_matches_aws_reference() {
        // Reference derivation from the AWS SigV4 documentation.
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn canonical_request_layout() {
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), "glacier.us-east-1.amazonaws.com".to_string());
        headers.insert("x-amz-glacier-version".to_string(), " 2012-06-01 ".to_string());
        let canonical = canonical_request("POST", "/-/vaults/my vault/archives", &headers, "abc");
        assert_eq!(
            canonical,
            "POST\n/-/vaults/my%20vault/archives\n\n\
             host:glacier.us-east-1.amazonaws.com\n\
             x-amz-glacier-version:2012-06-01\n\n\
             host;x-amz-glacier-version\nabc"
        );
    }

    #[test]
    fn sign_adds_authorization_over_sorted_headers() {
        let creds = Credentials::new("AKIDEXAMPLE", "secret");
        let mut headers = BTreeMap::new();
        headers.insert("x-amz-glacier-version".to_string(), "2012-06-01".to_string());
        headers.insert("host".to_string(), "glacier.eu-west-1.amazonaws.com".to_string());
        let time = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        sign(
            &creds,
            "eu-west-1",
            "glacier",
            time,
            RequestToSign {
                method: "GET",
                path: "/-/vaults",
                headers: &mut headers,
                payload_hash: &hex_sha256(b""),
            },
        );

        assert_eq!(headers["x-amz-date"], "20240115T120000Z");
        let auth = &headers["authorization"];
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240115/eu-west-1/glacier/aws4_request, "
        ));
        assert!(auth.contains("SignedHeaders=host;x-amz-date;x-amz-glacier-version, "));
        let signature = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = Credentials::new("AKID", "super-secret");
        let shown = format!("{creds:?}");
        assert!(shown.contains("AKID"));
        assert!(!shown.contains("super-secret"));
    }
}
