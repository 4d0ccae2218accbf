use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::error::{Result, VaultError};
use crate::http_util::{expect_status, required_header};
use crate::retry::{retry_http_body, retry_http_body_unprocessed, HttpRetryError};
use crate::sigv4::{self, Credentials, RequestToSign};
use crate::tree_hash::tree_hash_hex;
use crate::{ByteRange, PartAck, RetryConfig, TransferReceipt, VaultClient};

const GLACIER_API_VERSION: &str = "2012-06-01";
const SERVICE: &str = "glacier";
/// `-` addresses the account that owns the credentials.
const ACCOUNT_ID: &str = "-";

/// Amazon S3 Glacier over its REST API, using blocking HTTP.
pub struct GlacierVault {
    endpoint: String,
    host: String,
    region: String,
    credentials: Credentials,
    agent: ureq::Agent,
    retry: RetryConfig,
}

impl GlacierVault {
    pub fn new(
        endpoint: &str,
        region: &str,
        credentials: Credentials,
        retry: RetryConfig,
    ) -> Result<Self> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let host = endpoint
            .strip_prefix("https://")
            .or_else(|| endpoint.strip_prefix("http://"))
            .ok_or_else(|| {
                VaultError::Config(format!("invalid Glacier endpoint URL '{endpoint}'"))
            })?
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        if host.is_empty() {
            return Err(VaultError::Config(format!(
                "invalid Glacier endpoint URL '{endpoint}'"
            )));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(30))
            .timeout_read(Duration::from_secs(300))
            .timeout_write(Duration::from_secs(300))
            .build();

        Ok(Self {
            endpoint,
            host,
            region: region.to_string(),
            credentials,
            agent,
            retry,
        })
    }

    fn vault_path(vault: &str, suffix: &str) -> String {
        format!("/{ACCOUNT_ID}/vaults/{vault}{suffix}")
    }

    /// Sign and send one request, retrying transient failures.
    ///
    /// Each attempt is signed afresh so retries never carry a stale date.
    fn call<T>(
        &self,
        resend: Resend,
        op_name: &str,
        method: &str,
        path: &str,
        extra_headers: &[(&str, String)],
        body: &[u8],
        handle: impl Fn(ureq::Response) -> std::result::Result<T, HttpRetryError>,
    ) -> Result<T> {
        let payload_hash = sigv4::hex_sha256(body);
        let url = format!("{}{path}", self.endpoint);

        let attempt = || -> std::result::Result<T, HttpRetryError> {
            let mut headers = BTreeMap::new();
            headers.insert("host".to_string(), self.host.clone());
            headers.insert(
                "x-amz-glacier-version".to_string(),
                GLACIER_API_VERSION.to_string(),
            );
            headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());
            for (name, value) in extra_headers {
                headers.insert(name.to_ascii_lowercase(), value.clone());
            }
            sigv4::sign(
                &self.credentials,
                &self.region,
                SERVICE,
                Utc::now(),
                RequestToSign {
                    method,
                    path,
                    headers: &mut headers,
                    payload_hash: &payload_hash,
                },
            );

            let mut req = self.agent.request(method, &url);
            for (name, value) in &headers {
                req = req.set(name, value);
            }
            let resp = req.send_bytes(body).map_err(HttpRetryError::http)?;
            handle(resp)
        };
        let result = match resend {
            Resend::Transient => retry_http_body(&self.retry, op_name, "Glacier", attempt),
            Resend::Unprocessed => {
                retry_http_body_unprocessed(&self.retry, op_name, "Glacier", attempt)
            }
        };
        result.map_err(|e| into_vault_error(op_name, e))
    }
}

/// Which failures a request may be resent after.
#[derive(Clone, Copy)]
enum Resend {
    Transient,
    /// Creates a remote object; resend only if the server refused it outright.
    Unprocessed,
}

fn into_vault_error(op: &str, err: HttpRetryError) -> VaultError {
    match err {
        HttpRetryError::Http(e) => match *e {
            ureq::Error::Status(status, resp) => {
                let message = resp
                    .into_string()
                    .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
                VaultError::Rejected {
                    op: op.to_string(),
                    status,
                    message,
                }
            }
            transport @ ureq::Error::Transport(_) => VaultError::Transport {
                op: op.to_string(),
                message: transport.to_string(),
            },
        },
        HttpRetryError::BodyIo(e) => VaultError::Transport {
            op: op.to_string(),
            message: e.to_string(),
        },
        HttpRetryError::Permanent(message) => VaultError::Protocol {
            op: op.to_string(),
            message,
        },
    }
}

fn check_checksum(op: &str, sent: &str, reported: &str) -> Result<()> {
    if !sent.eq_ignore_ascii_case(reported) {
        return Err(VaultError::ChecksumMismatch {
            op: op.to_string(),
            sent: sent.to_string(),
            reported: reported.to_string(),
        });
    }
    Ok(())
}

fn receipt_from(
    resp: &ureq::Response,
    context: &str,
) -> std::result::Result<TransferReceipt, HttpRetryError> {
    expect_status(resp, 201, context)?;
    Ok(TransferReceipt {
        remote_id: required_header(resp, "x-amz-archive-id", context)?,
        location: required_header(resp, "Location", context)?,
        checksum: required_header(resp, "x-amz-sha256-tree-hash", context)?,
    })
}

impl VaultClient for GlacierVault {
    fn initiate_multipart(
        &self,
        vault: &str,
        description: &str,
        part_size: u64,
    ) -> Result<String> {
        let op = format!("INITIATE {vault}");
        let path = Self::vault_path(vault, "/multipart-uploads");
        let headers = [
            ("x-amz-archive-description", description.to_string()),
            ("x-amz-part-size", part_size.to_string()),
        ];
        let session_id = self.call(Resend::Unprocessed, &op, "POST", &path, &headers, &[], |resp| {
            expect_status(&resp, 201, &op)?;
            required_header(&resp, "x-amz-multipart-upload-id", &op)
        })?;
        debug!("Glacier {op}: session {session_id}");
        Ok(session_id)
    }

    fn upload_part(
        &self,
        vault: &str,
        session_id: &str,
        range: &ByteRange,
        body: &[u8],
    ) -> Result<PartAck> {
        let op = format!("UPLOAD_PART {vault} {range}");
        if body.len() as u64 != range.len() {
            return Err(VaultError::InvalidPart(format!(
                "{op}: body is {} bytes but range covers {}",
                body.len(),
                range.len()
            )));
        }
        let checksum = tree_hash_hex(body);
        let path = Self::vault_path(vault, &format!("/multipart-uploads/{session_id}"));
        let headers = [
            ("Content-Range", range.content_range()),
            ("x-amz-sha256-tree-hash", checksum.clone()),
        ];
        let reported = self.call(Resend::Transient, &op, "PUT", &path, &headers, body, |resp| {
            expect_status(&resp, 204, &op)?;
            required_header(&resp, "x-amz-sha256-tree-hash", &op)
        })?;
        check_checksum(&op, &checksum, &reported)?;
        Ok(PartAck {
            range: *range,
            checksum: reported,
        })
    }

    fn complete_multipart(
        &self,
        vault: &str,
        session_id: &str,
        total_size: u64,
        checksum: &str,
    ) -> Result<TransferReceipt> {
        let op = format!("COMPLETE {vault}");
        let path = Self::vault_path(vault, &format!("/multipart-uploads/{session_id}"));
        let headers = [
            ("x-amz-archive-size", total_size.to_string()),
            ("x-amz-sha256-tree-hash", checksum.to_string()),
        ];
        let receipt = self.call(Resend::Transient, &op, "POST", &path, &headers, &[], |resp| {
            receipt_from(&resp, &op)
        })?;
        check_checksum(&op, checksum, &receipt.checksum)?;
        Ok(receipt)
    }

    fn abort_multipart(&self, vault: &str, session_id: &str) -> Result<()> {
        let op = format!("ABORT {vault}");
        let path = Self::vault_path(vault, &format!("/multipart-uploads/{session_id}"));
        self.call(Resend::Transient, &op, "DELETE", &path, &[], &[], |resp| {
            expect_status(&resp, 204, &op)
        })
    }

    fn put_archive(&self, vault: &str, description: &str, body: &[u8]) -> Result<TransferReceipt> {
        let op = format!("UPLOAD_ARCHIVE {vault}");
        let checksum = tree_hash_hex(body);
        let path = Self::vault_path(vault, "/archives");
        let headers = [
            ("x-amz-archive-description", description.to_string()),
            ("x-amz-sha256-tree-hash", checksum.clone()),
        ];
        let receipt = self.call(Resend::Unprocessed, &op, "POST", &path, &headers, body, |resp| {
            receipt_from(&resp, &op)
        })?;
        check_checksum(&op, &checksum, &receipt.checksum)?;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    struct Recorded {
        request_line: String,
        headers: BTreeMap<String, String>,
        body_len: usize,
    }

    /// Serve canned responses, one per connection, recording each request.
    fn mock_glacier(responses: Vec<String>) -> (String, Arc<Mutex<Vec<Recorded>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        std::thread::spawn(move || {
            for response in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut headers = BTreeMap::new();
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((k, v)) = line.split_once(':') {
                        headers.insert(k.trim().to_ascii_lowercase(), v.trim().to_string());
                    }
                }
                let len: usize = headers
                    .get("content-length")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                let mut body = vec![0u8; len];
                reader.read_exact(&mut body).unwrap();
                seen_clone.lock().unwrap().push(Recorded {
                    request_line: request_line.trim_end().to_string(),
                    headers,
                    body_len: len,
                });
                let mut stream = stream;
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
        });
        (format!("http://{addr}"), seen)
    }

    fn response(status: &str, headers: &[(&str, &str)]) -> String {
        let mut out = format!("HTTP/1.1 {status}\r\nConnection: close\r\nContent-Length: 0\r\n");
        for (k, v) in headers {
            out.push_str(&format!("{k}: {v}\r\n"));
        }
        out.push_str("\r\n");
        out
    }

    fn vault(endpoint: &str) -> GlacierVault {
        GlacierVault::new(
            endpoint,
            "us-east-1",
            Credentials::new("AKIDEXAMPLE", "secret"),
            RetryConfig {
                max_retries: 2,
                retry_delay_ms: 1,
                retry_max_delay_ms: 2,
            },
        )
        .unwrap()
    }

    #[test]
    fn initiate_returns_session_id() {
        let (endpoint, seen) = mock_glacier(vec![response(
            "201 Created",
            &[("x-amz-multipart-upload-id", "session-42")],
        )]);
        let id = vault(&endpoint)
            .initiate_multipart("seedbank", "abc", 8 * 1024 * 1024)
            .unwrap();
        assert_eq!(id, "session-42");

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0].request_line,
            "POST /-/vaults/seedbank/multipart-uploads HTTP/1.1"
        );
        assert_eq!(seen[0].headers["x-amz-part-size"], "8388608");
        assert_eq!(seen[0].headers["x-amz-archive-description"], "abc");
        assert!(seen[0].headers["authorization"].starts_with("AWS4-HMAC-SHA256 "));
    }

    #[test]
    fn part_checksum_mismatch_is_reported() {
        let (endpoint, seen) = mock_glacier(vec![response(
            "204 No Content",
            &[("x-amz-sha256-tree-hash", "00")],
        )]);
        let body = b"part body";
        let range = ByteRange {
            start: 0,
            end: 8,
            total: 9,
        };
        let err = vault(&endpoint)
            .upload_part("seedbank", "s1", &range, body)
            .unwrap_err();
        assert!(matches!(err, VaultError::ChecksumMismatch { .. }), "{err}");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].headers["content-range"], "bytes 0-8/*");
        assert_eq!(seen[0].body_len, body.len());
    }

    #[test]
    fn client_errors_are_not_retried() {
        let (endpoint, seen) = mock_glacier(vec![response("400 Bad Request", &[])]);
        let err = vault(&endpoint)
            .abort_multipart("seedbank", "s1")
            .unwrap_err();
        assert!(matches!(err, VaultError::Rejected { status: 400, .. }), "{err}");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn server_errors_are_retried() {
        let tree = tree_hash_hex(b"payload");
        let (endpoint, seen) = mock_glacier(vec![
            response("503 Service Unavailable", &[]),
            response(
                "201 Created",
                &[
                    ("x-amz-archive-id", "archive-1"),
                    ("Location", "/-/vaults/seedbank/archives/archive-1"),
                    ("x-amz-sha256-tree-hash", &tree),
                ],
            ),
        ]);
        let receipt = vault(&endpoint)
            .put_archive("seedbank", "abc", b"payload")
            .unwrap();
        assert_eq!(receipt.remote_id, "archive-1");
        assert_eq!(receipt.checksum, tree);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn single_shot_upload_is_not_resent_after_server_error() {
        let (endpoint, seen) = mock_glacier(vec![response("500 Internal Server Error", &[])]);
        let err = vault(&endpoint)
            .put_archive("seedbank", "abc", b"payload")
            .unwrap_err();
        assert!(matches!(err, VaultError::Rejected { status: 500, .. }), "{err}");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn initiate_is_not_resent_after_gateway_timeout() {
        let (endpoint, seen) = mock_glacier(vec![response("504 Gateway Timeout", &[])]);
        let err = vault(&endpoint)
            .initiate_multipart("seedbank", "abc", 8 * 1024 * 1024)
            .unwrap_err();
        assert!(matches!(err, VaultError::Rejected { status: 504, .. }), "{err}");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn rejects_endpoint_without_scheme() {
        let result = GlacierVault::new(
            "glacier.example.com",
            "us-east-1",
            Credentials::new("a", "b"),
            RetryConfig::default(),
        );
        assert!(matches!(result, Err(VaultError::Config(_))));
    }
}
