use std::fmt;
use std::time::Duration;

use crate::RetryConfig;

/// Whether an HTTP error is transient and worth retrying.
pub fn is_retryable_http(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Transport(_) => true,
        ureq::Error::Status(code, _) => *code == 408 || *code == 429 || *code >= 500,
    }
}

/// Whether the server certainly did not act on the request, so even a
/// non-idempotent call may be sent again.
pub fn is_unprocessed_http(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Transport(t) => matches!(
            t.kind(),
            ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed
        ),
        ureq::Error::Status(code, _) => *code == 429 || *code == 503,
    }
}

/// Unified error type for HTTP request + response handling.
///
/// Keeps the retry loop decoupled from `VaultError`; conversion lives in
/// each backend.
pub enum HttpRetryError {
    /// HTTP-level error (may be retryable: transport, 408, 429, 5xx).
    Http(Box<ureq::Error>),
    /// Body read I/O error (may be retryable: connection reset, EOF, etc.).
    BodyIo(std::io::Error),
    /// Application error message (never retried).
    Permanent(String),
}

impl HttpRetryError {
    /// Wrap a `ureq::Error` (boxed to keep the enum small).
    pub fn http(e: ureq::Error) -> Self {
        HttpRetryError::Http(Box::new(e))
    }
}

impl fmt::Display for HttpRetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpRetryError::Http(e) => write!(f, "{e}"),
            HttpRetryError::BodyIo(e) => write!(f, "body read error: {e}"),
            HttpRetryError::Permanent(msg) => write!(f, "{msg}"),
        }
    }
}

/// Whether an I/O error is transient and worth retrying.
pub fn is_retryable_io(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::Interrupted
    )
}

fn is_retryable_http_body(err: &HttpRetryError) -> bool {
    match err {
        HttpRetryError::Http(e) => is_retryable_http(e.as_ref()),
        HttpRetryError::BodyIo(e) => is_retryable_io(e),
        HttpRetryError::Permanent(_) => false,
    }
}

fn is_unprocessed_http_body(err: &HttpRetryError) -> bool {
    match err {
        HttpRetryError::Http(e) => is_unprocessed_http(e.as_ref()),
        HttpRetryError::BodyIo(_) | HttpRetryError::Permanent(_) => false,
    }
}

/// Base delay before retry number `retry` (1-based), before jitter.
pub fn backoff_delay_ms(config: &RetryConfig, retry: u32) -> u64 {
    let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
    config
        .retry_delay_ms
        .saturating_mul(factor)
        .min(config.retry_max_delay_ms)
}

/// Retry `f` with exponential backoff + jitter while `is_retryable` says so.
pub fn retry_with_backoff<T, E: fmt::Display>(
    config: &RetryConfig,
    op_name: &str,
    backend_label: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut f: impl FnMut() -> std::result::Result<T, E>,
) -> std::result::Result<T, E> {
    let mut attempt = 0usize;
    loop {
        match f() {
            Ok(val) => return Ok(val),
            Err(e) if attempt < config.max_retries && is_retryable(&e) => {
                attempt += 1;
                tracing::warn!(
                    "{backend_label} {op_name}: transient error (attempt {attempt}/{}), retrying: {e}",
                    config.max_retries,
                );
                let delay_ms = backoff_delay_ms(config, attempt as u32);
                let jitter = rand::random::<u64>() % delay_ms.max(1);
                std::thread::sleep(Duration::from_millis(delay_ms + jitter));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Retry a closure that performs both an HTTP request and response handling.
pub fn retry_http_body<T>(
    config: &RetryConfig,
    op_name: &str,
    backend_label: &str,
    f: impl FnMut() -> std::result::Result<T, HttpRetryError>,
) -> std::result::Result<T, HttpRetryError> {
    retry_with_backoff(config, op_name, backend_label, is_retryable_http_body, f)
}

/// Like [`retry_http_body`], for requests that create something remotely.
///
/// Only failures the server never acted on are retried; a 5xx or a dropped
/// response may mean the object already exists.
pub fn retry_http_body_unprocessed<T>(
    config: &RetryConfig,
    op_name: &str,
    backend_label: &str,
    f: impl FnMut() -> std::result::Result<T, HttpRetryError>,
) -> std::result::Result<T, HttpRetryError> {
    retry_with_backoff(config, op_name, backend_label, is_unprocessed_http_body, f)
}
