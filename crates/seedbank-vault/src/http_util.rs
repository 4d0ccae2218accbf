use crate::retry::HttpRetryError;

/// Fetch a required response header, failing permanently when it is absent.
pub fn required_header(
    resp: &ureq::Response,
    name: &str,
    context: &str,
) -> Result<String, HttpRetryError> {
    resp.header(name)
        .map(str::to_string)
        .ok_or_else(|| {
            HttpRetryError::Permanent(format!("{context}: response missing {name} header"))
        })
}

/// Require one specific success status.
pub fn expect_status(
    resp: &ureq::Response,
    expected: u16,
    context: &str,
) -> Result<(), HttpRetryError> {
    let status = resp.status();
    if status != expected {
        return Err(HttpRetryError::Permanent(format!(
            "{context}: expected HTTP {expected}, got {status}"
        )));
    }
    Ok(())
}
