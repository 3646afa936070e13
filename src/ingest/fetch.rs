//! HTTP retrieval for NWIS requests.
//!
//! The service reports application errors inside an otherwise successful
//! response body, so every body is checked for the error marker before it
//! is handed on. A successful body can optionally be written verbatim to a
//! local file; that capture is best effort and never fails the fetch.
//!
//! Nothing here retries. Network failures come back as
//! `AcquisitionError::Transport`.

use crate::logging::{self, DataSource};
use crate::model::{AcquisitionError, ConfigurationError, RemoteServiceError, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Substring that marks an application-level error in a response body.
pub const ERROR_MARKER: &str = "error";

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Raw HTTP response: status code and full body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Issues a blocking GET. Implementations report only transport-level
/// failures; interpreting the status and body is left to `fetch`.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Production transport over `reqwest::blocking`.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Builds a client whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration, user_agent: &str) -> std::result::Result<Self, ConfigurationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ConfigurationError::single("http", format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| transport_error(url, &e))?;

        Ok(HttpResponse { status, body })
    }
}

fn transport_error(url: &str, e: &reqwest::Error) -> AcquisitionError {
    AcquisitionError::Transport {
        url: url.to_string(),
        message: e.to_string(),
        timed_out: e.is_timeout(),
    }
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Returns true if the body carries the service's in-band error marker.
pub fn contains_error_marker(body: &str) -> bool {
    body.contains(ERROR_MARKER)
}

/// Fetches `url` and returns the body of a successful response.
///
/// # Errors
/// - `Transport`: the request could not be completed.
/// - `RemoteService`: non-2xx status, or a 2xx body containing the error
///   marker. The raw body is attached unmodified.
pub fn fetch(
    transport: &dyn HttpTransport,
    url: &str,
    capture: Option<&Path>,
    source: DataSource,
) -> Result<String> {
    logging::debug(source, None, &format!("Fetching: {}", url));

    let response = transport.get(url)?;

    let success = (200..300).contains(&response.status);
    if !success || contains_error_marker(&response.body) {
        return Err(RemoteServiceError {
            url: url.to_string(),
            status: response.status,
            body: response.body,
        }
        .into());
    }

    if let Some(path) = capture {
        capture_body(path, &response.body, source);
    }

    Ok(response.body)
}

/// Writes the body verbatim. Failures are logged and swallowed; a partially
/// written file is left in place.
fn capture_body(path: &Path, body: &str, source: DataSource) {
    match fs::write(path, body) {
        Ok(()) => logging::debug(
            source,
            None,
            &format!("Saved {} bytes of response to {}", body.len(), path.display()),
        ),
        Err(e) => logging::warn(
            source,
            None,
            &format!("Failed to save response to {}: {}", path.display(), e),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedTransport(std::result::Result<HttpResponse, AcquisitionError>);

    impl HttpTransport for CannedTransport {
        fn get(&self, _url: &str) -> Result<HttpResponse> {
            self.0.clone()
        }
    }

    fn ok(body: &str) -> CannedTransport {
        CannedTransport(Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        }))
    }

    const URL: &str = "https://waterservices.usgs.gov/nwis/dv/?sites=09010500";

    #[test]
    fn test_successful_body_is_returned_unchanged() {
        let body = r#"{ "value": { "timeSeries": [] } }"#;
        let result = fetch(&ok(body), URL, None, DataSource::Daily).unwrap();
        assert_eq!(result, body);
    }

    #[test]
    fn test_error_marker_in_ok_body_is_remote_service_error() {
        let body = "# //Output-Format: RDB\n# error: No sites found matching all criteria";
        let err = fetch(&ok(body), URL, None, DataSource::Daily).unwrap_err();
        match err {
            AcquisitionError::RemoteService(remote) => {
                assert_eq!(remote.status, 200);
                assert_eq!(remote.body, body, "raw body must be attached");
                assert_eq!(remote.url, URL);
            }
            other => panic!("expected RemoteService, got {:?}", other),
        }
    }

    #[test]
    fn test_http_failure_status_is_remote_service_error() {
        let transport = CannedTransport(Ok(HttpResponse {
            status: 400,
            body: "Bad Request".to_string(),
        }));
        let err = fetch(&transport, URL, None, DataSource::Instantaneous).unwrap_err();
        assert!(matches!(err, AcquisitionError::RemoteService(ref r) if r.status == 400), "{:?}", err);
    }

    #[test]
    fn test_transport_failure_passes_through() {
        let transport = CannedTransport(Err(AcquisitionError::Transport {
            url: URL.to_string(),
            message: "operation timed out".to_string(),
            timed_out: true,
        }));
        let err = fetch(&transport, URL, None, DataSource::Daily).unwrap_err();
        assert!(matches!(err, AcquisitionError::Transport { timed_out: true, .. }));
    }

    #[test]
    fn test_capture_writes_body_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.json");
        let body = "{\"value\": {\"timeSeries\": []}}\n";

        fetch(&ok(body), URL, Some(&path), DataSource::Daily).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), body);
    }

    #[test]
    fn test_capture_failure_does_not_fail_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("response.json");

        let result = fetch(&ok("{}"), URL, Some(&path), DataSource::Daily);
        assert_eq!(result.unwrap(), "{}");
        assert!(!path.exists());
    }

    #[test]
    fn test_error_body_is_not_captured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.txt");

        let _ = fetch(&ok("error"), URL, Some(&path), DataSource::Daily);
        assert!(!path.exists());
    }
}
