//! HTTP client abstraction for testability

use std::time::Duration;

use crate::errors::{ExportError, ExportResult};

/// Trait for HTTP GET operations
///
/// Keeps the transport behind an interface so metadata resolution and tile
/// fetching can be tested against canned responses.
pub trait HttpClient {
    /// Perform an HTTP GET request and return the response body
    ///
    /// Implementations must treat any non-success status as an error;
    /// callers never retry.
    fn get(&self, url: &str) -> ExportResult<Vec<u8>>;
}

/// Blocking HTTP client backed by reqwest
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Create a client with the given per-request timeout
    ///
    /// The timeout bounds each individual network call; when it fires the
    /// call fails as a transport error and the export aborts.
    pub fn with_timeout(timeout_secs: u64) -> ExportResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExportError::Transport(format!(
                "Failed to create HTTP client: {}", e)))?;

        Ok(ReqwestClient { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> ExportResult<Vec<u8>> {
        let response = self.client.get(url).send()
            .map_err(|e| ExportError::Transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Transport(format!("HTTP {} from {}", status, url)));
        }

        response.bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ExportError::Transport(format!("Failed to read response body: {}", e)))
    }
}

/// Canned-response client for tests
#[cfg(test)]
pub struct MockHttpClient {
    /// (url substring, response body) pairs tried in order
    pub responses: Vec<(String, Vec<u8>)>,
}

#[cfg(test)]
impl HttpClient for MockHttpClient {
    fn get(&self, url: &str) -> ExportResult<Vec<u8>> {
        self.responses.iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| ExportError::Transport(format!("HTTP 404 from {}", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_client_matches_url_fragment() {
        let mock = MockHttpClient {
            responses: vec![("keyProperties".to_string(), vec![1, 2, 3])],
        };
        assert_eq!(mock.get("https://host/svc/keyProperties?f=pjson").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_mock_client_unmatched_is_transport_error() {
        let mock = MockHttpClient { responses: vec![] };
        let result = mock.get("https://host/other");
        assert!(matches!(result, Err(ExportError::Transport(_))));
    }
}
