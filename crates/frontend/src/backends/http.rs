//! Shared JSON-over-HTTP plumbing for the backend clients.

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use super::UpstreamError;

/// Longest upstream body kept in an error or log line.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Errors building the backend clients at startup.
#[derive(Debug, Error)]
pub enum BackendInitError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid {backend} address '{addr}': {reason}")]
    Address {
        backend: &'static str,
        addr: String,
        reason: String,
    },
}

/// One backend's base URL plus the shared connection pool.
///
/// Every backend exposes its API under `http://{addr}/api/`.
#[derive(Debug, Clone)]
pub struct BackendClient {
    name: &'static str,
    client: reqwest::Client,
    base: Url,
}

impl BackendClient {
    /// Create a client for the backend at `addr` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns `BackendInitError::Address` if `addr` does not form a valid base URL.
    pub fn new(
        name: &'static str,
        client: reqwest::Client,
        addr: &str,
    ) -> Result<Self, BackendInitError> {
        let invalid = |reason: String| BackendInitError::Address {
            backend: name,
            addr: addr.to_string(),
            reason,
        };

        if addr.trim().is_empty() {
            return Err(invalid("empty address".to_string()));
        }
        let base = Url::parse(&format!("http://{addr}/api/")).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(invalid("not a host:port".to_string()));
        }

        Ok(Self { name, client, base })
    }

    /// Backend name used in errors and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// URL of an API path; each segment is percent-encoded.
    #[must_use]
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Start a request to an API path.
    pub fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.client.request(method, self.url(segments))
    }

    /// Send a request, mapping only transport failures.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::Transport` if the request could not complete.
    pub async fn send_raw(&self, request: RequestBuilder) -> Result<Response, UpstreamError> {
        request.send().await.map_err(|source| UpstreamError::Transport {
            backend: self.name,
            source,
        })
    }

    /// Send a request and require a success status.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::Transport` or `UpstreamError::Status`.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, UpstreamError> {
        let response = self.send_raw(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Body is diagnostic only; a read failure leaves it empty.
        let body = truncate(&response.text().await.unwrap_or_default());
        tracing::warn!(
            backend = self.name,
            status = %status,
            body = %body,
            "Backend returned non-success status"
        );
        Err(UpstreamError::Status {
            backend: self.name,
            status: status.as_u16(),
            body,
        })
    }

    /// Read a response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::Transport` if the body cannot be read, or
    /// `UpstreamError::Decode` if it is not the expected JSON.
    pub async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, UpstreamError> {
        // Read text first for better error diagnostics
        let text = response.text().await.map_err(|source| UpstreamError::Transport {
            backend: self.name,
            source,
        })?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                backend = self.name,
                error = %e,
                body = %truncate(&text),
                "Failed to parse backend response"
            );
            UpstreamError::Decode {
                backend: self.name,
                message: e.to_string(),
            }
        })
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the body is not the expected JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, UpstreamError> {
        let response = self
            .send(self.request(Method::GET, segments).query(query))
            .await?;
        self.read_json(response).await
    }

    /// Send a JSON body and decode a JSON answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the body is not the expected JSON.
    pub async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T, UpstreamError> {
        let response = self
            .send(self.request(method, segments).json(body))
            .await?;
        self.read_json(response).await
    }

    /// Send a JSON body and ignore the answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn send_json_unit<B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<(), UpstreamError> {
        self.send(self.request(method, segments).json(body)).await?;
        Ok(())
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(addr: &str) -> Result<BackendClient, BackendInitError> {
        BackendClient::new("cart", reqwest::Client::new(), addr)
    }

    #[test]
    fn test_url_joins_segments_under_api() {
        let c = client("cartservice:7070").unwrap();
        assert_eq!(
            c.url(&["cart", "alice", "items"]).as_str(),
            "http://cartservice:7070/api/cart/alice/items"
        );
        assert_eq!(c.url(&["products"]).as_str(), "http://cartservice:7070/api/products");
    }

    #[test]
    fn test_url_escapes_segments() {
        let c = client("cartservice:7070").unwrap();
        assert_eq!(
            c.url(&["cart", "a b/c"]).as_str(),
            "http://cartservice:7070/api/cart/a%20b%2Fc"
        );
    }

    #[test]
    fn test_invalid_address_rejected() {
        assert!(matches!(
            client("bad host:1"),
            Err(BackendInitError::Address { backend: "cart", .. })
        ));
        assert!(client("").is_err());
    }

    #[test]
    fn test_truncate_error_body() {
        let long = "x".repeat(500);
        assert_eq!(truncate(&long).len(), MAX_ERROR_BODY_CHARS);
        assert_eq!(truncate("short"), "short");
    }
}
