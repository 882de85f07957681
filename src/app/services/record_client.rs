//! Remote record service client
//!
//! The pipeline only needs two things from the service: build a write request
//! for a subpath and body, then execute it. [`RecordClient`] is that seam;
//! [`HttpRecordClient`] implements it over a single shared `reqwest::Client`.

use async_trait::async_trait;
use reqwest::header::{CONNECTION, CONTENT_TYPE, HeaderValue};
use thiserror::Error;
use tracing::debug;

use crate::app::models::SubmissionResponse;
use crate::config::ServiceConfig;
use crate::{Error, Result};

/// Failure of an executed request that produced no response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            "timeout"
        } else if error.is_connect() {
            "connect"
        } else {
            "request"
        };
        Self::new(format!("{} error: {}", kind, error))
    }
}

/// Write access to the remote record service
///
/// Implementations are shared across all workers and must be safe for
/// concurrent use.
#[async_trait]
pub trait RecordClient: Send + Sync + 'static {
    /// Prepared request type
    type Request: Send;

    /// Build a write request for `subpath` carrying `body`
    ///
    /// Errors here mean the client is misconfigured and abort the pipeline.
    fn build_write_request(&self, subpath: &str, body: String) -> Result<Self::Request>;

    /// Execute a prepared request
    async fn execute(
        &self,
        request: Self::Request,
    ) -> std::result::Result<SubmissionResponse, TransportError>;
}

/// HTTP implementation of [`RecordClient`]
#[derive(Debug, Clone)]
pub struct HttpRecordClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    close_connections: bool,
}

impl HttpRecordClient {
    /// Build the client once for a whole run
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(concat!("city-ingest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            api_token: config.api_token.clone(),
            close_connections: config.close_connections,
        })
    }

    /// Full URL for `subpath`
    pub fn url_for(&self, subpath: &str) -> String {
        format!("{}/{}", self.base_url, subpath.trim_start_matches('/'))
    }
}

#[async_trait]
impl RecordClient for HttpRecordClient {
    type Request = reqwest::Request;

    fn build_write_request(&self, subpath: &str, body: String) -> Result<Self::Request> {
        let mut builder = self
            .http
            .post(self.url_for(subpath))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body);

        if self.close_connections {
            builder = builder.header(CONNECTION, HeaderValue::from_static("close"));
        }
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        builder
            .build()
            .map_err(|e| Error::request_build(subpath, e.to_string()))
    }

    async fn execute(
        &self,
        request: Self::Request,
    ) -> std::result::Result<SubmissionResponse, TransportError> {
        let response = self.http.execute(request).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(status, body_len = body.len(), "record service responded");
        Ok(SubmissionResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServiceConfig {
        ServiceConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            container: "iCloud.test.cities".to_string(),
            api_token: Some("token-123".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_url_for_joins_subpath() {
        let client = HttpRecordClient::new(&test_config()).unwrap();
        assert_eq!(
            client.url_for("/records/modify"),
            "http://127.0.0.1:9/database/1/iCloud.test.cities/development/public/records/modify"
        );
    }

    #[test]
    fn test_build_write_request_sets_headers() {
        let client = HttpRecordClient::new(&test_config()).unwrap();
        let request = client
            .build_write_request("records/modify", "{}".to_string())
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.headers()[CONNECTION], "close");
        assert_eq!(
            request.headers()[reqwest::header::AUTHORIZATION],
            "Bearer token-123"
        );
    }

    #[test]
    fn test_keep_alive_when_close_disabled() {
        let config = ServiceConfig {
            close_connections: false,
            api_token: None,
            ..test_config()
        };
        let client = HttpRecordClient::new(&config).unwrap();
        let request = client
            .build_write_request("records/modify", "{}".to_string())
            .unwrap();

        assert!(request.headers().get(CONNECTION).is_none());
        assert!(request.headers().get(reqwest::header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_invalid_url_fails_to_build() {
        let config = ServiceConfig {
            endpoint: "http://exa mple.com".to_string(),
            ..test_config()
        };
        let client = HttpRecordClient::new(&config).unwrap();
        let result = client.build_write_request("records/modify", "{}".to_string());

        assert!(matches!(result, Err(Error::RequestBuild { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let config = ServiceConfig {
            request_timeout_secs: 2,
            ..test_config()
        };
        let client = HttpRecordClient::new(&config).unwrap();
        let request = client
            .build_write_request("records/modify", "{}".to_string())
            .unwrap();

        assert!(client.execute(request).await.is_err());
    }
}
