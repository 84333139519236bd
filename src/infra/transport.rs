//! Outbound HTTP for the beacon.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use super::error::InfraError;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Status and body of whatever the collector sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait BeaconTransport: Send + Sync {
    /// Issue a single GET. Implementations must not retry.
    async fn get(&self, url: Url) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, InfraError> {
        let mut builder = Client::builder().user_agent(Self::user_agent());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn user_agent() -> &'static str {
        concat!("pageview-beacon/", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl BeaconTransport for HttpTransport {
    async fn get(&self, url: Url) -> Result<TransportResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;

    use super::*;

    #[tokio::test]
    async fn get_returns_status_and_body() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET").path("/tracking").query_param("site", "blog");
            then.status(202).body("cb({})");
        });

        let transport = HttpTransport::new(None)?;
        let url = Url::parse(&server.url("/tracking?site=blog"))?;
        let response = transport.get(url).await?;

        assert_eq!(response.status, 202);
        assert_eq!(response.body, "cb({})");
        assert!(response.is_success());
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let transport = HttpTransport::new(Some(Duration::from_secs(2)))?;
        // Port 9 on localhost is reserved for discard and normally closed.
        let url = Url::parse("http://127.0.0.1:9/tracking")?;
        let err = transport.get(url).await.expect_err("connection should fail");
        assert!(matches!(err, TransportError::Http(_)));
        Ok(())
    }

    #[test]
    fn non_2xx_is_not_success() {
        let response = TransportResponse {
            status: 503,
            body: String::new(),
        };
        assert!(!response.is_success());
    }
}
