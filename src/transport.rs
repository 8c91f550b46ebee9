use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::TransportError;

/// Status and raw body of one request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub status: u16,
    /// e.g. `200 OK`
    pub status_line: String,
    pub body: String,
}

impl RequestOutcome {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("");
        Self {
            status,
            status_line: format!("{} {}", status, reason).trim_end().to_string(),
            body: body.into(),
        }
    }
}

/// Seam between the prober and the network. Implementations must be safe to
/// call from many workers at once.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RequestOutcome, TransportError>;
}

/// GET over a shared reqwest client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<RequestOutcome, TransportError> {
        let parsed = Url::parse(url).map_err(|_| TransportError::InvalidUrl(url.to_string()))?;

        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = resp.status().as_u16();
        let body = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(url, error = %e, "body read failed, treating as empty");
                String::new()
            }
        };
        Ok(RequestOutcome::new(status, body))
    }
}
