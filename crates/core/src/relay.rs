//! Mail Relay client.
//!
//! The controller talks to the relay through [`MailRelayClient`] so that tests and
//! alternative transports can stand in for the HTTP endpoint.

use crate::RelayError;
use api_shared::{MessageRes, SendPdfReq};
use async_trait::async_trait;

/// One call per submission; the implementation never retries.
#[async_trait]
pub trait MailRelayClient: Send + Sync {
    /// Delivers the submission.
    ///
    /// # Errors
    ///
    /// `RelayError::Rejected` carries the status and response body of any non-2xx
    /// answer; `RelayError::Transport` covers requests that never got one.
    async fn send(&self, req: &SendPdfReq) -> Result<MessageRes, RelayError>;
}

/// Posts submissions to the Mail Relay endpoint as JSON.
#[derive(Debug, Clone)]
pub struct HttpRelayClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRelayClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MailRelayClient for HttpRelayClient {
    async fn send(&self, req: &SendPdfReq) -> Result<MessageRes, RelayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(req)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "mail relay rejected submission");
            return Err(RelayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        // A 2xx with an unexpected body still counts as delivered.
        Ok(serde_json::from_str(&body).unwrap_or_else(|_| MessageRes::new(body)))
    }
}
