//! Remote API transport.
//!
//! [`SyncTransport`] is the seam between the sync layer and the benefits API.
//! [`HttpTransport`] is the reqwest implementation; tests substitute a
//! scripted one.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::config::Config;
use crate::error::TransportError;

/// Delivers writes to and fetches reports from the remote API.
pub trait SyncTransport: Send + Sync + 'static {
    /// POST `body` to `endpoint`. Any 2xx is success.
    fn post(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// GET `path` and decode the JSON body.
    fn get(&self, path: &str) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

/// HTTP transport client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let transport = Self::new(&config.api_base_url, config.request_timeout)?;
        Ok(match &config.api_token {
            Some(token) => transport.with_bearer_token(token),
            None => transport,
        })
    }

    /// Set the bearer token for authenticated requests.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TransportError> {
        let request = match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_builder() {
            TransportError::Client(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl SyncTransport for HttpTransport {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<(), TransportError> {
        let url = self.url(endpoint);
        tracing::debug!(%url, "POST");
        self.send(self.client.post(&url).json(body)).await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let response = self.send(self.client.get(&url)).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let transport =
            HttpTransport::new("http://api.local/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.url("/solicitacoes"), "http://api.local/api/solicitacoes");
    }

    #[test]
    fn token_comes_from_config() {
        let mut config = Config::new("http://api.local");
        config.api_token = Some("secret".into());
        let transport = HttpTransport::from_config(&config).unwrap();
        assert_eq!(transport.bearer_token.as_deref(), Some("secret"));
    }
}
