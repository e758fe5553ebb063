//! # Google REST Client Module
//!
//! Thin authenticated client shared by the Sheets store and the Drive
//! upload adapter. Every call goes through a circuit breaker; only reads are
//! retried.

use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::circuit_breaker::CircuitBreaker;
use crate::config::{RecoveryConfig, TokenSource};
use crate::errors::GoogleError;
use crate::retry::with_retry;

/// Authenticated client for one Google service
pub struct GoogleClient {
    http: reqwest::Client,
    token: TokenSource,
    breaker: CircuitBreaker,
    recovery: RecoveryConfig,
}

impl GoogleClient {
    pub fn new(
        service: &'static str,
        token: TokenSource,
        recovery: RecoveryConfig,
    ) -> Result<Self, GoogleError> {
        let http = reqwest::Client::builder()
            .timeout(recovery.operation_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GoogleError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            token,
            breaker: CircuitBreaker::new(service, recovery.clone()),
            recovery,
        })
    }

    async fn bearer(&self) -> Result<String, GoogleError> {
        match &self.token {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::File(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| GoogleError::Auth(format!("{}: {e}", path.display())))?;
                let token = raw.trim();
                if token.is_empty() {
                    return Err(GoogleError::Auth(format!("{} is empty", path.display())));
                }
                Ok(token.to_string())
            }
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GoogleError> {
        if self.breaker.is_open() {
            return Err(GoogleError::CircuitOpen);
        }

        let token = self.bearer().await?;
        let response = match request.bearer_auth(token).send().await {
            Ok(response) => response,
            Err(e) => {
                self.breaker.record_failure();
                return Err(GoogleError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                self.breaker.record_failure();
            } else {
                self.breaker.record_success();
            }
            return Err(GoogleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        self.breaker.record_success();
        response
            .json::<T>()
            .await
            .map_err(|e| GoogleError::Decode(e.to_string()))
    }

    /// GET returning JSON, retried on transient failures
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, GoogleError> {
        with_retry(
            url.path(),
            &self.recovery,
            GoogleError::is_retryable,
            || self.execute(self.http.get(url.clone())),
        )
        .await
    }

    /// Send a JSON body. Never retried.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &serde_json::Value,
    ) -> Result<T, GoogleError> {
        self.execute(self.http.request(method, url).json(body)).await
    }

    /// Send raw bytes with the given content type. Never retried.
    pub async fn send_bytes<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<T, GoogleError> {
        self.execute(
            self.http
                .request(method, url)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(bytes),
        )
        .await
    }
}

/// Parse a constant base URL. Only called with literals.
pub(crate) fn base_url(raw: &str) -> Result<Url, GoogleError> {
    Url::parse(raw).map_err(|e| GoogleError::Transport(format!("invalid URL {raw}: {e}")))
}
