//! 0x Gasless API Client
//!
//! HTTP client for the 0x gasless swap API. Covers the four endpoints
//! of the relay flow: indicative price, firm quote, submission, and
//! status lookup. Requests are sent exactly once; in particular a
//! rejected submission is never replayed, since the relay may have
//! accepted the first attempt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use crate::ports::models::{
    PriceParams, PriceResponse, QuoteResponse, StatusResponse, SubmitRequest, SubmitResponse,
};
use crate::ports::swap_api::{SwapApiError, SwapApiPort};

/// 0x API client configuration
#[derive(Debug, Clone)]
pub struct ZeroExConfig {
    /// Base URL for the 0x API
    pub api_base_url: String,
    /// API key, sent as the `0x-api-key` header on every request
    pub api_key: Option<String>,
    /// API version, sent as the `0x-version` header on every request
    pub api_version: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for ZeroExConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.0x.org".to_string(),
            api_key: None,
            api_version: "v2".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// 0x gasless swap client
#[derive(Debug, Clone)]
pub struct ZeroExClient {
    config: ZeroExConfig,
    http: Client,
}

impl ZeroExClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self, SwapApiError> {
        Self::with_config(ZeroExConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ZeroExConfig) -> Result<Self, SwapApiError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SwapApiError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// Create a new client with an API key
    pub fn with_api_key(api_key: String) -> Result<Self, SwapApiError> {
        let mut config = ZeroExConfig::default();
        config.api_key = Some(api_key);
        Self::with_config(config)
    }

    /// Get the configured API base URL
    pub fn api_base_url(&self) -> &str {
        &self.config.api_base_url
    }

    /// Attach the authentication headers every endpoint requires.
    fn authenticate(&self, request: RequestBuilder) -> Result<RequestBuilder, SwapApiError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(SwapApiError::MissingApiKey)?;

        Ok(request
            .header("0x-api-key", api_key)
            .header("0x-version", &self.config.api_version))
    }

    /// Check the status line and deserialize the body.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, SwapApiError> {
        let status = response.status();

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SwapApiError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SwapApiError::Parse(format!("failed to parse response: {}", e)))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, SwapApiError> {
        let url = format!("{}{}", self.config.api_base_url, path);
        let request = self.authenticate(self.http.get(&url).query(query))?;

        let response = request
            .send()
            .await
            .map_err(|e| SwapApiError::Transport(e.to_string()))?;

        self.handle_response(response).await
    }
}

#[async_trait]
impl SwapApiPort for ZeroExClient {
    async fn price(&self, params: &PriceParams) -> Result<PriceResponse, SwapApiError> {
        self.get_json("/gasless/price", &params.to_query()).await
    }

    async fn quote(&self, params: &PriceParams) -> Result<QuoteResponse, SwapApiError> {
        self.get_json("/gasless/quote", &params.to_query()).await
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, SwapApiError> {
        let url = format!("{}/gasless/submit", self.config.api_base_url);
        let http_request = self.authenticate(self.http.post(&url).json(request))?;

        let response = http_request
            .send()
            .await
            .map_err(|e| SwapApiError::Transport(e.to_string()))?;

        self.handle_response(response).await
    }

    async fn status(
        &self,
        trade_hash: &str,
        chain_id: u64,
    ) -> Result<StatusResponse, SwapApiError> {
        let path = format!("/gasless/status/{}", trade_hash);
        let query = vec![("chainId".to_string(), chain_id.to_string())];
        self.get_json(&path, &query).await
    }
}
