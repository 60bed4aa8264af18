//! tonapi-client: thin async wrapper over the TonAPI REST endpoints
//!
//! Covers the two calls the locker needs: jetton metadata lookup and
//! get-method execution against an account. Account ids are always sent in
//! raw `wc:hex` form.

pub mod stack;
pub mod types;

use std::time::Duration;

use pizzabox_core::{ApiConfig, ApiError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use ton_cell::TonAddress;

pub use stack::{parse_num, StackError, StackReader};
pub use types::{JettonInfo, JettonMetadata, MethodExecutionResult, TvmStackRecord};

/// Result type for TonAPI operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// TonAPI HTTP client
#[derive(Debug, Clone)]
pub struct TonApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl TonApiClient {
    /// Build a client, attaching the bearer token when one is configured
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| ApiError::ClientBuild(format!("invalid API key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Wrap an existing `reqwest::Client` (custom TLS, proxies, ...)
    pub fn with_http_client(http: reqwest::Client, config: ApiConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Jetton master info, including indexed metadata
    pub async fn get_jetton_info(&self, jetton: &TonAddress) -> Result<JettonInfo> {
        let url = format!(
            "{}/v2/jettons/{}",
            self.config.trimmed_base_url(),
            jetton.to_raw()
        );
        self.get_json(&url).await
    }

    /// Run a get-method without arguments and return its stack.
    ///
    /// Exit codes 0 and 1 both mean success on TVM.
    pub async fn exec_get_method(
        &self,
        account: &TonAddress,
        method: &str,
    ) -> Result<MethodExecutionResult> {
        let url = format!(
            "{}/v2/blockchain/accounts/{}/methods/{}",
            self.config.trimmed_base_url(),
            account.to_raw(),
            method
        );
        let result: MethodExecutionResult = self.get_json(&url).await?;

        if !result.success || !matches!(result.exit_code, 0 | 1) {
            tracing::warn!(
                account = %account,
                method,
                exit_code = result.exit_code,
                "Get-method execution failed"
            );
            return Err(ApiError::ExitCode {
                method: method.to_string(),
                exit_code: result.exit_code,
            });
        }

        tracing::debug!(
            account = %account,
            method,
            stack_len = result.stack.len(),
            "Get-method executed"
        );
        Ok(result)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!(url, "TonAPI request");

        let response = self
            .timed_request(url, self.http.get(url).send())
            .await?
            .map_err(|e| ApiError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = self
            .timed_request(url, response.text())
            .await?
            .map_err(|e| ApiError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "TonAPI returned an error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::Parse(format!("Failed to parse response from {}: {}", url, e)))
    }

    /// Apply the configured timeout, if any
    async fn timed_request<T>(
        &self,
        url: &str,
        fut: impl std::future::Future<Output = T>,
    ) -> Result<T> {
        match self.config.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), fut)
                .await
                .map_err(|_| ApiError::Transport {
                    url: url.to_string(),
                    message: format!("request timed out after {}s", secs),
                }),
            None => Ok(fut.await),
        }
    }
}

impl Default for TonApiClient {
    fn default() -> Self {
        Self::with_http_client(reqwest::Client::new(), ApiConfig::default())
    }
}
