//! 1inch swap API client

use super::{Quote, SwapAggregator, SwapRequest, SwapTransaction};
use crate::config::AggregatorConfig;
use crate::error::{CompounderError, CompounderResult};

use async_trait::async_trait;
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client as HTTPClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize)]
struct SwapResponse {
    tx: SwapTransaction,
}

#[derive(Clone)]
pub struct OneInchClient {
    /// `{base_url}/{chain_id}`
    endpoint: String,
    client: HTTPClient,
}

impl OneInchClient {
    pub fn new(configuration: &AggregatorConfig, chain_id: u64) -> CompounderResult<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", configuration.api_key.trim()))
            .map_err(|_| {
                CompounderError::Config(
                    "aggregator.api_key is not a valid header value".to_string(),
                )
            })?;
        headers.insert(AUTHORIZATION, bearer);

        let client = HTTPClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(configuration.request_timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: format!("{}/{}", configuration.base_url.trim_end_matches('/'), chain_id),
            client,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> CompounderResult<T> {
        let url = format!("{}/{}", self.endpoint, path);
        debug!("GET {} {:?}", url, params);

        let response = self.client.get(&url).query(params).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(CompounderError::Aggregator(format!(
                "request error url={} status={}, body={}",
                url, status, text
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            CompounderError::Aggregator(format!(
                "unexpected response from {}: {} ({})",
                url, e, text
            ))
        })
    }
}

#[async_trait]
impl SwapAggregator for OneInchClient {
    async fn quote(&self, src: Address, dst: Address, amount: U256) -> CompounderResult<Quote> {
        let params = [
            ("src", to_checksum(&src, None)),
            ("dst", to_checksum(&dst, None)),
            ("amount", amount.to_string()),
        ];

        self.get("quote", &params).await
    }

    async fn swap(&self, request: &SwapRequest) -> CompounderResult<SwapTransaction> {
        let from = to_checksum(&request.from, None);
        let params = [
            ("src", to_checksum(&request.src, None)),
            ("dst", to_checksum(&request.dst, None)),
            ("amount", request.amount.to_string()),
            ("from", from.clone()),
            ("origin", from),
            ("slippage", request.slippage_percent.to_string()),
        ];

        let response: SwapResponse = self.get("swap", &params).await?;
        Ok(response.tx)
    }
}
