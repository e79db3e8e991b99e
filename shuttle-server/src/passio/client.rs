//! PassioGO HTTP client.
//!
//! Provides async methods for the three `mapGetData.php` queries the planner
//! needs. Handles request limiting and conversion to domain types.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{Route, Stop, SystemId, TransitSystem, Vehicle};

use super::LiveProvider;
use super::convert::{convert_routes, convert_stops, convert_systems, convert_vehicles};
use super::error::ProviderError;
use super::types::{BusesResponse, RoutesResponse, StopsResponse, SystemsResponse};

/// Default base URL for the PassioGO API.
const DEFAULT_BASE_URL: &str = "https://passiogo.com";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Configuration for the PassioGO client.
#[derive(Debug, Clone)]
pub struct PassioConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl PassioConfig {
    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for PassioConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 10,
        }
    }
}

/// PassioGO API client.
///
/// Uses a semaphore to limit concurrent requests to the upstream.
#[derive(Debug, Clone)]
pub struct PassioClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl PassioClient {
    /// Create a new client with the given configuration.
    pub fn new(config: PassioConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// POST a query to `mapGetData.php` and decode the response.
    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        body: serde_json::Value,
    ) -> Result<T, ProviderError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ProviderError::Unavailable("semaphore closed".to_string()))?;

        let url = format!("{}/mapGetData.php?{}", self.base_url, query);
        debug!(url = %url, "querying live provider");

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
    }
}

impl LiveProvider for PassioClient {
    async fn list_systems(&self) -> Result<Vec<TransitSystem>, ProviderError> {
        let response: SystemsResponse = self
            .query("getSystems=2&sortMode=1&credentials=1", json!({}))
            .await?;
        Ok(convert_systems(response))
    }

    async fn list_stops(&self, system: SystemId) -> Result<Vec<Stop>, ProviderError> {
        let response: StopsResponse = self
            .query(
                "getStops=2",
                json!({"s0": system.to_string(), "sA": 1}),
            )
            .await?;
        Ok(convert_stops(&response))
    }

    async fn list_routes(&self, system: SystemId) -> Result<Vec<Route>, ProviderError> {
        let response: RoutesResponse = self
            .query(
                "getRoutes=1",
                json!({"systemSelected0": system.to_string(), "amount": 1}),
            )
            .await?;
        Ok(convert_routes(response.into_routes()))
    }

    async fn list_vehicles(&self, system: SystemId) -> Result<Vec<Vehicle>, ProviderError> {
        let response: BusesResponse = self
            .query(
                "getBuses=2",
                json!({"s0": system.to_string(), "sA": 1}),
            )
            .await?;
        Ok(convert_vehicles(&response))
    }
}
