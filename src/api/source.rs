//! Backend abstraction for option lists - enables mocking for tests

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::errors::{FilterError, FilterResult};
use crate::filters::options::EntityOption;

use super::types::{AdItem, AdsDataResponse, AdsetItem, ItemsResponse};

pub const ADS_DATA_PATH: &str = "/api/ads-data";
pub const CAMPAIGN_ADSETS_PATH: &str = "/api/campaign-adsets";
pub const ADSET_ADS_PATH: &str = "/api/adset-ads";

/// Source of dependent option lists
#[async_trait]
pub trait OptionSource: Send + Sync {
    /// Every campaign known to the backend
    async fn fetch_campaigns(&self) -> FilterResult<Vec<EntityOption>>;

    /// Adsets belonging to `campaign_id`
    async fn fetch_adsets(&self, campaign_id: &str) -> FilterResult<Vec<EntityOption>>;

    /// Ads belonging to `adset_id`
    async fn fetch_ads(&self, adset_id: &str) -> FilterResult<Vec<EntityOption>>;
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// Reads option lists from the dashboard backend over HTTP
pub struct HttpOptionSource {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_base_delay_ms: u64,
}

impl HttpOptionSource {
    pub fn new(config: &ApiConfig) -> FilterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> FilterResult<T> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FilterError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// GET with exponential backoff on transport errors
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> FilterResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.get_once(&url, query).await {
                Ok(value) => {
                    debug!("GET {} {:?} ok", url, query);
                    return Ok(value);
                }
                Err(FilterError::Http(reason)) if attempts < self.max_retries => {
                    let delay = self
                        .retry_base_delay_ms
                        .saturating_mul(2u64.saturating_pow(attempts - 1));
                    warn!(
                        "GET {} failed (attempt {}/{}), retrying in {}ms: {}",
                        url, attempts, self.max_retries, delay, reason
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl OptionSource for HttpOptionSource {
    async fn fetch_campaigns(&self) -> FilterResult<Vec<EntityOption>> {
        let resp: AdsDataResponse = self.get_json(ADS_DATA_PATH, &[]).await?;
        if let Some(error) = resp.error {
            return Err(FilterError::Backend(error));
        }
        Ok(resp.campaigns.into_iter().map(EntityOption::from).collect())
    }

    async fn fetch_adsets(&self, campaign_id: &str) -> FilterResult<Vec<EntityOption>> {
        let resp: ItemsResponse<AdsetItem> = self
            .get_json(CAMPAIGN_ADSETS_PATH, &[("campaign_id", campaign_id)])
            .await?;
        if let Some(error) = resp.error {
            return Err(FilterError::Backend(error));
        }
        Ok(resp
            .items
            .into_iter()
            .map(|item| {
                let parent = item.campaign_id.unwrap_or_else(|| campaign_id.to_string());
                EntityOption::new(item.id, item.name.unwrap_or_default(), Some(parent))
            })
            .collect())
    }

    async fn fetch_ads(&self, adset_id: &str) -> FilterResult<Vec<EntityOption>> {
        let resp: ItemsResponse<AdItem> = self
            .get_json(ADSET_ADS_PATH, &[("adset_id", adset_id)])
            .await?;
        if let Some(error) = resp.error {
            return Err(FilterError::Backend(error));
        }
        Ok(resp
            .items
            .into_iter()
            .filter_map(|item| item.into_option(adset_id))
            .collect())
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// In-memory option source with failure injection and response gates.
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use tokio::sync::{Mutex, Notify};

    /// Mock backend for testing
    ///
    /// Request keys are `"campaigns"`, `"adsets:<campaign_id>"` and
    /// `"ads:<adset_id>"`. A gated key blocks until its `Notify` fires.
    #[derive(Default)]
    pub struct MockOptionSource {
        campaigns: Vec<EntityOption>,
        adsets: HashMap<String, Vec<EntityOption>>,
        ads: HashMap<String, Vec<EntityOption>>,
        failing: HashSet<String>,
        gates: HashMap<String, Arc<Notify>>,
        pub calls: Arc<Mutex<Vec<String>>>,
        pub should_fail: Arc<Mutex<bool>>,
    }

    impl MockOptionSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_campaign(mut self, id: &str, name: &str) -> Self {
            self.campaigns.push(EntityOption::new(id, name, None));
            self
        }

        pub fn with_adset(mut self, campaign_id: &str, id: &str, name: &str) -> Self {
            self.adsets
                .entry(campaign_id.to_string())
                .or_default()
                .push(EntityOption::new(id, name, Some(campaign_id.to_string())));
            self
        }

        pub fn with_ad(mut self, adset_id: &str, id: &str, name: &str) -> Self {
            self.ads
                .entry(adset_id.to_string())
                .or_default()
                .push(EntityOption::new(id, name, Some(adset_id.to_string())));
            self
        }

        /// Make requests for `key` fail
        pub fn failing(mut self, key: &str) -> Self {
            self.failing.insert(key.to_string());
            self
        }

        /// Hold responses for `key` until the returned `Notify` fires
        pub fn gate(&mut self, key: &str) -> Arc<Notify> {
            self.gates
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Notify::new()))
                .clone()
        }

        pub async fn set_should_fail(&self, fail: bool) {
            *self.should_fail.lock().await = fail;
        }

        pub async fn calls(&self) -> Vec<String> {
            self.calls.lock().await.clone()
        }

        async fn respond(&self, key: String, items: Option<&Vec<EntityOption>>) -> FilterResult<Vec<EntityOption>> {
            self.calls.lock().await.push(key.clone());
            if let Some(gate) = self.gates.get(&key) {
                gate.notified().await;
            }
            if *self.should_fail.lock().await || self.failing.contains(&key) {
                return Err(FilterError::Http(format!("Mock failure for {}", key)));
            }
            Ok(items.cloned().unwrap_or_default())
        }
    }

    #[async_trait]
    impl OptionSource for MockOptionSource {
        async fn fetch_campaigns(&self) -> FilterResult<Vec<EntityOption>> {
            self.respond("campaigns".to_string(), Some(&self.campaigns)).await
        }

        async fn fetch_adsets(&self, campaign_id: &str) -> FilterResult<Vec<EntityOption>> {
            self.respond(format!("adsets:{}", campaign_id), self.adsets.get(campaign_id))
                .await
        }

        async fn fetch_ads(&self, adset_id: &str) -> FilterResult<Vec<EntityOption>> {
            self.respond(format!("ads:{}", adset_id), self.ads.get(adset_id))
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn ads_data() -> Json<Value> {
        Json(json!({
            "extraction_date": "2024-05-01T00:00:00",
            "campaigns": [
                {"campaign_id": "c1", "campaign_name": "LS2 | Traffic", "spend": "10.5"},
                {"campaign_id": 2, "campaign_name": "Bulldog launch"}
            ]
        }))
    }

    async fn campaign_adsets(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        let campaign = q.get("campaign_id").cloned().unwrap_or_default();
        Json(json!({
            "items": [{"id": format!("{}-s1", campaign), "name": "Adset one", "campaign_id": campaign}]
        }))
    }

    async fn adset_ads(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        let adset = q.get("adset_id").cloned().unwrap_or_default();
        Json(json!({
            "items": [{"ad": {"id": format!("{}-a1", adset), "name": "Ad one"}}]
        }))
    }

    async fn broken() -> (StatusCode, &'static str) {
        (StatusCode::INTERNAL_SERVER_ERROR, "boom")
    }

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn source_for(base_url: String) -> HttpOptionSource {
        HttpOptionSource::new(&ApiConfig {
            base_url,
            timeout_secs: 5,
            max_retries: 1,
            retry_base_delay_ms: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_http_source_reads_all_endpoints() {
        let router = Router::new()
            .route(ADS_DATA_PATH, get(ads_data))
            .route(CAMPAIGN_ADSETS_PATH, get(campaign_adsets))
            .route(ADSET_ADS_PATH, get(adset_ads));
        let source = source_for(spawn_backend(router).await);

        let campaigns = source.fetch_campaigns().await.unwrap();
        assert_eq!(campaigns.len(), 2);
        assert_eq!(campaigns[1].id, "2");
        assert_eq!(campaigns[0].name, "LS2 | Traffic");

        let adsets = source.fetch_adsets("c1").await.unwrap();
        assert_eq!(adsets, vec![EntityOption::new("c1-s1", "Adset one", Some("c1".into()))]);

        let ads = source.fetch_ads("c1-s1").await.unwrap();
        assert_eq!(ads, vec![EntityOption::new("c1-s1-a1", "Ad one", Some("c1-s1".into()))]);
    }

    #[tokio::test]
    async fn test_http_source_reports_status_errors() {
        let router = Router::new().route(CAMPAIGN_ADSETS_PATH, get(broken));
        let source = source_for(spawn_backend(router).await);

        match source.fetch_adsets("c1").await {
            Err(FilterError::Status { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_source_reports_backend_error_body() {
        let router = Router::new().route(
            ADS_DATA_PATH,
            get(|| async { Json(json!({"error": "token expired"})) }),
        );
        let source = source_for(spawn_backend(router).await);

        assert!(matches!(
            source.fetch_campaigns().await,
            Err(FilterError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_http_source_skips_malformed_items() {
        let router = Router::new().route(
            CAMPAIGN_ADSETS_PATH,
            get(|| async {
                Json(json!({"items": [{"name": "no id"}, {"id": "s2", "name": "Kept"}, 17]}))
            }),
        );
        let source = source_for(spawn_backend(router).await);

        let adsets = source.fetch_adsets("c1").await.unwrap();
        assert_eq!(adsets, vec![EntityOption::new("s2", "Kept", Some("c1".into()))]);
    }

    #[tokio::test]
    async fn test_many_retries_against_closed_port_return_err() {
        let source = HttpOptionSource::new(&ApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
            max_retries: 70,
            retry_base_delay_ms: 0,
        })
        .unwrap();

        assert!(matches!(
            source.fetch_campaigns().await,
            Err(FilterError::Http(_))
        ));
    }
}
