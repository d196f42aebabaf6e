//! Thin JSON-over-HTTP clients for the remaining collaborators.
//!
//! Each speaks a small fixed contract against a configurable base URL; the
//! upstream services own their wire formats, these adapters only move JSON.

use crate::traits::{BookingCalendar, FollowUpScheduler, MediaStore, SheetBackend, Storefront};
use crate::types::{ConversationKey, MediaAsset, ShippingQuote};
use anyhow::{Result, anyhow};
use serde::Deserialize;

fn service_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| anyhow!("build http client: {e}"))
}

fn require_base_url(base_url: &str, what: &str) -> Result<String> {
    let base_url = base_url.trim().trim_end_matches('/');
    if base_url.is_empty() {
        return Err(anyhow!("{what} base url is required"));
    }
    Ok(base_url.to_string())
}

async fn expect_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("{what} request failed: status={status} body={body}"));
    }
    Ok(response)
}

#[derive(Clone)]
pub struct HttpMediaStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpMediaStore {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: service_client()?,
            base_url: require_base_url(base_url, "media store")?,
        })
    }
}

#[async_trait::async_trait]
impl MediaStore for HttpMediaStore {
    async fn find_asset(&self, namespace: &str, tag: &str) -> Result<Option<MediaAsset>> {
        let response = self
            .http
            .get(format!("{}/assets/{namespace}/{tag}", self.base_url))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_success(response, "media store").await?;
        let asset: MediaAsset = response.json().await?;
        Ok(Some(asset))
    }
}

#[derive(Clone)]
pub struct HttpSheetBackend {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SheetRows {
    #[serde(default)]
    rows: Vec<serde_json::Value>,
}

impl HttpSheetBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: service_client()?,
            base_url: require_base_url(base_url, "sheet backend")?,
        })
    }
}

#[async_trait::async_trait]
impl SheetBackend for HttpSheetBackend {
    async fn create(&self, record: &serde_json::Value) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/rows", self.base_url))
            .json(record)
            .send()
            .await?;
        expect_success(response, "sheet backend").await?;
        Ok(())
    }

    async fn query(&self, filter: &serde_json::Value) -> Result<Vec<serde_json::Value>> {
        let response = self
            .http
            .post(format!("{}/rows/search", self.base_url))
            .json(filter)
            .send()
            .await?;
        let response = expect_success(response, "sheet backend").await?;
        let rows: SheetRows = response.json().await?;
        Ok(rows.rows)
    }

    async fn update(&self, filter: &serde_json::Value, data: &serde_json::Value) -> Result<()> {
        let response = self
            .http
            .patch(format!("{}/rows", self.base_url))
            .json(&serde_json::json!({ "filter": filter, "data": data }))
            .send()
            .await?;
        expect_success(response, "sheet backend").await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct HttpScheduler {
    http: reqwest::Client,
    base_url: String,
}

impl HttpScheduler {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: service_client()?,
            base_url: require_base_url(base_url, "scheduler")?,
        })
    }
}

#[async_trait::async_trait]
impl FollowUpScheduler for HttpScheduler {
    async fn cancel(&self, key: &ConversationKey) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/followups/{}", self.base_url, key.as_str()))
            .send()
            .await?;
        // Cancelling an unknown follow-up is a no-op, not an error.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        expect_success(response, "scheduler").await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct HttpStorefront {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ProductPage {
    #[serde(default)]
    products: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ShippingOptions {
    #[serde(default)]
    options: Vec<ShippingQuote>,
}

impl HttpStorefront {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: service_client()?,
            base_url: require_base_url(base_url, "storefront")?,
        })
    }
}

#[async_trait::async_trait]
impl Storefront for HttpStorefront {
    async fn search_products(&self, filter: &serde_json::Value) -> Result<Vec<serde_json::Value>> {
        let response = self
            .http
            .post(format!("{}/products/search", self.base_url))
            .json(filter)
            .send()
            .await?;
        let response = expect_success(response, "storefront").await?;
        let page: ProductPage = response.json().await?;
        Ok(page.products)
    }

    async fn quote_shipping(&self, payload: &serde_json::Value) -> Result<Vec<ShippingQuote>> {
        let response = self
            .http
            .post(format!("{}/shipping/simulate", self.base_url))
            .json(payload)
            .send()
            .await?;
        let response = expect_success(response, "storefront").await?;
        let options: ShippingOptions = response.json().await?;
        Ok(options.options)
    }
}

#[derive(Clone)]
pub struct HttpBookingCalendar {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBookingCalendar {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: service_client()?,
            base_url: require_base_url(base_url, "booking calendar")?,
        })
    }
}

#[async_trait::async_trait]
impl BookingCalendar for HttpBookingCalendar {
    async fn check_availability(&self, request: &serde_json::Value) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(format!("{}/availability", self.base_url))
            .json(request)
            .send()
            .await?;
        let response = expect_success(response, "booking calendar").await?;
        Ok(response.json().await?)
    }
}
