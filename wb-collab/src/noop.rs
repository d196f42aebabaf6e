//! Stand-ins for optional collaborators that were not configured.
//!
//! Every call fails with a clear error; the pipeline's per-stage guard
//! turns that into a logged no-op, so a tag for an unconfigured service is
//! still stripped and never breaks delivery.

use crate::traits::{BookingCalendar, FollowUpScheduler, MediaStore, SheetBackend, Storefront};
use crate::types::{ConversationKey, MediaAsset, ShippingQuote};
use anyhow::{Result, anyhow};

#[derive(Clone)]
pub struct Unconfigured {
    service: &'static str,
}

impl Unconfigured {
    pub fn new(service: &'static str) -> Self {
        Self { service }
    }

    fn err(&self) -> anyhow::Error {
        anyhow!("{} is not configured", self.service)
    }
}

#[async_trait::async_trait]
impl MediaStore for Unconfigured {
    async fn find_asset(&self, _namespace: &str, _tag: &str) -> Result<Option<MediaAsset>> {
        Err(self.err())
    }
}

#[async_trait::async_trait]
impl SheetBackend for Unconfigured {
    async fn create(&self, _record: &serde_json::Value) -> Result<()> {
        Err(self.err())
    }

    async fn query(&self, _filter: &serde_json::Value) -> Result<Vec<serde_json::Value>> {
        Err(self.err())
    }

    async fn update(&self, _filter: &serde_json::Value, _data: &serde_json::Value) -> Result<()> {
        Err(self.err())
    }
}

#[async_trait::async_trait]
impl FollowUpScheduler for Unconfigured {
    async fn cancel(&self, _key: &ConversationKey) -> Result<()> {
        Err(self.err())
    }
}

#[async_trait::async_trait]
impl Storefront for Unconfigured {
    async fn search_products(&self, _filter: &serde_json::Value) -> Result<Vec<serde_json::Value>> {
        Err(self.err())
    }

    async fn quote_shipping(&self, _payload: &serde_json::Value) -> Result<Vec<ShippingQuote>> {
        Err(self.err())
    }
}

#[async_trait::async_trait]
impl BookingCalendar for Unconfigured {
    async fn check_availability(&self, _request: &serde_json::Value) -> Result<serde_json::Value> {
        Err(self.err())
    }
}
