use crate::types::{AiReply, ConversationKey, MediaAsset, MediaKind, ShippingQuote};
use anyhow::Result;
use async_trait::async_trait;

/// AI chat backend. Used for the main conversational turn and for
/// re-phrasing structured payloads detected mid-pipeline.
#[async_trait]
pub trait AiBackend: Send + Sync {
    async fn ask(&self, key: &ConversationKey, prompt: &str) -> Result<AiReply>;
}

/// Helpdesk/CRM mirror of the conversation (labels, assignment, notes).
#[async_trait]
pub trait Helpdesk: Send + Sync {
    async fn labels(&self, key: &ConversationKey) -> Result<Vec<String>>;

    async fn set_labels(&self, key: &ConversationKey, labels: &[String]) -> Result<()>;

    async fn assign_agent(&self, key: &ConversationKey, agent_id: u32) -> Result<()>;

    async fn set_priority(&self, key: &ConversationKey, priority: &str) -> Result<()>;

    async fn attributes(&self, key: &ConversationKey) -> Result<serde_json::Value>;

    async fn set_attribute(
        &self,
        key: &ConversationKey,
        name: &str,
        value: serde_json::Value,
    ) -> Result<()>;

    /// Mirror outbound bot text into the helpdesk conversation.
    async fn send_note(&self, key: &ConversationKey, text: &str) -> Result<()>;

    /// Mirror a delivered media asset into the helpdesk conversation.
    async fn send_media(&self, key: &ConversationKey, url: &str, kind: MediaKind) -> Result<()>;
}

/// Media asset lookup by tag name within a namespace.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn find_asset(&self, namespace: &str, tag: &str) -> Result<Option<MediaAsset>>;
}

/// Spreadsheet/headless-CMS record backend.
#[async_trait]
pub trait SheetBackend: Send + Sync {
    async fn create(&self, record: &serde_json::Value) -> Result<()>;

    async fn query(&self, filter: &serde_json::Value) -> Result<Vec<serde_json::Value>>;

    async fn update(&self, filter: &serde_json::Value, data: &serde_json::Value) -> Result<()>;
}

/// Follow-up scheduler; the only operation this core needs is removal.
#[async_trait]
pub trait FollowUpScheduler: Send + Sync {
    async fn cancel(&self, key: &ConversationKey) -> Result<()>;
}

/// E-commerce product and shipping lookups.
#[async_trait]
pub trait Storefront: Send + Sync {
    async fn search_products(&self, filter: &serde_json::Value) -> Result<Vec<serde_json::Value>>;

    async fn quote_shipping(&self, payload: &serde_json::Value) -> Result<Vec<ShippingQuote>>;
}

/// Booking/scheduling availability lookups.
#[async_trait]
pub trait BookingCalendar: Send + Sync {
    async fn check_availability(&self, request: &serde_json::Value) -> Result<serde_json::Value>;
}

/// Outbound messaging transport towards the end user.
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    async fn send_text(&self, key: &ConversationKey, text: &str) -> Result<()>;

    async fn send_media(
        &self,
        key: &ConversationKey,
        kind: MediaKind,
        url: &str,
        caption: Option<&str>,
    ) -> Result<()>;
}
