use crate::traits::Helpdesk;
use crate::types::{ConversationKey, MediaKind};
use anyhow::{Result, anyhow};
use reqwest::Url;
use serde::Deserialize;

/// Chatwoot REST adapter. The conversation key doubles as the Chatwoot
/// conversation identifier; the webhook layer that feeds this bot registers
/// conversations under the normalized user id.
#[derive(Clone)]
pub struct ChatwootHelpdesk {
    http: reqwest::Client,
    base_url: String,
    account_id: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct LabelsPayload {
    #[serde(default)]
    payload: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationPayload {
    #[serde(default)]
    custom_attributes: serde_json::Value,
}

impl ChatwootHelpdesk {
    pub fn new(base_url: &str, account_id: &str, token: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(anyhow!("chatwoot base url is required"));
        }
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(anyhow!("chatwoot account id is required"));
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(anyhow!("chatwoot api token is required"));
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            account_id: account_id.to_string(),
            token: token.to_string(),
        })
    }

    fn conversation_url(&self, key: &ConversationKey, suffix: &str) -> Result<Url> {
        Url::parse(&format!(
            "{}/api/v1/accounts/{}/conversations/{}{}",
            self.base_url,
            self.account_id,
            key.as_str(),
            suffix
        ))
        .map_err(|e| anyhow!("invalid chatwoot URL: {e}"))
    }

    async fn post_json(&self, url: Url, payload: serde_json::Value) -> Result<()> {
        let response = self
            .http
            .post(url)
            .header("api_access_token", &self.token)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(anyhow!(
                "chatwoot request failed: status={} body={}",
                status,
                body
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Helpdesk for ChatwootHelpdesk {
    async fn labels(&self, key: &ConversationKey) -> Result<Vec<String>> {
        let url = self.conversation_url(key, "/labels")?;
        let response = self
            .http
            .get(url)
            .header("api_access_token", &self.token)
            .send()
            .await?
            .error_for_status()?;
        let labels: LabelsPayload = response.json().await?;
        Ok(labels.payload)
    }

    async fn set_labels(&self, key: &ConversationKey, labels: &[String]) -> Result<()> {
        let url = self.conversation_url(key, "/labels")?;
        self.post_json(url, serde_json::json!({ "labels": labels }))
            .await
    }

    async fn assign_agent(&self, key: &ConversationKey, agent_id: u32) -> Result<()> {
        let url = self.conversation_url(key, "/assignments")?;
        self.post_json(url, serde_json::json!({ "assignee_id": agent_id }))
            .await
    }

    async fn set_priority(&self, key: &ConversationKey, priority: &str) -> Result<()> {
        let url = self.conversation_url(key, "/toggle_priority")?;
        self.post_json(url, serde_json::json!({ "priority": priority }))
            .await
    }

    async fn attributes(&self, key: &ConversationKey) -> Result<serde_json::Value> {
        let url = self.conversation_url(key, "")?;
        let response = self
            .http
            .get(url)
            .header("api_access_token", &self.token)
            .send()
            .await?
            .error_for_status()?;
        let conversation: ConversationPayload = response.json().await?;
        Ok(conversation.custom_attributes)
    }

    async fn set_attribute(
        &self,
        key: &ConversationKey,
        name: &str,
        value: serde_json::Value,
    ) -> Result<()> {
        let url = self.conversation_url(key, "/custom_attributes")?;
        let mut attributes = serde_json::Map::new();
        attributes.insert(name.to_string(), value);
        self.post_json(
            url,
            serde_json::json!({ "custom_attributes": attributes }),
        )
        .await
    }

    async fn send_note(&self, key: &ConversationKey, text: &str) -> Result<()> {
        let url = self.conversation_url(key, "/messages")?;
        self.post_json(
            url,
            serde_json::json!({
                "content": text,
                "message_type": "outgoing",
                "private": false,
            }),
        )
        .await
    }

    async fn send_media(&self, key: &ConversationKey, url: &str, kind: MediaKind) -> Result<()> {
        let endpoint = self.conversation_url(key, "/messages")?;
        self.post_json(
            endpoint,
            serde_json::json!({
                "content": url,
                "message_type": "outgoing",
                "private": false,
                "content_attributes": { "media_kind": kind.as_str() },
            }),
        )
        .await
    }
}
