use crate::traits::AiBackend;
use crate::types::{AiReply, ConversationKey};
use anyhow::{Result, anyhow};
use serde::Deserialize;

/// OpenAI-compatible chat completions client.
///
/// The conversation key is forwarded as the `user` field so the backend can
/// keep its own per-conversation state (history, persona) server-side.
#[derive(Clone)]
pub struct OpenAiChatBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    completion_tokens: u32,
}

impl OpenAiChatBackend {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(anyhow!("ai base url is required"));
        }
        if model.trim().is_empty() {
            return Err(anyhow!("ai model is required"));
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            api_key: api_key.trim().to_string(),
            model: model.trim().to_string(),
        })
    }
}

#[async_trait::async_trait]
impl AiBackend for OpenAiChatBackend {
    #[tracing::instrument(level = "info", skip_all, fields(key = %key))]
    async fn ask(&self, key: &ConversationKey, prompt: &str) -> Result<AiReply> {
        let payload = serde_json::json!({
            "model": self.model,
            "user": key.as_str(),
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });
        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(anyhow!("ai request failed: status={} body={}", status, body));
        }
        let completion: ChatCompletion = response.json().await?;
        let text = completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(anyhow!("ai backend returned an empty reply"));
        }
        let tokens = completion
            .usage
            .map(|u| u.completion_tokens)
            .unwrap_or_default();
        tracing::debug!(reply_len = text.len(), tokens, "ai reply received");
        Ok(AiReply { text, tokens })
    }
}
