use crate::traits::MessagingTransport;
use crate::types::{ConversationKey, MediaKind};
use anyhow::{Result, anyhow};
use reqwest::Url;

#[derive(Clone)]
pub struct WhatsAppCloudTransport {
    http: reqwest::Client,
    access_token: String,
    phone_number_id: String,
}

impl WhatsAppCloudTransport {
    pub fn new(access_token: &str, phone_number_id: &str) -> Result<Self> {
        let access_token = access_token.trim();
        if access_token.is_empty() {
            return Err(anyhow!("whatsapp access token is required"));
        }
        let phone_number_id = phone_number_id.trim();
        if phone_number_id.is_empty() {
            return Err(anyhow!("whatsapp phone number id is required"));
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            access_token: access_token.to_string(),
            phone_number_id: phone_number_id.to_string(),
        })
    }

    fn messages_url(&self) -> Result<Url> {
        Url::parse(&format!(
            "https://graph.facebook.com/v20.0/{}/messages",
            self.phone_number_id
        ))
        .map_err(|e| anyhow!("invalid whatsapp graph API URL: {e}"))
    }

    async fn post_message(&self, payload: serde_json::Value) -> Result<()> {
        let url = self.messages_url()?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(anyhow!(
                "whatsapp send failed: status={} body={}",
                status,
                body
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MessagingTransport for WhatsAppCloudTransport {
    async fn send_text(&self, key: &ConversationKey, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("message content is empty"));
        }
        self.post_message(serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": key.as_str(),
            "type": "text",
            "text": {
                "preview_url": false,
                "body": text,
            }
        }))
        .await
    }

    async fn send_media(
        &self,
        key: &ConversationKey,
        kind: MediaKind,
        url: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        let url = url.trim();
        if url.is_empty() {
            return Err(anyhow!("media url is empty"));
        }
        let mut media = serde_json::json!({ "link": url });
        if let Some(caption) = caption {
            media["caption"] = serde_json::Value::String(caption.to_string());
        }
        let mut payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": key.as_str(),
            "type": kind.as_str(),
        });
        payload[kind.as_str()] = media;
        self.post_message(payload).await
    }
}
