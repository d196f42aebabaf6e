use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

id_newtype!(ConversationKey);
id_newtype!(MessageId);

impl ConversationKey {
    /// Normalize a raw messaging identity into a conversation key.
    ///
    /// WhatsApp-style JIDs carry a transport suffix (`@s.whatsapp.net`,
    /// `@c.us`) and sometimes a `:device` part; both are stripped so the
    /// same user always maps to the same key.
    pub fn from_transport(raw: &str) -> Self {
        let trimmed = raw.trim();
        let without_suffix = trimmed.split('@').next().unwrap_or(trimmed);
        let without_device = without_suffix
            .split(':')
            .next()
            .unwrap_or(without_suffix);
        Self::new(without_device)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
        }
    }
}

/// A stored media asset resolved from a tag name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAsset {
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

/// Reply from the AI chat backend for one coalesced turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiReply {
    pub text: String,
    pub tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub carrier: String,
    pub price: f64,
    pub estimate: String,
}

/// One raw message as received from the messaging transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: MessageId,
    /// Raw sender identity, transport suffix included.
    pub sender: String,
    pub content: String,
    pub received_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_strips_whatsapp_suffix() {
        let key = ConversationKey::from_transport("5491122334455@s.whatsapp.net");
        assert_eq!(key.as_str(), "5491122334455");
    }

    #[test]
    fn key_strips_device_part() {
        let key = ConversationKey::from_transport("5491122334455:17@c.us");
        assert_eq!(key.as_str(), "5491122334455");
    }

    #[test]
    fn key_passes_plain_ids_through() {
        let key = ConversationKey::from_transport("  user-42  ");
        assert_eq!(key.as_str(), "user-42");
    }
}
