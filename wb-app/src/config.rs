//! Wirebot configuration loader.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use wb_pipeline::PipelineConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct WirebotConfig {
    pub general: GeneralConfig,
    pub ai: AiConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub chatwoot: ChatwootConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Debounce quiet gap in milliseconds before a burst is flushed.
    #[serde(default = "default_debounce_gap_ms")]
    pub debounce_gap_ms: u64,
    /// User-facing reply when the AI backend fails or returns nothing.
    #[serde(default = "default_fallback_text")]
    pub fallback_text: String,
}

fn default_debounce_gap_ms() -> u64 {
    3000
}

fn default_fallback_text() -> String {
    "Disculpa, no pude procesar tu mensaje. Intenta de nuevo en un momento.".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub phone_number_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatwootConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub token: String,
}

/// Base URLs for the auxiliary collaborator services.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub media_base_url: String,
    #[serde(default)]
    pub sheets_base_url: String,
    #[serde(default)]
    pub scheduler_base_url: String,
    #[serde(default)]
    pub storefront_base_url: String,
    #[serde(default)]
    pub booking_base_url: String,
}

impl WirebotConfig {
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = path.unwrap_or_else(default_config_path);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;

        let mut cfg: WirebotConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?;

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("WIREBOT_DEBOUNCE_GAP_MS") {
            if let Ok(gap) = v.trim().parse() {
                self.general.debounce_gap_ms = gap;
            }
        }
        if let Ok(v) = std::env::var("WIREBOT_AI_API_KEY") {
            if !v.trim().is_empty() {
                self.ai.api_key = v;
            }
        }
        if let Ok(v) = std::env::var("WHATSAPP_ACCESS_TOKEN") {
            if !v.trim().is_empty() {
                self.whatsapp.access_token = v;
            }
        }
        if let Ok(v) = std::env::var("WHATSAPP_PHONE_NUMBER_ID") {
            if !v.trim().is_empty() {
                self.whatsapp.phone_number_id = v;
            }
        }
        if let Ok(v) = std::env::var("CHATWOOT_API_TOKEN") {
            if !v.trim().is_empty() {
                self.chatwoot.token = v;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.general.debounce_gap_ms == 0 {
            return Err(anyhow::anyhow!("general.debounce_gap_ms must be > 0"));
        }
        if self.ai.model.trim().is_empty() {
            return Err(anyhow::anyhow!("ai.model is required"));
        }
        if self.ai.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("ai.base_url is required"));
        }
        self.pipeline
            .validate()
            .map_err(|e| anyhow::anyhow!("pipeline config: {e}"))?;

        if self.pipeline.lead_enabled && self.services.scheduler_base_url.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "pipeline.lead_enabled requires services.scheduler_base_url"
            ));
        }
        if self.pipeline.sheet_enabled && self.services.sheets_base_url.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "pipeline.sheet_enabled requires services.sheets_base_url"
            ));
        }
        if self.pipeline.booking_enabled && self.services.booking_base_url.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "pipeline.booking_enabled requires services.booking_base_url"
            ));
        }
        if (self.pipeline.ecommerce_enabled || self.pipeline.commerce_blocks_enabled)
            && self.services.storefront_base_url.trim().is_empty()
        {
            return Err(anyhow::anyhow!(
                "ecommerce stages require services.storefront_base_url"
            ));
        }

        for (name, family) in [
            ("image", &self.pipeline.image),
            ("video", &self.pipeline.video),
            ("document", &self.pipeline.document),
        ] {
            if !family.tags.is_empty() && family.namespace.trim().is_empty() {
                return Err(anyhow::anyhow!(
                    "pipeline.{name}.tags configured without a namespace"
                ));
            }
        }
        if !(self.pipeline.image.tags.is_empty()
            && self.pipeline.video.tags.is_empty()
            && self.pipeline.document.tags.is_empty())
            && self.services.media_base_url.trim().is_empty()
        {
            return Err(anyhow::anyhow!(
                "media tags configured without services.media_base_url"
            ));
        }
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".wirebot").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> WirebotConfig {
        toml::from_str(
            r#"
[general]

[ai]
base_url = "https://api.openai.com"
model = "gpt-4o-mini"
"#,
        )
        .expect("parse minimal config")
    }

    #[test]
    fn minimal_config_is_valid() {
        let cfg = minimal();
        assert_eq!(cfg.general.debounce_gap_ms, 3000);
        cfg.validate().expect("minimal config validates");
    }

    #[test]
    fn env_override_takes_precedence() {
        let mut cfg = minimal();
        unsafe { std::env::set_var("WIREBOT_DEBOUNCE_GAP_MS", "750") };
        cfg.apply_env_overrides();
        unsafe { std::env::remove_var("WIREBOT_DEBOUNCE_GAP_MS") };
        assert_eq!(cfg.general.debounce_gap_ms, 750);
    }

    #[test]
    fn zero_gap_is_rejected() {
        let mut cfg = minimal();
        cfg.general.debounce_gap_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn enabled_stage_requires_service_url() {
        let mut cfg = minimal();
        cfg.pipeline.sheet_enabled = true;
        assert!(cfg.validate().is_err());
        cfg.services.sheets_base_url = "https://sheets.internal".to_string();
        cfg.validate().expect("sheet stage with url validates");
    }

    #[test]
    fn conflicting_business_stages_are_rejected() {
        let mut cfg = minimal();
        cfg.pipeline.booking_enabled = true;
        cfg.pipeline.ecommerce_enabled = true;
        cfg.services.booking_base_url = "https://booking.internal".to_string();
        cfg.services.storefront_base_url = "https://shop.internal".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn media_tags_require_namespace() {
        let mut cfg = minimal();
        cfg.pipeline.image.tags = vec!["promo".to_string()];
        cfg.services.media_base_url = "https://media.internal".to_string();
        assert!(cfg.validate().is_err());
        cfg.pipeline.image.namespace = "catalogo-img".to_string();
        cfg.validate().expect("namespaced media tags validate");
    }
}
