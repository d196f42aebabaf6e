use serde::Deserialize;

/// One media tag family: tag names to look for and the storage namespace
/// they resolve in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaFamilyConfig {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub namespace: String,
}

/// Static pipeline configuration: stage enable flags plus the recognized
/// label/priority/media tag names. Loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Lead lifecycle stage (`%%lead_complete%%`).
    #[serde(default)]
    pub lead_enabled: bool,
    /// Spreadsheet command blocks (`&&…&&`).
    #[serde(default)]
    pub sheet_enabled: bool,
    /// Booking availability DSL (`$$…$$`).
    #[serde(default)]
    pub booking_enabled: bool,
    /// E-commerce filter tag (`[[…]]`).
    #[serde(default)]
    pub ecommerce_enabled: bool,
    /// Product/shipping command blocks (`##…##`).
    #[serde(default)]
    pub commerce_blocks_enabled: bool,

    /// Helpdesk label names recognized as `%%label%%` tags.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Label that additionally hands the conversation off to a human.
    #[serde(default)]
    pub handoff_label: Option<String>,
    /// Priority names recognized as `%%priority%%` tags.
    #[serde(default)]
    pub priorities: Vec<String>,

    #[serde(default)]
    pub image: MediaFamilyConfig,
    #[serde(default)]
    pub video: MediaFamilyConfig,
    #[serde(default)]
    pub document: MediaFamilyConfig,

    /// Conversation attribute set to disable the bot after handoff.
    #[serde(default = "default_bot_disable_attribute")]
    pub bot_disable_attribute: String,
}

fn default_bot_disable_attribute() -> String {
    "bot_disabled".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lead_enabled: false,
            sheet_enabled: false,
            booking_enabled: false,
            ecommerce_enabled: false,
            commerce_blocks_enabled: false,
            labels: Vec::new(),
            handoff_label: None,
            priorities: Vec::new(),
            image: MediaFamilyConfig::default(),
            video: MediaFamilyConfig::default(),
            document: MediaFamilyConfig::default(),
            bot_disable_attribute: default_bot_disable_attribute(),
        }
    }
}

impl PipelineConfig {
    /// At most one business-integration stage may replace the text per run;
    /// returns an error when the operator enables more than one.
    pub fn validate(&self) -> Result<(), String> {
        let business = [
            self.booking_enabled,
            self.ecommerce_enabled,
            self.commerce_blocks_enabled,
        ]
        .iter()
        .filter(|flag| **flag)
        .count();
        if business > 1 {
            return Err(
                "at most one of booking/ecommerce/commerce_blocks may be enabled".to_string(),
            );
        }
        Ok(())
    }
}
