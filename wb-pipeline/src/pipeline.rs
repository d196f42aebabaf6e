//! Tag dispatch pipeline.
//!
//! One-shot linear reduction over the AI reply text: a fixed, ordered
//! sequence of stages, each gated by configuration, each independently
//! guarded so a collaborator failure never aborts delivery. Business
//! integration stages run before helpdesk bookkeeping because they may
//! replace the whole text with a fresh AI reply that itself carries tags
//! for the later stages. Sanitation is strictly last.

use crate::command::parse_command_block;
use crate::config::PipelineConfig;
use crate::lenient::parse_lenient_json;
use crate::scan;
use anyhow::Result;
use std::sync::Arc;
use wb_collab::{
    AiBackend, BookingCalendar, ConversationKey, FollowUpScheduler, Helpdesk, MediaKind,
    MediaStore, MessagingTransport, SheetBackend, Storefront,
};

const LEAD_COMPLETE_TAG: &str = "lead_complete";

const BOOKING_PROMPT: &str = "You are a WhatsApp assistant. Turn this raw availability data into \
a short, friendly reply in the language of the ongoing conversation. Data:\n";
const PRODUCTS_PROMPT: &str = "You are a WhatsApp assistant. Present these products to the \
customer as a short, friendly reply in the language of the ongoing conversation. Data:\n";
const SHIPPING_PROMPT: &str = "You are a WhatsApp assistant. Summarize these shipping options \
for the customer as a short, friendly reply in the language of the ongoing conversation. Data:\n";

/// How a stage changed the working text.
///
/// `Replace` marks a full substitution with a freshly AI-generated reply,
/// as opposed to a local strip/transform of the existing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Local(String),
    Replace(String),
}

/// Collaborator handles the pipeline dispatches side effects to.
#[derive(Clone)]
pub struct Collaborators {
    pub ai: Arc<dyn AiBackend>,
    pub helpdesk: Arc<dyn Helpdesk>,
    pub media: Arc<dyn MediaStore>,
    pub sheets: Arc<dyn SheetBackend>,
    pub scheduler: Arc<dyn FollowUpScheduler>,
    pub storefront: Arc<dyn Storefront>,
    pub booking: Arc<dyn BookingCalendar>,
    pub transport: Arc<dyn MessagingTransport>,
}

pub struct TagPipeline {
    cfg: PipelineConfig,
    collab: Collaborators,
}

impl TagPipeline {
    pub fn new(cfg: PipelineConfig, collab: Collaborators) -> Self {
        Self { cfg, collab }
    }

    /// Run every configured stage over `text` in fixed order and return the
    /// cleaned user-facing reply. Always returns a string; stage failures
    /// are logged and the failing stage is a no-op.
    #[tracing::instrument(level = "info", skip_all, fields(key = %key))]
    pub async fn process_text(&self, key: &ConversationKey, text: &str) -> String {
        let mut text = text.to_string();

        if self.cfg.lead_enabled {
            text = self
                .guarded("lead", &text, self.lead_stage(key, &text))
                .await;
        }
        if self.cfg.sheet_enabled {
            text = self.guarded("sheet", &text, self.sheet_stage(&text)).await;
        }
        if self.cfg.booking_enabled {
            text = self
                .guarded("booking", &text, self.booking_stage(key, &text))
                .await;
        }
        if self.cfg.ecommerce_enabled {
            text = self
                .guarded("ecommerce", &text, self.ecommerce_stage(key, &text))
                .await;
        }
        if self.cfg.commerce_blocks_enabled {
            text = self
                .guarded("commerce_blocks", &text, self.commerce_blocks_stage(key, &text))
                .await;
        }
        text = self
            .guarded("labels", &text, self.labels_stage(key, &text))
            .await;
        text = self
            .guarded("agents", &text, self.agents_stage(key, &text))
            .await;
        text = self
            .guarded("priority", &text, self.priority_stage(key, &text))
            .await;
        text = self
            .guarded("media", &text, self.media_stage(key, &text))
            .await;

        scan::sanitize_residual_tokens(&text)
    }

    async fn guarded<F>(&self, stage: &str, current: &str, fut: F) -> String
    where
        F: std::future::Future<Output = Result<StageOutcome>>,
    {
        match fut.await {
            Ok(StageOutcome::Local(text)) => text,
            Ok(StageOutcome::Replace(text)) => {
                tracing::info!(stage, replacement_len = text.len(), "stage replaced reply text");
                text
            }
            Err(e) => {
                tracing::warn!(stage, error = %e, "stage failed; text passed through");
                current.to_string()
            }
        }
    }

    /// Stage 1: `%%lead_complete%%` removes the conversation from the
    /// follow-up schedule.
    async fn lead_stage(&self, key: &ConversationKey, text: &str) -> Result<StageOutcome> {
        if !scan::has_literal_tag(text, LEAD_COMPLETE_TAG) {
            return Ok(StageOutcome::Local(text.to_string()));
        }
        self.collab.scheduler.cancel(key).await?;
        tracing::info!(key = %key, "lead marked complete; follow-ups cancelled");
        Ok(StageOutcome::Local(scan::strip_literal_tag(
            text,
            LEAD_COMPLETE_TAG,
        )))
    }

    /// Stage 2: `&&…&&` spreadsheet command blocks. Blocks are always
    /// stripped; per-block failures are logged and skipped.
    async fn sheet_stage(&self, text: &str) -> Result<StageOutcome> {
        for raw in scan::collect_payloads(&scan::AMPERSAND, text) {
            let block = match parse_command_block(&raw) {
                Ok(block) => block,
                Err(e) => {
                    tracing::warn!(error = %e, raw = %raw, "sheet command block unparseable");
                    continue;
                }
            };
            let result = match block.name.as_str() {
                "create" => self.collab.sheets.create(&block.payload).await,
                "update" => {
                    let filter = block.payload.get("filter").cloned().unwrap_or_else(|| {
                        block.payload.clone()
                    });
                    let data = block
                        .payload
                        .get("data")
                        .cloned()
                        .unwrap_or_else(|| block.payload.clone());
                    self.collab.sheets.update(&filter, &data).await
                }
                "search" => self
                    .collab
                    .sheets
                    .query(&block.payload)
                    .await
                    .map(|rows| {
                        tracing::info!(rows = rows.len(), "sheet search completed");
                    }),
                other => {
                    tracing::warn!(command = %other, "unknown sheet command ignored");
                    Ok(())
                }
            };
            if let Err(e) = result {
                tracing::warn!(command = %block.name, error = %e, "sheet command failed");
            }
        }
        Ok(StageOutcome::Local(scan::strip_all(&scan::AMPERSAND, text)))
    }

    /// Stage 3a: `$$…$$` booking availability. Feeds the collaborator data
    /// back through the AI and substitutes its reply for the whole text.
    async fn booking_stage(&self, key: &ConversationKey, text: &str) -> Result<StageOutcome> {
        let payloads = scan::collect_payloads(&scan::DOLLAR, text);
        let Some(raw) = payloads.first() else {
            return Ok(StageOutcome::Local(text.to_string()));
        };
        let request = match parse_lenient_json(raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, raw = %raw, "booking payload unparseable");
                return Ok(StageOutcome::Local(scan::strip_all(&scan::DOLLAR, text)));
            }
        };
        let slots = self.collab.booking.check_availability(&request).await?;
        let reply = self
            .collab
            .ai
            .ask(key, &format!("{BOOKING_PROMPT}{slots}"))
            .await?;
        Ok(StageOutcome::Replace(reply.text))
    }

    /// Stage 3b: `[[…]]` e-commerce filter tag.
    async fn ecommerce_stage(&self, key: &ConversationKey, text: &str) -> Result<StageOutcome> {
        let payloads = scan::collect_payloads(&scan::BRACKET_PAYLOAD, text);
        let Some(raw) = payloads.first() else {
            return Ok(StageOutcome::Local(text.to_string()));
        };
        let filter = match parse_lenient_json(raw) {
            Ok(filter) => filter,
            Err(e) => {
                tracing::warn!(error = %e, raw = %raw, "ecommerce filter unparseable");
                return Ok(StageOutcome::Local(
                    scan::strip_all(&scan::BRACKET_PAYLOAD, text),
                ));
            }
        };
        let products = self.collab.storefront.search_products(&filter).await?;
        let reply = self
            .collab
            .ai
            .ask(
                key,
                &format!("{PRODUCTS_PROMPT}{}", serde_json::Value::Array(products)),
            )
            .await?;
        Ok(StageOutcome::Replace(reply.text))
    }

    /// Stage 3c: `##…##` product/shipping command blocks.
    async fn commerce_blocks_stage(
        &self,
        key: &ConversationKey,
        text: &str,
    ) -> Result<StageOutcome> {
        let payloads = scan::collect_payloads(&scan::DOUBLE_HASH, text);
        if payloads.is_empty() {
            return Ok(StageOutcome::Local(text.to_string()));
        }

        let mut gathered: Vec<(String, serde_json::Value)> = Vec::new();
        for raw in &payloads {
            let block = match parse_command_block(raw) {
                Ok(block) => block,
                Err(e) => {
                    tracing::warn!(error = %e, raw = %raw, "commerce command block unparseable");
                    continue;
                }
            };
            match block.name.as_str() {
                "products" => {
                    let products = self.collab.storefront.search_products(&block.payload).await?;
                    gathered.push(("products".to_string(), serde_json::Value::Array(products)));
                }
                "shipping" => {
                    let quotes = self.collab.storefront.quote_shipping(&block.payload).await?;
                    gathered.push(("shipping".to_string(), serde_json::to_value(quotes)?));
                }
                other => {
                    tracing::warn!(command = %other, "unknown commerce command ignored");
                }
            }
        }

        if gathered.is_empty() {
            return Ok(StageOutcome::Local(scan::strip_all(&scan::DOUBLE_HASH, text)));
        }
        let prompt = gathered
            .iter()
            .map(|(kind, data)| {
                let template = if kind == "shipping" {
                    SHIPPING_PROMPT
                } else {
                    PRODUCTS_PROMPT
                };
                format!("{template}{data}")
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let reply = self.collab.ai.ask(key, &prompt).await?;
        Ok(StageOutcome::Replace(reply.text))
    }

    /// Stage 4: configured `%%label%%` tags. The handoff label additionally
    /// disables the bot for this conversation.
    async fn labels_stage(&self, key: &ConversationKey, text: &str) -> Result<StageOutcome> {
        let mut text = text.to_string();
        for label in &self.cfg.labels {
            if !scan::has_literal_tag(&text, label) {
                continue;
            }
            let mut labels = self.collab.helpdesk.labels(key).await?;
            if !labels.iter().any(|existing| existing == label) {
                labels.push(label.clone());
            }
            self.collab.helpdesk.set_labels(key, &labels).await?;
            tracing::info!(key = %key, label = %label, "label applied");

            if self.cfg.handoff_label.as_deref() == Some(label.as_str()) {
                self.collab
                    .helpdesk
                    .set_attribute(key, &self.cfg.bot_disable_attribute, true.into())
                    .await?;
                tracing::info!(key = %key, "conversation handed off to human");
            }
            text = scan::strip_literal_tag(&text, label);
        }
        Ok(StageOutcome::Local(text))
    }

    /// Stage 5: `%%NNN%%` agent assignment (1–3 digits, all matches).
    /// Assignment disables the bot for the conversation.
    async fn agents_stage(&self, key: &ConversationKey, text: &str) -> Result<StageOutcome> {
        let mut agent_ids: Vec<String> = Vec::new();
        for caps in scan::AGENT.captures_iter(text) {
            if let Some(digits) = caps.get(1) {
                agent_ids.push(digits.as_str().to_string());
            }
        }
        if agent_ids.is_empty() {
            return Ok(StageOutcome::Local(text.to_string()));
        }

        let mut text = text.to_string();
        for digits in agent_ids {
            // A numeric label or priority configured with the same digits is
            // ambiguous with an agent id; labels ran first, so anything still
            // present here that collides is left for those stages' owners.
            if self.cfg.labels.iter().any(|l| l == &digits)
                || self.cfg.priorities.iter().any(|p| p == &digits)
            {
                tracing::warn!(
                    token = %digits,
                    "numeric tag collides with configured label/priority; not treated as agent"
                );
                continue;
            }
            let agent_id: u32 = digits.parse()?;
            self.collab.helpdesk.assign_agent(key, agent_id).await?;
            self.collab
                .helpdesk
                .set_attribute(key, &self.cfg.bot_disable_attribute, true.into())
                .await?;
            tracing::info!(key = %key, agent_id, "conversation assigned to agent");
            text = scan::strip_literal_tag(&text, &digits);
        }
        Ok(StageOutcome::Local(text))
    }

    /// Stage 6: configured `%%priority%%` tags.
    async fn priority_stage(&self, key: &ConversationKey, text: &str) -> Result<StageOutcome> {
        let mut text = text.to_string();
        for priority in &self.cfg.priorities {
            if !scan::has_literal_tag(&text, priority) {
                continue;
            }
            self.collab.helpdesk.set_priority(key, priority).await?;
            tracing::info!(key = %key, priority = %priority, "priority set");
            text = scan::strip_literal_tag(&text, priority);
        }
        Ok(StageOutcome::Local(text))
    }

    /// Stage 7: media tags, three families with distinct namespaces. Tags
    /// are stripped whether or not the lookup succeeds; a failed lookup
    /// logs and never blocks text delivery.
    async fn media_stage(&self, key: &ConversationKey, text: &str) -> Result<StageOutcome> {
        let mut text = text.to_string();
        let families = [
            (MediaKind::Image, &self.cfg.image),
            (MediaKind::Video, &self.cfg.video),
            (MediaKind::Document, &self.cfg.document),
        ];
        for (kind, family) in families {
            for tag in &family.tags {
                if !scan::has_literal_tag(&text, tag) {
                    continue;
                }
                text = scan::strip_literal_tag(&text, tag);
                match self.collab.media.find_asset(&family.namespace, tag).await {
                    Ok(Some(asset)) => {
                        if let Err(e) = self.deliver_media(key, kind, &asset.url, asset.caption.as_deref()).await
                        {
                            tracing::warn!(tag = %tag, error = %e, "media delivery failed");
                        }
                    }
                    Ok(None) => {
                        tracing::warn!(
                            namespace = %family.namespace,
                            tag = %tag,
                            "media tag has no stored asset"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(tag = %tag, error = %e, "media lookup failed");
                    }
                }
            }
        }
        Ok(StageOutcome::Local(text))
    }

    async fn deliver_media(
        &self,
        key: &ConversationKey,
        kind: MediaKind,
        url: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        self.collab
            .transport
            .send_media(key, kind, url, caption)
            .await?;
        self.collab.helpdesk.send_media(key, url, kind).await?;
        Ok(())
    }
}
