//! Conversation flow controller: inbound messages feed the debounce queue,
//! coalesced turns go to the AI backend, replies run through the tag
//! pipeline, and the cleaned text is delivered plus mirrored to the
//! helpdesk.

use crate::config::WirebotConfig;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use wb_collab::{ConversationKey, InboundMessage};
use wb_pipeline::{Collaborators, DebounceQueue, TagPipeline};

pub struct Gateway {
    fallback_text: String,
    bot_disable_attribute: String,
    queue: DebounceQueue,
    pipeline: Arc<TagPipeline>,
    collab: Collaborators,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
}

impl Gateway {
    pub fn new(
        cfg: &WirebotConfig,
        collab: Collaborators,
        inbound_rx: mpsc::Receiver<InboundMessage>,
    ) -> Self {
        let queue = DebounceQueue::new(std::time::Duration::from_millis(
            cfg.general.debounce_gap_ms,
        ));
        let pipeline = Arc::new(TagPipeline::new(cfg.pipeline.clone(), collab.clone()));
        Self {
            fallback_text: cfg.general.fallback_text.clone(),
            bot_disable_attribute: cfg.pipeline.bot_disable_attribute.clone(),
            queue,
            pipeline,
            collab,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
        }
    }

    pub fn start(self: Arc<Self>) {
        tokio::spawn(async move {
            if let Err(e) = self.run_loop().await {
                tracing::error!(%e, "gateway loop exited");
            }
        });
    }

    #[tracing::instrument(level = "info", skip_all)]
    async fn run_loop(self: Arc<Self>) -> Result<()> {
        loop {
            let msg = {
                let mut rx = self.inbound_rx.lock().await;
                rx.recv().await
            };
            let Some(inbound) = msg else {
                return Ok(());
            };
            Arc::clone(&self).handle_inbound(inbound);
        }
    }

    /// Buffer one raw inbound message. The AI turn runs only after the
    /// debounce gap passes with no further fragment from this sender.
    pub fn handle_inbound(self: Arc<Self>, inbound: InboundMessage) {
        let key = ConversationKey::from_transport(&inbound.sender);
        tracing::debug!(key = %key, message_id = %inbound.message_id, "inbound fragment buffered");

        let gateway = Arc::clone(&self);
        let flush_key = key.clone();
        self.queue.enqueue(
            &key,
            &inbound.content,
            Box::new(move |turn| {
                Box::pin(async move {
                    gateway.run_turn(&flush_key, &turn).await;
                })
            }),
        );
    }

    /// Process one coalesced turn end to end. Never fails outward: AI
    /// failure falls back to the configured text, delivery failures are
    /// logged.
    #[tracing::instrument(level = "info", skip_all, fields(key = %key))]
    async fn run_turn(&self, key: &ConversationKey, turn: &str) {
        match self.bot_disabled(key).await {
            Ok(true) => {
                tracing::info!(key = %key, "bot disabled for conversation; turn skipped");
                return;
            }
            Ok(false) => {}
            Err(e) => {
                // Can't tell; assume enabled rather than go silent.
                tracing::warn!(key = %key, error = %e, "bot-disabled check failed");
            }
        }

        let reply = match self.collab.ai.ask(key, turn).await {
            Ok(reply) => reply.text,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "ai turn failed; using fallback text");
                self.fallback_text.clone()
            }
        };

        let final_text = self.pipeline.process_text(key, &reply).await;
        if final_text.is_empty() {
            tracing::info!(key = %key, "pipeline produced empty text; nothing to deliver");
            return;
        }

        if let Err(e) = self.collab.transport.send_text(key, &final_text).await {
            tracing::error!(key = %key, error = %e, "reply delivery failed");
        }
        if let Err(e) = self.collab.helpdesk.send_note(key, &final_text).await {
            tracing::warn!(key = %key, error = %e, "helpdesk mirror failed");
        }
    }

    async fn bot_disabled(&self, key: &ConversationKey) -> Result<bool> {
        let attrs = self.collab.helpdesk.attributes(key).await?;
        Ok(attrs
            .get(&self.bot_disable_attribute)
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}
