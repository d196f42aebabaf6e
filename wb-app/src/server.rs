//! Component wiring for `wirebot serve` and `wirebot doctor`.

use crate::config::WirebotConfig;
use crate::gateway::Gateway;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use wb_collab::{
    ChatwootHelpdesk, HttpBookingCalendar, HttpMediaStore, HttpScheduler, HttpSheetBackend,
    HttpStorefront, InboundMessage, OpenAiChatBackend, Unconfigured, WhatsAppCloudTransport,
};
use wb_pipeline::Collaborators;

pub async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    let cfg = WirebotConfig::load(config_path).await?;
    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(256);
    let collab = build_collaborators(&cfg)?;

    let gateway = Arc::new(Gateway::new(&cfg, collab, inbound_rx));
    gateway.start();
    tracing::info!(
        debounce_gap_ms = cfg.general.debounce_gap_ms,
        "wirebot gateway running"
    );

    // The webhook relay that feeds inbound messages runs out of process;
    // keep the sender alive until shutdown so embedders can clone it.
    let _inbound_tx = inbound_tx;
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    Ok(())
}

pub async fn doctor(config_path: Option<PathBuf>) -> Result<()> {
    let cfg = WirebotConfig::load(config_path).await?;
    build_collaborators(&cfg)?;
    println!("config ok: debounce_gap_ms={}", cfg.general.debounce_gap_ms);
    println!(
        "stages: lead={} sheet={} booking={} ecommerce={} commerce_blocks={}",
        cfg.pipeline.lead_enabled,
        cfg.pipeline.sheet_enabled,
        cfg.pipeline.booking_enabled,
        cfg.pipeline.ecommerce_enabled,
        cfg.pipeline.commerce_blocks_enabled,
    );
    println!(
        "tags: labels={} priorities={} media={}",
        cfg.pipeline.labels.len(),
        cfg.pipeline.priorities.len(),
        cfg.pipeline.image.tags.len()
            + cfg.pipeline.video.tags.len()
            + cfg.pipeline.document.tags.len(),
    );
    Ok(())
}

fn build_collaborators(cfg: &WirebotConfig) -> Result<Collaborators> {
    let ai = Arc::new(OpenAiChatBackend::new(
        &cfg.ai.base_url,
        &cfg.ai.api_key,
        &cfg.ai.model,
    )?);
    let helpdesk = Arc::new(ChatwootHelpdesk::new(
        &cfg.chatwoot.base_url,
        &cfg.chatwoot.account_id,
        &cfg.chatwoot.token,
    )?);
    let transport = Arc::new(WhatsAppCloudTransport::new(
        &cfg.whatsapp.access_token,
        &cfg.whatsapp.phone_number_id,
    )?);

    let media: Arc<dyn wb_collab::MediaStore> = if cfg.services.media_base_url.trim().is_empty() {
        Arc::new(Unconfigured::new("media store"))
    } else {
        Arc::new(HttpMediaStore::new(&cfg.services.media_base_url)?)
    };
    let sheets: Arc<dyn wb_collab::SheetBackend> =
        if cfg.services.sheets_base_url.trim().is_empty() {
            Arc::new(Unconfigured::new("sheet backend"))
        } else {
            Arc::new(HttpSheetBackend::new(&cfg.services.sheets_base_url)?)
        };
    let scheduler: Arc<dyn wb_collab::FollowUpScheduler> =
        if cfg.services.scheduler_base_url.trim().is_empty() {
            Arc::new(Unconfigured::new("follow-up scheduler"))
        } else {
            Arc::new(HttpScheduler::new(&cfg.services.scheduler_base_url)?)
        };
    let storefront: Arc<dyn wb_collab::Storefront> =
        if cfg.services.storefront_base_url.trim().is_empty() {
            Arc::new(Unconfigured::new("storefront"))
        } else {
            Arc::new(HttpStorefront::new(&cfg.services.storefront_base_url)?)
        };
    let booking: Arc<dyn wb_collab::BookingCalendar> =
        if cfg.services.booking_base_url.trim().is_empty() {
            Arc::new(Unconfigured::new("booking calendar"))
        } else {
            Arc::new(HttpBookingCalendar::new(&cfg.services.booking_base_url)?)
        };

    Ok(Collaborators {
        ai,
        helpdesk,
        media,
        sheets,
        scheduler,
        storefront,
        booking,
        transport,
    })
}
