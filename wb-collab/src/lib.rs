//! Collaborator interfaces and adapters for Wirebot.
//!
//! Adapters are pure I/O: they convert the narrow trait calls the pipeline
//! makes into HTTP requests against the external systems (AI backend,
//! helpdesk, media store, spreadsheet, scheduler, commerce, WhatsApp).

mod ai;
mod chatwoot;
mod noop;
mod services;
mod traits;
mod types;
mod whatsapp;

pub use ai::OpenAiChatBackend;
pub use chatwoot::ChatwootHelpdesk;
pub use noop::Unconfigured;
pub use services::{
    HttpBookingCalendar, HttpMediaStore, HttpScheduler, HttpSheetBackend, HttpStorefront,
};
pub use traits::{
    AiBackend, BookingCalendar, FollowUpScheduler, Helpdesk, MediaStore, MessagingTransport,
    SheetBackend, Storefront,
};
pub use types::{
    AiReply, ConversationKey, InboundMessage, MediaAsset, MediaKind, MessageId, ShippingQuote,
};
pub use whatsapp::WhatsAppCloudTransport;
