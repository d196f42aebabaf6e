//! Wirebot core: message coalescing and tag dispatch.
//!
//! Two pieces live here. The [`DebounceQueue`] batches rapid inbound message
//! bursts into one coalesced AI turn per conversation. The [`TagPipeline`]
//! scans AI replies for embedded command tokens, dispatches side effects to
//! the collaborators, and guarantees no internal markup reaches the user.

mod command;
mod config;
mod debounce;
mod lenient;
mod pipeline;
mod scan;

pub use command::{CommandBlock, CommandError, parse_command_block};
pub use config::{MediaFamilyConfig, PipelineConfig};
pub use debounce::{DebounceQueue, FlushFn};
pub use lenient::{parse_lenient_json, repair_json};
pub use pipeline::{Collaborators, StageOutcome, TagPipeline};
pub use scan::sanitize_residual_tokens;
