use crate::lenient::parse_lenient_json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command block has no name:payload separator: {0:?}")]
    MissingSeparator(String),

    #[error("command payload is not valid JSON after repair: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A parsed `command_name:payload` block from a `&&…&&` or `##…##` token.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandBlock {
    /// Lower-cased command name; never contains `:`.
    pub name: String,
    pub payload: serde_json::Value,
}

/// Split a raw block at the first colon and leniently parse the payload.
pub fn parse_command_block(raw: &str) -> Result<CommandBlock, CommandError> {
    let (name, payload) = raw
        .split_once(':')
        .ok_or_else(|| CommandError::MissingSeparator(raw.to_string()))?;
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        return Err(CommandError::MissingSeparator(raw.to_string()));
    }
    let payload = parse_lenient_json(payload)?;
    Ok(CommandBlock { name, payload })
}
