//! Bot API payloads consumed by the update loop.

use serde::{Deserialize, Serialize};

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
pub(super) struct EnvelopeDto<T> {
    pub(super) ok: bool,
    #[serde(default)]
    pub(super) description: Option<String>,
    pub(super) result: Option<T>,
}

/// One entry of a `getUpdates` result. Update kinds other than messages are
/// skipped but still advance the offset.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct UpdateDto {
    pub(super) update_id: i64,
    #[serde(default)]
    pub(super) message: Option<MessageDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct MessageDto {
    pub(super) chat: ChatDto,
    #[serde(default)]
    pub(super) text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ChatDto {
    pub(super) id: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct GetUpdatesDto<'a> {
    pub(super) offset: Option<i64>,
    pub(super) timeout: u64,
    pub(super) allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
pub(super) struct SetMyCommandsDto<'a> {
    pub(super) commands: Vec<BotCommandDto<'a>>,
}

#[derive(Debug, Serialize)]
pub(super) struct BotCommandDto<'a> {
    pub(super) command: &'a str,
    pub(super) description: &'a str,
}
