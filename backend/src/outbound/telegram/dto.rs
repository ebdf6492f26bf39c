//! Bot API request and response envelopes used by `sendMessage`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct SendMessageDto<'a> {
    pub(super) chat_id: i64,
    pub(super) text: &'a str,
}

/// Common Bot API response envelope; `result` is ignored for `sendMessage`.
#[derive(Debug, Deserialize)]
pub(super) struct ApiResponseDto {
    pub(super) ok: bool,
    #[serde(default)]
    pub(super) description: Option<String>,
    #[serde(default)]
    pub(super) parameters: Option<ResponseParametersDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResponseParametersDto {
    #[serde(default)]
    pub(super) retry_after: Option<u64>,
}
