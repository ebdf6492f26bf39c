//! Reqwest-backed Telegram notification channel.
//!
//! Every request URL embeds the bot token, so transport errors are stripped
//! of their URL before they reach a log line.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use super::dto::{ApiResponseDto, SendMessageDto};
use crate::domain::SubscriberId;
use crate::domain::ports::{NotificationChannel, NotificationChannelError};

/// Delivers plain-text messages through the Bot API `sendMessage` method.
pub struct TelegramNotificationChannel {
    client: Client,
    send_message_url: Url,
}

impl TelegramNotificationChannel {
    /// Build a channel for the bot identified by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationChannelError::Rejected`] when `api_base` cannot
    /// carry a path, and [`NotificationChannelError::Transport`] when the
    /// reqwest client cannot be constructed.
    pub fn new(
        api_base: &Url,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, NotificationChannelError> {
        let send_message_url = method_url(api_base, token, "sendMessage")?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| NotificationChannelError::transport(error.without_url().to_string()))?;
        Ok(Self {
            client,
            send_message_url,
        })
    }
}

#[async_trait]
impl NotificationChannel for TelegramNotificationChannel {
    async fn send(
        &self,
        subscriber: SubscriberId,
        message: &str,
    ) -> Result<(), NotificationChannelError> {
        let response = self
            .client
            .post(self.send_message_url.clone())
            .json(&SendMessageDto {
                chat_id: subscriber.as_i64(),
                text: message,
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        interpret_response(status, body.as_ref())
    }
}

fn method_url(api_base: &Url, token: &str, method: &str) -> Result<Url, NotificationChannelError> {
    let mut url = api_base.clone();
    url.path_segments_mut()
        .map_err(|()| {
            NotificationChannelError::rejected(format!(
                "Telegram API base `{api_base}` cannot carry a path"
            ))
        })?
        .pop_if_empty()
        .push(&format!("bot{token}"))
        .push(method);
    Ok(url)
}

fn interpret_response(status: StatusCode, body: &[u8]) -> Result<(), NotificationChannelError> {
    let envelope = serde_json::from_slice::<ApiResponseDto>(body).ok();
    if status.is_success() && envelope.as_ref().is_some_and(|envelope| envelope.ok) {
        return Ok(());
    }

    let description = envelope
        .as_ref()
        .and_then(|envelope| envelope.description.clone())
        .unwrap_or_else(|| format!("status {}", status.as_u16()));
    let retry_after = envelope
        .and_then(|envelope| envelope.parameters)
        .and_then(|parameters| parameters.retry_after);

    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => NotificationChannelError::rate_limited(match retry_after {
            Some(seconds) => format!("{description} (retry after {seconds}s)"),
            None => description,
        }),
        StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
            NotificationChannelError::rejected(description)
        }
        _ if status.is_success() => NotificationChannelError::rejected(description),
        _ => NotificationChannelError::transport(description),
    })
}

fn map_transport_error(error: reqwest::Error) -> NotificationChannelError {
    NotificationChannelError::transport(error.without_url().to_string())
}
