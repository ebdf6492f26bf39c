//! Long-polling `getUpdates` loop feeding the command dispatcher.
//!
//! The loop owns the update offset: every received update, handled or not,
//! advances it so Telegram never redelivers it. Failed polls back off
//! exponentially up to a ceiling and reset after the next success.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::commands::COMMAND_MENU;
use super::dispatcher::CommandDispatcher;
use super::dto::{BotCommandDto, EnvelopeDto, GetUpdatesDto, SetMyCommandsDto, UpdateDto};
use crate::domain::SubscriberId;

const ALLOWED_UPDATES: &[&str] = &["message"];
const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Errors raised by Bot API calls made from the update loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelegramApiError {
    /// The request never produced a response.
    #[error("Telegram transport failed: {message}")]
    Transport {
        /// Transport message with the URL stripped.
        message: String,
    },
    /// Telegram answered with `ok: false` or an error status.
    #[error("Telegram rejected {method}: {message}")]
    Api {
        /// Bot API method name.
        method: &'static str,
        /// Telegram's description.
        message: String,
    },
    /// The response body did not match the expected envelope.
    #[error("Telegram response for {method} was malformed: {message}")]
    Decode {
        /// Bot API method name.
        method: &'static str,
        /// Decoder message.
        message: String,
    },
    /// The configured API base cannot carry a method path.
    #[error("invalid Telegram API base: {message}")]
    Config {
        /// What was wrong with the base URL.
        message: String,
    },
}

/// Settings for the update loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateLoopConfig {
    /// Seconds Telegram may hold a `getUpdates` request open.
    pub long_poll_timeout: Duration,
}

impl Default for UpdateLoopConfig {
    fn default() -> Self {
        Self {
            long_poll_timeout: Duration::from_secs(30),
        }
    }
}

/// Bot API client for the inbound side: `getUpdates` and `setMyCommands`.
pub struct TelegramUpdates {
    client: Client,
    api_base: Url,
    token: String,
    config: UpdateLoopConfig,
}

impl TelegramUpdates {
    /// Build a client for the bot identified by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramApiError::Config`] for an unusable base URL and
    /// [`TelegramApiError::Transport`] when the HTTP client cannot be built.
    pub fn new(
        api_base: Url,
        token: impl Into<String>,
        config: UpdateLoopConfig,
    ) -> Result<Self, TelegramApiError> {
        if api_base.cannot_be_a_base() {
            return Err(TelegramApiError::Config {
                message: format!("`{api_base}` cannot carry a path"),
            });
        }
        // The HTTP timeout must outlive the long poll it carries.
        let client = Client::builder()
            .timeout(config.long_poll_timeout + Duration::from_secs(10))
            .build()
            .map_err(|error| TelegramApiError::Transport {
                message: error.without_url().to_string(),
            })?;
        Ok(Self {
            client,
            api_base,
            token: token.into(),
            config,
        })
    }

    /// Publish [`COMMAND_MENU`] so clients offer command completion.
    ///
    /// # Errors
    ///
    /// Returns a [`TelegramApiError`] when Telegram refuses the list.
    pub async fn register_commands(&self) -> Result<(), TelegramApiError> {
        let body = SetMyCommandsDto {
            commands: COMMAND_MENU
                .iter()
                .map(|&(command, description)| BotCommandDto {
                    command,
                    description,
                })
                .collect(),
        };
        let _: bool = self.call("setMyCommands", &body).await?;
        info!(count = COMMAND_MENU.len(), "bot commands registered");
        Ok(())
    }

    /// Poll updates and dispatch them until `shutdown` resolves.
    pub async fn run(&self, dispatcher: &CommandDispatcher, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut offset = None;
        let mut backoff = MIN_BACKOFF;

        info!("telegram update loop started");
        loop {
            let polled = tokio::select! {
                () = &mut shutdown => break,
                polled = self.get_updates(offset) => polled,
            };

            match polled {
                Ok(updates) => {
                    backoff = MIN_BACKOFF;
                    for update in updates {
                        offset = Some(next_offset(offset, update.update_id));
                        dispatch(dispatcher, update).await;
                    }
                }
                Err(error) => {
                    warn!(%error, retry_in_secs = backoff.as_secs(), "getUpdates failed");
                    tokio::select! {
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
        info!("telegram update loop stopping");
    }

    async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<UpdateDto>, TelegramApiError> {
        let body = GetUpdatesDto {
            offset,
            timeout: self.config.long_poll_timeout.as_secs(),
            allowed_updates: ALLOWED_UPDATES,
        };
        self.call("getUpdates", &body).await
    }

    async fn call<B, T>(&self, method: &'static str, body: &B) -> Result<T, TelegramApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = method_url(&self.api_base, &self.token, method)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|error| TelegramApiError::Transport {
                message: error.without_url().to_string(),
            })?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| TelegramApiError::Transport {
                message: error.without_url().to_string(),
            })?;
        decode_envelope(method, status.as_u16(), &bytes)
    }
}

fn method_url(api_base: &Url, token: &str, method: &str) -> Result<Url, TelegramApiError> {
    let mut url = api_base.clone();
    url.path_segments_mut()
        .map_err(|()| TelegramApiError::Config {
            message: format!("`{api_base}` cannot carry a path"),
        })?
        .pop_if_empty()
        .push(&format!("bot{token}"))
        .push(method);
    Ok(url)
}

fn decode_envelope<T: DeserializeOwned>(
    method: &'static str,
    status: u16,
    body: &[u8],
) -> Result<T, TelegramApiError> {
    let envelope: EnvelopeDto<T> =
        serde_json::from_slice(body).map_err(|error| TelegramApiError::Decode {
            method,
            message: error.to_string(),
        })?;
    match envelope {
        EnvelopeDto {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        EnvelopeDto { ok: true, .. } => Err(TelegramApiError::Decode {
            method,
            message: "missing `result`".to_owned(),
        }),
        EnvelopeDto { description, .. } => Err(TelegramApiError::Api {
            method,
            message: description.unwrap_or_else(|| format!("status {status}")),
        }),
    }
}

fn next_offset(current: Option<i64>, update_id: i64) -> i64 {
    let next = update_id.saturating_add(1);
    current.map_or(next, |offset| offset.max(next))
}

async fn dispatch(dispatcher: &CommandDispatcher, update: UpdateDto) {
    let Some(message) = update.message else {
        debug!(update_id = update.update_id, "skipping non-message update");
        return;
    };
    let Some(text) = message.text else {
        debug!(update_id = update.update_id, "skipping message without text");
        return;
    };
    dispatcher
        .handle_message(SubscriberId::new(message.chat.id), &text)
        .await;
}
