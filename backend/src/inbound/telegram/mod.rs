//! Telegram chat front end.
//!
//! Long-polls the Bot API for messages, parses them into [`BotCommand`]s, and
//! answers through the domain's notification channel. This adapter talks to
//! `SubscriptionService` only; it never touches persistence directly.

mod commands;
mod dispatcher;
mod dto;
mod updates;

pub use commands::{BotCommand, COMMAND_MENU, CommandParseError};
pub use dispatcher::CommandDispatcher;
pub use updates::{TelegramApiError, TelegramUpdates, UpdateLoopConfig};
