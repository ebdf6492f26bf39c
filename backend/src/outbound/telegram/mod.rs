//! Telegram outbound adapters.
//!
//! This module provides the Bot API implementation of the
//! `NotificationChannel` port.

mod channel;
mod dto;

pub use channel::TelegramNotificationChannel;
