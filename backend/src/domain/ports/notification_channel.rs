//! Driven port for delivering chat messages to subscribers.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::SubscriberId;

define_port_error! {
    /// Errors surfaced while delivering a message.
    pub enum NotificationChannelError {
        /// Network transport failed before the channel answered.
        Transport { message: String } =>
            "notification transport failed: {message}",
        /// The channel throttled the sender.
        RateLimited { message: String } =>
            "notification rate limited: {message}",
        /// The channel refused the message (blocked bot, unknown chat, ...).
        Rejected { message: String } =>
            "notification rejected: {message}",
    }
}

/// Port for fire-and-forget message delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Deliver `message` to `subscriber`.
    async fn send(
        &self,
        subscriber: SubscriberId,
        message: &str,
    ) -> Result<(), NotificationChannelError>;
}
