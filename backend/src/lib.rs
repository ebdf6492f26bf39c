//! Flight availability watcher: polls the ticketing site, stores date
//! snapshots, and notifies Telegram subscribers when dates change.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{AppSettings, SettingsError};
