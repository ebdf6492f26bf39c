//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed snapshot and subscription stores
//!   using Diesel
//! - **ticketing**: reqwest client for the airline's availability endpoints
//! - **telegram**: Bot API `sendMessage` notification channel
//!
//! Adapters are thin translators between domain types and wire or storage
//! representations. They contain no business logic.

pub mod persistence;
pub mod telegram;
pub mod ticketing;
