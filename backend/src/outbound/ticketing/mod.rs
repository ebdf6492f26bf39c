//! Ticketing-site outbound adapters.
//!
//! This module provides the reqwest implementation of the
//! `AvailabilitySource` port.

mod dto;
mod http_source;

pub use http_source::TicketingHttpSource;
