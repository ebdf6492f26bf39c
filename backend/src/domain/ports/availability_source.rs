//! Driven port for reading availability from the ticketing site.
//!
//! The site is treated as untrusted: any transport problem, unexpected status,
//! or payload that does not match the expected shape surfaces as an error and
//! is never interpreted as "no dates".

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{LocationId, RouteKey};

define_port_error! {
    /// Errors surfaced while calling the ticketing site.
    pub enum AvailabilitySourceError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "ticketing transport failed: {message}",
        /// The call exceeded its timeout.
        Timeout { message: String } =>
            "ticketing request timed out: {message}",
        /// The site rate-limited the request.
        RateLimited { message: String } =>
            "ticketing rate limited request: {message}",
        /// The site answered with a non-success status.
        Status { message: String } =>
            "ticketing returned an error status: {message}",
        /// The response body did not match the expected shape.
        Decode { message: String } =>
            "ticketing response decode failed: {message}",
        /// The adapter could not build the request.
        InvalidRequest { message: String } =>
            "ticketing request invalid: {message}",
    }
}

/// Port for querying destinations and on-sale dates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// Destinations currently served from `origin`.
    async fn fetch_destinations(
        &self,
        origin: LocationId,
    ) -> Result<Vec<LocationId>, AvailabilitySourceError>;

    /// Dates currently on sale for `route`, in source order.
    async fn fetch_dates(&self, route: RouteKey) -> Result<Vec<String>, AvailabilitySourceError>;
}
