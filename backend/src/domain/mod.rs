//! Domain primitives, services, and ports.
//!
//! Purpose: model route availability and subscriptions independently of the
//! ticketing site, the database, and Telegram. Adapters in `inbound` and
//! `outbound` depend on this module, never the other way round.
//!
//! Public surface:
//! - Identifiers: [`LocationId`], [`RouteKey`], [`SubscriberId`], [`Subscription`].
//! - Availability: [`AvailabilityDigest`], [`AvailabilitySnapshot`].
//! - Services: [`ChangeDetector`], [`Notifier`], [`PollCycleDriver`],
//!   [`SubscriptionService`].
//! - Errors: [`Error`], [`ErrorCode`].

pub mod change_detector;
pub mod digest;
pub mod error;
pub mod locations;
pub mod notifier;
pub mod poll_driver;
pub mod ports;
pub mod route;
pub mod snapshot;
pub mod subscription_service;

pub use self::change_detector::{ChangeDetector, Detection, FetchFailure};
pub use self::digest::{AvailabilityDigest, DigestParseError, EMPTY_DATES_DIGEST};
pub use self::error::{Error, ErrorCode};
pub use self::locations::{
    Location, known_locations, location_label, location_name, polled_origins, route_label,
};
pub use self::notifier::{
    DeliveryOutcome, NotificationReport, Notifier, NotifierError, availability_message,
};
pub use self::poll_driver::{
    CycleReport, CycleRun, PollCycleDriver, PollDriverConfig, PollDriverPorts, RouteOutcome,
};
pub use self::route::{LocationId, RouteKey, SubscriberId, Subscription};
pub use self::snapshot::AvailabilitySnapshot;
pub use self::subscription_service::SubscriptionService;

/// Result alias for operations surfaced to chat users.
///
/// # Examples
/// ```
/// use flightwatch::domain::{DomainResult, Error};
///
/// fn reject() -> DomainResult<()> {
///     Err(Error::invalid_request("nope"))
/// }
/// assert!(reject().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;
