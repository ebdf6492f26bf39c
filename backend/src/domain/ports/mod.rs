//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod availability_source;
mod notification_channel;
mod snapshot_repository;
mod subscription_repository;

#[cfg(test)]
pub use availability_source::MockAvailabilitySource;
pub use availability_source::{AvailabilitySource, AvailabilitySourceError};
#[cfg(test)]
pub use notification_channel::MockNotificationChannel;
pub use notification_channel::{NotificationChannel, NotificationChannelError};
#[cfg(test)]
pub use snapshot_repository::MockSnapshotRepository;
pub use snapshot_repository::{SnapshotRepository, SnapshotRepositoryError};
#[cfg(test)]
pub use subscription_repository::MockSubscriptionRepository;
pub use subscription_repository::{SubscriptionRepository, SubscriptionRepositoryError};
