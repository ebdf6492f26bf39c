//! Static catalogue of the locations the ticketing site serves.
//!
//! The poll driver uses the catalogue as its list of origins; the bot uses it
//! to render human-readable route labels.

use super::route::{LocationId, RouteKey};

const KNOWN_LOCATIONS: &[(i64, &str)] = &[
    (1, "Tbilisi"),
    (2, "Ambrolauri"),
    (4, "Batumi"),
    (5, "Kutaisi"),
    (6, "Mestia"),
    (7, "Natakhtari"),
    (8, "Aktau"),
];

/// One catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Ticketing identifier.
    pub id: LocationId,
    /// English display name.
    pub name: &'static str,
}

/// Every known location, in ticketing id order.
pub fn known_locations() -> impl Iterator<Item = Location> {
    KNOWN_LOCATIONS.iter().map(|&(id, name)| Location {
        id: LocationId::new(id),
        name,
    })
}

/// Origins polled on every cycle.
pub fn polled_origins() -> Vec<LocationId> {
    known_locations().map(|location| location.id).collect()
}

/// Display name for `id`, if the catalogue knows it.
pub fn location_name(id: LocationId) -> Option<&'static str> {
    KNOWN_LOCATIONS
        .iter()
        .find(|(known, _)| *known == id.as_i64())
        .map(|(_, name)| *name)
}

/// Label such as `Batumi (4)`, or `#9` for ids outside the catalogue.
///
/// # Examples
/// ```
/// use flightwatch::domain::{LocationId, location_label};
///
/// assert_eq!(location_label(LocationId::new(4)), "Batumi (4)");
/// assert_eq!(location_label(LocationId::new(99)), "#99");
/// ```
pub fn location_label(id: LocationId) -> String {
    match location_name(id) {
        Some(name) => format!("{name} ({id})"),
        None => format!("#{id}"),
    }
}

/// Label such as `Tbilisi (1) → Batumi (4)`.
pub fn route_label(route: RouteKey) -> String {
    format!(
        "{} → {}",
        location_label(route.origin()),
        location_label(route.destination())
    )
}
