//! DTOs for decoding ticketing-site JSON responses.

use serde::Deserialize;

use crate::domain::LocationId;

/// One entry of the `check-dest` array. The site has served ids both as
/// JSON numbers and as numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum DestinationIdDto {
    Number(i64),
    Text(String),
}

impl DestinationIdDto {
    fn into_location(self) -> Result<LocationId, String> {
        match self {
            Self::Number(raw) => Ok(LocationId::new(raw)),
            Self::Text(raw) => raw
                .parse()
                .map_err(|_| format!("destination id `{raw}` is not an integer")),
        }
    }
}

pub(super) fn into_destinations(raw: Vec<DestinationIdDto>) -> Result<Vec<LocationId>, String> {
    raw.into_iter().map(DestinationIdDto::into_location).collect()
}

/// Body of `check-flight/{origin}/{destination}`; only `from` is read.
#[derive(Debug, Deserialize)]
pub(super) struct CheckFlightDto {
    pub(super) from: Vec<String>,
}
