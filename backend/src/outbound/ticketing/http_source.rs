//! Reqwest-backed ticketing source adapter.
//!
//! This adapter owns transport details only: URL building, HTTP error
//! mapping, and JSON decoding into domain identifiers and date strings.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::{CheckFlightDto, DestinationIdDto, into_destinations};
use crate::domain::ports::{AvailabilitySource, AvailabilitySourceError};
use crate::domain::{LocationId, RouteKey};

const USER_AGENT: &str = concat!("flightwatch/", env!("CARGO_PKG_VERSION"));

/// Ticketing source adapter issuing GET requests under one base URL.
pub struct TicketingHttpSource {
    client: Client,
    base_url: Url,
}

impl TicketingHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let source = TicketingHttpSource::new(base_url, Duration::from_secs(30))?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, base_url })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[String],
    ) -> Result<T, AvailabilitySourceError> {
        let url = endpoint(&self.base_url, segments)?;
        debug!(%url, "requesting ticketing endpoint");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        decode(body.as_ref())
    }
}

#[async_trait]
impl AvailabilitySource for TicketingHttpSource {
    async fn fetch_destinations(
        &self,
        origin: LocationId,
    ) -> Result<Vec<LocationId>, AvailabilitySourceError> {
        let raw: Vec<DestinationIdDto> = self
            .get_json(&["check-dest".to_owned(), origin.to_string()])
            .await?;
        into_destinations(raw).map_err(AvailabilitySourceError::decode)
    }

    async fn fetch_dates(&self, route: RouteKey) -> Result<Vec<String>, AvailabilitySourceError> {
        let flight: CheckFlightDto = self
            .get_json(&[
                "check-flight".to_owned(),
                route.origin().to_string(),
                route.destination().to_string(),
            ])
            .await?;
        Ok(flight.from)
    }
}

fn endpoint(base_url: &Url, segments: &[String]) -> Result<Url, AvailabilitySourceError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|()| {
            AvailabilitySourceError::invalid_request(format!(
                "ticketing base URL `{base_url}` cannot carry a path"
            ))
        })?
        .pop_if_empty()
        .push("custom")
        .extend(segments);
    Ok(url)
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, AvailabilitySourceError> {
    serde_json::from_slice(body).map_err(|error| {
        AvailabilitySourceError::decode(format!("invalid ticketing JSON payload: {error}"))
    })
}

fn map_transport_error(error: reqwest::Error) -> AvailabilitySourceError {
    if error.is_timeout() {
        AvailabilitySourceError::timeout(error.to_string())
    } else if error.is_decode() {
        AvailabilitySourceError::decode(error.to_string())
    } else {
        AvailabilitySourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> AvailabilitySourceError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => AvailabilitySourceError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            AvailabilitySourceError::timeout(message)
        }
        _ => AvailabilitySourceError::status(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network ticketing helpers.

    use super::*;
    use rstest::rstest;

    fn base(raw: &str) -> Url {
        Url::parse(raw).expect("valid base URL")
    }

    #[rstest]
    #[case("https://ticket.vanillasky.ge", "https://ticket.vanillasky.ge/custom/check-dest/1")]
    #[case("https://ticket.vanillasky.ge/", "https://ticket.vanillasky.ge/custom/check-dest/1")]
    #[case("http://127.0.0.1:8080/mirror/", "http://127.0.0.1:8080/mirror/custom/check-dest/1")]
    fn endpoints_are_built_under_the_base_path(#[case] raw: &str, #[case] expected: &str) {
        let url = endpoint(&base(raw), &["check-dest".to_owned(), "1".to_owned()])
            .expect("endpoint builds");
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn cannot_be_a_base_urls_are_rejected() {
        let error = endpoint(&base("mailto:ops@example.com"), &[]).expect_err("must fail");
        assert!(matches!(error, AvailabilitySourceError::InvalidRequest { .. }));
    }

    #[rstest]
    #[case::rate_limited(StatusCode::TOO_MANY_REQUESTS, "RateLimited")]
    #[case::request_timeout(StatusCode::REQUEST_TIMEOUT, "Timeout")]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT, "Timeout")]
    #[case::not_found(StatusCode::NOT_FOUND, "Status")]
    #[case::server_error(StatusCode::BAD_GATEWAY, "Status")]
    fn maps_http_statuses_to_expected_domain_errors(
        #[case] status: StatusCode,
        #[case] expected: &str,
    ) {
        let error = map_status_error(status, b"<html>  upstream   down </html>");
        let matched = match expected {
            "RateLimited" => matches!(error, AvailabilitySourceError::RateLimited { .. }),
            "Timeout" => matches!(error, AvailabilitySourceError::Timeout { .. }),
            "Status" => matches!(error, AvailabilitySourceError::Status { .. }),
            _ => panic!("unsupported test expectation: {expected}"),
        };
        assert!(matched, "{status} mapped to {error:?}");
    }

    #[test]
    fn status_messages_carry_a_compact_body_preview() {
        let body = b"<html>\n  upstream   down\n</html>";
        let error = map_status_error(StatusCode::BAD_GATEWAY, body);
        assert_eq!(
            error,
            AvailabilitySourceError::status("status 502: <html> upstream down </html>")
        );
    }

    #[test]
    fn long_bodies_are_truncated_in_previews() {
        let body = "x".repeat(400);
        let preview = body_preview(body.as_bytes());
        assert_eq!(preview.len(), 163);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn destinations_accept_numbers_and_numeric_strings() {
        let raw: Vec<DestinationIdDto> = decode(br#"[4, "5", 8]"#).expect("JSON should decode");
        let ids = into_destinations(raw).expect("ids are integers");
        assert_eq!(
            ids,
            vec![LocationId::new(4), LocationId::new(5), LocationId::new(8)]
        );
    }

    #[test]
    fn non_numeric_destination_is_a_decode_error() {
        let raw: Vec<DestinationIdDto> = decode(br#"["batumi"]"#).expect("JSON should decode");
        let error = into_destinations(raw)
            .map_err(AvailabilitySourceError::decode)
            .expect_err("must fail");
        assert!(matches!(error, AvailabilitySourceError::Decode { .. }));
    }

    #[test]
    fn flight_dates_are_read_from_the_from_field() {
        let flight: CheckFlightDto =
            decode(br#"{"from": ["2024-05-02", "2024-05-01"], "to": ["2024-05-09"]}"#)
                .expect("JSON should decode");
        assert_eq!(flight.from, vec!["2024-05-02", "2024-05-01"]);
    }

    #[rstest]
    #[case::missing_field(br#"{"to": []}"#.as_slice())]
    #[case::not_json(b"<html>maintenance</html>".as_slice())]
    #[case::wrong_shape(br#"{"from": "2024-05-01"}"#.as_slice())]
    fn malformed_flight_payloads_are_decode_errors(#[case] body: &[u8]) {
        let error = decode::<CheckFlightDto>(body).expect_err("must fail");
        assert!(matches!(error, AvailabilitySourceError::Decode { .. }));
    }
}
