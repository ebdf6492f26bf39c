//! Order-insensitive digest of an availability date set.
//!
//! Both sides of every change comparison go through [`AvailabilityDigest::of_dates`],
//! so a stored digest and a freshly fetched one are always comparable.
//!
//! The canonical form is the lexicographically sorted dates serialised as a
//! compact JSON array (`["2024-05-01","2024-05-02"]`), hashed with SHA-256 and
//! rendered as lowercase hex. The sort is plain string ordering, not
//! date-aware.

use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Digest of the empty date set: SHA-256 of `[]`.
pub const EMPTY_DATES_DIGEST: &str =
    "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945";

const DIGEST_HEX_LEN: usize = 64;

/// Hex-encoded SHA-256 digest of a normalised date set.
///
/// # Examples
/// ```
/// use flightwatch::domain::AvailabilityDigest;
///
/// let a = AvailabilityDigest::of_dates(&["2024-05-02", "2024-05-01"]);
/// let b = AvailabilityDigest::of_dates(&["2024-05-01", "2024-05-02"]);
/// assert_eq!(a, b);
/// assert_eq!(a.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AvailabilityDigest(String);

/// Returned when a stored digest column is not 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("availability digest must be {DIGEST_HEX_LEN} lowercase hex characters, got {raw:?}")]
pub struct DigestParseError {
    raw: String,
}

impl AvailabilityDigest {
    /// Compute the digest of `dates`. The caller's slice is left untouched.
    pub fn of_dates<S: AsRef<str>>(dates: &[S]) -> Self {
        let mut sorted = dates.iter().map(AsRef::as_ref).collect::<Vec<&str>>();
        sorted.sort_unstable();
        let canonical = Value::Array(sorted.into_iter().map(Value::from).collect()).to_string();
        let hash = Sha256::digest(canonical.as_bytes());
        Self(hex::encode(hash))
    }

    /// Digest of the empty date set.
    pub fn empty() -> Self {
        Self(EMPTY_DATES_DIGEST.to_owned())
    }

    /// Validate a digest read back from storage.
    pub fn parse(raw: &str) -> Result<Self, DigestParseError> {
        let valid = raw.len() == DIGEST_HEX_LEN
            && raw
                .bytes()
                .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte));
        if valid {
            Ok(Self(raw.to_owned()))
        } else {
            Err(DigestParseError {
                raw: raw.to_owned(),
            })
        }
    }

    /// Hex rendering.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for AvailabilityDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
