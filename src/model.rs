//! Stored records and name handling shared by the store, matcher and synthesizer.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use time::{Duration, OffsetDateTime};
use trust_dns_proto::rr::Name;

/// How long a published challenge response stays live after creation.
pub const RESPONSE_LIFETIME: Duration = Duration::minutes(5);

/// A name-scoped credential permitting publication and expiry of challenge responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub name: String,
    pub secret: String,
    /// Name of the owning account, `None` when authorization creation is unrestricted.
    #[serde(default)]
    pub account: Option<String>,
    /// Only honored by [`AuthorizationStrategy::SuffixDelegation`][crate::auth::AuthorizationStrategy].
    #[serde(default)]
    pub suffix_match: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by_ip: IpAddr,
}

/// A published ACME challenge response for `_acme-challenge.<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub name: String,
    pub response: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by_ip: IpAddr,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expired_at: Option<OffsetDateTime>,
}

impl Response {
    /// A response is live for [`RESPONSE_LIFETIME`] after creation, unless expired earlier.
    #[must_use]
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        self.created_at > now - RESPONSE_LIFETIME && self.expired_at.map_or(true, |at| at > now)
    }
}

/// Lowercase a name and drop any trailing root label dot. Used on every comparison key.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Normalize a client supplied name, rejecting anything that isn't a plain ASCII DNS name.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] for empty names, names containing whitespace or control
/// characters, and names exceeding DNS label or length limits.
pub fn validate_name(name: &str) -> Result<String, Error> {
    let normalized = normalize_name(name);
    if normalized.is_empty()
        || normalized
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || !c.is_ascii())
    {
        return Err(Error::InvalidName(name.to_string()));
    }
    Name::from_ascii(&normalized).map_err(|_| Error::InvalidName(name.to_string()))?;
    Ok(normalized)
}

/// Reject challenge tokens the line based pipe protocol can't carry.
///
/// # Errors
///
/// Returns [`Error::InvalidResponse`] for empty tokens and tokens containing whitespace or
/// control characters.
pub fn validate_response(token: &str) -> Result<(), Error> {
    if token.is_empty() || token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidResponse);
    }
    Ok(())
}

/// `name` with its `count` leftmost labels removed.
#[must_use]
pub fn strip_labels(name: &str, count: usize) -> String {
    name.split('.').skip(count).collect::<Vec<_>>().join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn response(created_at: OffsetDateTime, expired_at: Option<OffsetDateTime>) -> Response {
        Response {
            name: "example.com".to_string(),
            response: "test_response".to_string(),
            created_at,
            created_by_ip: "127.0.0.1".parse().unwrap(),
            expired_at,
        }
    }

    #[test]
    fn liveness_window() {
        let now = datetime!(2020-06-16 00:35:35 UTC);
        assert!(response(now - Duration::seconds(10), None).is_live(now));
        assert!(!response(now - Duration::minutes(5), None).is_live(now));
        assert!(!response(now - Duration::minutes(6), None).is_live(now));
        assert!(response(now - Duration::seconds(10), Some(now + Duration::seconds(1))).is_live(now));
        assert!(!response(now - Duration::seconds(10), Some(now)).is_live(now));
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_name("ExAmPle.COM."), "example.com");
        assert_eq!(validate_name(" Test.Example.com ").unwrap(), "test.example.com");
        assert_eq!(
            validate_name("_acme-challenge.example.com").unwrap(),
            "_acme-challenge.example.com"
        );
    }

    #[test]
    fn bad_names_are_rejected() {
        for name in ["", ".", "exa mple.com", "example.com\tIN", "exämple.com"] {
            assert!(
                matches!(validate_name(name), Err(Error::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
        let long_label = format!("{}.com", "a".repeat(64));
        assert!(validate_name(&long_label).is_err());
    }

    #[test]
    fn tokens_must_fit_the_pipe_protocol() {
        assert!(validate_response("LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo").is_ok());
        assert!(validate_response("").is_err());
        assert!(validate_response("a\nDATA").is_err());
        assert!(validate_response("a b").is_err());
    }

    #[test]
    fn label_stripping() {
        assert_eq!(strip_labels("test.example.com", 0), "test.example.com");
        assert_eq!(strip_labels("test.example.com", 1), "example.com");
        assert_eq!(strip_labels("com", 1), "");
    }
}
