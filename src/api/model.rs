use crate::service::{Expired, Granted, Published};
use crate::zone::ZoneRecord;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone, Default, Eq, PartialEq)]
pub(super) struct PublishResponseRequest {
    pub name: String,
    pub response: String,
    pub secret: String,
}

/// Body of both `/expire_response` and `/expire_authorisation`.
#[derive(Deserialize, Debug, Clone, Default, Eq, PartialEq)]
pub(super) struct NameSecretRequest {
    pub name: String,
    pub secret: String,
}

#[derive(Deserialize, Debug, Clone, Default, Eq, PartialEq)]
pub(super) struct CreateAuthorizationRequest {
    pub name: String,
    /// The account secret, when accounts are configured.
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub suffix_match: Option<String>,
}

impl CreateAuthorizationRequest {
    pub fn suffix_match(&self) -> bool {
        self.suffix_match
            .as_deref()
            .map_or(false, |v| v.trim().eq_ignore_ascii_case("true"))
    }

    /// An empty `secret` field counts as no secret.
    pub fn account_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }
}

/// Wraps every successful body as `{"result": ...}`.
#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub(super) struct ResultBody<T> {
    pub result: T,
}

impl<T> ResultBody<T> {
    pub fn new(result: T) -> Self {
        Self { result }
    }
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub(super) struct PublishResult {
    pub authorisation: String,
    pub suffix_match: bool,
    pub published: bool,
}

impl From<Published> for PublishResult {
    fn from(p: Published) -> Self {
        Self {
            authorisation: p.authorization,
            suffix_match: p.suffix_match,
            published: true,
        }
    }
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub(super) struct ExpireResult {
    pub authorisation: String,
    pub suffix_match: bool,
    pub expired: bool,
}

impl From<Expired> for ExpireResult {
    fn from(e: Expired) -> Self {
        Self {
            authorisation: e.authorization,
            suffix_match: e.suffix_match,
            expired: e.expired,
        }
    }
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub(super) struct SecretResult {
    pub authorisation: String,
    pub suffix_match: bool,
    pub secret: String,
}

impl From<Granted> for SecretResult {
    fn from(g: Granted) -> Self {
        Self {
            authorisation: g.authorization,
            suffix_match: g.suffix_match,
            secret: g.secret,
        }
    }
}

/// A record in the PowerDNS remote backend lookup format.
#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub(super) struct LookupRecord {
    pub qtype: String,
    pub qname: String,
    pub ttl: u32,
    pub content: String,
}

impl From<&ZoneRecord> for LookupRecord {
    fn from(r: &ZoneRecord) -> Self {
        Self {
            qtype: r.record_type.to_string(),
            qname: r.name.clone(),
            ttl: r.ttl,
            content: r.content.clone(),
        }
    }
}
