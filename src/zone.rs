//! Synthesized zone data.
//!
//! There is no zone file or record database. Every time a question is answered the record set
//! is rebuilt from the challenge responses that are live at that moment.
//!
//! For each live response for `foo.example.com` the following are served:
//!
//! | Name | Types |
//! |---|---|
//! | `_acme-challenge.foo.example.com` | `TXT` (the token), `SOA`, `NS`, `CAA` |
//! | `foo.example.com` | `SOA`, `NS`, `CAA` |
//! | `example.com` | `SOA`, `NS`, `CAA` |
//!
//! Claiming authority at all three levels covers the challenge name having been delegated to
//! us at `_acme-challenge`, at the zone itself or one label up, and the `CAA` records let
//! Let's Encrypt issue for the zone wherever the delegation sits.
//!
//! Every record has a 5 second TTL, and the `SOA` serial is the current unix time, so it
//! changes on every call.

use crate::model::{normalize_name, strip_labels, Response};
use std::collections::HashSet;
use std::str::FromStr;
use time::OffsetDateTime;
use trust_dns_proto::rr::RecordType;

pub const RECORD_TTL: u32 = 5;
pub const CHALLENGE_LABEL: &str = "_acme-challenge";
const CAA_CONTENT: &str = "0 issue \"letsencrypt.org\"";

/// A synthesized resource record, in presentation format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecord {
    /// Lowercase owner name, without a trailing dot.
    pub name: String,
    pub record_type: RecordType,
    pub ttl: u32,
    pub content: String,
}

/// The full synthesized record set, in generation order.
///
/// Holds at most one record per name and type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneRecords {
    records: Vec<ZoneRecord>,
    seen: HashSet<(String, RecordType)>,
}

impl ZoneRecords {
    fn push(&mut self, name: &str, record_type: RecordType, content: String) {
        if self.seen.insert((name.to_string(), record_type)) {
            self.records.push(ZoneRecord {
                name: name.to_string(),
                record_type,
                ttl: RECORD_TTL,
                content,
            });
        }
    }

    /// The record of `record_type` at `name`, if one was synthesized.
    pub fn get(&self, name: &str, record_type: RecordType) -> Option<&ZoneRecord> {
        let name = normalize_name(name);
        self.records
            .iter()
            .find(|r| r.name == name && r.record_type == record_type)
    }

    /// Records answering a question for `qname` and `qtype`, in generation order.
    ///
    /// `qtype` is a type mnemonic as sent by a DNS server, e.g. `TXT`, or `ANY` to match every
    /// type. An unknown mnemonic matches nothing.
    pub fn answers<'a>(&'a self, qname: &str, qtype: &str) -> impl Iterator<Item = &'a ZoneRecord> {
        let qname = normalize_name(qname);
        let qtype = parse_qtype(qtype);
        self.records.iter().filter(move |r| {
            r.name == qname
                && match qtype {
                    Some(RecordType::ANY) => true,
                    Some(t) => t == r.record_type,
                    None => false,
                }
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZoneRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_qtype(qtype: &str) -> Option<RecordType> {
    let qtype = qtype.trim().to_ascii_uppercase();
    if qtype.is_empty() || !qtype.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    RecordType::from_str(&qtype).ok()
}

/// Builds [`ZoneRecords`] from live responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSynthesizer {
    soa_hostname: String,
    soa_contact: String,
}

impl RecordSynthesizer {
    /// `soa_hostname` doubles as the `NS` target. Trailing dots are dropped from both.
    #[must_use]
    pub fn new(soa_hostname: &str, soa_contact: &str) -> Self {
        Self {
            soa_hostname: soa_hostname.trim_end_matches('.').to_string(),
            soa_contact: soa_contact.trim_end_matches('.').to_string(),
        }
    }

    /// Synthesize every record for the responses live at `now`.
    ///
    /// Responses are taken newest first, so when a name has several live responses the most
    /// recent one provides the `TXT` content.
    pub fn generate(&self, responses: &[Response], now: OffsetDateTime) -> ZoneRecords {
        let mut live: Vec<&Response> = responses.iter().filter(|r| r.is_live(now)).collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let soa = self.soa_content(now);
        let mut zone = ZoneRecords::default();
        for response in live {
            let name = normalize_name(&response.name);
            let challenge_name = format!("{CHALLENGE_LABEL}.{name}");
            zone.push(&challenge_name, RecordType::TXT, response.response.clone());
            self.push_authority(&mut zone, &challenge_name, &soa);

            for depth in 0..=1 {
                let zone_name = strip_labels(&name, depth);
                if !zone_name.is_empty() {
                    self.push_authority(&mut zone, &zone_name, &soa);
                }
            }
        }
        zone
    }

    fn push_authority(&self, zone: &mut ZoneRecords, name: &str, soa: &str) {
        zone.push(name, RecordType::SOA, soa.to_string());
        zone.push(name, RecordType::NS, self.soa_hostname.clone());
        zone.push(name, RecordType::CAA, CAA_CONTENT.to_string());
    }

    fn soa_content(&self, now: OffsetDateTime) -> String {
        format!(
            "{}. {}. {} 0 0 0 0",
            self.soa_hostname,
            self.soa_contact,
            now.unix_timestamp()
        )
    }
}
