//! ACME Proxy
//!
//! A PowerDNS backend serving [RFC-8555][RFC-8555] [DNS-01] challenge responses.
//!
//! ACME clients holding an authorization secret for a name publish their challenge response
//! over a small [HTTP API][crate::api]. PowerDNS runs the [pipe backend][crate::pipe] and asks
//! it for `_acme-challenge` records, which are [synthesized][crate::zone] on every question
//! from the responses published in the last five minutes. There is no zone to maintain:
//! delegate `_acme-challenge.<name>` (or `<name>` itself) to the PowerDNS server and publish.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod pipe;
pub mod secret;
pub mod service;
pub mod store;
pub mod zone;

pub use api::new as new_http;
pub use config::{Config, Shared};
pub use pipe::PipeSession;
pub use service::ChallengeService;
pub use store::{FileSecretStore, InMemorySecretStore};
