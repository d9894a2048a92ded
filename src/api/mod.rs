//! HTTP API for managing authorizations and publishing challenge responses.
//!
//! Requests are form encoded (`application/x-www-form-urlencoded`) `POST`s. Successful
//! responses are JSON of the form `{"result": ...}`. Failures are `{"result": false}` with an
//! `error` description and an HTTP status: 400 for missing or invalid fields, 403 when the
//! secret doesn't match, 409 for a duplicate authorization and 500 for storage failures. A
//! 403 never says whether the name or the secret was wrong.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/create_authorisation` (POST)
//!
//!   Fields: `name`, `secret` (the account secret, required when accounts are configured),
//!   `suffix_match` (`true` to let the authorization cover names one label down, only honored
//!   when suffix delegation is enabled).
//!
//!   ```json
//!   {"result": {"authorisation": "example.com", "suffix_match": false, "secret": "..."}}
//!   ```
//!
//! ## `/expire_authorisation` (POST)
//!
//!   Fields: `name`, `secret`. Replaces the authorization's secret, returning the new one in
//!   the same shape as `/create_authorisation`.
//!
//! ## `/publish_response` (POST)
//!
//!   Fields: `name`, `response` (the DNS-01 challenge value), `secret`. The response is served
//!   as `TXT` at `_acme-challenge.<name>` for five minutes, or until expired.
//!
//!   ```json
//!   {"result": {"authorisation": "example.com", "suffix_match": false, "published": true}}
//!   ```
//!
//! ## `/expire_response` (POST)
//!
//!   Fields: `name`, `secret`. Stops serving every response published for `name`. `expired` is
//!   `false` when there was nothing left to expire.
//!
//!   ```json
//!   {"result": {"authorisation": "example.com", "suffix_match": false, "expired": true}}
//!   ```
//!
//! ## `/dns/lookup/<qname>/<qtype>` (GET)
//!
//!   The same answers the [pipe backend][crate::pipe] gives, in the PowerDNS remote backend
//!   format:
//!
//!   ```json
//!   {"result": [{"qtype": "TXT", "qname": "_acme-challenge.example.com", "ttl": 5, "content": "..."}]}
//!   ```
//!
//!   Any other `/dns/...` remote backend call gets HTTP 501 and `{"result": false}`.

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::new;
