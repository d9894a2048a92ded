//! Authorization and challenge response storage.
//!
//! Supports a generic interface over the handful of lookups and updates the rest of the
//! crate needs. Nothing outside this module builds queries: every case-insensitive lookup
//! is a named method with a documented contract.
//!
//! Two implementations are provided, [`memory::InMemorySecretStore`] and
//! [`file::FileSecretStore`]. The former is not durable across restarts. The latter keeps
//! its state in a JSON file that is re-read for every lookup, so a PowerDNS spawned
//! [pipe backend][crate::pipe] process sees updates made through the [HTTP API][crate::api]
//! process.

use crate::error::Error;
use crate::model::{Authorization, Response};
use std::net::IpAddr;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

pub mod file;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use file::FileSecretStore;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemorySecretStore;

/// `DynSecretStore` is a type alias for a [`SecretStore`] that can be used by multiple
/// read/write consumers that coordinate through an [`Arc`] and a [`RwLock`] wrapping the
/// [`SecretStore`].
#[allow(clippy::module_name_repetitions)]
pub type DynSecretStore = Arc<RwLock<dyn SecretStore + Send + Sync>>;

/// An async trait describing storage of [`Authorization`]s and published [`Response`]s.
///
/// All `name` arguments are compared case-insensitively.
#[async_trait::async_trait]
pub trait SecretStore {
    /// The authorization for `name`, if one exists.
    async fn find_authorization_by_name(&self, name: &str)
        -> Result<Option<Authorization>, Error>;

    /// Every response live at `now`, in creation order.
    async fn list_live_responses(&self, now: OffsetDateTime) -> Result<Vec<Response>, Error>;

    /// Record a newly published challenge response.
    async fn insert_response(
        &mut self,
        name: &str,
        token: &str,
        created_by_ip: IpAddr,
        now: OffsetDateTime,
    ) -> Result<Response, Error>;

    /// Set `expired_at = now` on every response for `name` that hasn't already expired,
    /// returning how many were changed.
    async fn mark_responses_expired(&mut self, name: &str, now: OffsetDateTime)
        -> Result<usize, Error>;

    /// Create an authorization for `name` with a fresh secret, returning the secret.
    ///
    /// Fails with [`Error::AuthorizationExists`] if `name` already has one.
    async fn insert_authorization(
        &mut self,
        name: &str,
        account: Option<String>,
        suffix_match: bool,
        created_by_ip: IpAddr,
        now: OffsetDateTime,
    ) -> Result<String, Error>;

    /// Replace the secret of `authorization` with a fresh one, returning the new secret.
    async fn rotate_authorization_secret(
        &mut self,
        authorization: &Authorization,
    ) -> Result<String, Error>;
}
