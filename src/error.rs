//! Error types.

use std::net::IpAddr;

/// Error enumerates the possible ACME Proxy error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when the remote end of a [pipe session][crate::pipe] opens with anything other
    /// than an ABI version 1 `HELO`. Ends the session.
    #[error("pipe protocol violation: {0}")]
    ProtocolViolation(String),

    /// Returned when a pipe line doesn't split into the six question fields. Recoverable, the
    /// line is skipped.
    #[error("malformed question: {0:?}")]
    MalformedQuestion(String),

    /// Returned when a name/secret pair doesn't match a stored authorization, when an account
    /// secret is unknown, or when the account isn't permitted the requested name.
    ///
    /// The cause is deliberately never distinguished.
    #[error("authorization denied")]
    AuthorizationDenied,

    /// Returned when creating an authorization for a name that already has one.
    #[error("an authorization already exists for \"{0}\"")]
    AuthorizationExists(String),

    /// Returned when a name is empty, contains whitespace or control characters, or isn't a
    /// valid DNS name.
    #[error("invalid name: \"{0}\"")]
    InvalidName(String),

    /// Returned when a challenge response token is empty or contains whitespace or control
    /// characters, which can't be carried by the pipe protocol.
    #[error("invalid challenge response")]
    InvalidResponse,

    /// Returned when [`Config::require_dns01_tokens`][crate::config::Config::require_dns01_tokens]
    /// is set and a token isn't a valid [RFC-8555][RFC-8555] [DNS-01] challenge response value.
    ///
    /// These values MUST be a BASE64 encoded 32 byte SHA256 digest.
    ///
    /// [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
    /// [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
    #[error("response value is not a valid DNS-01 challenge response")]
    InvalidDNS01,

    /// Returned when the [`SecretStore`][crate::store::SecretStore] can't be read or written.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// Returned when the [`Config::api_bind_addr`][`crate::config::Config::api_bind_addr`] is
    /// not a loopback address, or an address within a private network space, and
    /// [`Config::api_allow_public_bind`][`crate::config::Config::api_allow_public_bind`] isn't
    /// set. The API is expected to sit behind a TLS terminating proxy.
    #[error("API bind address ({0}) must be a loopback or private IP")]
    InsecureAPIBind(IpAddr),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk fails, e.g.
    /// [trying to load a `Config`][crate::config::Config::try_from_file].
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Self::StorageFailure(format!("{context}: {err}"))
    }
}
