//! PowerDNS pipe backend.
//!
//! PowerDNS spawns the backend as a coprocess and talks to it over stdin/stdout, one line per
//! message, tab separated. Only ABI version 1 is spoken.
//!
//! # Handshake
//!
//! ```text
//! > HELO	1
//! < OK	ACME Proxy API
//! ```
//!
//! Anything else is answered with `FAIL` and the process exits with a failure status.
//!
//! # Questions
//!
//! Each question is answered with zero or more `DATA` lines and a closing `END`. E.g. with a
//! response published for `example.com`:
//!
//! ```text
//! > Q	_acme-challenge.example.com	IN	ANY	-1	192.0.2.1
//! < DATA	_acme-challenge.example.com	IN	TXT	5	1	LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo
//! < DATA	_acme-challenge.example.com	IN	SOA	5	1	acme-proxy-ns1.example.com. hostmaster.example.com. 1592267735 0 0 0 0
//! < DATA	_acme-challenge.example.com	IN	NS	5	1	acme-proxy-ns1.example.com
//! < DATA	_acme-challenge.example.com	IN	CAA	5	1	0 issue "letsencrypt.org"
//! < END
//! ```
//!
//! See [`crate::zone`] for the records that are synthesized. Questions other than `Q` (e.g.
//! `AXFR`) get a bare `END`. Lines that don't have six fields are ignored, except one starting
//! with `DEBUGQUIT`, which ends the session. If the state can't be read the reply is `FAIL`
//! and the session carries on.

mod question;
mod session;

pub use session::PipeSession;

use crate::error::Error;
use tokio::io::BufReader;

/// Run a session over the process's stdin and stdout.
///
/// # Errors
///
/// See [`PipeSession::run`].
pub async fn serve_stdio(session: &PipeSession) -> Result<(), Error> {
    session
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}
