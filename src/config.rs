use crate::auth::{AccountConfig, AccountPolicy, AccountTable, AuthorizationStrategy};
use crate::error::Error;
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub type Shared = Arc<Config>;

pub const DEFAULT_BANNER: &str = "ACME Proxy API";

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Primary name server in synthesized `SOA` records, and the `NS` record target.
    pub soa_hostname: String,
    /// Responsible mailbox in synthesized `SOA` records, either in `SOA` form
    /// (`hostmaster.example.com`) or as an email address.
    pub soa_contact: String,
    /// Sent in the pipe handshake reply.
    #[serde(default = "default_banner")]
    pub banner: String,
    /// JSON state file. State is kept in memory when unset, which only suits testing: the
    /// pipe backend runs in a separate process and would never see published responses.
    #[serde(default)]
    pub state_path: Option<String>,
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub api_timeout: Duration,
    #[serde(default)]
    pub api_allow_public_bind: bool,
    /// Take the client address from the first `X-Forwarded-For` entry. Only set this behind a
    /// proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
    #[serde(default)]
    pub suffix_delegation: bool,
    #[serde(default)]
    pub require_dns01_tokens: bool,
    /// Account secret to account. Unset means anyone may create authorizations.
    #[serde(default)]
    pub accounts: Option<HashMap<String, AccountConfig>>,
}

fn default_banner() -> String {
    DEFAULT_BANNER.to_string()
}

lazy_static! {
    // NOTE(XXX): Once the "ip" feature has stabilized we can use Ipv6Addr.is_unique_local[0].
    //            Presently this feature is unstable so we home-roll. See also RFC 4193[1].
    // [0]: https://doc.rust-lang.org/std/net/struct.Ipv6Addr.html#method.is_unique_local
    // [1]: https://www.rfc-editor.org/rfc/rfc4193.html
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
}

impl Config {
    /// Load and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read, [`Error::InvalidJSON`] if it isn't a
    /// valid config, and [`Error::InsecureAPIBind`] for a public API bind address that hasn't
    /// been explicitly allowed.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.bind_addr_is_secure()?;
        Ok(conf)
    }

    pub fn account_policy(&self) -> AccountPolicy {
        match &self.accounts {
            None => AccountPolicy::Open,
            Some(accounts) => AccountPolicy::Restricted(AccountTable::from_config(accounts)),
        }
    }

    pub fn authorization_strategy(&self) -> AuthorizationStrategy {
        if self.suffix_delegation {
            AuthorizationStrategy::SuffixDelegation
        } else {
            AuthorizationStrategy::Exact
        }
    }

    /// The `SOA` responsible mailbox, converting `user@domain` to `user.domain` and escaping
    /// dots in the local part.
    pub fn soa_contact(&self) -> Cow<str> {
        match self.soa_contact.split_once('@') {
            Some((user, domain)) => {
                let user = user.replace('.', "\\.");
                Cow::Owned(format!("{user}.{domain}"))
            }
            _ => Cow::Borrowed(&self.soa_contact),
        }
    }

    fn bind_addr_is_secure(&self) -> Result<(), Error> {
        if self.api_allow_public_bind {
            return Ok(());
        }
        match self.api_bind_addr {
            SocketAddr::V4(v4_addr) => {
                let ip = v4_addr.ip();
                if !ip.is_loopback() && !ip.is_private() {
                    return Err(Error::InsecureAPIBind(IpAddr::V4(*ip)));
                }
                Ok(())
            }
            SocketAddr::V6(v6_addr) => {
                let ip = v6_addr.ip();
                if !ip.is_loopback() && !IPV6_UNIQUE_LOCAL_NETWORK.contains(IpAddr::V6(*ip)) {
                    return Err(Error::InsecureAPIBind(IpAddr::V6(*ip)));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn config(value: serde_json::Value) -> Result<Config, Error> {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(value.to_string().as_bytes()).unwrap();
        Config::try_from_file(f.path())
    }

    fn minimal(api_bind_addr: &str) -> serde_json::Value {
        json!({
            "soa_hostname": "acme-proxy-ns1.example.com",
            "soa_contact": "hostmaster.example.com",
            "api_bind_addr": api_bind_addr,
            "api_timeout": 10,
        })
    }

    #[test]
    fn defaults() {
        let conf = config(minimal("127.0.0.1:8080")).unwrap();
        assert_eq!(conf.banner, DEFAULT_BANNER);
        assert_eq!(conf.api_timeout, Duration::from_secs(10));
        assert_eq!(conf.state_path, None);
        assert_eq!(conf.account_policy(), AccountPolicy::Open);
        assert_eq!(conf.authorization_strategy(), AuthorizationStrategy::Exact);
        assert_eq!(conf.soa_contact(), "hostmaster.example.com");
    }

    #[test]
    fn accounts_make_creation_restricted() {
        let mut value = minimal("10.0.0.1:8080");
        value["suffix_delegation"] = json!(true);
        value["accounts"] = json!({
            "dbb62ae39642b9d2e81ee7a5e5e8d175": {
                "name": "operations-team",
                "permit": ["example.com", ".example.org"],
            },
            "18084e750a1cff6f2d627e7a568ab81a": { "name": "developers" },
        });
        let conf = config(value).unwrap();
        assert_eq!(
            conf.authorization_strategy(),
            AuthorizationStrategy::SuffixDelegation
        );
        match conf.account_policy() {
            AccountPolicy::Restricted(table) => {
                let ops = table.find_by_secret("dbb62ae39642b9d2e81ee7a5e5e8d175").unwrap();
                assert_eq!(ops.name, "operations-team");
                assert!(ops.is_permitted("www.example.org"));
                assert!(!ops.is_permitted("www.example.com"));
            }
            AccountPolicy::Open => panic!("expected a restricted policy"),
        }
    }

    #[test]
    fn email_contact_is_converted() {
        let mut value = minimal("127.0.0.1:8080");
        value["soa_contact"] = json!("dns.admin@example.com");
        let conf = config(value).unwrap();
        assert_eq!(conf.soa_contact(), "dns\\.admin.example.com");
    }

    #[test]
    fn public_bind_needs_opt_in() {
        assert!(matches!(
            config(minimal("93.184.216.34:443")),
            Err(Error::InsecureAPIBind(_))
        ));
        assert!(matches!(
            config(minimal("[2606:2800:220:1:248:1893:25c8:1946]:443")),
            Err(Error::InsecureAPIBind(_))
        ));
        assert!(config(minimal("[fd00::1]:8080")).is_ok());

        let mut value = minimal("0.0.0.0:8080");
        value["api_allow_public_bind"] = json!(true);
        assert!(config(value).is_ok());
    }

    #[test]
    fn invalid_json() {
        assert!(matches!(
            config(json!({ "soa_hostname": 1 })),
            Err(Error::InvalidJSON(_))
        ));
    }
}
