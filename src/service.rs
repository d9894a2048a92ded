//! The challenge operations behind the [HTTP API][crate::api], and fresh zone data for the
//! [pipe backend][crate::pipe].
//!
//! Every mutating operation is checked by the [`AuthorizationMatcher`] before the store is
//! touched.

use crate::auth::{AuthorizationMatcher, AuthorizationStrategy};
use crate::clock::SharedClock;
use crate::config::Config;
use crate::error::Error;
use crate::model::{validate_name, validate_response};
use crate::store::DynSecretStore;
use crate::zone::{RecordSynthesizer, ZoneRecords};
use base64::engine::general_purpose;
use base64::{alphabet, engine, Engine};
use lazy_static::lazy_static;
use std::net::IpAddr;
use std::sync::Arc;

pub type SharedService = Arc<ChallengeService>;

const DNS01_DECODED_LEN_BYTES: usize = 32;

lazy_static! {
    static ref BASE64_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub authorization: String,
    pub suffix_match: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expired {
    pub authorization: String,
    pub suffix_match: bool,
    /// Whether any unexpired response was found for the name.
    pub expired: bool,
}

/// The result of creating an authorization or rotating its secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Granted {
    pub authorization: String,
    pub suffix_match: bool,
    pub secret: String,
}

pub struct ChallengeService {
    store: DynSecretStore,
    matcher: AuthorizationMatcher,
    synthesizer: RecordSynthesizer,
    clock: SharedClock,
    require_dns01_tokens: bool,
}

impl ChallengeService {
    #[must_use]
    pub fn new(
        store: DynSecretStore,
        matcher: AuthorizationMatcher,
        synthesizer: RecordSynthesizer,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            matcher,
            synthesizer,
            clock,
            require_dns01_tokens: false,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config, store: DynSecretStore, clock: SharedClock) -> Self {
        let matcher =
            AuthorizationMatcher::new(config.account_policy(), config.authorization_strategy());
        let synthesizer = RecordSynthesizer::new(&config.soa_hostname, &config.soa_contact());
        Self {
            require_dns01_tokens: config.require_dns01_tokens,
            ..Self::new(store, matcher, synthesizer, clock)
        }
    }

    /// Only accept tokens shaped like an RFC 8555 DNS-01 key authorization digest.
    #[must_use]
    pub fn require_dns01_tokens(mut self, require: bool) -> Self {
        self.require_dns01_tokens = require;
        self
    }

    /// Publish `token` as the challenge response for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`], [`Error::InvalidResponse`] or [`Error::InvalidDNS01`] for
    /// bad input, [`Error::AuthorizationDenied`] if `secret` doesn't authorize `name`, and
    /// [`Error::StorageFailure`] if the store fails.
    pub async fn publish_response(
        &self,
        name: &str,
        token: &str,
        secret: &str,
        client_ip: IpAddr,
    ) -> Result<Published, Error> {
        let name = validate_name(name)?;
        validate_response(token)?;
        if self.require_dns01_tokens {
            valid_dns01(token)?;
        }

        let mut store = self.store.write().await;
        let Some(authorization) = self.matcher.find_authorization(&*store, &name, secret).await?
        else {
            tracing::debug!("rejected publish from {client_ip} for \"{name}\"");
            return Err(Error::AuthorizationDenied);
        };
        store
            .insert_response(&name, token, client_ip, self.clock.now())
            .await?;
        tracing::info!(
            "published response from {client_ip} for \"{name}\" under \"{}\"",
            authorization.name
        );
        Ok(Published {
            authorization: authorization.name,
            suffix_match: authorization.suffix_match,
        })
    }

    /// Expire every unexpired response for `name`, e.g. once the challenge has been validated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthorizationDenied`] if `secret` doesn't authorize `name`, and
    /// [`Error::StorageFailure`] if the store fails.
    pub async fn expire_response(
        &self,
        name: &str,
        secret: &str,
        client_ip: IpAddr,
    ) -> Result<Expired, Error> {
        let name = validate_name(name)?;
        let mut store = self.store.write().await;
        let Some(authorization) = self.matcher.find_authorization(&*store, &name, secret).await?
        else {
            tracing::debug!("rejected expiry from {client_ip} for \"{name}\"");
            return Err(Error::AuthorizationDenied);
        };
        let count = store.mark_responses_expired(&name, self.clock.now()).await?;
        tracing::info!("expired {count} response(s) for \"{name}\" from {client_ip}");
        Ok(Expired {
            authorization: authorization.name,
            suffix_match: authorization.suffix_match,
            expired: count > 0,
        })
    }

    /// Create an authorization for `name`, returning its secret.
    ///
    /// `account_secret` is only needed when accounts are configured. `suffix_match` is only
    /// stored when suffix delegation is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthorizationDenied`] if the account secret is unknown or the account
    /// isn't permitted `name`, [`Error::AuthorizationExists`] if `name` already has an
    /// authorization, and [`Error::StorageFailure`] if the store fails.
    pub async fn create_authorization(
        &self,
        name: &str,
        account_secret: Option<&str>,
        suffix_match: bool,
        client_ip: IpAddr,
    ) -> Result<Granted, Error> {
        let name = validate_name(name)?;
        let account = match self.matcher.authorize_creation(account_secret, &name) {
            Ok(account) => account.map(|a| a.name.clone()),
            Err(err) => {
                tracing::debug!("rejected authorization request from {client_ip} for \"{name}\"");
                return Err(err);
            }
        };
        let suffix_match =
            suffix_match && self.matcher.strategy() == AuthorizationStrategy::SuffixDelegation;

        let secret = self
            .store
            .write()
            .await
            .insert_authorization(&name, account.clone(), suffix_match, client_ip, self.clock.now())
            .await?;
        tracing::info!(
            "created authorization for \"{name}\" from {client_ip} (account: {})",
            account.as_deref().unwrap_or("none")
        );
        Ok(Granted {
            authorization: name,
            suffix_match,
            secret,
        })
    }

    /// Replace the secret of the authorization `secret` currently unlocks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthorizationDenied`] if `secret` doesn't authorize `name`, and
    /// [`Error::StorageFailure`] if the store fails.
    pub async fn renew_authorization(
        &self,
        name: &str,
        secret: &str,
        client_ip: IpAddr,
    ) -> Result<Granted, Error> {
        let name = validate_name(name)?;
        let mut store = self.store.write().await;
        let Some(authorization) = self.matcher.find_authorization(&*store, &name, secret).await?
        else {
            tracing::debug!("rejected secret rotation from {client_ip} for \"{name}\"");
            return Err(Error::AuthorizationDenied);
        };
        let secret = store.rotate_authorization_secret(&authorization).await?;
        tracing::info!(
            "rotated secret of authorization \"{}\" from {client_ip}",
            authorization.name
        );
        Ok(Granted {
            authorization: authorization.name,
            suffix_match: authorization.suffix_match,
            secret,
        })
    }

    /// The record set for the responses live right now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageFailure`] if the store can't be read.
    pub async fn zone(&self) -> Result<ZoneRecords, Error> {
        let now = self.clock.now();
        let responses = self.store.read().await.list_live_responses(now).await?;
        Ok(self.synthesizer.generate(&responses, now))
    }
}

fn valid_dns01(token: &str) -> Result<(), Error> {
    match BASE64_ENGINE.decode(token) {
        Ok(raw) if raw.len() == DNS01_DECODED_LEN_BYTES => Ok(()),
        Ok(raw) => {
            tracing::debug!(
                "response decodes to {} bytes, expected {DNS01_DECODED_LEN_BYTES}",
                raw.len()
            );
            Err(Error::InvalidDNS01)
        }
        Err(err) => {
            tracing::debug!("response isn't valid base64: {err}");
            Err(Error::InvalidDNS01)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Account, AccountPolicy, AccountTable};
    use crate::clock::FixedClock;
    use crate::store::{InMemorySecretStore, SecretStore};
    use tokio::sync::RwLock;

    const NOW: i64 = 1_592_267_735;

    fn localhost() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    fn service_with(policy: AccountPolicy, strategy: AuthorizationStrategy) -> ChallengeService {
        let store: DynSecretStore = Arc::new(RwLock::new(InMemorySecretStore::new()));
        ChallengeService::new(
            store,
            AuthorizationMatcher::new(policy, strategy),
            RecordSynthesizer::new("acme-proxy-ns1.example.com", "hostmaster.example.com"),
            Arc::new(FixedClock::at_unix(NOW).unwrap()),
        )
    }

    fn open_service() -> ChallengeService {
        service_with(AccountPolicy::Open, AuthorizationStrategy::Exact)
    }

    #[tokio::test]
    async fn publish_then_serve_then_expire() {
        let service = open_service();
        let granted = service
            .create_authorization("ExAMplE.cOm", None, false, localhost())
            .await
            .unwrap();
        assert_eq!(granted.authorization, "example.com");

        let published = service
            .publish_response("exAMple.coM", "random_secret", &granted.secret, localhost())
            .await
            .unwrap();
        assert_eq!(published.authorization, "example.com");

        let zone = service.zone().await.unwrap();
        let txt: Vec<_> = zone
            .answers("_acme-challenge.example.com", "TXT")
            .map(|r| r.content.as_str())
            .collect();
        assert_eq!(txt, ["random_secret"]);

        let expired = service
            .expire_response("example.com", &granted.secret, localhost())
            .await
            .unwrap();
        assert!(expired.expired);
        assert!(service.zone().await.unwrap().is_empty());

        let again = service
            .expire_response("example.com", &granted.secret, localhost())
            .await
            .unwrap();
        assert!(!again.expired);
    }

    #[tokio::test]
    async fn wrong_secret_and_unknown_name_are_denied_alike() {
        let service = open_service();
        let granted = service
            .create_authorization("example.com", None, false, localhost())
            .await
            .unwrap();

        let wrong_secret = service
            .publish_response("example.com", "random_secret", "wrong_secret", localhost())
            .await
            .unwrap_err();
        let unknown_name = service
            .publish_response("example.org", "random_secret", &granted.secret, localhost())
            .await
            .unwrap_err();
        assert_eq!(wrong_secret.to_string(), unknown_name.to_string());
        assert!(matches!(wrong_secret, Error::AuthorizationDenied));
        assert!(service.zone().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn renewal_invalidates_the_old_secret() {
        let service = open_service();
        let old = service
            .create_authorization("example.com", None, false, localhost())
            .await
            .unwrap()
            .secret;
        let new = service
            .renew_authorization("EXAMPLE.com", &old, localhost())
            .await
            .unwrap()
            .secret;
        assert_ne!(old, new);

        assert!(matches!(
            service
                .publish_response("example.com", "token", &old, localhost())
                .await,
            Err(Error::AuthorizationDenied)
        ));
        assert!(service
            .publish_response("example.com", "token", &new, localhost())
            .await
            .is_ok());
        assert!(matches!(
            service.renew_authorization("example.com", "wrong_secret", localhost()).await,
            Err(Error::AuthorizationDenied)
        ));
    }

    #[tokio::test]
    async fn creation_respects_account_permissions() {
        let table = AccountTable::new(vec![Account {
            name: "developers".to_string(),
            secret: "18084e750a1cff6f2d627e7a568ab81a".to_string(),
            permit_domains: vec![".example.com".to_string()],
        }]);
        let service = service_with(
            AccountPolicy::Restricted(table),
            AuthorizationStrategy::Exact,
        );
        let secret = Some("18084e750a1cff6f2d627e7a568ab81a");

        assert!(service
            .create_authorization("test.example.com", secret, false, localhost())
            .await
            .is_ok());
        for (name, secret) in [
            ("example.com", secret),
            ("test.example.org", secret),
            ("other.example.com", Some("wrong_secret")),
            ("other.example.com", None),
        ] {
            assert!(
                matches!(
                    service.create_authorization(name, secret, false, localhost()).await,
                    Err(Error::AuthorizationDenied)
                ),
                "{name} with {secret:?} should be denied"
            );
        }

        let stored = service
            .store
            .read()
            .await
            .find_authorization_by_name("test.example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.account.as_deref(), Some("developers"));
    }

    #[tokio::test]
    async fn duplicate_creation_is_refused() {
        let service = open_service();
        service
            .create_authorization("example.com", None, false, localhost())
            .await
            .unwrap();
        assert!(matches!(
            service
                .create_authorization("Example.COM", None, false, localhost())
                .await,
            Err(Error::AuthorizationExists(_))
        ));
    }

    #[tokio::test]
    async fn suffix_match_only_sticks_with_delegation_enabled() {
        let exact = open_service();
        let granted = exact
            .create_authorization("example.com", None, true, localhost())
            .await
            .unwrap();
        assert!(!granted.suffix_match);

        let delegating = service_with(AccountPolicy::Open, AuthorizationStrategy::SuffixDelegation);
        let granted = delegating
            .create_authorization("example.com", None, true, localhost())
            .await
            .unwrap();
        assert!(granted.suffix_match);

        let published = delegating
            .publish_response("www.example.com", "token", &granted.secret, localhost())
            .await
            .unwrap();
        assert_eq!(published.authorization, "example.com");
        assert!(published.suffix_match);
        assert!(delegating
            .zone()
            .await
            .unwrap()
            .get("_acme-challenge.www.example.com", trust_dns_proto::rr::RecordType::TXT)
            .is_some());
    }

    #[tokio::test]
    async fn input_validation() {
        let service = open_service().require_dns01_tokens(true);
        let secret = service
            .create_authorization("example.com", None, false, localhost())
            .await
            .unwrap()
            .secret;

        assert!(matches!(
            service.create_authorization("bad name", None, false, localhost()).await,
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            service
                .publish_response("example.com", "tok\nDATA", &secret, localhost())
                .await,
            Err(Error::InvalidResponse)
        ));
        assert!(matches!(
            service
                .publish_response("example.com", "not_a_digest", &secret, localhost())
                .await,
            Err(Error::InvalidDNS01)
        ));
        assert!(service
            .publish_response(
                "example.com",
                "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo",
                &secret,
                localhost()
            )
            .await
            .is_ok());
    }
}
