//! Authorization and account permission checks.
//!
//! Two questions are answered here, both before anything is written to the
//! [`SecretStore`]:
//!
//! * does a name/secret pair match a stored [`Authorization`]? Checked for publishing and
//!   expiring challenge responses, and for rotating an authorization's secret.
//! * may the holder of an account secret create an authorization for a name? Checked
//!   against the account's permit patterns.
//!
//! Every secret comparison is constant-time. Failures never say which part was wrong.

use crate::error::Error;
use crate::model::{normalize_name, strip_labels, Authorization};
use crate::secret::constant_time_eq;
use crate::store::SecretStore;
use serde::Deserialize;

/// The pattern that permits every name.
const ANY_NAME: &str = ".";

/// An administrative credential scoping which names authorizations may be created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub secret: String,
    /// Ordered permit patterns: a literal name, a `.suffix` pattern, or `.` for any name.
    pub permit_domains: Vec<String>,
}

impl Account {
    /// Whether this account may create an authorization for `requested_name`.
    ///
    /// Patterns are trimmed and lowercased. `.` matches any name. A pattern starting with a
    /// dot matches names that end with it, which needs at least one more label: `.example.com`
    /// matches `test.example.com` but neither `example.com` nor `evilexample.com`. Anything
    /// else must equal the name. A pattern that makes no sense simply never matches.
    #[must_use]
    pub fn is_permitted(&self, requested_name: &str) -> bool {
        let requested_name = normalize_name(requested_name);
        self.permit_domains.iter().any(|pattern| {
            let pattern = pattern.trim().to_ascii_lowercase();
            if pattern == ANY_NAME {
                true
            } else if pattern.starts_with('.') {
                requested_name.ends_with(&pattern)
            } else {
                !pattern.is_empty() && pattern == requested_name
            }
        })
    }
}

/// An account as written in the configuration file, keyed by its secret.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountConfig {
    pub name: String,
    /// Omitted means any name.
    #[serde(default)]
    pub permit: Option<Vec<String>>,
}

/// The configured accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountTable {
    accounts: Vec<Account>,
}

impl AccountTable {
    #[must_use]
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    /// Build the table from the configuration file's `secret -> account` map.
    pub fn from_config<'a>(
        entries: impl IntoIterator<Item = (&'a String, &'a AccountConfig)>,
    ) -> Self {
        let mut accounts: Vec<Account> = entries
            .into_iter()
            .map(|(secret, config)| Account {
                name: config.name.clone(),
                secret: secret.clone(),
                permit_domains: config
                    .permit
                    .clone()
                    .unwrap_or_else(|| vec![ANY_NAME.to_string()]),
            })
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Self { accounts }
    }

    /// The account holding `secret`, if any.
    ///
    /// Every entry is compared, so the time taken doesn't depend on which account (if any)
    /// matched.
    #[must_use]
    pub fn find_by_secret(&self, secret: &str) -> Option<&Account> {
        self.accounts.iter().fold(None, |found, account| {
            let matched = constant_time_eq(&account.secret, secret);
            found.or(matched.then_some(account))
        })
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Deployment-wide policy for creating authorizations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountPolicy {
    /// No account table configured: anyone may create an authorization for any name.
    Open,
    /// An account secret is required, and the account must permit the name.
    Restricted(AccountTable),
}

/// How a name/secret pair is matched to a stored [`Authorization`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthorizationStrategy {
    /// Only an authorization for exactly the requested name.
    #[default]
    Exact,
    /// Fall back to an authorization one label up, if that authorization was created with
    /// `suffix_match` set.
    SuffixDelegation,
}

#[derive(Debug, Clone)]
pub struct AuthorizationMatcher {
    policy: AccountPolicy,
    strategy: AuthorizationStrategy,
}

impl AuthorizationMatcher {
    #[must_use]
    pub fn new(policy: AccountPolicy, strategy: AuthorizationStrategy) -> Self {
        Self { policy, strategy }
    }

    pub fn strategy(&self) -> AuthorizationStrategy {
        self.strategy
    }

    /// Find the authorization for `name` whose secret is `secret`.
    ///
    /// A wrong secret and an unknown name both give `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageFailure`] if the store can't be read.
    pub async fn find_authorization(
        &self,
        store: &(dyn SecretStore + Send + Sync),
        name: &str,
        secret: &str,
    ) -> Result<Option<Authorization>, Error> {
        let name = normalize_name(name);
        if let Some(authorization) = Self::with_secret(store, &name, secret).await? {
            return Ok(Some(authorization));
        }
        if self.strategy == AuthorizationStrategy::SuffixDelegation {
            let parent = strip_labels(&name, 1);
            if !parent.is_empty() {
                return Ok(Self::with_secret(store, &parent, secret)
                    .await?
                    .filter(|a| a.suffix_match));
            }
        }
        Ok(None)
    }

    async fn with_secret(
        store: &(dyn SecretStore + Send + Sync),
        name: &str,
        secret: &str,
    ) -> Result<Option<Authorization>, Error> {
        Ok(store
            .find_authorization_by_name(name)
            .await?
            .filter(|a| constant_time_eq(&a.secret, secret)))
    }

    /// Decide whether the holder of `account_secret` may create an authorization for
    /// `requested_name`, returning the owning account (`None` in open mode).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthorizationDenied`] if the secret matches no account or the account
    /// doesn't permit the name.
    pub fn authorize_creation(
        &self,
        account_secret: Option<&str>,
        requested_name: &str,
    ) -> Result<Option<&Account>, Error> {
        match &self.policy {
            AccountPolicy::Open => Ok(None),
            AccountPolicy::Restricted(table) => {
                let account = table
                    .find_by_secret(account_secret.unwrap_or_default())
                    .ok_or(Error::AuthorizationDenied)?;
                if account.is_permitted(requested_name) {
                    Ok(Some(account))
                } else {
                    tracing::debug!(
                        "account \"{}\" is not permitted \"{requested_name}\"",
                        account.name
                    );
                    Err(Error::AuthorizationDenied)
                }
            }
        }
    }
}
