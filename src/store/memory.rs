use crate::error::Error;
use crate::model::{normalize_name, Authorization, Response};
use crate::secret::generate_secret;
use crate::store::SecretStore;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use time::OffsetDateTime;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::module_name_repetitions)]
pub struct InMemorySecretStore {
    #[serde(default)]
    authorizations: Vec<Authorization>,
    #[serde(default)]
    responses: Vec<Response>,
}

impl InMemorySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing authorization, e.g. one provisioned out of band.
    #[must_use]
    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorizations.push(authorization);
        self
    }

    /// Seed the store with an existing response.
    #[must_use]
    pub fn with_response(mut self, response: Response) -> Self {
        self.responses.push(response);
        self
    }

    pub fn authorizations(&self) -> &[Authorization] {
        &self.authorizations
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    fn authorization_position(&self, name: &str) -> Option<usize> {
        let name = normalize_name(name);
        self.authorizations
            .iter()
            .position(|a| normalize_name(&a.name) == name)
    }
}

#[async_trait::async_trait]
impl SecretStore for InMemorySecretStore {
    async fn find_authorization_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Authorization>, Error> {
        Ok(self
            .authorization_position(name)
            .map(|i| self.authorizations[i].clone()))
    }

    async fn list_live_responses(&self, now: OffsetDateTime) -> Result<Vec<Response>, Error> {
        Ok(self
            .responses
            .iter()
            .filter(|r| r.is_live(now))
            .cloned()
            .collect())
    }

    async fn insert_response(
        &mut self,
        name: &str,
        token: &str,
        created_by_ip: IpAddr,
        now: OffsetDateTime,
    ) -> Result<Response, Error> {
        let response = Response {
            name: normalize_name(name),
            response: token.to_string(),
            created_at: now,
            created_by_ip,
            expired_at: None,
        };
        self.responses.push(response.clone());
        Ok(response)
    }

    async fn mark_responses_expired(
        &mut self,
        name: &str,
        now: OffsetDateTime,
    ) -> Result<usize, Error> {
        let name = normalize_name(name);
        let mut count = 0;
        for response in self
            .responses
            .iter_mut()
            .filter(|r| normalize_name(&r.name) == name)
            .filter(|r| r.expired_at.map_or(true, |at| at > now))
        {
            response.expired_at = Some(now);
            count += 1;
        }
        Ok(count)
    }

    async fn insert_authorization(
        &mut self,
        name: &str,
        account: Option<String>,
        suffix_match: bool,
        created_by_ip: IpAddr,
        now: OffsetDateTime,
    ) -> Result<String, Error> {
        let name = normalize_name(name);
        if self.authorization_position(&name).is_some() {
            return Err(Error::AuthorizationExists(name));
        }
        let secret = generate_secret();
        self.authorizations.push(Authorization {
            name,
            secret: secret.clone(),
            account,
            suffix_match,
            created_at: now,
            created_by_ip,
        });
        Ok(secret)
    }

    async fn rotate_authorization_secret(
        &mut self,
        authorization: &Authorization,
    ) -> Result<String, Error> {
        let i = self
            .authorization_position(&authorization.name)
            .ok_or(Error::AuthorizationDenied)?;
        let secret = generate_secret();
        self.authorizations[i].secret = secret.clone();
        Ok(secret)
    }
}
