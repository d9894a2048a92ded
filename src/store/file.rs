//! A JSON file-backed implementation of the [`SecretStore`][super::SecretStore] trait.
//!
//! Wraps an [`InMemorySecretStore`][super::memory::InMemorySecretStore] state, persisting
//! updates to a JSON file on disk. Unlike the in-memory store, state isn't held between
//! calls: every lookup re-reads the file so separate processes sharing one state file stay
//! in step.
use crate::error::Error;
use crate::model::{Authorization, Response};
use crate::store::memory::InMemorySecretStore;
use crate::store::SecretStore;
use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// A file-backed store. After each update the JSON file on disk is atomically replaced with
/// the new state.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// Open the JSON state file at the given path, creating an empty one if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageFailure`] if the file can't be read or created, or doesn't
    /// hold valid state.
    pub async fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let store = Self {
            path: p.as_ref().to_path_buf(),
        };
        match fs::metadata(&store.path).await {
            Ok(_) => {
                store.load().await?;
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!("creating empty state file {}", store.path.display());
                store.save(&InMemorySecretStore::default()).await?;
            }
            Err(err) => return Err(Error::storage("reading state file metadata", err)),
        }
        Ok(store)
    }

    async fn load(&self) -> Result<InMemorySecretStore, Error> {
        let contents = fs::read(&self.path)
            .await
            .map_err(|err| Error::storage("reading state file", err))?;
        serde_json::from_slice(&contents).map_err(|err| Error::storage("parsing state file", err))
    }

    /// Write to a sibling temporary file and rename it over the state file, so a concurrent
    /// reader never sees a partial write.
    async fn save(&self, state: &InMemorySecretStore) -> Result<(), Error> {
        let data = serde_json::to_string_pretty(state)
            .map_err(|err| Error::storage("serializing state", err))?;
        let tmp_path = self.path.with_extension("tmp");
        let write = async {
            let mut output_file = fs::File::create(&tmp_path).await?;
            output_file.write_all(data.as_bytes()).await?;
            output_file.sync_all().await?;
            fs::rename(&tmp_path, &self.path).await
        };
        write
            .await
            .map_err(|err| Error::storage("writing state file", err))
    }
}

#[async_trait::async_trait]
impl SecretStore for FileSecretStore {
    async fn find_authorization_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Authorization>, Error> {
        self.load().await?.find_authorization_by_name(name).await
    }

    async fn list_live_responses(&self, now: OffsetDateTime) -> Result<Vec<Response>, Error> {
        self.load().await?.list_live_responses(now).await
    }

    async fn insert_response(
        &mut self,
        name: &str,
        token: &str,
        created_by_ip: IpAddr,
        now: OffsetDateTime,
    ) -> Result<Response, Error> {
        let mut state = self.load().await?;
        let response = state
            .insert_response(name, token, created_by_ip, now)
            .await?;
        self.save(&state).await?;
        Ok(response)
    }

    async fn mark_responses_expired(
        &mut self,
        name: &str,
        now: OffsetDateTime,
    ) -> Result<usize, Error> {
        let mut state = self.load().await?;
        let count = state.mark_responses_expired(name, now).await?;
        if count > 0 {
            self.save(&state).await?;
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
        let mut state = self.load().await?;
        let secret = state
            .insert_authorization(name, account, suffix_match, created_by_ip, now)
            .await?;
        self.save(&state).await?;
        Ok(secret)
    }

    async fn rotate_authorization_secret(
        &mut self,
        authorization: &Authorization,
    ) -> Result<String, Error> {
        let mut state = self.load().await?;
        let secret = state.rotate_authorization_secret(authorization).await?;
        self.save(&state).await?;
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2020-06-16 00:35:35 UTC);

    fn localhost() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    #[tokio::test]
    async fn creates_missing_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileSecretStore::try_from_file(&path).await.unwrap();
        assert!(path.exists());
        assert!(store.list_live_responses(NOW).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_are_visible_to_other_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut writer = FileSecretStore::try_from_file(&path).await.unwrap();
        let reader = FileSecretStore::try_from_file(&path).await.unwrap();

        let secret = writer
            .insert_authorization("example.com", Some("ops".into()), false, localhost(), NOW)
            .await
            .unwrap();
        writer
            .insert_response("example.com", "test_response", localhost(), NOW)
            .await
            .unwrap();

        let authorization = reader
            .find_authorization_by_name("Example.COM")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(authorization.secret, secret);
        assert_eq!(authorization.account.as_deref(), Some("ops"));
        let live = reader.list_live_responses(NOW).await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].response, "test_response");

        assert_eq!(writer.mark_responses_expired("example.com", NOW).await.unwrap(), 1);
        assert!(reader.list_live_responses(NOW).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_state_is_a_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = FileSecretStore::try_from_file(&path).await.unwrap_err();
        assert!(matches!(err, Error::StorageFailure(_)));
    }
}
