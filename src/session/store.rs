//! Durable, process-wide credential store. The store owns the only mutable copy
//! of the [`Session`]; every reader goes through it and observers follow
//! changes through a watch channel.

use super::{Session, UserRecord};
use anyhow::{Context, Result, anyhow, bail};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

/// The three durable keys, written together on `set` and removed together on
/// `clear`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Serialized `UserRecord`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

pub trait CredentialStorage: Send + Sync {
    /// # Errors
    /// Returns an error if the backing medium cannot be read or decoded.
    fn load(&self) -> Result<PersistedCredentials>;

    /// # Errors
    /// Returns an error if the credentials cannot be written.
    fn save(&self, credentials: &PersistedCredentials) -> Result<()>;

    /// # Errors
    /// Returns an error if existing credentials cannot be removed.
    fn erase(&self) -> Result<()>;
}

/// Stores the credentials as one JSON document. Writes go to a sibling temp
/// file which is then renamed over the target, so the keys change together.
#[derive(Clone, Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CredentialStorage for FileStorage {
    fn load(&self) -> Result<PersistedCredentials> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(PersistedCredentials::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.path.display()));
            }
        };

        serde_json::from_str(&contents)
            .with_context(|| format!("failed to decode {}", self.path.display()))
    }

    fn save(&self, credentials: &PersistedCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let payload = serde_json::to_vec_pretty(credentials)?;
        let temp_path = self.temp_path();

        fs::write(&temp_path, payload)
            .with_context(|| format!("failed to write {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("failed to restrict {}", temp_path.display()))?;
        }

        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))
    }

    fn erase(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }
}

/// In-process storage, used when nothing should outlive the process and in tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<PersistedCredentials>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStorage for MemoryStorage {
    fn load(&self) -> Result<PersistedCredentials> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("credential storage lock poisoned"))?;
        Ok(inner.clone())
    }

    fn save(&self, credentials: &PersistedCredentials) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("credential storage lock poisoned"))?;
        *inner = credentials.clone();
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("credential storage lock poisoned"))?;
        *inner = PersistedCredentials::default();
        Ok(())
    }
}

pub struct CredentialStore {
    storage: Arc<dyn CredentialStorage>,
    state: watch::Sender<Session>,
    // serializes set/clear so a storage write and the state update stay paired
    writes: Mutex<()>,
}

impl CredentialStore {
    /// Reconstructs the session from storage. Absent, partial or unreadable
    /// data yields an empty session.
    #[must_use]
    pub fn load(storage: Arc<dyn CredentialStorage>) -> Self {
        let session = match storage.load() {
            Ok(persisted) => decode(persisted),
            Err(err) => {
                warn!("ignoring persisted credentials: {err:#}");
                Session::default()
            }
        };

        debug!(authenticated = session.is_authenticated(), "credential store loaded");

        let (state, _) = watch::channel(session);

        Self {
            storage,
            state,
            writes: Mutex::new(()),
        }
    }

    /// Replaces the whole session. Storage is written first; on failure the
    /// in-memory session is left as it was.
    ///
    /// # Errors
    /// Returns an error if a token is empty or the credentials cannot be persisted.
    #[instrument(skip_all, fields(user.id = %user.id))]
    pub fn set(
        &self,
        user: UserRecord,
        access_token: SecretString,
        refresh_token: SecretString,
    ) -> Result<()> {
        let _writes = self.writes.lock().unwrap_or_else(PoisonError::into_inner);

        self.write(user, access_token, refresh_token)
    }

    /// Like [`CredentialStore::set`], but only while the stored refresh token
    /// is still `expected`. Returns `false` without writing when the session
    /// was cleared or replaced in the meantime.
    ///
    /// # Errors
    /// Returns an error if a token is empty or the credentials cannot be persisted.
    #[instrument(skip_all, fields(user.id = %user.id))]
    pub fn set_if_current(
        &self,
        expected: &SecretString,
        user: UserRecord,
        access_token: SecretString,
        refresh_token: SecretString,
    ) -> Result<bool> {
        let _writes = self.writes.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.state.borrow().refresh_token().expose_secret().to_string();
        if current.is_empty() || current != expected.expose_secret() {
            debug!("session changed, skipping write");
            return Ok(false);
        }

        self.write(user, access_token, refresh_token)?;

        Ok(true)
    }

    fn write(
        &self,
        user: UserRecord,
        access_token: SecretString,
        refresh_token: SecretString,
    ) -> Result<()> {
        if access_token.expose_secret().is_empty() || refresh_token.expose_secret().is_empty() {
            bail!("refusing to store a session with an empty token");
        }

        let persisted = PersistedCredentials {
            access_token: Some(access_token.expose_secret().to_string()),
            refresh_token: Some(refresh_token.expose_secret().to_string()),
            user: Some(serde_json::to_string(&user)?),
        };

        self.storage
            .save(&persisted)
            .context("failed to persist credentials")?;

        self.state
            .send_replace(Session::new(user, access_token, refresh_token));

        debug!("session updated");

        Ok(())
    }

    /// Empties the session and erases the persisted keys. Returns whether the
    /// in-memory session held anything; observers are only notified then.
    ///
    /// # Errors
    /// Returns an error if the persisted keys cannot be removed. The in-memory
    /// session is cleared regardless.
    #[instrument(skip_all)]
    pub fn clear(&self) -> Result<bool> {
        let _writes = self.writes.lock().unwrap_or_else(PoisonError::into_inner);

        let cleared = self.state.send_if_modified(|session| {
            if session.is_empty() {
                false
            } else {
                *session = Session::default();
                true
            }
        });

        self.storage
            .erase()
            .context("failed to erase persisted credentials")?;

        debug!(cleared, "session cleared");

        Ok(cleared)
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn access_token(&self) -> SecretString {
        self.state.borrow().access_token().clone()
    }

    #[must_use]
    pub fn refresh_token(&self) -> SecretString {
        self.state.borrow().refresh_token().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserRecord> {
        self.state.borrow().user().cloned()
    }

    /// Subscribes to session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }
}

fn decode(persisted: PersistedCredentials) -> Session {
    let PersistedCredentials {
        access_token: Some(access_token),
        refresh_token: Some(refresh_token),
        user: Some(user),
    } = persisted
    else {
        return Session::default();
    };

    if access_token.is_empty() || refresh_token.is_empty() {
        return Session::default();
    }

    match serde_json::from_str::<UserRecord>(&user) {
        Ok(user) => Session::new(
            user,
            SecretString::from(access_token),
            SecretString::from(refresh_token),
        ),
        Err(err) => {
            warn!("ignoring persisted user record: {err}");
            Session::default()
        }
    }
}
