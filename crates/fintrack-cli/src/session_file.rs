//! Carries the session between invocations as a sealed file in the cache
//! directory. The file never holds plaintext tokens.

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use fintrack_core::{CredentialStore, SessionSeal, SessionStore};
use tracing::{debug, warn};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.seal";

pub struct SessionFile {
    cache_dir: PathBuf,
    /// Explicit seal secret; the keychain is consulted when absent
    secret: Option<String>,
    seal: OnceLock<SessionSeal>,
}

impl SessionFile {
    pub fn new(cache_dir: PathBuf, secret: Option<String>) -> Self {
        Self {
            cache_dir,
            secret,
            seal: OnceLock::new(),
        }
    }

    /// The seal, derived on first use so commands that never touch a
    /// session file do not need the keychain.
    fn seal(&self) -> Result<&SessionSeal> {
        if let Some(seal) = self.seal.get() {
            return Ok(seal);
        }
        let secret = match &self.secret {
            Some(secret) => secret.clone(),
            None => CredentialStore::seal_secret()?,
        };
        let seal = SessionSeal::new(&secret).context("Invalid session secret")?;
        Ok(self.seal.get_or_init(|| seal))
    }

    /// Load the stored session into a fresh store. A file that cannot be
    /// unsealed (other secret, corruption) is discarded and the store is
    /// left empty.
    pub fn load(&self) -> Result<SessionStore> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(SessionStore::new());
        }

        let contents = std::fs::read_to_string(&path)
            .context("Failed to read session file")?;

        match self.seal()?.unseal(&contents) {
            Ok(session) => {
                debug!(user_id = %session.user_id(), "Session loaded");
                Ok(SessionStore::with_session(session))
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable session file");
                std::fs::remove_file(&path).context("Failed to remove session file")?;
                Ok(SessionStore::new())
            }
        }
    }

    /// Write back whatever the store holds now; an empty store removes the file.
    pub async fn save(&self, store: &SessionStore) -> Result<()> {
        let path = self.session_path();
        match store.snapshot().await {
            Some(session) => {
                std::fs::create_dir_all(&self.cache_dir)?;
                let sealed = self.seal()?.seal(&session).context("Failed to seal session")?;
                std::fs::write(&path, sealed).context("Failed to write session file")?;
            }
            None => {
                if path.exists() {
                    std::fs::remove_file(&path).context("Failed to remove session file")?;
                }
            }
        }
        Ok(())
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}
