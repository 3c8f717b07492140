use anyhow::{Context, Result};
use keyring::Entry;

use super::seal;

const SERVICE_NAME: &str = "fintrack";

/// Keychain account under which the session-seal secret lives
const SEAL_SECRET_ACCOUNT: &str = "__session_seal_secret";

/// OS keychain access for remembered passwords and the seal secret.
pub struct CredentialStore;

impl CredentialStore {
    fn entry(account: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, account)
            .with_context(|| format!("Failed to open keychain entry for {}", account))
    }

    pub fn remember_password(username: &str, password: &str) -> Result<()> {
        Self::entry(username)?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    /// Remembered password for `username`, if one was stored
    pub fn remembered_password(username: &str) -> Option<String> {
        Self::entry(username).ok()?.get_password().ok()
    }

    pub fn forget_password(username: &str) -> Result<()> {
        Self::entry(username)?
            .delete_credential()
            .context("Failed to delete password from keychain")
    }

    /// Secret used to seal sessions at rest, created on first use.
    pub fn seal_secret() -> Result<String> {
        let entry = Self::entry(SEAL_SECRET_ACCOUNT)?;
        if let Ok(secret) = entry.get_password() {
            return Ok(secret);
        }

        let secret = seal::generate_secret();
        entry
            .set_password(&secret)
            .context("Failed to store session secret in keychain")?;
        Ok(secret)
    }
}
