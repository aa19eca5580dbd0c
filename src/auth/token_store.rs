//! Secrets kept in the OS keyring: the OAuth client secret (keyed by client id)
//! and the refresh token (keyed by account email).

use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "venmo_mail";

fn entry(key: &str) -> Result<Entry> {
    Entry::new(SERVICE, key).map_err(|e| anyhow!("keyring entry {key}: {e}"))
}

fn store(key: &str, secret: &str) -> Result<()> {
    entry(key)?
        .set_password(secret)
        .map_err(|e| anyhow!(e.to_string()))
}

fn fetch(key: &str) -> Result<Option<String>> {
    match entry(key)?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

pub fn save_refresh_token(account: &str, refresh_token: &str) -> Result<()> {
    store(account, refresh_token)
}

pub fn load_refresh_token(account: &str) -> Result<Option<String>> {
    fetch(account)
}

/// Forget the refresh token; a missing entry is not an error.
pub fn delete_refresh_token(account: &str) -> Result<()> {
    match entry(account)?.delete_credential() {
        Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

pub fn save_client_secret(client_id: &str, client_secret: &str) -> Result<()> {
    store(client_id, client_secret)
}

pub fn load_client_secret(client_id: &str) -> Result<Option<String>> {
    fetch(client_id)
}
