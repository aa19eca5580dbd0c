use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::config_dir;

/// Non-secret token metadata stored in ~/.config/venmo_mail/tokens.json
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokensFile {
    pub access_token: Option<String>,
    pub expires_at_epoch: Option<i64>, // epoch seconds
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
}

impl TokensFile {
    /// The cached access token if it has not expired at `now` (epoch seconds).
    pub fn valid_access_token(&self, now: i64) -> Option<&str> {
        match (&self.access_token, self.expires_at_epoch) {
            (Some(at), Some(exp)) if now < exp => Some(at),
            _ => None,
        }
    }
}

pub fn tokens_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("tokens.json");
    Ok(p)
}

/// Remove the cache file; a missing file is fine.
pub fn clear_tokens_at(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

pub fn save_tokens_to(path: &Path, tf: &TokensFile) -> Result<()> {
    let s = serde_json::to_string_pretty(tf)?;
    fs::write(path, s)?;
    Ok(())
}

pub fn load_tokens_from(path: &Path) -> Result<Option<TokensFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path)?;
    let tf: TokensFile = serde_json::from_str(&s)?;
    Ok(Some(tf))
}
