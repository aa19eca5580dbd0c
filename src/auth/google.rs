use anyhow::Result;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::oauth::{self, Tokens, scopes_include};
use crate::auth::session::{AuthProvider, AuthSession};
use crate::auth::tokens_file::{self, TokensFile};
use crate::auth::{GMAIL_READONLY_SCOPE, token_store};
use crate::config::Config;

// Used when the provider does not report a lifetime.
const FALLBACK_LIFETIME_SECS: i64 = 3500;

fn now_epoch() -> Result<i64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64)
}

/// Access token, expiry and granted scopes currently held in memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct TokenState {
    access_token: Option<String>,
    expires_at: Option<i64>,
    scopes: Option<Vec<String>>,
}

impl TokenState {
    fn from_cache(tf: &TokensFile, now: i64) -> Option<Self> {
        let at = tf.valid_access_token(now)?;
        Some(Self {
            access_token: Some(at.to_string()),
            expires_at: tf.expires_at_epoch,
            scopes: tf.scopes.clone(),
        })
    }

    /// Take over a token response; returns what should go to the cache file.
    fn adopt(&mut self, t: Tokens, now: i64) -> TokensFile {
        let exp = t
            .expires_in
            .map(|s| now + s as i64)
            .unwrap_or(now + FALLBACK_LIFETIME_SECS);

        // a refresh response may omit scopes; keep what the consent granted
        if t.scopes.is_some() {
            self.scopes = t.scopes;
        }
        self.access_token = Some(t.access_token);
        self.expires_at = Some(exp);

        TokensFile {
            access_token: self.access_token.clone(),
            expires_at_epoch: self.expires_at,
            scopes: self.scopes.clone(),
        }
    }

    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    fn needs_refresh(&self, now: i64) -> bool {
        self.access_token.is_some() && self.is_expired(now)
    }

    /// Expired token with nothing to renew it from: forget it. Returns the
    /// refresh token to use otherwise.
    fn on_expiry(&mut self, stored_refresh: Option<String>) -> Option<String> {
        if stored_refresh.is_none() {
            *self = Self::default();
        }
        stored_refresh
    }

    fn session(&self, account: &str) -> AuthSession {
        match &self.access_token {
            Some(token) => AuthSession::signed_in(
                account,
                token.clone(),
                scopes_include(self.scopes.as_deref(), GMAIL_READONLY_SCOPE),
            ),
            None => AuthSession::signed_out(account),
        }
    }
}

/// A refreshed grant is only good enough if it still covers Gmail reads;
/// otherwise the user has to consent again.
fn refreshed_grant_usable(t: &Tokens) -> bool {
    t.grants(GMAIL_READONLY_SCOPE)
}

/// An unreadable cache is treated as absent.
fn load_cache(path: &Path) -> Option<TokensFile> {
    match tokens_file::load_tokens_from(path) {
        Ok(tf) => tf,
        Err(e) => {
            warn!("ignoring unreadable token cache {}: {e}", path.display());
            None
        }
    }
}

/// Clear the cache file and the refresh token. Both steps always run; the
/// first failure is reported.
fn forget(tokens_path: &Path, delete_refresh: impl FnOnce() -> Result<()>) -> Result<()> {
    let cleared = tokens_file::clear_tokens_at(tokens_path);
    let deleted = delete_refresh();
    cleared.and(deleted)
}

/// Google sign-in backed by the keyring (refresh token) and the tokens file
/// (access token, expiry, granted scopes).
pub struct GoogleAuth {
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
    account: String,
    tokens_path: PathBuf,

    state: TokenState,
}

impl GoogleAuth {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client_id = cfg.client_id.clone();
        let client_secret = token_store::load_client_secret(&client_id)?
            .or_else(|| std::env::var("OAUTH_CLIENT_SECRET").ok());

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri: cfg.redirect_uri(),
            account: cfg.user_email()?,
            tokens_path: tokens_file::tokens_path()?,
            state: TokenState::default(),
        })
    }

    /// Pick up a previous session without user interaction: a cached access
    /// token if still valid, else a refresh. Leaves the session signed out if
    /// neither works.
    pub fn restore(&mut self) -> Result<AuthSession> {
        let now = now_epoch()?;
        if let Some(cached) =
            load_cache(&self.tokens_path).and_then(|tf| TokenState::from_cache(&tf, now))
        {
            info!("using cached access token for {}", self.account);
            self.state = cached;
            return Ok(self.session());
        }

        if let Some(rt) = token_store::load_refresh_token(&self.account)? {
            match oauth::refresh_access_token(&self.client_id, self.client_secret.as_deref(), &rt)
            {
                Ok(t) => self.adopt(t, now),
                Err(e) => warn!("silent refresh failed: {e}"),
            }
        }
        Ok(self.session())
    }

    fn adopt(&mut self, t: Tokens, now: i64) {
        if let Some(rt) = &t.refresh_token
            && let Err(e) = token_store::save_refresh_token(&self.account, rt)
        {
            warn!("could not store refresh token in keyring: {e}");
        }

        let tf = self.state.adopt(t, now);
        if let Err(e) = tokens_file::save_tokens_to(&self.tokens_path, &tf) {
            warn!("couldn't save tokens metadata: {e}");
        }
    }
}

impl AuthProvider for GoogleAuth {
    fn session(&self) -> AuthSession {
        self.state.session(&self.account)
    }

    fn sign_in(&mut self) -> Result<AuthSession> {
        let now = now_epoch()?;

        if let Some(rt) = token_store::load_refresh_token(&self.account)? {
            match oauth::refresh_access_token(&self.client_id, self.client_secret.as_deref(), &rt)
            {
                Ok(t) if refreshed_grant_usable(&t) => {
                    self.adopt(t, now);
                    info!("signed in {} with stored refresh token", self.account);
                    return Ok(self.session());
                }
                Ok(_) => info!("stored grant lacks Gmail access; asking for consent again"),
                Err(e) => warn!("refresh failed: {e}, falling back to interactive auth"),
            }
        }

        let t = oauth::perform_pkce_flow(
            &self.client_id,
            self.client_secret.as_deref(),
            &self.redirect_uri,
            &[GMAIL_READONLY_SCOPE],
            &self.account,
        )?;
        self.adopt(t, now);
        info!("signed in {}", self.account);
        Ok(self.session())
    }

    fn sign_out(&mut self) -> Result<()> {
        self.state = TokenState::default();
        let account = self.account.clone();
        forget(&self.tokens_path, || token_store::delete_refresh_token(&account))?;
        info!("signed out {}", self.account);
        Ok(())
    }

    fn refresh_if_expired(&mut self) -> Result<bool> {
        let now = now_epoch()?;
        if !self.state.needs_refresh(now) {
            return Ok(false);
        }
        let stored = token_store::load_refresh_token(&self.account)?;
        let Some(rt) = self.state.on_expiry(stored) else {
            return Ok(true);
        };
        let t = oauth::refresh_access_token(&self.client_id, self.client_secret.as_deref(), &rt)?;
        self.adopt(t, now);
        Ok(true)
    }
}
