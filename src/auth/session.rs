use anyhow::Result;

/// Snapshot of the sign-in state, owned by an [`AuthProvider`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
    pub token: Option<String>,
    pub is_authed: bool,
    pub account: String,
    pub scopes_approved: bool,
}

impl AuthSession {
    pub fn signed_out(account: impl Into<String>) -> Self {
        Self {
            token: None,
            is_authed: false,
            account: account.into(),
            scopes_approved: false,
        }
    }

    pub fn signed_in(
        account: impl Into<String>,
        token: impl Into<String>,
        scopes_approved: bool,
    ) -> Self {
        Self {
            token: Some(token.into()),
            is_authed: true,
            account: account.into(),
            scopes_approved,
        }
    }

    /// The token, but only when it may be used to read mail.
    pub fn ready_token(&self) -> Option<&str> {
        if self.is_authed && self.scopes_approved {
            self.token.as_deref()
        } else {
            None
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready_token().is_some()
    }
}

pub trait AuthProvider {
    fn session(&self) -> AuthSession;

    /// Refresh with a stored refresh token if possible, otherwise run the
    /// interactive consent flow.
    fn sign_in(&mut self) -> Result<AuthSession>;

    fn sign_out(&mut self) -> Result<()>;

    /// Silently renew an expired access token. Returns `true` if the token changed.
    fn refresh_if_expired(&mut self) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_withheld_until_scopes_are_approved() {
        let s = AuthSession::signed_in("me@example.com", "tok", false);
        assert!(s.is_authed);
        assert_eq!(s.ready_token(), None);

        let s = AuthSession::signed_in("me@example.com", "tok", true);
        assert_eq!(s.ready_token(), Some("tok"));
    }

    #[test]
    fn signed_out_is_never_ready() {
        let mut s = AuthSession::signed_out("me@example.com");
        s.scopes_approved = true;
        s.token = Some("stale".into());
        assert!(!s.is_ready());
    }
}
