use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use oauth2::TokenResponse;
use oauth2::basic::BasicClient;
use oauth2::reqwest::http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, Scope, TokenUrl,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tiny_http::{Response, Server};
use url::Url;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CALLBACK_WAIT: Duration = Duration::from_secs(120);

/// Tokens returned by the oauth flow (in-memory)
#[derive(Debug, Clone)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    /// Scopes the user actually granted; `None` when the provider did not say.
    pub scopes: Option<Vec<String>>,
}

impl Tokens {
    /// An omitted scope list means the request was granted as asked.
    pub fn grants(&self, scope: &str) -> bool {
        scopes_include(self.scopes.as_deref(), scope)
    }
}

pub fn scopes_include(granted: Option<&[String]>, scope: &str) -> bool {
    match granted {
        Some(list) => list.iter().any(|s| s == scope),
        None => true,
    }
}

fn google_client(client_id: &str, client_secret: Option<&str>) -> Result<BasicClient> {
    let client_id = ClientId::new(client_id.to_string());
    let client_secret = client_secret.map(|s| ClientSecret::new(s.to_string()));
    let auth_url = AuthUrl::new(GOOGLE_AUTH_URL.to_string())?;
    let token_url = TokenUrl::new(GOOGLE_TOKEN_URL.to_string())?;
    Ok(BasicClient::new(
        client_id,
        client_secret,
        auth_url,
        Some(token_url),
    ))
}

fn into_tokens<T: TokenResponse<oauth2::basic::BasicTokenType>>(token: &T) -> Tokens {
    Tokens {
        access_token: token.access_token().secret().to_string(),
        refresh_token: token.refresh_token().map(|r| r.secret().to_string()),
        expires_in: token.expires_in().map(|d| d.as_secs()),
        scopes: token
            .scopes()
            .map(|v| v.iter().map(|s| s.as_str().to_string()).collect()),
    }
}

/// Exchange a refresh token for a new access token
pub fn refresh_access_token(
    client_id: &str,
    client_secret: Option<&str>,
    refresh_token: &str,
) -> Result<Tokens> {
    let oauth_client = google_client(client_id, client_secret)?;
    let rt = RefreshToken::new(refresh_token.to_string());
    let token = oauth_client
        .exchange_refresh_token(&rt)
        .request(http_client)
        .map_err(|e| anyhow!("refresh token exchange failed: {e}"))?;
    debug!("refreshed access token");
    Ok(into_tokens(&token))
}

/// Where the loopback listener must bind for a given redirect URI.
pub fn callback_bind_addr(redirect_uri: &str) -> Result<SocketAddr> {
    let redirect = Url::parse(redirect_uri)
        .map_err(|e| anyhow!("Invalid redirect_uri '{redirect_uri}': {e}"))?;

    let host = redirect
        .host_str()
        .ok_or_else(|| anyhow!("redirect_uri missing host: {redirect_uri}"))?;

    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| anyhow!("redirect_uri missing/unknown port: {redirect_uri}"))?;

    let bind_ip: IpAddr = match host {
        "localhost" | "127.0.0.1" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other.parse::<IpAddr>().map_err(|_| {
            anyhow!("redirect_uri host must be localhost/127.0.0.1 or an IP: {other}")
        })?,
    };

    Ok(SocketAddr::new(bind_ip, port))
}

/// What a single request to the callback listener carried.
#[derive(Debug, PartialEq, Eq)]
pub enum Callback {
    Code(String),
    Denied(String),
    Unrelated,
}

/// Inspect a callback path+query such as `/callback?code=...&state=...`.
pub fn parse_callback(path_and_query: &str, expected_state: &str) -> Result<Callback> {
    let parsed = Url::parse("http://localhost")?.join(path_and_query)?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (k, v) in parsed.query_pairs() {
        match k.as_ref() {
            "code" => code = Some(v.into_owned()),
            "state" => state = Some(v.into_owned()),
            "error" => error = Some(v.into_owned()),
            _ => {}
        }
    }

    let state_ok = state.as_deref() == Some(expected_state);
    if let Some(e) = error {
        if !state_ok {
            return Err(anyhow!("OAuth state mismatch in redirect"));
        }
        return Ok(Callback::Denied(e));
    }
    match code {
        Some(c) if state_ok => Ok(Callback::Code(c)),
        Some(_) => Err(anyhow!("OAuth state mismatch in redirect")),
        None => Ok(Callback::Unrelated),
    }
}

/// Authorization Code + PKCE flow. Opens the system browser and captures the
/// code on a loopback listener.
pub fn perform_pkce_flow(
    client_id: &str,
    client_secret: Option<&str>,
    redirect_uri: &str,
    scopes: &[&str],
    login_hint: &str,
) -> Result<Tokens> {
    let bind_addr = callback_bind_addr(redirect_uri)?;

    // listen before the browser can redirect
    let server = Server::http(bind_addr)
        .map_err(|e| anyhow!("Failed to bind OAuth callback server on {bind_addr}: {e:?}"))?;

    let oauth_client = google_client(client_id, client_secret)?
        .set_redirect_uri(RedirectUrl::new(redirect_uri.to_string())?);

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let mut request = oauth_client
        .authorize_url(CsrfToken::new_random)
        .set_pkce_challenge(pkce_challenge)
        // Google only hands out refresh tokens for offline access
        .add_extra_param("access_type", "offline")
        .add_extra_param("login_hint", login_hint);
    for scope in scopes {
        request = request.add_scope(Scope::new(scope.to_string()));
    }
    let (auth_url, csrf_token) = request.url();

    println!("Open this URL in your browser:\n{auth_url}");
    if let Err(e) = open::that(auth_url.as_str()) {
        warn!("could not open browser automatically: {e}");
    }

    let mut code_opt: Option<String> = None;
    let wait_until = Instant::now() + CALLBACK_WAIT;

    while Instant::now() < wait_until {
        let Ok(maybe_request) = server.recv_timeout(Duration::from_millis(500)) else {
            continue;
        };
        let Some(request) = maybe_request else {
            continue;
        };

        match parse_callback(request.url(), csrf_token.secret()) {
            Ok(Callback::Code(code)) => {
                let _ = request.respond(Response::from_string(
                    "Authorization received. You can close this tab.",
                ));
                code_opt = Some(code);
                break;
            }
            Ok(Callback::Denied(reason)) => {
                let _ = request.respond(Response::from_string(
                    "Authorization was declined. You can close this tab.",
                ));
                return Err(anyhow!("Google sign-in declined: {reason}"));
            }
            Ok(Callback::Unrelated) => {
                let _ = request.respond(Response::from_string(
                    "No code found in redirect. You can close this tab.",
                ));
            }
            Err(e) => {
                let _ = request.respond(Response::from_string("Bad redirect"));
                warn!("ignoring callback: {e}");
            }
        }
    }

    let code = code_opt.ok_or_else(|| anyhow!("No code received within timeout"))?;

    let token = oauth_client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(pkce_verifier)
        .request(http_client)
        .map_err(|e| anyhow!("Token exchange failed: {e:?}"))?;

    info!("authorization code exchanged for tokens");
    Ok(into_tokens(&token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_hosts_bind_to_localhost() {
        let addr = callback_bind_addr("http://localhost:8080/callback").unwrap();
        assert_eq!(addr, "127.0.0.1:8080".parse().unwrap());

        let addr = callback_bind_addr("http://127.0.0.1/callback").unwrap();
        assert_eq!(addr.port(), 80);

        assert!(callback_bind_addr("http://example.com:8080/cb").is_err());
        assert!(callback_bind_addr("not a url").is_err());
    }

    #[test]
    fn callback_requires_matching_state() {
        assert_eq!(
            parse_callback("/callback?code=abc&state=s1", "s1").unwrap(),
            Callback::Code("abc".into())
        );
        assert!(parse_callback("/callback?code=abc&state=evil", "s1").is_err());
        assert!(parse_callback("/callback?code=abc", "s1").is_err());
    }

    #[test]
    fn callback_reports_denial_and_noise() {
        assert_eq!(
            parse_callback("/callback?error=access_denied&state=s1", "s1").unwrap(),
            Callback::Denied("access_denied".into())
        );
        // a denial only counts when it answers our own request
        assert!(parse_callback("/callback?error=access_denied", "s1").is_err());
        assert!(parse_callback("/callback?error=access_denied&state=evil", "s1").is_err());
        assert_eq!(
            parse_callback("/favicon.ico", "s1").unwrap(),
            Callback::Unrelated
        );
    }

    #[test]
    fn missing_scope_list_counts_as_granted() {
        let scope = crate::auth::GMAIL_READONLY_SCOPE;
        assert!(scopes_include(None, scope));
        assert!(!scopes_include(Some(&["openid".to_string()]), scope));
        assert!(scopes_include(Some(&[scope.to_string()]), scope));
    }
}
