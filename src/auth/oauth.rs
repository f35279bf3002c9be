//! Interactive authorization-code login with PKCE.
//!
//! A one-shot listener is bound on the configured redirect URI, the user's
//! browser is pointed at the identity server, and the code delivered to the
//! listener is exchanged for an access token.

use crate::auth::bearer::store;
use crate::auth::identity::{IdentityClient, TokenResponse};
use crate::auth::{bearer_headers, AuthOutcome, AuthRequest, Authenticator, BrowserLauncher};
use crate::cache::CredentialCache;
use crate::constants;
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use url::Url;

const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(300);
const VERIFIER_LENGTH: usize = 64;
const STATE_LENGTH: usize = 32;
const PKCE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

type Callback = HashMap<String, String>;

pub struct OAuthAuthenticator {
    cache: Arc<dyn CredentialCache>,
    browser: Arc<dyn BrowserLauncher>,
    login_timeout: Duration,
}

impl OAuthAuthenticator {
    #[must_use]
    pub fn new(cache: Arc<dyn CredentialCache>, browser: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            cache,
            browser,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    async fn login(
        &self,
        identity: &IdentityClient,
        client_id: &str,
        redirect_uri: &str,
        scopes: &str,
    ) -> Result<TokenResponse, String> {
        let redirect = Url::parse(redirect_uri)
            .map_err(|e| format!("Invalid redirect URI '{redirect_uri}': {e}"))?;
        let verifier = random_string(VERIFIER_LENGTH);
        let state = random_string(STATE_LENGTH);

        let listener = bind_listener(&redirect).await?;
        let (sender, receiver) = oneshot::channel::<Callback>();
        let shutdown = CancellationToken::new();
        let router = Router::new()
            .route(redirect_path(&redirect), get(receive_callback))
            .with_state(Arc::new(Mutex::new(Some(sender))));
        tokio::spawn({
            let shutdown = shutdown.child_token();
            async move {
                let _ = axum::serve(listener, router)
                    .with_graceful_shutdown(async move { shutdown.cancelled().await })
                    .await;
            }
        });

        let authorize_url = Url::parse_with_params(
            &identity.authorize_url(),
            &[
                ("response_type", "code"),
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("scope", scopes),
                ("state", state.as_str()),
                ("code_challenge", code_challenge(&verifier).as_str()),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| format!("Invalid authorize URL: {e}"))?;

        if let Err(e) = self.browser.open(authorize_url.as_str()) {
            tracing::warn!(
                target: constants::LOG_TARGET_AUTH,
                error = %e,
                url = %authorize_url,
                "could not open browser, visit the URL to log in"
            );
        }

        let callback = tokio::time::timeout(self.login_timeout, receiver).await;
        shutdown.cancel();

        let callback = match callback {
            Ok(Ok(callback)) => callback,
            Ok(Err(_)) => return Err("Login listener stopped unexpectedly".to_string()),
            Err(_) => return Err("Timed out waiting for login".to_string()),
        };
        if let Some(error) = callback.get("error") {
            return Err(format!("Login was rejected: {error}"));
        }
        if callback.get("state") != Some(&state) {
            return Err("Login state does not match".to_string());
        }
        let code = callback
            .get("code")
            .ok_or_else(|| "Login response contained no authorization code".to_string())?;

        identity
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", redirect_uri),
                ("client_id", client_id),
                ("code_verifier", verifier.as_str()),
            ])
            .await
    }
}

#[async_trait]
impl Authenticator for OAuthAuthenticator {
    fn name(&self) -> &str {
        "oauth"
    }

    async fn authenticate(&self, request: &AuthRequest) -> AuthOutcome {
        if request.option(constants::AUTH_CLIENT_SECRET).is_some() {
            return AuthOutcome::NotApplicable;
        }
        let (Some(client_id), Some(redirect_uri)) = (
            request.option(constants::AUTH_CLIENT_ID),
            request.option(constants::AUTH_REDIRECT_URI),
        ) else {
            return AuthOutcome::NotApplicable;
        };
        let identity_uri = match request.identity_uri() {
            Ok(identity) => identity,
            Err(reason) => return AuthOutcome::Failed(reason),
        };
        let scopes = request.scopes().unwrap_or_default();
        let key = format!("oauth|{identity_uri}|{client_id}|{redirect_uri}|{scopes}");

        if let Some(entry) = self.cache.get(&key) {
            tracing::debug!(target: constants::LOG_TARGET_AUTH, "using cached login token");
            return AuthOutcome::Authenticated(bearer_headers(&entry.token));
        }

        let identity = IdentityClient::new(&identity_uri, request.insecure);
        match self.login(&identity, client_id, redirect_uri, &scopes).await {
            Ok(token) => {
                store(self.cache.as_ref(), &key, &token.to_cache_entry());
                AuthOutcome::Authenticated(bearer_headers(&token.access_token))
            }
            Err(reason) => AuthOutcome::Failed(reason),
        }
    }
}

async fn receive_callback(
    State(sender): State<Arc<Mutex<Option<oneshot::Sender<Callback>>>>>,
    Query(params): Query<Callback>,
) -> Html<&'static str> {
    if let Some(sender) = sender.lock().ok().and_then(|mut s| s.take()) {
        let _ = sender.send(params);
    }
    Html("<html><body>Login complete. You can close this window.</body></html>")
}

async fn bind_listener(redirect: &Url) -> Result<tokio::net::TcpListener, String> {
    let host = redirect.host_str().unwrap_or("localhost");
    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| format!("Redirect URI '{redirect}' has no port"))?;
    tokio::net::TcpListener::bind((host, port))
        .await
        .map_err(|e| format!("Cannot listen on {host}:{port}: {e}"))
}

fn redirect_path(redirect: &Url) -> &str {
    match redirect.path() {
        "" => "/",
        path => path,
    }
}

/// Unreserved characters drawn from the operating system RNG
fn random_string(length: usize) -> String {
    (0..length)
        .map(|_| char::from(PKCE_ALPHABET[OsRng.gen_range(0..PKCE_ALPHABET.len())]))
        .collect()
}

/// S256 challenge for a PKCE verifier
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::browser::MockBrowserLauncher;
    use crate::cache::{CacheEntry, MemoryCache};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    fn request(identity: &str, redirect_uri: &str) -> AuthRequest {
        AuthRequest {
            base_uri: Url::parse("https://cloud.example.com/org/tenant").unwrap(),
            config: serde_json::from_value(serde_json::json!({
                "clientId": "cli-client",
                "redirectUri": redirect_uri,
                "scopes": "OR.Jobs",
                "uri": identity
            }))
            .unwrap(),
            insecure: false,
        }
    }

    #[test]
    fn test_random_string_uses_unreserved_alphabet() {
        let first = random_string(VERIFIER_LENGTH);
        let second = random_string(VERIFIER_LENGTH);
        assert_eq!(first.len(), VERIFIER_LENGTH);
        assert!(first.bytes().all(|b| PKCE_ALPHABET.contains(&b)));
        assert_ne!(first, second);
    }

    #[test]
    fn test_code_challenge_matches_rfc7636_example() {
        assert_eq!(
            code_challenge("dBjftJeZ4CQP-0fiokO6VG3iYjqUbR6PLpQqK6ao6lI"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[tokio::test]
    async fn test_login_exchanges_code() {
        let identity = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connect/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "interactive",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&identity)
            .await;

        let redirect_uri = format!("http://127.0.0.1:{}/callback", free_port());
        let callback_base = redirect_uri.clone();
        let mut browser = MockBrowserLauncher::new();
        browser.expect_open().times(1).returning(move |url| {
            let url = Url::parse(url).unwrap();
            let state = url
                .query_pairs()
                .find(|(k, _)| k == "state")
                .map(|(_, v)| v.to_string())
                .unwrap();
            assert!(url.query_pairs().any(|(k, v)| k == "code_challenge_method" && v == "S256"));
            let callback = format!("{callback_base}?code=the-code&state={state}");
            tokio::spawn(async move {
                let client = crate::engine::http::build_client(false).unwrap();
                client.get(callback).send().await.unwrap();
            });
            Ok(())
        });

        let cache = Arc::new(MemoryCache::new());
        let authenticator = OAuthAuthenticator::new(cache.clone(), Arc::new(browser))
            .with_login_timeout(Duration::from_secs(10));
        let outcome = authenticator
            .authenticate(&request(&identity.uri(), &redirect_uri))
            .await;
        assert_eq!(outcome, AuthOutcome::Authenticated(bearer_headers("interactive")));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_state_mismatch_fails() {
        let identity = MockServer::start().await;
        let redirect_uri = format!("http://127.0.0.1:{}/", free_port());
        let callback_base = redirect_uri.clone();
        let mut browser = MockBrowserLauncher::new();
        browser.expect_open().returning(move |_| {
            let callback = format!("{callback_base}?code=c&state=forged");
            tokio::spawn(async move {
                let client = crate::engine::http::build_client(false).unwrap();
                client.get(callback).send().await.unwrap();
            });
            Ok(())
        });

        let authenticator =
            OAuthAuthenticator::new(Arc::new(MemoryCache::new()), Arc::new(browser))
                .with_login_timeout(Duration::from_secs(10));
        let outcome = authenticator
            .authenticate(&request(&identity.uri(), &redirect_uri))
            .await;
        assert_eq!(
            outcome,
            AuthOutcome::Failed("Login state does not match".to_string())
        );
    }

    #[tokio::test]
    async fn test_cached_token_skips_login() {
        let identity = "https://login.example.com";
        let redirect_uri = "http://127.0.0.1:8104";
        let cache = Arc::new(MemoryCache::new());
        let key = format!("oauth|{identity}/|cli-client|{redirect_uri}|OR.Jobs");
        cache
            .set(&key, &CacheEntry::expiring_in("cached", 3600, chrono::Utc::now()))
            .unwrap();

        let mut browser = MockBrowserLauncher::new();
        browser.expect_open().never();
        let authenticator = OAuthAuthenticator::new(cache, Arc::new(browser));
        let outcome = authenticator.authenticate(&request(identity, redirect_uri)).await;
        assert_eq!(outcome, AuthOutcome::Authenticated(bearer_headers("cached")));
    }

    #[tokio::test]
    async fn test_client_secret_is_not_interactive() {
        let mut config = request("https://login.example.com", "http://127.0.0.1:8104");
        config
            .config
            .insert("clientSecret".into(), serde_json::json!("secret"));
        let authenticator = OAuthAuthenticator::new(
            Arc::new(MemoryCache::new()),
            Arc::new(MockBrowserLauncher::new()),
        );
        assert_eq!(
            authenticator.authenticate(&config).await,
            AuthOutcome::NotApplicable
        );
    }
}
