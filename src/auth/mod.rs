//! Authenticator chain producing request headers for the active profile.
//!
//! Strategies are tried in a fixed order. The first one that applies decides
//! the outcome: its headers are used, or its failure is reported. When none
//! applies the request goes out without authentication headers.

pub mod bearer;
pub mod browser;
pub mod external;
pub mod identity;
pub mod oauth;
pub mod pat;

pub use bearer::BearerAuthenticator;
pub use browser::{BrowserLauncher, ExecBrowserLauncher};
pub use external::ExternalAuthenticator;
pub use oauth::OAuthAuthenticator;
pub use pat::PatAuthenticator;

use crate::cache::CredentialCache;
use crate::config::PluginConfig;
use crate::constants;
use crate::error::Error;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use url::Url;

/// Header name to value, in insertion order
pub type AuthHeaders = IndexMap<String, String>;

/// Input handed to every authenticator
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Resolved base URI of the definition being called
    pub base_uri: Url,
    /// The profile's `auth` section
    pub config: IndexMap<String, serde_json::Value>,
    pub insecure: bool,
}

impl AuthRequest {
    /// Non-empty string option from the `auth` section
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|v| !v.is_empty())
    }

    /// `auth.uri`, else `<scheme>://<host>/identity_` of the base URI.
    ///
    /// # Errors
    ///
    /// Returns an error if `auth.uri` is not a valid URL.
    pub fn identity_uri(&self) -> Result<Url, String> {
        let raw = match self.option(constants::AUTH_URI) {
            Some(uri) => uri.trim_end_matches('/').to_string(),
            None => format!(
                "{}/{}",
                self.base_uri.origin().ascii_serialization(),
                constants::IDENTITY_PATH
            ),
        };
        Url::parse(&raw).map_err(|e| format!("Invalid identity URI '{raw}': {e}"))
    }

    /// Requested scopes, space separated
    #[must_use]
    pub fn scopes(&self) -> Option<String> {
        match self.config.get(constants::AUTH_SCOPES)? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let scopes: Vec<&str> = items.iter().filter_map(serde_json::Value::as_str).collect();
                (!scopes.is_empty()).then(|| scopes.join(" "))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The profile does not configure this strategy
    NotApplicable,
    Authenticated(AuthHeaders),
    Failed(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Name reported in authentication failures
    fn name(&self) -> &str;

    async fn authenticate(&self, request: &AuthRequest) -> AuthOutcome;
}

/// Builds the single-header outcome used by the token strategies
#[must_use]
pub fn bearer_headers(token: &str) -> AuthHeaders {
    let mut headers = AuthHeaders::new();
    headers.insert(
        constants::HEADER_AUTHORIZATION.to_string(),
        format!("Bearer {token}"),
    );
    headers
}

/// Ordered authenticators; the first applicable one wins
pub struct AuthenticatorChain {
    authenticators: Vec<Box<dyn Authenticator>>,
}

impl AuthenticatorChain {
    #[must_use]
    pub fn new(authenticators: Vec<Box<dyn Authenticator>>) -> Self {
        Self { authenticators }
    }

    /// External authenticators from the plugin configuration, then PAT,
    /// OAuth and bearer sharing one credential cache.
    #[must_use]
    pub fn standard(
        plugins: &PluginConfig,
        cache: Arc<dyn CredentialCache>,
        browser: Arc<dyn BrowserLauncher>,
    ) -> Self {
        let mut authenticators: Vec<Box<dyn Authenticator>> = plugins
            .authenticators
            .iter()
            .map(|config| {
                Box::new(ExternalAuthenticator::new(&config.name, &config.path))
                    as Box<dyn Authenticator>
            })
            .collect();
        authenticators.push(Box::new(PatAuthenticator));
        authenticators.push(Box::new(OAuthAuthenticator::new(Arc::clone(&cache), browser)));
        authenticators.push(Box::new(BearerAuthenticator::new(cache)));
        Self::new(authenticators)
    }

    /// Runs the chain.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` naming the first applicable
    /// authenticator if it fails.
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<AuthHeaders, Error> {
        for authenticator in &self.authenticators {
            match authenticator.authenticate(request).await {
                AuthOutcome::NotApplicable => {}
                AuthOutcome::Authenticated(headers) => {
                    tracing::debug!(
                        target: constants::LOG_TARGET_AUTH,
                        authenticator = authenticator.name(),
                        "authenticated"
                    );
                    return Ok(headers);
                }
                AuthOutcome::Failed(reason) => {
                    return Err(Error::auth_failed(authenticator.name(), reason));
                }
            }
        }
        Ok(AuthHeaders::new())
    }
}
