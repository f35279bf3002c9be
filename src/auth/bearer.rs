use crate::auth::identity::IdentityClient;
use crate::auth::{bearer_headers, AuthOutcome, AuthRequest, Authenticator};
use crate::cache::{CacheEntry, CredentialCache};
use crate::constants;
use async_trait::async_trait;
use std::sync::Arc;

/// Client-credentials grant for profiles with `clientId` and `clientSecret`
pub struct BearerAuthenticator {
    cache: Arc<dyn CredentialCache>,
}

impl BearerAuthenticator {
    #[must_use]
    pub fn new(cache: Arc<dyn CredentialCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Authenticator for BearerAuthenticator {
    fn name(&self) -> &str {
        "bearer"
    }

    async fn authenticate(&self, request: &AuthRequest) -> AuthOutcome {
        let (Some(client_id), Some(client_secret)) = (
            request.option(constants::AUTH_CLIENT_ID),
            request.option(constants::AUTH_CLIENT_SECRET),
        ) else {
            return AuthOutcome::NotApplicable;
        };
        let identity = match request.identity_uri() {
            Ok(identity) => identity,
            Err(reason) => return AuthOutcome::Failed(reason),
        };
        let scopes = request.scopes().unwrap_or_default();
        let key = format!("bearer|{identity}|{client_id}|{client_secret}|{scopes}");

        if let Some(entry) = self.cache.get(&key) {
            tracing::debug!(target: constants::LOG_TARGET_AUTH, "using cached bearer token");
            return AuthOutcome::Authenticated(bearer_headers(&entry.token));
        }

        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        if !scopes.is_empty() {
            form.push(("scope", scopes.as_str()));
        }

        match IdentityClient::new(&identity, request.insecure)
            .request_token(&form)
            .await
        {
            Ok(token) => {
                store(self.cache.as_ref(), &key, &token.to_cache_entry());
                AuthOutcome::Authenticated(bearer_headers(&token.access_token))
            }
            Err(reason) => AuthOutcome::Failed(reason),
        }
    }
}

/// A token that cannot be cached is still usable for this run
pub(crate) fn store(cache: &dyn CredentialCache, key: &str, entry: &CacheEntry) {
    if let Err(e) = cache.set(key, entry) {
        tracing::warn!(target: constants::LOG_TARGET_AUTH, error = %e, "could not cache token");
    }
}
