use crate::auth::{bearer_headers, AuthOutcome, AuthRequest, Authenticator};
use crate::constants;
use async_trait::async_trait;

/// Sends a personal access token from `auth.pat` as a bearer token
#[derive(Debug, Clone, Copy, Default)]
pub struct PatAuthenticator;

#[async_trait]
impl Authenticator for PatAuthenticator {
    fn name(&self) -> &str {
        "pat"
    }

    async fn authenticate(&self, request: &AuthRequest) -> AuthOutcome {
        request
            .option(constants::AUTH_PAT)
            .map_or(AuthOutcome::NotApplicable, |pat| {
                AuthOutcome::Authenticated(bearer_headers(pat))
            })
    }
}
