//! Client for the identity server's authorize and token endpoints.

use crate::engine::http;
use crate::{cache::CacheEntry, constants};
use chrono::Utc;
use serde::Deserialize;
use url::Url;

const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

const fn default_expires_in() -> i64 {
    DEFAULT_EXPIRES_IN_SECS
}

impl TokenResponse {
    /// Cache entry expiring relative to now
    #[must_use]
    pub fn to_cache_entry(&self) -> CacheEntry {
        CacheEntry::expiring_in(&self.access_token, self.expires_in, Utc::now())
    }
}

pub struct IdentityClient {
    base: String,
    insecure: bool,
}

impl IdentityClient {
    #[must_use]
    pub fn new(identity: &Url, insecure: bool) -> Self {
        Self {
            base: identity.as_str().trim_end_matches('/').to_string(),
            insecure,
        }
    }

    #[must_use]
    pub fn authorize_url(&self) -> String {
        format!("{}/connect/authorize", self.base)
    }

    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/connect/token", self.base)
    }

    /// Posts a form-encoded token request.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure for non-2xx responses,
    /// transport errors and unreadable token responses.
    pub async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, String> {
        let client = http::build_client(self.insecure).map_err(|e| e.to_string())?;
        let request = client
            .post(self.token_url())
            .header(constants::HEADER_ACCEPT, constants::CONTENT_TYPE_JSON)
            .form(form);
        let response = http::send(&client, request)
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();
        let body = http::read_text(response).await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!(
                "Identity server returned status code '{}' and body '{body}'",
                status.as_u16()
            ));
        }
        serde_json::from_str(&body).map_err(|e| format!("Invalid token response: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_request_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity_/connect/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "abc",
                "expires_in": 120
            })))
            .expect(1)
            .mount(&server)
            .await;

        let identity = Url::parse(&format!("{}/identity_", server.uri())).unwrap();
        let token = IdentityClient::new(&identity, false)
            .request_token(&[("grant_type", "client_credentials")])
            .await
            .unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_in, 120);
    }

    #[tokio::test]
    async fn test_request_token_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let identity = Url::parse(&server.uri()).unwrap();
        let err = IdentityClient::new(&identity, false)
            .request_token(&[])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            "Identity server returned status code '401' and body 'invalid_client'"
        );
    }

    #[test]
    fn test_missing_expiry_defaults() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token":"x"}"#).unwrap();
        assert_eq!(token.expires_in, 3600);
    }
}
