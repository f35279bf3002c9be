//! Authenticator backed by an executable listed in `plugins.yaml`.
//!
//! The executable receives `{"url": ..., "config": {...}}` on stdin and must
//! print `{"headers": {...}}` to stdout and exit successfully.

use crate::auth::{AuthHeaders, AuthOutcome, AuthRequest, Authenticator};
use crate::constants;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;

#[derive(Serialize)]
struct ExternalRequest<'a> {
    url: &'a str,
    config: &'a IndexMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct ExternalResponse {
    #[serde(default)]
    headers: AuthHeaders,
}

pub struct ExternalAuthenticator {
    name: String,
    path: String,
}

impl ExternalAuthenticator {
    #[must_use]
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
        }
    }

    async fn run(&self, request: &AuthRequest) -> Result<AuthHeaders, String> {
        let program = shellexpand::full(&self.path)
            .map_or_else(|_| self.path.clone(), |p| p.to_string());
        let input = serde_json::to_vec(&ExternalRequest {
            url: request.base_uri.as_str(),
            config: &request.config,
        })
        .map_err(|e| e.to_string())?;

        let mut child = tokio::process::Command::new(&program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Could not start '{program}': {e}"))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .await
                .map_err(|e| format!("Could not write to '{program}': {e}"))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| format!("Could not run '{program}': {e}"))?;
        if !output.status.success() {
            return Err(format!(
                "'{program}' exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let response: ExternalResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("Invalid output from '{program}': {e}"))?;
        Ok(response.headers)
    }
}

#[async_trait]
impl Authenticator for ExternalAuthenticator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(&self, request: &AuthRequest) -> AuthOutcome {
        if request.option(constants::AUTH_TYPE) != Some(self.name.as_str()) {
            return AuthOutcome::NotApplicable;
        }
        match self.run(request).await {
            Ok(headers) => AuthOutcome::Authenticated(headers),
            Err(reason) => AuthOutcome::Failed(reason),
        }
    }
}
