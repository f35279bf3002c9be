//! Document digitization: start an asynchronous operation, then poll for its
//! result.

use crate::constants;
use crate::engine::context::ExecutionContext;
use crate::engine::executor::CommandOutput;
use crate::engine::http;
use crate::error::Error;
use crate::plugin::{CommandPlugin, PluginCommand};
use crate::spec::{CommandParameter, ParameterLocation, ParameterType};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const DEFINITION: &str = "du";
const GROUP: &str = "digitization";
const SERVICE: &str = "Digitizer";
const API_VERSION: &str = "api-version=1";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_ATTEMPTS: u32 = 60;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    operation_id: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
}

/// `du digitization digitize`
#[derive(Debug, Clone)]
pub struct DigitizeCommand {
    poll_interval: Duration,
    max_attempts: u32,
}

impl Default for DigitizeCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl DigitizeCommand {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    async fn start(
        &self,
        client: &reqwest::Client,
        base: &str,
        context: &ExecutionContext,
    ) -> Result<String, Error> {
        let content_type = context.text("contentType").ok();
        let file = context
            .file(constants::RAW_BODY_PARAMETER)?
            .open()
            .await?;
        let part = file.into_part(Some(
            content_type
                .as_deref()
                .unwrap_or(constants::CONTENT_TYPE_OCTET_STREAM),
        ))?;
        let form = reqwest::multipart::Form::new().part(constants::RAW_BODY_PARAMETER, part);

        let mut request = client.post(format!("{base}/digitize/start?{API_VERSION}"));
        for (name, value) in &context.auth {
            request = request.header(name, value);
        }
        let response = http::send(client, request.multipart(form)).await?;
        let status = response.status();
        let body = http::read_text(response).await?;
        if status != StatusCode::ACCEPTED {
            return Err(upstream(status, body));
        }
        let started: StartResponse = serde_json::from_str(&body).map_err(Error::malformed_json)?;
        Ok(started.operation_id)
    }

    /// The terminal result body, or `None` while the operation is running.
    async fn poll(
        client: &reqwest::Client,
        base: &str,
        operation_id: &str,
        context: &ExecutionContext,
    ) -> Result<Option<String>, Error> {
        let mut request = client.get(format!(
            "{base}/digitize/result/{operation_id}?{API_VERSION}"
        ));
        for (name, value) in &context.auth {
            request = request.header(name, value);
        }
        let response = http::send(client, request).await?;
        let status = response.status();
        let body = http::read_text(response).await?;
        if status != StatusCode::OK {
            return Err(upstream(status, body));
        }
        let result: StatusResponse = serde_json::from_str(&body).map_err(Error::malformed_json)?;
        if matches!(result.status.as_str(), "NotStarted" | "Running") {
            return Ok(None);
        }
        Ok(Some(indent(&body)))
    }
}

fn upstream(status: StatusCode, body: String) -> Error {
    Error::Upstream {
        service: SERVICE.to_string(),
        status: status.as_u16(),
        body,
    }
}

fn indent(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl CommandPlugin for DigitizeCommand {
    fn command(&self) -> PluginCommand {
        PluginCommand::new(DEFINITION, GROUP, "digitize", "Digitize the given file")
            .with_parameter(
                CommandParameter::new(
                    constants::RAW_BODY_PARAMETER,
                    ParameterType::Binary,
                    ParameterLocation::Form,
                )
                .required(true)
                .with_description("The file to digitize"),
            )
            .with_parameter(
                CommandParameter::new("contentType", ParameterType::String, ParameterLocation::Form)
                    .with_description("The content type of the file"),
            )
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<CommandOutput, Error> {
        let base = format!(
            "{}/{}/{}/du_/api/digitizer",
            context.origin(),
            context.organization()?,
            context.tenant()?
        );
        let client = http::build_client(context.insecure)?;

        let operation_id = self.start(&client, &base, context).await?;
        tracing::debug!(target: constants::LOG_TARGET_PLUGIN, %operation_id, "digitization started");

        for attempt in 1..=self.max_attempts {
            if let Some(result) = Self::poll(&client, &base, &operation_id, context).await? {
                return Ok(CommandOutput::Text(result));
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        Err(Error::Timeout {
            operation: "Digitization".to_string(),
            id: operation_id,
        })
    }
}

/// `du digitization digitize-result`, kept out of listings and refused
#[derive(Debug, Clone, Copy, Default)]
pub struct DigitizeResultCommand;

#[async_trait]
impl CommandPlugin for DigitizeResultCommand {
    fn command(&self) -> PluginCommand {
        PluginCommand::new(DEFINITION, GROUP, "digitize-result", "Get the digitization result")
            .disabled("Digitize result command not supported")
    }

    async fn execute(&self, _context: &ExecutionContext) -> Result<CommandOutput, Error> {
        Err(Error::CommandNotSupported {
            reason: "Digitize result command not supported".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthHeaders;
    use crate::config::OutputMode;
    use crate::engine::context::{ExecutionParameter, FileReference, InputStream, ParameterValue};
    use url::Url;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context(server: &MockServer, file: FileReference) -> ExecutionContext {
        let mut auth = AuthHeaders::new();
        auth.insert("Authorization".into(), "Bearer token".into());
        ExecutionContext {
            definition: DEFINITION.into(),
            group: GROUP.into(),
            command: "digitize".into(),
            method: String::new(),
            route: String::new(),
            content_type: None,
            base_uri: Url::parse(&format!("{}/my-org/my-tenant/du_", server.uri())).unwrap(),
            organization: Some("my-org".into()),
            tenant: Some("my-tenant".into()),
            parameters: vec![ExecutionParameter {
                name: "file".into(),
                location: ParameterLocation::Form,
                value: ParameterValue::File(file),
            }],
            auth,
            insecure: false,
            debug: false,
            output: OutputMode::Json,
        }
    }

    fn fast() -> DigitizeCommand {
        DigitizeCommand::new().with_poll_interval(Duration::from_millis(1))
    }

    async fn mount_start(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/my-org/my-tenant/du_/api/digitizer/digitize/start"))
            .and(query_param("api-version", "1"))
            .and(header("Authorization", "Bearer token"))
            .respond_with(
                ResponseTemplate::new(202).set_body_json(serde_json::json!({"operationId": "op-1"})),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_polls_until_terminal_state() {
        let server = MockServer::start().await;
        mount_start(&server).await;
        Mock::given(method("GET"))
            .and(path("/my-org/my-tenant/du_/api/digitizer/digitize/result/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"Running"}"#))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/my-org/my-tenant/du_/api/digitizer/digitize/result/op-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"status":"Done","pages":[]}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let stream = InputStream::from_bytes(b"%PDF-1.7".to_vec());
        let ctx = context(&server, FileReference::from_stream("file", stream));
        let output = fast().execute(&ctx).await.unwrap();
        let CommandOutput::Text(text) = output else {
            panic!("expected text output");
        };
        assert_eq!(text, "{\n  \"status\": \"Done\",\n  \"pages\": []\n}");
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let server = MockServer::start().await;
        mount_start(&server).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"NotStarted"}"#))
            .expect(3)
            .mount(&server)
            .await;

        let stream = InputStream::from_bytes(b"data".to_vec());
        let ctx = context(&server, FileReference::from_stream("file", stream));
        let err = fast().with_max_attempts(3).execute(&ctx).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Digitization with operationId 'op-1' did not finish in time"
        );
    }

    #[test]
    fn test_default_polling_budget() {
        let command = DigitizeCommand::new();
        assert_eq!(command.poll_interval, Duration::from_secs(1));
        assert_eq!(command.max_attempts, 60);
        let default = DigitizeCommand::default();
        assert_eq!(default.poll_interval, command.poll_interval);
        assert_eq!(default.max_attempts, command.max_attempts);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_budget_waits_between_polls() {
        let server = MockServer::start().await;
        mount_start(&server).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"Running"}"#))
            .expect(60)
            .mount(&server)
            .await;

        let stream = InputStream::from_bytes(b"data".to_vec());
        let ctx = context(&server, FileReference::from_stream("file", stream));
        let started = tokio::time::Instant::now();
        let err = DigitizeCommand::new().execute(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(started.elapsed() >= Duration::from_secs(59));
    }

    #[tokio::test]
    async fn test_malformed_start_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).set_body_string("not json"))
            .mount(&server)
            .await;

        let stream = InputStream::from_bytes(b"data".to_vec());
        let ctx = context(&server, FileReference::from_stream("file", stream));
        let err = fast().execute(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::MalformedJson { .. }));
        assert!(err.to_string().starts_with("Error parsing json response: "));
        assert!(!err.to_string().contains("Error reading response"));
    }

    #[tokio::test]
    async fn test_unexpected_start_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid file"))
            .mount(&server)
            .await;

        let stream = InputStream::from_bytes(b"data".to_vec());
        let ctx = context(&server, FileReference::from_stream("file", stream));
        let err = fast().execute(&ctx).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Digitizer returned status code '400' and body 'invalid file'"
        );
    }

    #[tokio::test]
    async fn test_missing_file_reported_before_any_request() {
        let server = MockServer::start().await;
        let ctx = context(&server, FileReference::from_path("does-not-exist"));
        let err = fast().execute(&ctx).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error sending request: File 'does-not-exist' not found"
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
