use crate::config::OutputMode;
use crate::constants;
use crate::engine::context::{ExecutionContext, ExecutionParameter, ParameterValue};
use crate::engine::http;
use crate::engine::plugin_executor::PluginExecutor;
use crate::error::Error;
use crate::spec::{Command, ParameterLocation, Visibility};
use crate::utils::capitalize;
use futures_util::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use reqwest::Method;
use std::str::FromStr;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

/// Result of a command, written to standard output by the CLI
#[derive(Debug)]
pub enum CommandOutput {
    Empty,
    Text(String),
    /// Streamed through unchanged
    Body(reqwest::Response),
}

impl CommandOutput {
    /// Writes the output. Text is pretty-printed when it is JSON and `mode`
    /// is `Json`; response bodies are copied byte for byte.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be read or `out` cannot be written.
    pub async fn write_to<W>(self, out: &mut W, mode: OutputMode) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match self {
            Self::Empty => {}
            Self::Text(text) => {
                let mut text = format_text(text, mode);
                if !text.ends_with('\n') {
                    text.push('\n');
                }
                out.write_all(text.as_bytes()).await?;
            }
            Self::Body(response) => {
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(Error::invalid_response)?;
                    out.write_all(&chunk).await?;
                }
            }
        }
        out.flush().await?;
        Ok(())
    }
}

fn format_text(text: String, mode: OutputMode) -> String {
    if mode == OutputMode::Text {
        return text;
    }
    serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or(text)
}

/// Performs a generated command as a single HTTP request
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpExecutor;

impl HttpExecutor {
    /// # Errors
    ///
    /// Returns `Upstream` for non-2xx responses, `FileNotFound` or
    /// `Transport` when the request cannot be built or sent.
    pub async fn execute(&self, context: &ExecutionContext) -> Result<CommandOutput, Error> {
        let client = http::build_client(context.insecure)?;
        let method = Method::from_str(&context.method.to_uppercase()).map_err(Error::transport)?;
        let url = build_url(context)?;

        let mut request = client
            .request(method, url)
            .header(constants::HEADER_ACCEPT, constants::CONTENT_TYPE_JSON);
        for (name, value) in &context.auth {
            request = request.header(name, value);
        }
        for parameter in located(context, ParameterLocation::Header) {
            if let Some(value) = parameter.value.to_text() {
                request = request.header(&parameter.name, value);
            }
        }
        let request = attach_body(request, context).await?;

        let response = http::send(&client, request).await?;
        let status = response.status();
        let body = http::read_text(response).await?;
        if !status.is_success() {
            return Err(Error::Upstream {
                service: capitalize(&context.definition),
                status: status.as_u16(),
                body,
            });
        }
        Ok(if body.is_empty() {
            CommandOutput::Empty
        } else {
            CommandOutput::Text(body)
        })
    }
}

fn located(
    context: &ExecutionContext,
    location: ParameterLocation,
) -> impl Iterator<Item = &ExecutionParameter> {
    context
        .parameters
        .iter()
        .filter(move |p| p.location == location)
}

/// Base URI, then the route with path parameters substituted, then the query
fn build_url(context: &ExecutionContext) -> Result<Url, Error> {
    let mut route = context.route.clone();
    for parameter in located(context, ParameterLocation::Path) {
        let value = parameter.value.to_text().unwrap_or_default();
        route = route.replace(
            &format!("{{{}}}", parameter.name),
            &urlencoding::encode(&value),
        );
    }

    let base = context.base_uri.as_str().trim_end_matches('/');
    let raw = format!("{base}{route}");
    let mut url = Url::parse(&raw).map_err(|e| Error::transport(format!("Invalid URL '{raw}': {e}")))?;

    let mut query = Vec::new();
    for parameter in located(context, ParameterLocation::Query) {
        match &parameter.value {
            ParameterValue::Array(items) => {
                query.extend(items.iter().filter_map(|item| {
                    item.to_text().map(|text| (parameter.name.as_str(), text))
                }));
            }
            value => {
                if let Some(text) = value.to_text() {
                    query.push((parameter.name.as_str(), text));
                }
            }
        }
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

async fn attach_body(
    request: reqwest::RequestBuilder,
    context: &ExecutionContext,
) -> Result<reqwest::RequestBuilder, Error> {
    let form: Vec<&ExecutionParameter> = located(context, ParameterLocation::Form).collect();
    let body: Vec<&ExecutionParameter> = located(context, ParameterLocation::Body).collect();
    let content_type = context.content_type.as_deref();

    let is_multipart = content_type.is_some_and(|c| c.starts_with(constants::CONTENT_TYPE_MULTIPART))
        || form.iter().any(|p| matches!(p.value, ParameterValue::File(_)));
    if is_multipart {
        let mut multipart = reqwest::multipart::Form::new();
        for parameter in form {
            multipart = match &parameter.value {
                ParameterValue::File(file) => {
                    multipart.part(parameter.name.clone(), file.open().await?.into_part(None)?)
                }
                value => multipart.text(parameter.name.clone(), value.to_text().unwrap_or_default()),
            };
        }
        return Ok(request.multipart(multipart));
    }
    if !form.is_empty() {
        let pairs: Vec<(String, String)> = form
            .iter()
            .filter_map(|p| p.value.to_text().map(|text| (p.name.clone(), text)))
            .collect();
        return Ok(request.form(&pairs));
    }

    if let Some(ParameterValue::File(file)) = body
        .iter()
        .find(|p| p.name == constants::RAW_BODY_PARAMETER)
        .map(|p| &p.value)
    {
        let opened = file.open().await?;
        let mut request = request.header(
            constants::HEADER_CONTENT_TYPE,
            content_type.unwrap_or(constants::CONTENT_TYPE_OCTET_STREAM),
        );
        if let Some(length) = opened.length {
            request = request.header(CONTENT_LENGTH, length);
        }
        return Ok(request.body(opened.into_body()));
    }

    match body.as_slice() {
        [] => Ok(request),
        [only] if only.name == constants::JSON_BODY_PARAMETER
            && matches!(only.value, ParameterValue::Json(_)) =>
        {
            Ok(request.json(&only.value.to_json()))
        }
        parameters => {
            let object: serde_json::Map<String, serde_json::Value> = parameters
                .iter()
                .filter_map(|p| p.value.to_json().map(|value| (p.name.clone(), value)))
                .collect();
            Ok(request.json(&object))
        }
    }
}

/// Routes a command to the HTTP executor or its plugin
pub struct Executor {
    http: HttpExecutor,
    plugins: PluginExecutor,
}

impl Executor {
    #[must_use]
    pub const fn new(plugins: PluginExecutor) -> Self {
        Self {
            http: HttpExecutor,
            plugins,
        }
    }

    /// # Errors
    ///
    /// Returns `CommandNotSupported` for disabled commands, otherwise the
    /// executing component's error.
    pub async fn execute(
        &self,
        command: &Command,
        context: &ExecutionContext,
    ) -> Result<CommandOutput, Error> {
        if let Visibility::Disabled { reason } = &command.visibility {
            return Err(Error::CommandNotSupported {
                reason: reason.clone(),
            });
        }
        if command.plugin {
            self.plugins.execute(command, context).await
        } else {
            self.http.execute(context).await
        }
    }
}
