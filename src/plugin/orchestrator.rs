//! Storage bucket file transfer. Both commands first ask the service for a
//! pre-signed blob URI, then move the file content directly against it.

use crate::constants;
use crate::engine::context::ExecutionContext;
use crate::engine::executor::CommandOutput;
use crate::engine::http;
use crate::error::Error;
use crate::plugin::{CommandPlugin, PluginCommand};
use crate::spec::{CommandParameter, ParameterLocation, ParameterType};
use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use serde::Deserialize;
use url::Url;

const DEFINITION: &str = "orchestrator";
const GROUP: &str = "buckets";
const SERVICE: &str = "Orchestrator";
const SERVICE_PATH: &str = "orchestrator_";
const BLOCK_BLOB: &str = "BlockBlob";

#[derive(Deserialize)]
struct BlobUri {
    #[serde(rename = "Uri")]
    uri: String,
}

fn bucket_parameters(command: PluginCommand) -> PluginCommand {
    command
        .with_parameter(
            CommandParameter::new("folderId", ParameterType::Integer, ParameterLocation::Header)
                .required(true)
                .with_description("Folder/OrganizationUnit Id"),
        )
        .with_parameter(
            CommandParameter::new("key", ParameterType::Integer, ParameterLocation::Path)
                .required(true)
                .with_description("The Bucket Id"),
        )
        .with_parameter(
            CommandParameter::new("path", ParameterType::String, ParameterLocation::Query)
                .required(true)
                .with_description("The BlobFile full path"),
        )
}

/// Requests the read or write URI of the blob addressed by the command's
/// `key` and `path`.
async fn blob_uri(
    client: &reqwest::Client,
    context: &ExecutionContext,
    operation: &str,
) -> Result<String, Error> {
    let folder_id = context.text("folderId")?;
    let key = context.text("key")?;
    let path = context.text("path")?;

    let base = format!(
        "{}/{}/{}/{SERVICE_PATH}",
        context.origin(),
        context.organization()?,
        context.tenant()?
    );
    let url = Url::parse_with_params(
        &format!("{base}/odata/Buckets({key})/UiPath.Server.Configuration.OData.{operation}"),
        &[("path", path.as_str()), ("expiryInMinutes", "0")],
    )
    .map_err(Error::transport)?;
    let mut request = client
        .get(url)
        .header(constants::HEADER_FOLDER_ID, folder_id)
        .header(constants::HEADER_ACCEPT, constants::CONTENT_TYPE_JSON);
    for (name, value) in &context.auth {
        request = request.header(name, value);
    }

    let response = http::send(client, request).await?;
    let status = response.status();
    let body = http::read_text(response).await?;
    if !status.is_success() {
        return Err(upstream(status, body));
    }
    let blob: BlobUri = serde_json::from_str(&body).map_err(Error::malformed_json)?;
    Ok(blob.uri)
}

fn upstream(status: reqwest::StatusCode, body: String) -> Error {
    Error::Upstream {
        service: SERVICE.to_string(),
        status: status.as_u16(),
        body,
    }
}

/// `orchestrator buckets upload`
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadCommand;

#[async_trait]
impl CommandPlugin for UploadCommand {
    fn command(&self) -> PluginCommand {
        bucket_parameters(PluginCommand::new(
            DEFINITION,
            GROUP,
            "upload",
            "Uploads the provided file to the bucket",
        ))
        .with_parameter(
            CommandParameter::new(
                constants::RAW_BODY_PARAMETER,
                ParameterType::Binary,
                ParameterLocation::Body,
            )
            .required(true)
            .with_description("The file to upload"),
        )
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<CommandOutput, Error> {
        let file = context.file(constants::RAW_BODY_PARAMETER)?;
        let client = http::build_client(context.insecure)?;
        let uri = blob_uri(&client, context, "GetWriteUri").await?;

        let opened = file.open().await?;
        let mut request = client
            .put(&uri)
            .header(constants::HEADER_BLOB_TYPE, BLOCK_BLOB)
            .header(constants::HEADER_CONTENT_TYPE, constants::CONTENT_TYPE_OCTET_STREAM);
        if let Some(length) = opened.length {
            request = request.header(CONTENT_LENGTH, length);
        }
        let response = http::send(&client, request.body(opened.into_body())).await?;
        let status = response.status();
        let body = http::read_text(response).await?;
        if !status.is_success() {
            return Err(upstream(status, body));
        }
        Ok(CommandOutput::Empty)
    }
}

/// `orchestrator buckets download`
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadCommand;

#[async_trait]
impl CommandPlugin for DownloadCommand {
    fn command(&self) -> PluginCommand {
        bucket_parameters(PluginCommand::new(
            DEFINITION,
            GROUP,
            "download",
            "Downloads the file with the given path from the bucket",
        ))
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<CommandOutput, Error> {
        let client = http::build_client(context.insecure)?;
        let uri = blob_uri(&client, context, "GetReadUri").await?;

        let response = http::send(&client, client.get(&uri)).await?;
        let status = response.status();
        if !status.is_success() {
            let body = http::read_text(response).await?;
            return Err(upstream(status, body));
        }
        Ok(CommandOutput::Body(response))
    }
}
