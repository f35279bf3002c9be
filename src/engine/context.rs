//! The request-ready execution context and the values bound into it.

use crate::auth::AuthHeaders;
use crate::config::OutputMode;
use crate::error::Error;
use crate::spec::ParameterLocation;
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::io::ReaderStream;
use url::Url;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Pre-supplied input (usually standard input) that can be consumed once.
#[derive(Clone)]
pub struct InputStream {
    reader: Arc<Mutex<Option<BoxedReader>>>,
}

impl InputStream {
    pub fn new(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            reader: Arc::new(Mutex::new(Some(Box::new(reader)))),
        }
    }

    #[must_use]
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }

    #[must_use]
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::new(Cursor::new(data.into()))
    }

    fn take(&self) -> Option<BoxedReader> {
        self.reader.lock().ok()?.take()
    }

    /// Waits for the first bytes of input. An input that is immediately at
    /// end of stream (such as `/dev/null`) counts as no input.
    pub async fn probe(self) -> Option<Self> {
        let mut reader = BufReader::new(self.take()?);
        let has_data = matches!(reader.fill_buf().await, Ok(buffer) if !buffer.is_empty());
        has_data.then(|| Self::new(reader))
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStream").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
enum FileSource {
    Path(PathBuf),
    Stream(InputStream),
}

/// A file parameter. Nothing is opened until the request body is built, so a
/// missing file is reported at send time. The opened handle belongs to the
/// request body and is closed when the body is dropped.
#[derive(Debug, Clone)]
pub struct FileReference {
    pub filename: String,
    source: FileSource,
}

/// An opened file ready to be sent
pub struct OpenedFile {
    pub filename: String,
    pub length: Option<u64>,
    reader: BoxedReader,
}

impl OpenedFile {
    /// Streams the file as a request body.
    #[must_use]
    pub fn into_body(self) -> reqwest::Body {
        reqwest::Body::wrap_stream(ReaderStream::new(self.reader))
    }

    /// Streams the file as a multipart form part.
    ///
    /// # Errors
    ///
    /// Returns a transport error if `mime` is not a valid media type.
    pub fn into_part(self, mime: Option<&str>) -> Result<reqwest::multipart::Part, Error> {
        let filename = self.filename.clone();
        let length = self.length;
        let body = self.into_body();
        let part = match length {
            Some(length) => reqwest::multipart::Part::stream_with_length(body, length),
            None => reqwest::multipart::Part::stream(body),
        }
        .file_name(filename);
        match mime {
            Some(mime) => part.mime_str(mime).map_err(Error::transport),
            None => Ok(part),
        }
    }
}

impl FileReference {
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map_or_else(|| "file".to_string(), |n| n.to_string_lossy().to_string());
        Self {
            filename,
            source: FileSource::Path(path),
        }
    }

    #[must_use]
    pub fn from_stream(filename: impl Into<String>, stream: InputStream) -> Self {
        Self {
            filename: filename.into(),
            source: FileSource::Stream(stream),
        }
    }

    /// Opens the file for reading.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` for a missing path, or a transport error if the
    /// file cannot be opened or the input stream was already consumed.
    pub async fn open(&self) -> Result<OpenedFile, Error> {
        match &self.source {
            FileSource::Path(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::FileNotFound {
                            path: path.display().to_string(),
                        }
                    } else {
                        Error::transport(format!("Error opening file '{}': {e}", path.display()))
                    }
                })?;
                let length = file.metadata().await.ok().map(|m| m.len());
                Ok(OpenedFile {
                    filename: self.filename.clone(),
                    length,
                    reader: Box::new(file),
                })
            }
            FileSource::Stream(stream) => {
                let reader = stream
                    .take()
                    .ok_or_else(|| Error::transport("input stream was already consumed"))?;
                Ok(OpenedFile {
                    filename: self.filename.clone(),
                    length: None,
                    reader,
                })
            }
        }
    }
}

/// A typed argument value
#[derive(Debug, Clone)]
pub enum ParameterValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Json(serde_json::Value),
    Array(Vec<ParameterValue>),
    File(FileReference),
}

impl ParameterValue {
    /// Text form for paths, query strings and headers. Files have none.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Boolean(b) => Some(b.to_string()),
            Self::Json(v) => Some(v.to_string()),
            Self::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Self::to_text)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Self::File(_) => None,
        }
    }

    /// JSON form for request bodies. Files have none.
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::String(s) => Some(serde_json::Value::String(s.clone())),
            Self::Integer(i) => Some(serde_json::Value::from(*i)),
            Self::Number(n) => Some(serde_json::Value::from(*n)),
            Self::Boolean(b) => Some(serde_json::Value::Bool(*b)),
            Self::Json(v) => Some(v.clone()),
            Self::Array(items) => Some(serde_json::Value::Array(
                items.iter().filter_map(Self::to_json).collect(),
            )),
            Self::File(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionParameter {
    pub name: String,
    pub location: ParameterLocation,
    pub value: ParameterValue,
}

/// Everything an executor needs to perform one command
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub definition: String,
    pub group: String,
    pub command: String,
    pub method: String,
    pub route: String,
    pub content_type: Option<String>,
    pub base_uri: Url,
    pub organization: Option<String>,
    pub tenant: Option<String>,
    pub parameters: Vec<ExecutionParameter>,
    pub auth: AuthHeaders,
    pub insecure: bool,
    pub debug: bool,
    pub output: OutputMode,
}

impl ExecutionContext {
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Text value of a bound parameter.
    ///
    /// # Errors
    ///
    /// Returns `MissingArgument` if the parameter is not bound.
    pub fn text(&self, name: &str) -> Result<String, Error> {
        self.parameter(name)
            .and_then(ParameterValue::to_text)
            .ok_or_else(|| Error::missing_argument(crate::utils::to_kebab_case(name)))
    }

    /// File value of a bound parameter.
    ///
    /// # Errors
    ///
    /// Returns `MissingArgument` if the parameter is not bound to a file.
    pub fn file(&self, name: &str) -> Result<&FileReference, Error> {
        match self.parameter(name) {
            Some(ParameterValue::File(file)) => Ok(file),
            _ => Err(Error::missing_argument(crate::utils::to_kebab_case(name))),
        }
    }

    /// # Errors
    ///
    /// Returns `Organization is not set` when the profile has none.
    pub fn organization(&self) -> Result<&str, Error> {
        self.organization
            .as_deref()
            .ok_or_else(|| Error::MissingServerVariable {
                name: crate::constants::SERVER_VAR_ORGANIZATION.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns `Tenant is not set` when the profile has none.
    pub fn tenant(&self) -> Result<&str, Error> {
        self.tenant
            .as_deref()
            .ok_or_else(|| Error::MissingServerVariable {
                name: crate::constants::SERVER_VAR_TENANT.to_string(),
            })
    }

    /// `scheme://host[:port]` of the base URI
    #[must_use]
    pub fn origin(&self) -> String {
        self.base_uri.origin().ascii_serialization()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_missing_file_reports_path() {
        let file = FileReference::from_path("does-not-exist");
        let Err(err) = file.open().await else {
            panic!("expected an error");
        };
        assert_eq!(
            err.to_string(),
            "Error sending request: File 'does-not-exist' not found"
        );
    }

    #[tokio::test]
    async fn test_stream_is_consumed_once() {
        let stream = InputStream::from_bytes(b"hello".to_vec());
        let file = FileReference::from_stream("file", stream);
        let mut opened = file.open().await.unwrap();
        let mut content = String::new();
        opened.reader.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "hello");
        assert!(file.open().await.is_err());
    }

    #[tokio::test]
    async fn test_opened_path_reports_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pdf");
        std::fs::write(&path, b"12345").unwrap();
        let file = FileReference::from_path(&path);
        assert_eq!(file.filename, "invoice.pdf");
        let opened = file.open().await.unwrap();
        assert_eq!(opened.length, Some(5));
    }

    #[tokio::test]
    async fn test_probe_discards_empty_input() {
        assert!(InputStream::from_bytes(Vec::new()).probe().await.is_none());

        let probed = InputStream::from_bytes(b"data".to_vec()).probe().await.unwrap();
        let mut opened = FileReference::from_stream("file", probed).open().await.unwrap();
        let mut content = String::new();
        opened.reader.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "data");
    }

    #[test]
    fn test_value_text_and_json() {
        let array = ParameterValue::Array(vec![
            ParameterValue::Integer(1),
            ParameterValue::Integer(2),
        ]);
        assert_eq!(array.to_text().as_deref(), Some("1,2"));
        assert_eq!(array.to_json(), Some(serde_json::json!([1, 2])));
        let file = ParameterValue::File(FileReference::from_path("x"));
        assert!(file.to_text().is_none());
    }
}
