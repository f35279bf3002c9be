//! Tracing/logging initialization for the CLI.

use crate::constants;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Wrapper type to write logs to file or stderr.
struct FileOrStderr {
    file: Option<std::sync::Mutex<std::fs::File>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FileOrStderr {
    type Writer = Box<dyn std::io::Write + 'a>;

    fn make_writer(&'a self) -> Self::Writer {
        self.file
            .as_ref()
            .and_then(|mutex| mutex.lock().ok())
            .and_then(|file| file.try_clone().ok())
            .map_or_else(
                || Box::new(std::io::stderr()) as Self::Writer,
                |cloned| Box::new(cloned) as Self::Writer,
            )
    }
}

fn log_writer() -> FileOrStderr {
    use std::fs::OpenOptions;
    use std::sync::Mutex;

    std::env::var(constants::ENV_LOG_FILE).ok().map_or_else(
        || FileOrStderr { file: None },
        |path| match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => FileOrStderr {
                file: Some(Mutex::new(file)),
            },
            Err(e) => {
                // Tracing is not yet initialized; eprintln! is the only output channel available.
                eprintln!("Warning: Could not open log file '{path}': {e}. Using stderr.");
                FileOrStderr { file: None }
            }
        },
    )
}

/// Initialize tracing-subscriber.
///
/// Diagnostics go to stderr (or `CMDGEN_LOG_FILE`) filtered by `-v` or
/// `CMDGEN_LOG`. With `debug` the HTTP exchange on the `cmdgen::http` target
/// is also echoed to stdout as plain lines.
pub fn init_tracing(verbosity: u8, debug: bool) {
    let log_level_str = match verbosity {
        0 => std::env::var(constants::ENV_LOG).unwrap_or_else(|_| "error".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    let env_filter = EnvFilter::try_new(&log_level_str)
        .or_else(|_| EnvFilter::try_new("error"))
        .unwrap_or_else(|_| EnvFilter::new("error"));

    let log_format = std::env::var(constants::ENV_LOG_FORMAT)
        .map_or_else(|_| "text".to_string(), |s| s.to_lowercase());

    if log_format != "json" && log_format != "text" {
        eprintln!(
            "Warning: Unrecognized {} '{log_format}'. Valid values: 'json', 'text'. Using 'text'.",
            constants::ENV_LOG_FORMAT
        );
    }

    let diagnostics: BoxedLayer = if log_format == "json" {
        tracing_subscriber::fmt::layer()
            .json()
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .with_writer(log_writer())
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_line_number(false)
            .with_writer(log_writer())
            .with_filter(env_filter)
            .boxed()
    };

    let mut layers = vec![diagnostics];
    if debug {
        layers.push(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_level(false)
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::io::stdout)
                .with_filter(Targets::new().with_target(constants::LOG_TARGET_HTTP, Level::INFO))
                .boxed(),
        );
    }

    tracing_subscriber::registry().with(layers).init();
}
