//! HTTP request and response logging with header redaction.
//!
//! Everything here is emitted on the `cmdgen::http` target. In debug mode the
//! CLI routes that target to stdout so the exchange is echoed to the user.

use crate::constants::{ENV_LOG_MAX_BODY, LOG_TARGET_HTTP};
use reqwest::header::HeaderMap;
use tracing::info;

const DEFAULT_MAX_BODY_LEN: usize = 1000;
const REDACTED: &str = "[REDACTED]";

/// Checks if a header carries credentials and must not be echoed
#[must_use]
pub fn should_redact_header(header_name: &str) -> bool {
    let lower = header_name.to_lowercase();
    matches!(
        lower.as_str(),
        "authorization"
            | "proxy-authorization"
            | "x-api-key"
            | "x-access-token"
            | "x-auth-token"
            | "api-key"
            | "cookie"
            | "set-cookie"
    )
}

/// Logs an outgoing request
pub fn log_request(method: &str, url: &str, headers: &HeaderMap, body: Option<&str>) {
    info!(target: LOG_TARGET_HTTP, "{} {}", method.to_uppercase(), url);
    log_headers(headers);
    if let Some(body) = body {
        log_body(body);
    }
}

/// Logs a received response. Streamed bodies are passed as `None`.
pub fn log_response(status: u16, duration_ms: u128, headers: &HeaderMap, body: Option<&str>) {
    info!(target: LOG_TARGET_HTTP, "HTTP {} ({}ms)", status, duration_ms);
    log_headers(headers);
    if let Some(body) = body {
        log_body(body);
    }
}

/// Logs a body read after the response line was logged
pub fn log_body(body: &str) {
    info!(target: LOG_TARGET_HTTP, "{}", truncate(body, get_max_body_len()));
}

fn log_headers(headers: &HeaderMap) {
    for (name, value) in headers {
        let display_value = if should_redact_header(name.as_str()) {
            REDACTED.to_string()
        } else {
            String::from_utf8_lossy(value.as_bytes()).to_string()
        };
        info!(target: LOG_TARGET_HTTP, "{}: {}", name.as_str(), display_value);
    }
}

/// Cuts `body` to at most `max_len` characters, marking the cut.
#[must_use]
pub fn truncate(body: &str, max_len: usize) -> String {
    match body.char_indices().nth(max_len) {
        Some((byte_index, _)) => {
            format!("{} (truncated at {max_len} chars)", &body[..byte_index])
        }
        None => body.to_string(),
    }
}

/// Maximum logged body length from `CMDGEN_LOG_MAX_BODY`, default 1000
#[must_use]
pub fn get_max_body_len() -> usize {
    std::env::var(ENV_LOG_MAX_BODY)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_BODY_LEN)
}
