//! HTTP client construction and logged request sending shared by the
//! executor, the authenticators and the plugins.

use crate::error::Error;
use crate::logging;
use std::sync::Once;
use std::time::Instant;

static CRYPTO_PROVIDER: Once = Once::new();

/// Installs the process-wide rustls crypto provider. Safe to call repeatedly.
pub fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        #[cfg(not(target_os = "windows"))]
        let provider = rustls::crypto::ring::default_provider();
        #[cfg(target_os = "windows")]
        let provider = rustls::crypto::aws_lc_rs::default_provider();
        // Another component may have installed one first
        let _ = provider.install_default();
    });
}

/// Build HTTP client; `insecure` disables certificate verification
///
/// # Errors
///
/// Returns a transport error if the client cannot be created.
pub fn build_client(insecure: bool) -> Result<reqwest::Client, Error> {
    install_crypto_provider();
    reqwest::Client::builder()
        .danger_accept_invalid_certs(insecure)
        .build()
        .map_err(|e| Error::transport(format!("Failed to create HTTP client: {e}")))
}

/// Sends `request`, logging the exchange on the `cmdgen::http` target. The
/// response body is left unread.
///
/// # Errors
///
/// Returns a transport error if the request cannot be built or sent.
pub async fn send(
    client: &reqwest::Client,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, Error> {
    let request = request.build().map_err(Error::transport)?;
    let body = request
        .body()
        .and_then(reqwest::Body::as_bytes)
        .map(String::from_utf8_lossy);
    logging::log_request(
        request.method().as_str(),
        request.url().as_str(),
        request.headers(),
        body.as_deref(),
    );

    let started = Instant::now();
    let response = client.execute(request).await.map_err(Error::transport)?;
    logging::log_response(
        response.status().as_u16(),
        started.elapsed().as_millis(),
        response.headers(),
        None,
    );
    Ok(response)
}

/// Reads the whole body as text, logging it.
///
/// # Errors
///
/// Returns `InvalidResponse` if the body cannot be read.
pub async fn read_text(response: reqwest::Response) -> Result<String, Error> {
    let text = response.text().await.map_err(Error::invalid_response)?;
    if !text.is_empty() {
        logging::log_body(&text);
    }
    Ok(text)
}
