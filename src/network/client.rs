//! HTTP client wrapper - executes prepared requests with reqwest

use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::{Method, StatusCode};

use crate::constants::{APP_NAME, APP_VERSION, MAX_RESPONSE_BODY};
use crate::error::{CoreError, Result};
use crate::models::{Request, Response};
use crate::network::transport::Transport;
use crate::storage::HttpSettings;

/// Blocking transport over an async reqwest client. Owns a current-thread
/// tokio runtime so the core stays single-threaded.
pub struct ReqwestTransport {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    timeout_secs: u64,
}

struct Received {
    status: StatusCode,
    headers: HeaderMap,
    total_size: Option<u64>,
    body: Vec<u8>,
    truncated: bool,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::from_settings(&HttpSettings::default())
    }

    /// Apply timeout, TLS verification and redirect policy from settings.
    pub fn from_settings(settings: &HttpSettings) -> Result<Self> {
        let redirect = if settings.follow_redirects {
            Policy::limited(settings.max_redirects as usize)
        } else {
            Policy::none()
        };
        let timeout_secs = settings.timeout.max(1);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .danger_accept_invalid_certs(!settings.ssl_verify_enabled)
            .redirect(redirect)
            .user_agent(format!("{}/{}", APP_NAME, APP_VERSION))
            .build()
            .map_err(|e| CoreError::Transport(format!("client setup failed: {}", e)))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CoreError::Transport(format!("runtime setup failed: {}", e)))?;

        Ok(ReqwestTransport {
            client,
            runtime,
            timeout_secs,
        })
    }

    fn build_request(&self, request: &Request) -> Result<reqwest::RequestBuilder> {
        let method = Method::from_bytes(request.method().as_bytes())
            .map_err(|_| CoreError::Transport(format!("invalid method {}", request.method())))?;
        let mut builder = self.client.request(method, request.url());
        for header in &request.headers {
            builder = builder.header(header.name.as_str(), header.value.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }
        Ok(builder)
    }

    fn describe_error(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("Request timed out ({}s)", self.timeout_secs)
        } else if err.is_connect() {
            format!("Connection failed: {}", err)
        } else if err.is_builder() {
            format!("Invalid request: {}", err)
        } else {
            format!("Request failed: {}", err)
        }
    }
}

async fn receive(builder: reqwest::RequestBuilder) -> std::result::Result<Received, reqwest::Error> {
    let mut resp = builder.send().await?;
    let status = resp.status();
    let headers = resp.headers().clone();
    let total_size = resp.content_length();

    let mut body = Vec::new();
    let mut truncated = false;
    while let Some(chunk) = resp.chunk().await? {
        let room = MAX_RESPONSE_BODY - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        body.extend_from_slice(&chunk);
    }

    Ok(Received {
        status,
        headers,
        total_size,
        body,
        truncated,
    })
}

impl Transport for ReqwestTransport {
    fn send(&mut self, request: &Request) -> Result<Response> {
        let builder = self.build_request(request)?;
        tracing::info!(method = request.method(), url = request.url(), "Sending request");

        let start = Instant::now();
        let received = self
            .runtime
            .block_on(receive(builder))
            .map_err(|e| CoreError::Transport(self.describe_error(&e)))?;
        let elapsed = start.elapsed().as_millis() as u64;

        let mut response = Response::default();
        response.status_code = received.status.as_u16();
        response.status_text = received
            .status
            .canonical_reason()
            .unwrap_or_default()
            .to_string();
        response.response_time_ms = elapsed;
        response.truncated = received.truncated;
        response.total_size = received.total_size;
        response.fill_status_text();

        for (name, value) in &received.headers {
            let value = String::from_utf8_lossy(value.as_bytes());
            if let Err(e) = response.headers.add(name.as_str(), &value) {
                tracing::warn!(header = %name, error = %e, "Dropping response header");
            }
        }
        response.set_body(&received.body)?;

        if received.truncated {
            tracing::warn!(limit = MAX_RESPONSE_BODY, "Response body truncated");
        }
        tracing::info!(
            status = response.status_code,
            elapsed_ms = elapsed,
            bytes = received.body.len(),
            "Request finished"
        );
        Ok(response)
    }
}
