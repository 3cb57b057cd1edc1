use std::time::{Duration, Instant};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Method,
};
use tracing::{info, warn};
use url::Url;

use crate::{collection::Request, error::RequestError, scope::ScopeSnapshot};

use super::{
    builder::prepare_request,
    models::{ResponseData, SentRequest},
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("pmrun/", env!("CARGO_PKG_VERSION"));

/// Sends requests through one reusable client with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new(timeout: Duration) -> Result<Self, RequestError> {
        Ok(Self {
            client: build_client(timeout)?,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves `request` against `snapshot` and performs it. Failures are
    /// reported on the returned value, never as an `Err`.
    pub async fn execute(&self, request: &Request, snapshot: &ScopeSnapshot) -> ResponseData {
        let sent = prepare_request(request, snapshot);
        info!(method = %sent.method, url = %sent.url, "sending request");

        let start = Instant::now();
        match self.send(&sent).await {
            Ok(captured) => {
                let elapsed = start.elapsed();
                match &captured.error {
                    None => info!(
                        status = captured.status_code,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "response received"
                    ),
                    Some(err) => warn!(
                        status = captured.status_code,
                        error = %err,
                        url = %sent.url,
                        "response body could not be read"
                    ),
                }
                ResponseData {
                    status_code: captured.status_code,
                    status: captured.status,
                    headers: captured.headers,
                    body: captured.body,
                    elapsed,
                    request: sent,
                    error: captured.error,
                }
            }
            Err(err) => {
                let elapsed = start.elapsed();
                warn!(error = %err, url = %sent.url, "request failed");
                ResponseData::failed(sent, err, elapsed)
            }
        }
    }

    async fn send(&self, sent: &SentRequest) -> Result<Captured, RequestError> {
        let method = Method::from_bytes(sent.method.as_bytes())
            .map_err(|_| RequestError::Build(format!("invalid HTTP method {}", sent.method)))?;
        let url = Url::parse(&sent.url)
            .map_err(|err| RequestError::Build(format!("invalid URL '{}': {err}", sent.url)))?;

        let mut header_map = HeaderMap::new();
        for (name, value) in &sent.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| RequestError::Build(format!("invalid header name '{name}'")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| RequestError::Build(format!("invalid value for header '{name}'")))?;
            header_map.append(name, value);
        }

        let mut request_builder = self.client.request(method, url).headers(header_map);
        if let Some(body) = &sent.body {
            request_builder = request_builder.body(body.clone());
        }

        let response = request_builder.send().await.map_err(classify)?;

        let status = response.status();
        let headers = collect_headers(response.headers());
        let status_line = match status.canonical_reason() {
            Some(reason) => format!("{} {}", status.as_u16(), reason),
            None => status.as_u16().to_string(),
        };
        // Status and headers are already in hand; keep them if the body fails.
        let (body, error) = match response.text().await {
            Ok(body) => (body, None),
            Err(err) => (String::new(), Some(RequestError::Body(err.to_string()))),
        };

        Ok(Captured {
            status_code: status.as_u16(),
            status: status_line,
            headers,
            body,
            error,
        })
    }
}

fn build_client(timeout: Duration) -> Result<Client, RequestError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|err| RequestError::Build(format!("creating HTTP client: {err}")))
}

/// Performs `request` with the default timeout. A client that cannot be
/// created is reported on the response like any other build error.
pub async fn execute(request: &Request, snapshot: &ScopeSnapshot) -> ResponseData {
    match HttpExecutor::new(DEFAULT_REQUEST_TIMEOUT) {
        Ok(executor) => executor.execute(request, snapshot).await,
        Err(err) => ResponseData::failed(prepare_request(request, snapshot), err, Duration::ZERO),
    }
}

struct Captured {
    status_code: u16,
    status: String,
    headers: Vec<(String, String)>,
    body: String,
    error: Option<RequestError>,
}

fn classify(err: reqwest::Error) -> RequestError {
    if err.is_builder() {
        RequestError::Build(err.to_string())
    } else if err.is_timeout() {
        RequestError::Transport(format!("timed out: {err}"))
    } else {
        RequestError::Transport(err.to_string())
    }
}

fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}
