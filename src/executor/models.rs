use std::time::Duration;

use crate::error::RequestError;

/// What was actually sent, after variable resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl SentRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Captured result of one HTTP exchange. Never mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseData {
    pub status_code: u16,
    pub status: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub elapsed: Duration,
    pub request: SentRequest,
    pub error: Option<RequestError>,
}

impl ResponseData {
    pub(crate) fn failed(request: SentRequest, error: RequestError, elapsed: Duration) -> Self {
        Self {
            elapsed,
            request,
            error: Some(error),
            ..Self::default()
        }
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Status reason phrase without the numeric code, e.g. `OK`.
    pub fn reason(&self) -> &str {
        self.status
            .split_once(' ')
            .map(|(_, reason)| reason)
            .unwrap_or_default()
    }

    pub fn duration_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
