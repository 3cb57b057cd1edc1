use crate::{
    collection::{Request, Url},
    scope::ScopeSnapshot,
    template::resolve,
};

use super::models::SentRequest;

/// Resolves a request description into the exact method, URL, headers and
/// body that will go on the wire.
pub fn prepare_request(request: &Request, snapshot: &ScopeSnapshot) -> SentRequest {
    let method = match request.method.trim() {
        "" => "GET".to_string(),
        method => method.to_ascii_uppercase(),
    };

    let headers = request
        .header
        .iter()
        .filter(|header| !header.disabled)
        .map(|header| (header.key.clone(), resolve(&header.value, snapshot)))
        .collect();

    let body = request
        .body
        .as_ref()
        .and_then(|body| body.raw_payload())
        .map(|raw| resolve(raw, snapshot));

    SentRequest {
        method,
        url: resolve(&effective_url(&request.url), snapshot),
        headers,
        body,
    }
}

/// The raw URL when present, otherwise one synthesised from host and path
/// components. With neither, the raw field is used as-is.
pub fn effective_url(url: &Url) -> String {
    if !url.raw.is_empty() || url.host.is_empty() {
        return url.raw.clone();
    }

    let mut synthesized = format!("https://{}/{}", url.host.join("."), url.path.join("/"));
    let query: Vec<String> = url
        .query
        .iter()
        .filter(|param| !param.disabled)
        .map(|param| format!("{}={}", param.key, param.value))
        .collect();
    if !query.is_empty() {
        synthesized.push('?');
        synthesized.push_str(&query.join("&"));
    }
    synthesized
}
