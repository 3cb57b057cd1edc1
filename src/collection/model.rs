use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::script::ScriptPhase;

/// A Postman v2.1 collection as read from disk.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Collection {
    pub info: CollectionInfo,
    pub item: Vec<Item>,
    pub variable: Vec<VariableEntry>,
    pub event: Vec<Event>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectionInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Either a folder (carries `item`) or a request (carries `request`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Item {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Vec<Item>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Request>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variable: Vec<VariableEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub event: Vec<Event>,
}

impl Item {
    pub fn is_folder(&self) -> bool {
        self.item.is_some()
    }

    pub fn children(&self) -> &[Item] {
        self.item.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Request {
    pub method: String,
    pub header: Vec<Header>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    pub url: Url,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Header {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Body {
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Body {
    /// The raw payload, if this is a raw-mode body with content.
    pub fn raw_payload(&self) -> Option<&str> {
        if self.mode != "raw" {
            return None;
        }
        self.raw.as_deref().filter(|raw| !raw.is_empty())
    }
}

/// Request URL. Collections store it either as a plain string or as an
/// object with raw text plus host/path components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "UrlRepr")]
pub struct Url {
    pub raw: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<QueryParam>,
}

impl Url {
    pub fn raw(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryParam {
    pub key: String,
    #[serde(deserialize_with = "scalar_string")]
    pub value: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UrlRepr {
    Raw(String),
    Parts {
        #[serde(default)]
        raw: String,
        #[serde(default, deserialize_with = "string_or_parts")]
        host: Vec<String>,
        #[serde(default, deserialize_with = "string_or_parts")]
        path: Vec<String>,
        #[serde(default)]
        query: Vec<QueryParam>,
    },
}

impl From<UrlRepr> for Url {
    fn from(value: UrlRepr) -> Self {
        match value {
            UrlRepr::Raw(raw) => Url::raw(raw),
            UrlRepr::Parts {
                raw,
                host,
                path,
                query,
            } => Url {
                raw,
                host,
                path,
                query,
            },
        }
    }
}

/// One key/value pair at some scope. `enabled` only matters for
/// environment entries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VariableEntry {
    pub key: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl VariableEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
            kind: None,
        }
    }

    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::new(key, value)
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Event {
    pub listen: String,
    pub script: Script,
}

impl Event {
    pub fn new(phase: ScriptPhase, source: &str) -> Self {
        Self {
            listen: phase.listen_tag().to_string(),
            script: Script {
                exec: source.lines().map(str::to_string).collect(),
                kind: Some("text/javascript".to_string()),
            },
        }
    }

    pub fn phase(&self) -> Option<ScriptPhase> {
        ScriptPhase::from_listen_tag(&self.listen)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Script {
    #[serde(deserialize_with = "string_or_parts")]
    pub exec: Vec<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Script {
    pub fn source(&self) -> String {
        self.exec.join("\n")
    }
}

/// A Postman environment: an id/name plus ordered variables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Environment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub values: Vec<VariableEntry>,
}

fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    })
}

fn string_or_parts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Parts {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Parts>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Parts::One(text)) => text.lines().map(str::to_string).collect(),
        Some(Parts::Many(parts)) => parts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn url_accepts_plain_string() {
        let url: Url = serde_json::from_str(r#""https://example.com/a""#).unwrap();
        assert_eq!(url, Url::raw("https://example.com/a"));
    }

    #[test]
    fn url_accepts_component_object() {
        let url: Url = serde_json::from_str(
            r#"{"raw":"","host":["api","example","com"],"path":["v1","users"],
                "query":[{"key":"page","value":2}]}"#,
        )
        .unwrap();
        assert_eq!(url.host, vec!["api", "example", "com"]);
        assert_eq!(url.path, vec!["v1", "users"]);
        assert_eq!(url.query[0].value, "2");
    }

    #[test]
    fn variable_values_accept_scalars() {
        let entries: Vec<VariableEntry> = serde_json::from_str(
            r#"[{"key":"n","value":5},{"key":"b","value":true,"enabled":false},{"key":"s"}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].value, "5");
        assert_eq!(entries[1].value, "true");
        assert!(!entries[1].enabled);
        assert_eq!(entries[2].value, "");
        assert!(entries[2].enabled);
    }

    #[test]
    fn script_exec_accepts_single_string() {
        let script: Script =
            serde_json::from_str(r#"{"exec":"pm.test('a', () => {});\nvar x = 1;"}"#).unwrap();
        assert_eq!(script.exec.len(), 2);
        assert_eq!(script.source(), "pm.test('a', () => {});\nvar x = 1;");
    }

    #[test]
    fn raw_payload_requires_raw_mode_and_content() {
        let raw = Body {
            mode: "raw".to_string(),
            raw: Some("{}".to_string()),
        };
        let empty = Body {
            mode: "raw".to_string(),
            raw: Some(String::new()),
        };
        let form = Body {
            mode: "urlencoded".to_string(),
            raw: Some("a=b".to_string()),
        };
        assert_eq!(raw.raw_payload(), Some("{}"));
        assert_eq!(empty.raw_payload(), None);
        assert_eq!(form.raw_payload(), None);
    }
}
