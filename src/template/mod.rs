use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::scope::ScopeSnapshot;

static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("valid regex"));

/// Replaces every `{{ key }}` with its value from `snapshot`. Unknown keys
/// stay verbatim and substituted values are not scanned again.
pub fn resolve(text: &str, snapshot: &ScopeSnapshot) -> String {
    substitute(text, |key| snapshot.get(key))
}

pub fn resolve_map(text: &str, variables: &HashMap<String, String>) -> String {
    substitute(text, |key| variables.get(key).map(String::as_str))
}

fn substitute<'v>(text: &str, lookup: impl Fn(&str) -> Option<&'v str>) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }

    PLACEHOLDER_PATTERN
        .replace_all(text, |caps: &Captures<'_>| match lookup(caps[1].trim()) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
