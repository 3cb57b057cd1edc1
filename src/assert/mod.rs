//! Response assertions used by the `pm.response.to.*` helpers.
//!
//! Every check returns `Err(AssertionError)` on failure; the sandbox turns
//! that into a thrown exception so it composes with `pm.test`.

mod path;

use serde_json::Value;

pub use path::{lookup_path, scalar_text, values_match};

use crate::{error::AssertionError, executor::ResponseData};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusExpectation {
    Code(u16),
    Text(String),
}

pub fn assert_status(
    response: &ResponseData,
    expected: &StatusExpectation,
) -> Result<(), AssertionError> {
    let matches = match expected {
        StatusExpectation::Code(code) => response.status_code == *code,
        StatusExpectation::Text(text) => match text.trim().parse::<u16>() {
            Ok(code) => response.status_code == code,
            Err(_) => response.reason().eq_ignore_ascii_case(text) || response.status == *text,
        },
    };
    if matches {
        return Ok(());
    }

    let expected = match expected {
        StatusExpectation::Code(code) => code.to_string(),
        StatusExpectation::Text(text) => text.clone(),
    };
    Err(status_mismatch(response, expected))
}

/// Passes when `name` is present and, if given, any of its values equals
/// `expected`.
pub fn assert_header(
    response: &ResponseData,
    name: &str,
    expected: Option<&str>,
) -> Result<(), AssertionError> {
    let Some(first) = response.header(name) else {
        return Err(AssertionError::MissingHeader(name.to_string()));
    };
    let Some(expected) = expected else {
        return Ok(());
    };
    if response.header_values(name).any(|value| value == expected) {
        return Ok(());
    }
    Err(AssertionError::Mismatch {
        subject: format!("header '{name}'"),
        expected: expected.to_string(),
        actual: first.to_string(),
    })
}

pub fn assert_ok(response: &ResponseData) -> Result<(), AssertionError> {
    if (200..300).contains(&response.status_code) {
        Ok(())
    } else {
        Err(status_mismatch(response, "2xx".to_string()))
    }
}

pub fn assert_client_error(response: &ResponseData) -> Result<(), AssertionError> {
    if (400..500).contains(&response.status_code) {
        Ok(())
    } else {
        Err(status_mismatch(response, "4xx".to_string()))
    }
}

/// Resolves `path` in the JSON body and, when `expected` is given, compares
/// the value found there.
pub fn assert_json_path(
    body: &str,
    path: &str,
    expected: Option<&Value>,
) -> Result<(), AssertionError> {
    let parsed: Value =
        serde_json::from_str(body).map_err(|err| AssertionError::InvalidJson(err.to_string()))?;
    let actual = lookup_path(&parsed, path)?;

    match expected {
        Some(expected) if !values_match(actual, expected) => Err(AssertionError::Mismatch {
            subject: format!("'{path}'"),
            expected: scalar_text(expected),
            actual: scalar_text(actual),
        }),
        _ => Ok(()),
    }
}

fn status_mismatch(response: &ResponseData, expected: String) -> AssertionError {
    AssertionError::Mismatch {
        subject: "response status".to_string(),
        expected,
        actual: response.status_code.to_string(),
    }
}
