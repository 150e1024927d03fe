//! Read-only checks over values the step primitives already produced.
//!
//! Every function fails fast with `ScenarioError::AssertionFailed`.

use super::step::TextMatch;
use crate::errors::{Result, ScenarioError};
use crate::types::{CookieData, PageResponse};

pub fn assert_equals(description: &str, expected: &str, actual: &str) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ScenarioError::assertion(description, expected, actual))
    }
}

pub fn assert_text_match(description: &str, expected: &TextMatch, actual: &str) -> Result<()> {
    if expected.matches(actual) {
        return Ok(());
    }
    let expected = match expected {
        TextMatch::Equals(text) => text.clone(),
        TextMatch::StartsWith(prefix) => format!("{}...", prefix),
    };
    Err(ScenarioError::assertion(description, expected, actual))
}

fn presence(present: bool) -> &'static str {
    if present {
        "present"
    } else {
        "absent"
    }
}

pub fn assert_present(description: &str, expected: bool, actual: bool) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ScenarioError::assertion(
            description,
            presence(expected),
            presence(actual),
        ))
    }
}

pub fn assert_cookie(cookies: &[CookieData], name: &str, present: bool) -> Result<()> {
    let found = cookies.iter().any(|c| c.name == name && !c.value.is_empty());
    if found == present {
        return Ok(());
    }

    let names: Vec<&str> = cookies.iter().map(|c| c.name.as_str()).collect();
    let actual = if found {
        "present".to_string()
    } else {
        format!("absent (cookies: [{}])", names.join(", "))
    };
    Err(ScenarioError::assertion(
        format!("cookie {}", name),
        presence(present),
        actual,
    ))
}

pub fn assert_response_ok(response: Option<&PageResponse>) -> Result<()> {
    match response {
        Some(response) if response.ok() => Ok(()),
        Some(response) => Err(ScenarioError::assertion(
            format!("response status of {}", response.url),
            "2xx",
            response.status.to_string(),
        )),
        None => Err(ScenarioError::assertion(
            "response status",
            "2xx",
            "no navigation yet",
        )),
    }
}
