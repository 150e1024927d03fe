use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepErrorKind {
    NavigationError,
    ElementNotFound,
    ElementNotVisible,
    TimeoutExceeded,
    ExternalChannelError,
}

impl fmt::Display for StepErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepErrorKind::NavigationError => "navigation error",
            StepErrorKind::ElementNotFound => "element not found",
            StepErrorKind::ElementNotVisible => "element not visible",
            StepErrorKind::TimeoutExceeded => "timeout exceeded",
            StepErrorKind::ExternalChannelError => "external channel error",
        };
        f.write_str(name)
    }
}

/// Failure of a single step primitive against the page.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{kind}{}: {detail}", selector_suffix(.selector))]
pub struct StepError {
    pub kind: StepErrorKind,
    pub selector: Option<String>,
    pub detail: String,
}

fn selector_suffix(selector: &Option<String>) -> String {
    selector
        .as_ref()
        .map(|s| format!(" [{}]", s))
        .unwrap_or_default()
}

impl StepError {
    pub fn new(kind: StepErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            selector: None,
            detail: detail.into(),
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn navigation(detail: impl Into<String>) -> Self {
        Self::new(StepErrorKind::NavigationError, detail)
    }

    pub fn not_found(selector: &str) -> Self {
        Self::new(StepErrorKind::ElementNotFound, "no element matches selector")
            .with_selector(selector)
    }

    pub fn not_visible(selector: &str) -> Self {
        Self::new(StepErrorKind::ElementNotVisible, "element is not visible")
            .with_selector(selector)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(StepErrorKind::TimeoutExceeded, detail)
    }

    pub fn channel(detail: impl Into<String>) -> Self {
        Self::new(StepErrorKind::ExternalChannelError, detail)
    }
}
