use thiserror::Error;

mod step;

pub use step::{StepError, StepErrorKind};

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Session acquisition failed: {0}")]
    Acquisition(String),

    #[error("{0}")]
    Step(#[from] StepError),

    #[error("Assertion failed: {description} (expected {expected:?}, got {actual:?})")]
    AssertionFailed {
        description: String,
        expected: String,
        actual: String,
    },

    #[error("Scenario already registered: {0}")]
    DuplicateName(String),

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Page closed: {0}")]
    PageClosed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

pub type Result<T> = std::result::Result<T, ScenarioError>;

// Convert anyhow::Error to ScenarioError
impl From<anyhow::Error> for ScenarioError {
    fn from(err: anyhow::Error) -> Self {
        ScenarioError::AnyhowError(err.to_string())
    }
}

impl ScenarioError {
    pub fn assertion(
        description: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        ScenarioError::AssertionFailed {
            description: description.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
