use crate::errors::{Result, ScenarioError};
use crate::types::Viewport;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub session: SessionConfig,
    pub target: TargetConfig,
    pub channel: ChannelConfig,
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub ignore_certificate_errors: bool,
    pub args: Vec<String>,
    pub launch_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub navigation_timeout_ms: u64,
    pub element_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Delay used by `wait_fixed` steps that do not name a duration.
    pub settle_delay_ms: u64,
}

/// The service under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub base_url: String,
    pub session_cookie: String,
    /// Seeded into every scenario for `${name}` substitution. Values from a
    /// config file override the defaults key by key.
    #[serde(deserialize_with = "merge_variables")]
    pub variables: BTreeMap<String, String>,
}

fn default_variables() -> BTreeMap<String, String> {
    let mut variables = BTreeMap::new();
    variables.insert("username".to_string(), "casuser".to_string());
    variables.insert("password".to_string(), "Mellon".to_string());
    variables.insert(
        "sso_peer_url".to_string(),
        "https://localhost:8444/cas".to_string(),
    );
    variables
}

fn merge_variables<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<String, String>::deserialize(deserializer)?;
    let mut variables = default_variables();
    variables.extend(overrides);
    Ok(variables)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Regex with one capture group; the whole trimmed body is used when unset.
    pub code_pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub scenario_timeout_ms: u64,
    pub screenshot_on_failure: bool,
    pub artifacts_dir: PathBuf,
    pub max_concurrency: usize,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.target.base_url).map_err(|e| {
            ScenarioError::Config(format!(
                "target.base_url '{}' is not a valid URL: {}",
                self.target.base_url, e
            ))
        })?;
        if self.session.poll_interval_ms == 0 {
            return Err(ScenarioError::Config(
                "session.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.runner.max_concurrency == 0 {
            return Err(ScenarioError::Config(
                "runner.max_concurrency must be at least 1".to_string(),
            ));
        }
        if let Some(pattern) = &self.channel.code_pattern {
            regex::Regex::new(pattern).map_err(|e| {
                ScenarioError::Config(format!("channel.code_pattern is invalid: {}", e))
            })?;
        }
        Ok(())
    }
}

impl SessionConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            ignore_certificate_errors: true,
            args: vec![],
            launch_timeout_ms: 30000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30000,
            element_timeout_ms: 10000,
            poll_interval_ms: 100,
            settle_delay_ms: 1000,
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:8443/cas".to_string(),
            session_cookie: "TGC".to_string(),
            variables: default_variables(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8282".to_string(),
            timeout_ms: 15000,
            poll_interval_ms: 500,
            code_pattern: None,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            scenario_timeout_ms: 120000,
            screenshot_on_failure: true,
            artifacts_dir: PathBuf::from("scenario-artifacts"),
            max_concurrency: 1,
        }
    }
}
