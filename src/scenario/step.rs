//! Scenario and step definitions.
//!
//! Steps are plain data (selectors, literals and variable names), so a
//! scenario can be written in YAML, compared, and replayed.

use crate::core::ChannelKind;
use crate::errors::{Result, ScenarioError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutcome {
    #[default]
    Pass,
    Fail,
}

/// Expected text of an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    Equals(String),
    StartsWith(String),
}

impl TextMatch {
    pub fn matches(&self, actual: &str) -> bool {
        match self {
            TextMatch::Equals(expected) => actual == expected,
            TextMatch::StartsWith(prefix) => actual.starts_with(prefix.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a URL; paths starting with `/` are relative to the target
    Navigate { url: String },

    /// The last navigation answered with a 2xx status
    AssertResponseOk,

    Type { selector: String, text: String },

    Click { selector: String },

    PressKey { key: String },

    SubmitForm { selector: String },

    /// Unconditional delay; 0 means the configured settle delay
    WaitFixed {
        #[serde(default)]
        ms: u64,
    },

    WaitForSelector {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    WaitForNavigation {
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// The session cookie (or `name`) is present or absent
    AssertCookiePresent {
        #[serde(default = "default_true")]
        present: bool,
        #[serde(default)]
        name: Option<String>,
    },

    AssertText { selector: String, expected: TextMatch },

    AssertTitle { equals: String },

    AssertUrl { equals: String },

    AssertVisible { selector: String },

    AssertAbsent { selector: String },

    /// Fetch a one-time code and store it in the variable `into`
    ExtractFromExternalChannel { kind: ChannelKind, into: String },

    Screenshot {
        #[serde(default)]
        name: Option<String>,
    },

    Log { message: String },
}

fn default_true() -> bool {
    true
}

impl Step {
    pub fn navigate(url: &str) -> Self {
        Step::Navigate {
            url: url.to_string(),
        }
    }

    pub fn assert_response_ok() -> Self {
        Step::AssertResponseOk
    }

    pub fn type_text(selector: &str, text: &str) -> Self {
        Step::Type {
            selector: selector.to_string(),
            text: text.to_string(),
        }
    }

    pub fn click(selector: &str) -> Self {
        Step::Click {
            selector: selector.to_string(),
        }
    }

    pub fn press_key(key: &str) -> Self {
        Step::PressKey {
            key: key.to_string(),
        }
    }

    pub fn submit_form(selector: &str) -> Self {
        Step::SubmitForm {
            selector: selector.to_string(),
        }
    }

    pub fn wait_fixed(ms: u64) -> Self {
        Step::WaitFixed { ms }
    }

    pub fn wait_for_selector(selector: &str) -> Self {
        Step::WaitForSelector {
            selector: selector.to_string(),
            timeout_ms: None,
        }
    }

    pub fn wait_for_navigation() -> Self {
        Step::WaitForNavigation { timeout_ms: None }
    }

    pub fn assert_cookie(present: bool) -> Self {
        Step::AssertCookiePresent {
            present,
            name: None,
        }
    }

    pub fn assert_cookie_named(name: &str, present: bool) -> Self {
        Step::AssertCookiePresent {
            present,
            name: Some(name.to_string()),
        }
    }

    pub fn assert_text(selector: &str, text: &str) -> Self {
        Step::AssertText {
            selector: selector.to_string(),
            expected: TextMatch::Equals(text.to_string()),
        }
    }

    pub fn assert_text_starts_with(selector: &str, prefix: &str) -> Self {
        Step::AssertText {
            selector: selector.to_string(),
            expected: TextMatch::StartsWith(prefix.to_string()),
        }
    }

    pub fn assert_title(title: &str) -> Self {
        Step::AssertTitle {
            equals: title.to_string(),
        }
    }

    pub fn assert_url(url: &str) -> Self {
        Step::AssertUrl {
            equals: url.to_string(),
        }
    }

    pub fn assert_visible(selector: &str) -> Self {
        Step::AssertVisible {
            selector: selector.to_string(),
        }
    }

    pub fn assert_absent(selector: &str) -> Self {
        Step::AssertAbsent {
            selector: selector.to_string(),
        }
    }

    pub fn extract_code(kind: ChannelKind, into: &str) -> Self {
        Step::ExtractFromExternalChannel {
            kind,
            into: into.to_string(),
        }
    }

    pub fn screenshot(name: Option<&str>) -> Self {
        Step::Screenshot {
            name: name.map(|n| n.to_string()),
        }
    }

    pub fn log(message: &str) -> Self {
        Step::Log {
            message: message.to_string(),
        }
    }

    /// One-line description for traces and reports.
    pub fn describe(&self) -> String {
        match self {
            Step::Navigate { url } => format!("navigate {}", url),
            Step::AssertResponseOk => "assert response ok".to_string(),
            Step::Type { selector, .. } => format!("type into {}", selector),
            Step::Click { selector } => format!("click {}", selector),
            Step::PressKey { key } => format!("press {}", key),
            Step::SubmitForm { selector } => format!("submit {}", selector),
            Step::WaitFixed { ms } => format!("wait {} ms", ms),
            Step::WaitForSelector { selector, .. } => format!("wait for {}", selector),
            Step::WaitForNavigation { .. } => "wait for navigation".to_string(),
            Step::AssertCookiePresent { present, name } => format!(
                "assert cookie {} {}",
                name.as_deref().unwrap_or("<session>"),
                if *present { "present" } else { "absent" }
            ),
            Step::AssertText { selector, expected } => match expected {
                TextMatch::Equals(text) => format!("assert text of {} == {:?}", selector, text),
                TextMatch::StartsWith(text) => {
                    format!("assert text of {} starts with {:?}", selector, text)
                }
            },
            Step::AssertTitle { equals } => format!("assert title == {:?}", equals),
            Step::AssertUrl { equals } => format!("assert url == {}", equals),
            Step::AssertVisible { selector } => format!("assert {} visible", selector),
            Step::AssertAbsent { selector } => format!("assert {} absent", selector),
            Step::ExtractFromExternalChannel { kind, into } => {
                format!("extract {} code into ${{{}}}", kind, into)
            }
            Step::Screenshot { name } => {
                format!("screenshot {}", name.as_deref().unwrap_or("<auto>"))
            }
            Step::Log { message } => format!("log {:?}", message),
        }
    }
}

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Executed strictly in this order
    pub steps: Vec<Step>,

    #[serde(default)]
    pub expect: ExpectedOutcome,

    /// Transient files and directories removed at teardown
    #[serde(default)]
    pub cleanup: Vec<PathBuf>,
}

impl Scenario {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            tags: Vec::new(),
            steps: Vec::new(),
            expect: ExpectedOutcome::Pass,
            cleanup: Vec::new(),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn expect(mut self, expect: ExpectedOutcome) -> Self {
        self.expect = expect;
        self
    }

    pub fn cleanup(mut self, path: impl Into<PathBuf>) -> Self {
        self.cleanup.push(path.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ScenarioError::ScenarioParse(
                "scenario name must not be empty".to_string(),
            ));
        }
        for (index, step) in self.steps.iter().enumerate() {
            if let Step::ExtractFromExternalChannel { into, .. } = step {
                if !super::variables::is_valid_name(into) {
                    return Err(ScenarioError::ScenarioParse(format!(
                        "{}: step {} stores into invalid variable name {:?}",
                        self.name, index, into
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    /// Load one scenario file. Relative `cleanup` entries are taken relative
    /// to the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut scenario = Self::from_yaml(&content).map_err(|e| match e {
            ScenarioError::Yaml(err) => {
                ScenarioError::ScenarioParse(format!("{}: {}", path.display(), err))
            }
            other => other,
        })?;

        if let Some(dir) = path.parent() {
            scenario.cleanup = scenario.cleanup_paths(dir);
        }
        Ok(scenario)
    }

    /// Cleanup paths with relative entries joined onto `base`.
    pub fn cleanup_paths(&self, base: &Path) -> Vec<PathBuf> {
        self.cleanup
            .iter()
            .map(|path| {
                if path.is_relative() {
                    base.join(path)
                } else {
                    path.clone()
                }
            })
            .collect()
    }

    /// Load every `*.yaml`/`*.yml` scenario under `dir`, ordered by path.
    pub fn load_all(dir: &Path) -> Result<Vec<Self>> {
        if !dir.is_dir() {
            return Err(ScenarioError::ScenarioParse(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_type().is_file()
                    && e.path()
                        .extension()
                        .map(|ext| ext == "yaml" || ext == "yml")
                        .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_passwordless_yaml() {
        let yaml = r##"
name: passwordless
description: Passwordless login with an emailed token
tags:
  - passwordless
steps:
  - action: navigate
    url: /login
  - action: assert_absent
    selector: "#password"
  - action: type
    selector: "#username"
    text: user3+casuser
  - action: press_key
    key: Enter
  - action: assert_text
    selector: "#login h3"
    expected:
      equals: Provide Token
  - action: assert_text
    selector: "#login p"
    expected:
      starts_with: Please provide the security token
  - action: extract_from_external_channel
    kind: email
    into: code
  - action: type
    selector: "#token"
    text: "${code}"
  - action: submit_form
    selector: "#fm1"
  - action: assert_cookie_present
  - action: wait_fixed
"##;
        let scenario = Scenario::from_yaml(yaml).unwrap();

        assert_eq!(scenario.name, "passwordless");
        assert_eq!(scenario.expect, ExpectedOutcome::Pass);
        assert_eq!(scenario.steps.len(), 11);
        assert_eq!(scenario.steps[0], Step::navigate("/login"));
        assert_eq!(
            scenario.steps[5],
            Step::assert_text_starts_with("#login p", "Please provide the security token")
        );
        assert_eq!(
            scenario.steps[6],
            Step::extract_code(ChannelKind::Email, "code")
        );
        assert_eq!(scenario.steps[9], Step::assert_cookie(true));
        assert_eq!(scenario.steps[10], Step::wait_fixed(0));
    }

    #[test]
    fn test_parse_expected_failure_and_cleanup() {
        let yaml = r#"
name: wrong-password
expect: fail
cleanup:
  - saml-md
steps:
  - action: assert_cookie_present
    present: false
    name: TGC
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.expect, ExpectedOutcome::Fail);
        assert_eq!(scenario.cleanup, vec![PathBuf::from("saml-md")]);
        assert_eq!(scenario.steps[0], Step::assert_cookie_named("TGC", false));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let yaml = r#"
name: bad
steps:
  - action: teleport
    url: /
"#;
        assert!(matches!(
            Scenario::from_yaml(yaml),
            Err(ScenarioError::Yaml(_))
        ));
    }

    #[test]
    fn test_invalid_variable_name_rejected() {
        let scenario = Scenario::new("bad-var").step(Step::extract_code(ChannelKind::Email, "my code"));
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::ScenarioParse(_))
        ));
    }

    #[test]
    fn test_load_all_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "name: second\nsteps:\n  - action: navigate\n    url: /logout\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.yml"),
            "name: first\nsteps:\n  - action: navigate\n    url: /login\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let scenarios = Scenario::load_all(dir.path()).unwrap();
        let names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_file_cleanup_relative_to_scenario_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saml.yaml");
        std::fs::write(
            &path,
            "name: saml\ncleanup:\n  - saml-md\n  - /tmp/sp-metadata.xml\nsteps:\n  - action: navigate\n    url: /login\n",
        )
        .unwrap();

        let scenario = Scenario::from_file(&path).unwrap();
        assert_eq!(
            scenario.cleanup,
            vec![dir.path().join("saml-md"), PathBuf::from("/tmp/sp-metadata.xml")]
        );
    }

    #[test]
    fn test_cleanup_paths_keep_absolute_entries() {
        let scenario = Scenario::new("saml")
            .cleanup("saml-md")
            .cleanup("/var/cas/saml-md");
        assert_eq!(
            scenario.cleanup_paths(Path::new("/work/artifacts")),
            vec![
                PathBuf::from("/work/artifacts/saml-md"),
                PathBuf::from("/var/cas/saml-md")
            ]
        );
    }

    #[test]
    fn test_text_match() {
        assert!(TextMatch::Equals("Log In Successful".into()).matches("Log In Successful"));
        assert!(!TextMatch::Equals("Log In Successful".into()).matches("Log In Successful!"));
        assert!(TextMatch::StartsWith("[true]".into()).matches("[true] boolean"));
        assert!(!TextMatch::StartsWith("[true]".into()).matches("[false]"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            Step::assert_cookie(false).describe(),
            "assert cookie <session> absent"
        );
        assert_eq!(
            Step::extract_code(ChannelKind::Email, "code").describe(),
            "extract email code into ${code}"
        );
    }
}
