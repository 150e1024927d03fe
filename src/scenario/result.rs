use super::step::ExpectedOutcome;
use crate::errors::{Result, ScenarioError, StepError};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Runner lifecycle: `Idle → Running → {Passed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureReason {
    Acquisition {
        detail: String,
    },
    Step(StepError),
    AssertionFailed {
        description: String,
        expected: String,
        actual: String,
    },
    /// Misconfigured scenario data, e.g. an undefined variable
    Other {
        detail: String,
    },
}

impl From<ScenarioError> for FailureReason {
    fn from(err: ScenarioError) -> Self {
        match err {
            ScenarioError::Acquisition(detail) => FailureReason::Acquisition { detail },
            ScenarioError::Step(step) => FailureReason::Step(step),
            ScenarioError::AssertionFailed {
                description,
                expected,
                actual,
            } => FailureReason::AssertionFailed {
                description,
                expected,
                actual,
            },
            other => FailureReason::Other {
                detail: other.to_string(),
            },
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Acquisition { detail } => {
                write!(f, "session acquisition failed: {}", detail)
            }
            FailureReason::Step(step) => write!(f, "{}", step),
            FailureReason::AssertionFailed {
                description,
                expected,
                actual,
            } => write!(
                f,
                "assertion failed: {} (expected {:?}, got {:?})",
                description, expected, actual
            ),
            FailureReason::Other { detail } => f.write_str(detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed {
        /// `None` when the failure happened outside any step
        step_index: Option<usize>,
        reason: FailureReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub description: String,
    pub duration_ms: u64,
    pub status: StepStatus,
}

/// Result of one scenario execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub expected: ExpectedOutcome,
    pub outcome: Outcome,
    /// Steps that actually ran, in order; ends at the failing step
    pub trace: Vec<StepRecord>,
    pub screenshots: Vec<PathBuf>,
    pub failure_screenshot: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }

    pub fn failed_step(&self) -> Option<usize> {
        match &self.outcome {
            Outcome::Failed { step_index, .. } => *step_index,
            Outcome::Passed => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.outcome {
            Outcome::Failed { reason, .. } => Some(reason),
            Outcome::Passed => None,
        }
    }

    pub fn met_expectation(&self) -> bool {
        match self.expected {
            ExpectedOutcome::Pass => self.passed(),
            ExpectedOutcome::Fail => !self.passed(),
        }
    }

    /// One report line: `PASSED name (12 ms)` or
    /// `FAILED name: step 3 (click #x): element not found ...`.
    pub fn summary_line(&self) -> String {
        let verdict = if self.met_expectation() {
            "PASSED"
        } else {
            "FAILED"
        };

        let mut line = format!("{} {}", verdict, self.name);
        if let Outcome::Failed { step_index, reason } = &self.outcome {
            line.push_str(": ");
            if let Some(index) = step_index {
                let description = self
                    .trace
                    .get(*index)
                    .map(|r| r.description.as_str())
                    .unwrap_or("?");
                line.push_str(&format!("step {} ({}): ", index, description));
            }
            line.push_str(&reason.to_string());
            if self.expected == ExpectedOutcome::Fail {
                line.push_str(" [expected failure]");
            }
        } else if self.expected == ExpectedOutcome::Fail {
            line.push_str(": passed but was expected to fail");
        }
        if let Some(path) = &self.failure_screenshot {
            line.push_str(&format!(" [screenshot {}]", path.display()));
        }
        line.push_str(&format!(" ({} ms)", self.duration_ms));
        line
    }
}

/// Results of a whole registry run, in registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteReport {
    pub results: IndexMap<String, ScenarioResult>,
    pub duration_ms: u64,
}

impl SuiteReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ScenarioResult> {
        self.results.get(name)
    }

    pub fn passed(&self) -> usize {
        self.results.values().filter(|r| r.met_expectation()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.passed()
    }

    /// 0 iff every scenario met its expected outcome.
    pub fn exit_code(&self) -> i32 {
        if self.failed() == 0 {
            0
        } else {
            1
        }
    }

    pub fn summary_lines(&self) -> Vec<String> {
        self.results.values().map(|r| r.summary_line()).collect()
    }

    /// Write results to `dir/scenario-results.json`.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join("scenario-results.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StepErrorKind;

    fn result(name: &str, outcome: Outcome, expected: ExpectedOutcome) -> ScenarioResult {
        ScenarioResult {
            name: name.to_string(),
            expected,
            outcome,
            trace: vec![
                StepRecord {
                    index: 0,
                    description: "navigate /login".to_string(),
                    duration_ms: 5,
                    status: StepStatus::Ok,
                },
                StepRecord {
                    index: 1,
                    description: "click #auth-tab".to_string(),
                    duration_ms: 5,
                    status: StepStatus::Failed,
                },
            ],
            screenshots: vec![],
            failure_screenshot: None,
            started_at: Utc::now(),
            duration_ms: 10,
        }
    }

    fn failed_at_click() -> Outcome {
        Outcome::Failed {
            step_index: Some(1),
            reason: FailureReason::Step(StepError::not_found("#auth-tab")),
        }
    }

    #[test]
    fn test_summary_line_for_failure() {
        let r = result("attributes", failed_at_click(), ExpectedOutcome::Pass);
        assert_eq!(
            r.summary_line(),
            "FAILED attributes: step 1 (click #auth-tab): element not found [#auth-tab]: no element matches selector (10 ms)"
        );
    }

    #[test]
    fn test_expected_failure_counts_as_pass() {
        let r = result("wrong-password", failed_at_click(), ExpectedOutcome::Fail);
        assert!(r.met_expectation());
        assert!(r.summary_line().starts_with("PASSED wrong-password"));

        let mut report = SuiteReport::default();
        report.results.insert(r.name.clone(), r);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_exit_code_with_failure() {
        let mut report = SuiteReport::default();
        let ok = result("a", Outcome::Passed, ExpectedOutcome::Pass);
        let bad = result("b", failed_at_click(), ExpectedOutcome::Pass);
        report.results.insert(ok.name.clone(), ok);
        report.results.insert(bad.name.clone(), bad);

        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_empty_report_exits_zero() {
        assert_eq!(SuiteReport::default().exit_code(), 0);
    }

    #[test]
    fn test_failure_reason_from_error() {
        let reason: FailureReason = ScenarioError::assertion("page title", "X", "Y").into();
        assert_eq!(
            reason,
            FailureReason::AssertionFailed {
                description: "page title".to_string(),
                expected: "X".to_string(),
                actual: "Y".to_string(),
            }
        );

        let reason: FailureReason = ScenarioError::from(StepError::timeout("slow")).into();
        match reason {
            FailureReason::Step(step) => assert_eq!(step.kind, StepErrorKind::TimeoutExceeded),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = SuiteReport::default();
        let r = result("attributes", failed_at_click(), ExpectedOutcome::Pass);
        report.results.insert(r.name.clone(), r);

        let path = report.write_json(dir.path()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["results"]["attributes"]["outcome"]["status"], "failed");
        assert_eq!(json["results"]["attributes"]["outcome"]["step_index"], 1);
        assert_eq!(
            json["results"]["attributes"]["outcome"]["reason"]["type"],
            "step"
        );
        assert_eq!(
            json["results"]["attributes"]["outcome"]["reason"]["kind"],
            "ElementNotFound"
        );
    }
}
