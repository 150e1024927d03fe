use super::assertions;
use super::primitives::StepPrimitives;
use super::result::{
    FailureReason, Outcome, RunState, ScenarioResult, StepRecord, StepStatus,
};
use super::step::{Scenario, Step};
use super::variables::Variables;
use crate::browser::Session;
use crate::core::{BrowserTrait, Config, MessageChannel};
use crate::errors::{Result, ScenarioError, StepError};
use crate::types::PageResponse;
use crate::utils::{remove_path, ScreenshotManager};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Resolve a step URL against the target base URL.
///
/// Absolute `http(s)` URLs pass through; anything else is appended to the
/// base so `/login` on `https://host/cas` becomes `https://host/cas/login`.
pub fn resolve_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

/// Mutable bookkeeping for one execution.
struct Execution {
    variables: Variables,
    last_response: Option<PageResponse>,
    trace: Vec<StepRecord>,
    screenshots: Vec<PathBuf>,
    current_step: Option<usize>,
    /// Document loaded before the last click, key press or submit.
    document_before: Option<String>,
}

/// Executes scenarios, one fresh session per execution.
pub struct ScenarioRunner<B: BrowserTrait> {
    config: Arc<Config>,
    browser_factory: Arc<dyn Fn() -> B + Send + Sync>,
    channel: Option<Arc<dyn MessageChannel>>,
}

impl<B: BrowserTrait> ScenarioRunner<B> {
    pub fn new(config: Config, browser_factory: impl Fn() -> B + Send + Sync + 'static) -> Self {
        Self {
            config: Arc::new(config),
            browser_factory: Arc::new(browser_factory),
            channel: None,
        }
    }

    pub fn with_channel(mut self, channel: Arc<dyn MessageChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn transition(scenario: &str, state: &mut RunState, next: RunState) {
        debug!(scenario, from = ?*state, to = ?next, "State transition");
        *state = next;
    }

    /// Run `scenario` to a terminal state.
    ///
    /// Never returns an error: every failure becomes `Outcome::Failed`. The
    /// session is closed exactly once on every path out of this function,
    /// and released on drop if the returned future is cancelled.
    pub async fn execute(&self, scenario: &Scenario) -> ScenarioResult {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let mut state = RunState::Idle;

        info!(scenario = %scenario.name, steps = scenario.steps.len(), "Starting scenario");
        Self::transition(&scenario.name, &mut state, RunState::Running);

        let mut session =
            match Session::open((self.browser_factory)(), &self.config.browser).await {
                Ok(session) => session,
                Err(e) => {
                    error!(scenario = %scenario.name, "Could not acquire session: {}", e);
                    // Nothing was opened, but declared transient files still go.
                    self.remove_cleanup_paths(scenario).await;
                    Self::transition(&scenario.name, &mut state, RunState::Failed);
                    return ScenarioResult {
                        name: scenario.name.clone(),
                        expected: scenario.expect,
                        outcome: Outcome::Failed {
                            step_index: None,
                            reason: FailureReason::from(e),
                        },
                        trace: Vec::new(),
                        screenshots: Vec::new(),
                        failure_screenshot: None,
                        started_at,
                        duration_ms: start_time.elapsed().as_millis() as u64,
                    };
                }
            };

        info!(scenario = %scenario.name, session = %session.id(), "Session acquired");
        for path in scenario.cleanup_paths(&self.config.runner.artifacts_dir) {
            session.add_cleanup(path);
        }

        let mut execution = Execution {
            variables: Variables::new(&self.config.target.variables),
            last_response: None,
            trace: Vec::new(),
            screenshots: Vec::new(),
            current_step: None,
            document_before: None,
        };

        let scenario_timeout = Duration::from_millis(self.config.runner.scenario_timeout_ms);
        let run = tokio::time::timeout(
            scenario_timeout,
            self.run_steps(&session, scenario, &mut execution),
        )
        .await;

        let outcome = match run {
            Ok(Ok(())) => Outcome::Passed,
            Ok(Err((index, err))) => Outcome::Failed {
                step_index: Some(index),
                reason: FailureReason::from(err),
            },
            Err(_) => {
                let index = execution.current_step;
                if let Some(index) = index {
                    Self::record(&mut execution, scenario, index, Duration::ZERO, false);
                }
                Outcome::Failed {
                    step_index: index,
                    reason: FailureReason::Step(StepError::timeout(format!(
                        "scenario exceeded {} ms",
                        scenario_timeout.as_millis()
                    ))),
                }
            }
        };

        let mut failure_screenshot = None;
        match &outcome {
            Outcome::Passed => {
                Self::transition(&scenario.name, &mut state, RunState::Passed);
            }
            Outcome::Failed { step_index, reason } => {
                Self::transition(&scenario.name, &mut state, RunState::Failed);
                error!(
                    scenario = %scenario.name,
                    step = ?step_index,
                    "Scenario failed: {}",
                    reason
                );
                if self.config.runner.screenshot_on_failure {
                    failure_screenshot = self.capture_failure(&session, scenario).await;
                }
            }
        }

        if let Err(e) = session.close().await {
            warn!(scenario = %scenario.name, session = %session.id(), "Teardown error (ignored): {}", e);
        }

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(scenario = %scenario.name, state = ?state, duration_ms, "Scenario finished");

        ScenarioResult {
            name: scenario.name.clone(),
            expected: scenario.expect,
            outcome,
            trace: execution.trace,
            screenshots: execution.screenshots,
            failure_screenshot,
            started_at,
            duration_ms,
        }
    }

    async fn run_steps(
        &self,
        session: &Session<B>,
        scenario: &Scenario,
        execution: &mut Execution,
    ) -> std::result::Result<(), (usize, ScenarioError)> {
        let page = session.page().map_err(|e| (0, e))?;
        let primitives = StepPrimitives::new(
            page,
            &self.config.session,
            self.channel.as_deref(),
            &self.config.runner.artifacts_dir,
        );

        for (index, step) in scenario.steps.iter().enumerate() {
            execution.current_step = Some(index);
            debug!(scenario = %scenario.name, index, step = %step.describe(), "Running step");

            let step_start = Instant::now();
            let result = self
                .run_step(&primitives, scenario, index, step, execution)
                .await;
            let ok = result.is_ok();
            Self::record(execution, scenario, index, step_start.elapsed(), ok);

            if let Err(e) = result {
                return Err((index, e));
            }
        }

        execution.current_step = None;
        Ok(())
    }

    fn record(
        execution: &mut Execution,
        scenario: &Scenario,
        index: usize,
        elapsed: Duration,
        ok: bool,
    ) {
        execution.trace.push(StepRecord {
            index,
            description: scenario.steps[index].describe(),
            duration_ms: elapsed.as_millis() as u64,
            status: if ok { StepStatus::Ok } else { StepStatus::Failed },
        });
    }

    async fn run_step(
        &self,
        primitives: &StepPrimitives<'_, B::Page>,
        scenario: &Scenario,
        index: usize,
        step: &Step,
        execution: &mut Execution,
    ) -> Result<()> {
        let session_config = &self.config.session;
        let vars = &execution.variables;

        match step {
            Step::Navigate { url } => {
                let url = resolve_url(&self.config.target.base_url, &vars.substitute(url)?);
                let response = primitives.navigate(&url).await?;
                info!(scenario = %scenario.name, url = %response.url, status = response.status, "Navigated");
                execution.last_response = Some(response);
                execution.document_before = None;
            }
            Step::AssertResponseOk => {
                assertions::assert_response_ok(execution.last_response.as_ref())?;
            }
            Step::Type { selector, text } => {
                let text = vars.substitute(text)?;
                primitives.type_text(selector, &text).await?;
            }
            Step::Click { selector } => {
                execution.document_before = Self::snapshot(primitives).await;
                primitives.click(selector).await?;
            }
            Step::PressKey { key } => {
                execution.document_before = Self::snapshot(primitives).await;
                primitives.press_key(key).await?;
            }
            Step::SubmitForm { selector } => {
                execution.document_before = Self::snapshot(primitives).await;
                primitives.submit_form(selector).await?;
            }
            Step::WaitFixed { ms } => {
                let ms = if *ms == 0 {
                    session_config.settle_delay_ms
                } else {
                    *ms
                };
                primitives.wait_fixed(Duration::from_millis(ms)).await?;
            }
            Step::WaitForSelector {
                selector,
                timeout_ms,
            } => {
                let timeout = timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| session_config.element_timeout());
                primitives.wait_for_selector(selector, timeout).await?;
            }
            Step::WaitForNavigation { timeout_ms } => {
                let timeout = timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| session_config.navigation_timeout());
                let from_document = match execution.document_before.take() {
                    Some(document) => document,
                    None => primitives.document_id().await?,
                };
                primitives.wait_for_navigation(&from_document, timeout).await?;
            }
            Step::AssertCookiePresent { present, name } => {
                let name = name
                    .as_deref()
                    .unwrap_or(&self.config.target.session_cookie);
                let cookies = primitives.cookies().await?;
                assertions::assert_cookie(&cookies, name, *present)?;
            }
            Step::AssertText { selector, expected } => {
                let actual = primitives.read_text(selector).await?;
                assertions::assert_text_match(&format!("text of {}", selector), expected, &actual)?;
            }
            Step::AssertTitle { equals } => {
                let title = primitives.read_title().await?;
                assertions::assert_equals("page title", equals, &title)?;
            }
            Step::AssertUrl { equals } => {
                let expected = resolve_url(&self.config.target.base_url, &vars.substitute(equals)?);
                let actual = primitives.read_url().await?;
                assertions::assert_equals("page url", &expected, &actual)?;
            }
            Step::AssertVisible { selector } => primitives.require_visible(selector).await?,
            Step::AssertAbsent { selector } => {
                let exists = primitives.exists(selector).await?;
                assertions::assert_present(&format!("element {}", selector), false, exists)?;
            }
            Step::ExtractFromExternalChannel { kind, into } => {
                let code = primitives.extract_code(*kind).await?;
                info!(scenario = %scenario.name, variable = %into, length = code.len(), "Extracted {} code", kind);
                execution.variables.set(into, code);
            }
            Step::Screenshot { name } => {
                let name = name
                    .clone()
                    .unwrap_or_else(|| format!("{}-step-{}", scenario.name, index));
                let path = primitives.screenshot(&name).await?;
                info!(scenario = %scenario.name, path = %path.display(), "Screenshot saved");
                execution.screenshots.push(path);
            }
            Step::Log { message } => {
                info!(scenario = %scenario.name, "{}", vars.substitute(message)?);
            }
        }

        Ok(())
    }

    async fn snapshot(primitives: &StepPrimitives<'_, B::Page>) -> Option<String> {
        match primitives.document_id().await {
            Ok(document) => Some(document),
            Err(e) => {
                debug!("Document marker unavailable: {}", e);
                None
            }
        }
    }

    /// Best-effort screenshot of the page a scenario failed on.
    async fn capture_failure(&self, session: &Session<B>, scenario: &Scenario) -> Option<PathBuf> {
        let page = session.page().ok()?;
        let shot_name = format!("{}-failure", scenario.name);
        let capture =
            ScreenshotManager::save_to_dir(page, &self.config.runner.artifacts_dir, &shot_name);

        match tokio::time::timeout(self.config.session.element_timeout(), capture).await {
            Ok(Ok(path)) => {
                info!(scenario = %scenario.name, path = %path.display(), "Failure screenshot saved");
                Some(path)
            }
            Ok(Err(e)) => {
                warn!(scenario = %scenario.name, "Failure screenshot not taken: {}", e);
                None
            }
            Err(_) => {
                warn!(scenario = %scenario.name, "Failure screenshot timed out");
                None
            }
        }
    }

    async fn remove_cleanup_paths(&self, scenario: &Scenario) {
        for path in scenario.cleanup_paths(&self.config.runner.artifacts_dir) {
            if let Err(e) = remove_path(&path).await {
                warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_url() {
        assert_eq!(
            resolve_url("https://localhost:8443/cas", "/login"),
            "https://localhost:8443/cas/login"
        );
        assert_eq!(
            resolve_url("https://localhost:8443/cas/", "logout"),
            "https://localhost:8443/cas/logout"
        );
    }

    #[test]
    fn test_resolve_absolute_url() {
        assert_eq!(
            resolve_url("https://localhost:8443/cas", "https://localhost:8444/cas/login"),
            "https://localhost:8444/cas/login"
        );
    }
}
