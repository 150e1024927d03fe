use super::result::{ScenarioResult, SuiteReport};
use super::runner::ScenarioRunner;
use super::step::Scenario;
use crate::core::BrowserTrait;
use crate::errors::{Result, ScenarioError};
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use tokio::time::Instant;
use tracing::info;

/// Named scenarios, kept in registration order.
pub struct ScenarioRegistry<B: BrowserTrait> {
    runner: ScenarioRunner<B>,
    scenarios: IndexMap<String, Scenario>,
}

impl<B: BrowserTrait> ScenarioRegistry<B> {
    pub fn new(runner: ScenarioRunner<B>) -> Self {
        Self {
            runner,
            scenarios: IndexMap::new(),
        }
    }

    /// Register a scenario under its own name
    pub fn register(&mut self, scenario: Scenario) -> Result<()> {
        if self.scenarios.contains_key(&scenario.name) {
            return Err(ScenarioError::DuplicateName(scenario.name));
        }
        scenario.validate()?;
        self.scenarios.insert(scenario.name.clone(), scenario);
        Ok(())
    }

    pub fn register_all(&mut self, scenarios: impl IntoIterator<Item = Scenario>) -> Result<()> {
        for scenario in scenarios {
            self.register(scenario)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.scenarios.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Keep only scenarios carrying `tag`, preserving order.
    pub fn filter_by_tag(&mut self, tag: &str) {
        self.scenarios.retain(|_, scenario| scenario.has_tag(tag));
    }

    /// Keep only the scenario called `name`.
    pub fn select(&mut self, name: &str) -> Result<()> {
        if !self.scenarios.contains_key(name) {
            return Err(ScenarioError::UnknownScenario(name.to_string()));
        }
        self.scenarios.retain(|key, _| key == name);
        Ok(())
    }

    pub fn runner(&self) -> &ScenarioRunner<B> {
        &self.runner
    }

    pub async fn run(&self, name: &str) -> Result<ScenarioResult> {
        let scenario = self
            .scenarios
            .get(name)
            .ok_or_else(|| ScenarioError::UnknownScenario(name.to_string()))?;
        Ok(self.runner.execute(scenario).await)
    }

    /// Run every scenario; at most `runner.max_concurrency` at once.
    pub async fn run_all(&self) -> SuiteReport {
        let start_time = Instant::now();
        let concurrency = self.runner.config().runner.max_concurrency.max(1);
        info!(
            scenarios = self.scenarios.len(),
            concurrency, "Running scenario suite"
        );

        let results: Vec<ScenarioResult> = stream::iter(self.scenarios.values())
            .map(|scenario| self.runner.execute(scenario))
            .buffered(concurrency)
            .collect()
            .await;

        let report = SuiteReport {
            results: results
                .into_iter()
                .map(|result| (result.name.clone(), result))
                .collect(),
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            passed = report.passed(),
            failed = report.failed(),
            duration_ms = report.duration_ms,
            "Scenario suite finished"
        );
        report
    }
}
