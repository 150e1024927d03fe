use crate::core::PageTrait;
use crate::errors::{Result, ScenarioError, StepError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Condition-based waits. Each one returns as soon as its condition holds and
/// only sleeps `poll_interval` between checks.
pub struct NavigationManager;

impl NavigationManager {
    /// Poll `check` until it yields `true` or `timeout` elapses.
    ///
    /// Errors from `check` are treated as "not yet": a page in the middle of
    /// navigating routinely rejects script evaluation.
    pub async fn poll_until<F, Fut>(
        timeout: Duration,
        poll_interval: Duration,
        mut check: F,
    ) -> Result<bool>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let start_time = Instant::now();

        loop {
            match check().await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => debug!("Condition check failed, retrying: {}", e),
            }

            if start_time.elapsed() >= timeout {
                return Ok(false);
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    pub async fn wait_for_selector<P: PageTrait + ?Sized>(
        page: &P,
        selector: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<()> {
        let found =
            Self::poll_until(timeout, poll_interval, || page.element_exists(selector)).await?;

        if found {
            Ok(())
        } else {
            Err(StepError::not_found(selector)
                .with_detail(format!("not present after {} ms", timeout.as_millis()))
                .into())
        }
    }

    /// Wait until a document other than `from_document` has fully loaded.
    ///
    /// `from_document` is the page's `document_id` taken before the action
    /// that should navigate. A page that never leaves it times out.
    pub async fn wait_for_navigation<P: PageTrait + ?Sized>(
        page: &P,
        from_document: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<NavigationResult> {
        let start_time = Instant::now();
        let complete = Self::poll_until(timeout, poll_interval, || async {
            let moved = page.document_id().await? != from_document;
            Ok::<bool, ScenarioError>(moved && page.ready_state().await? == "complete")
        })
        .await?;

        if !complete {
            return Err(StepError::timeout(format!(
                "no navigation completed within {} ms",
                timeout.as_millis()
            ))
            .into());
        }

        Ok(NavigationResult {
            url: page.url().await?,
            ready_state: "complete".to_string(),
            duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub ready_state: String,
    pub duration_ms: u64,
}
