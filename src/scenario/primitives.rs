use crate::browser::NavigationManager;
use crate::core::config::SessionConfig;
use crate::core::{ChannelKind, MessageChannel, PageTrait};
use crate::errors::{Result, ScenarioError, StepError, StepErrorKind};
use crate::types::{CookieData, PageResponse};
use crate::utils::ScreenshotManager;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// The operations a step can perform against one page.
///
/// Element interactions first wait for their selector, so a slow page costs
/// at most `element_timeout` and a fast one costs nothing.
pub struct StepPrimitives<'a, P: PageTrait + ?Sized> {
    page: &'a P,
    config: &'a SessionConfig,
    channel: Option<&'a dyn MessageChannel>,
    artifacts_dir: &'a Path,
}

impl<'a, P: PageTrait + ?Sized> StepPrimitives<'a, P> {
    pub fn new(
        page: &'a P,
        config: &'a SessionConfig,
        channel: Option<&'a dyn MessageChannel>,
        artifacts_dir: &'a Path,
    ) -> Self {
        Self {
            page,
            config,
            channel,
            artifacts_dir,
        }
    }

    /// Navigate and report the response status; only transport failures and
    /// timeouts are errors.
    pub async fn navigate(&self, url: &str) -> Result<PageResponse> {
        let timeout = self.config.navigation_timeout();
        match tokio::time::timeout(timeout, self.page.goto(url, timeout)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(ScenarioError::Step(e))) => Err(e.into()),
            Ok(Err(e)) => Err(StepError::navigation(format!("{}: {}", url, e)).into()),
            Err(_) => Err(StepError::navigation(format!(
                "{}: no response within {} ms",
                url,
                timeout.as_millis()
            ))
            .into()),
        }
    }

    pub async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.wait_for_selector(selector, self.config.element_timeout())
            .await?;
        self.page.type_text(selector, text).await
    }

    pub async fn click(&self, selector: &str) -> Result<()> {
        self.wait_for_selector(selector, self.config.element_timeout())
            .await?;
        self.page.click(selector).await
    }

    pub async fn press_key(&self, key: &str) -> Result<()> {
        self.page.press_key(key).await
    }

    pub async fn submit_form(&self, selector: &str) -> Result<()> {
        self.wait_for_selector(selector, self.config.element_timeout())
            .await?;
        self.page.submit_form(selector).await
    }

    pub async fn wait_fixed(&self, duration: Duration) -> Result<()> {
        tokio::time::sleep(duration).await;
        Ok(())
    }

    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        NavigationManager::wait_for_selector(self.page, selector, timeout, self.config.poll_interval())
            .await
    }

    /// Marker of the current document, taken before an action that may
    /// navigate so `wait_for_navigation` can tell the old page from the new.
    pub async fn document_id(&self) -> Result<String> {
        self.page.document_id().await
    }

    pub async fn wait_for_navigation(&self, from_document: &str, timeout: Duration) -> Result<()> {
        let result = NavigationManager::wait_for_navigation(
            self.page,
            from_document,
            timeout,
            self.config.poll_interval(),
        )
        .await?;
        debug!("Navigation settled at {} after {} ms", result.url, result.duration_ms);
        Ok(())
    }

    /// Trimmed `innerText` of the first match.
    pub async fn read_text(&self, selector: &str) -> Result<String> {
        self.wait_for_selector(selector, self.config.element_timeout())
            .await?;
        match self.page.inner_text(selector).await? {
            Some(text) => Ok(text.trim().to_string()),
            None => Err(StepError::not_found(selector).into()),
        }
    }

    pub async fn read_title(&self) -> Result<String> {
        self.page.title().await
    }

    pub async fn read_url(&self) -> Result<String> {
        self.page.url().await
    }

    pub async fn exists(&self, selector: &str) -> Result<bool> {
        self.page.element_exists(selector).await
    }

    /// Wait for the element and require it to be rendered.
    pub async fn require_visible(&self, selector: &str) -> Result<()> {
        self.wait_for_selector(selector, self.config.element_timeout())
            .await?;
        let visible = NavigationManager::poll_until(
            self.config.element_timeout(),
            self.config.poll_interval(),
            || self.page.is_visible(selector),
        )
        .await?;

        if visible {
            Ok(())
        } else {
            Err(StepError::not_visible(selector).into())
        }
    }

    pub async fn cookies(&self) -> Result<Vec<CookieData>> {
        self.page.cookies().await
    }

    pub async fn extract_code(&self, kind: ChannelKind) -> Result<String> {
        let channel = self.channel.ok_or_else(|| {
            StepError::channel(format!("no {} channel configured", kind))
        })?;

        match channel.extract_latest_code(kind).await {
            Ok(code) => Ok(code),
            Err(ScenarioError::Step(e)) if e.kind == StepErrorKind::ExternalChannelError => {
                Err(e.into())
            }
            Err(e) => Err(StepError::channel(e.to_string()).into()),
        }
    }

    pub async fn screenshot(&self, name: &str) -> Result<PathBuf> {
        ScreenshotManager::save_to_dir(self.page, self.artifacts_dir, name).await
    }
}
