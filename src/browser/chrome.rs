use super::scripts;
use crate::core::config::BrowserConfig;
use crate::core::{BrowserTrait, PageTrait};
use crate::errors::{Result, ScenarioError, StepError};
use crate::types::{CookieData, PageResponse};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Chrome browser implementation
pub struct ChromeBrowser {
    browser: Option<Browser>,
}

impl ChromeBrowser {
    pub fn new() -> Self {
        Self { browser: None }
    }
}

impl Default for ChromeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

fn launch_chrome(config: BrowserConfig) -> Result<Browser> {
    let user_agent_arg = config
        .user_agent
        .as_ref()
        .map(|ua| format!("--user-agent={}", ua));

    let mut args = vec![OsStr::new("--disable-dev-shm-usage")];

    if let Some(ref ua_arg) = user_agent_arg {
        args.push(OsStr::new(ua_arg));
    }

    // Add custom args
    for arg in &config.args {
        args.push(OsStr::new(arg));
    }

    let launch_options = LaunchOptions::default_builder()
        .headless(config.headless)
        .sandbox(false)
        .window_size(Some((config.viewport.width, config.viewport.height)))
        .ignore_certificate_errors(config.ignore_certificate_errors)
        .idle_browser_timeout(Duration::from_millis(config.launch_timeout_ms.max(1000)))
        .args(args)
        .build()
        .map_err(|e| ScenarioError::Acquisition(e.to_string()))?;

    Browser::new(launch_options).map_err(|e| ScenarioError::Acquisition(e.to_string()))
}

#[async_trait]
impl BrowserTrait for ChromeBrowser {
    type Page = ChromePage;

    async fn launch(&mut self, config: &BrowserConfig) -> Result<()> {
        let config = config.clone();
        let browser = tokio::task::spawn_blocking(move || launch_chrome(config))
            .await
            .map_err(|e| ScenarioError::Acquisition(e.to_string()))??;

        self.browser = Some(browser);
        Ok(())
    }

    async fn new_page(&self) -> Result<Self::Page> {
        let browser = self
            .browser
            .clone()
            .ok_or_else(|| ScenarioError::Acquisition("browser not launched".to_string()))?;

        let tab = tokio::task::spawn_blocking(move || browser.new_tab())
            .await
            .map_err(|e| ScenarioError::Acquisition(e.to_string()))?
            .map_err(|e| ScenarioError::Acquisition(e.to_string()))?;

        Ok(ChromePage::new(tab))
    }

    fn is_running(&self) -> bool {
        self.browser.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the handle kills the browser process.
        self.browser = None;
        Ok(())
    }
}

/// One Chrome tab.
///
/// DevTools calls block, so each one runs on the blocking pool. A scenario
/// timeout can then abandon a stuck call and tear the browser down.
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || op(&tab))
            .await
            .map_err(|e| ScenarioError::AnyhowError(format!("page task failed: {}", e)))?
    }

    async fn evaluate_value(&self, script: String) -> Result<Value> {
        self.blocking(move |tab| {
            let result = tab
                .evaluate(&script, false)
                .map_err(|e| ScenarioError::AnyhowError(e.to_string()))?;
            Ok(result.value.unwrap_or(Value::Null))
        })
        .await
    }
}

#[async_trait]
impl PageTrait for ChromePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<PageResponse> {
        let target = url.to_string();
        self.blocking(move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&target)
                .map_err(|e| StepError::navigation(format!("{}: {}", target, e)))?;
            tab.wait_until_navigated()
                .map_err(|e| StepError::navigation(format!("{}: {}", target, e)))?;

            let status = tab
                .evaluate(scripts::RESPONSE_STATUS, false)
                .ok()
                .and_then(|r| r.value)
                .and_then(|v| v.as_u64())
                .unwrap_or(0);

            // Older Chrome builds do not report responseStatus; a completed
            // DevTools navigation is then taken as a 200.
            let status = if status == 0 { 200 } else { status as u16 };
            Ok(PageResponse::new(tab.get_url(), status))
        })
        .await
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let selector = selector.to_string();
        let text = text.to_string();
        self.blocking(move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|_| StepError::not_found(&selector))?;
            element
                .click()
                .map_err(|e| ScenarioError::AnyhowError(e.to_string()))?;
            element
                .type_into(&text)
                .map_err(|e| ScenarioError::AnyhowError(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let selector = selector.to_string();
        self.blocking(move |tab| {
            tab.find_element(&selector)
                .map_err(|_| StepError::not_found(&selector))?
                .click()
                .map_err(|e| ScenarioError::AnyhowError(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |tab| {
            tab.press_key(&key)
                .map_err(|e| ScenarioError::AnyhowError(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn submit_form(&self, selector: &str) -> Result<()> {
        let submitted = self.evaluate_value(scripts::submit_form(selector)).await?;
        if submitted.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(StepError::not_found(selector).into())
        }
    }

    async fn element_exists(&self, selector: &str) -> Result<bool> {
        let value = self.evaluate_value(scripts::element_exists(selector)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let value = self.evaluate_value(scripts::is_visible(selector)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn inner_text(&self, selector: &str) -> Result<Option<String>> {
        let value = self.evaluate_value(scripts::inner_text(selector)).await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn ready_state(&self) -> Result<String> {
        let value = self.evaluate_value(scripts::READY_STATE.to_string()).await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    async fn document_id(&self) -> Result<String> {
        let value = self.evaluate_value(scripts::DOCUMENT_ID.to_string()).await?;
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ScenarioError::AnyhowError("document has no time origin".to_string()))
    }

    async fn url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    async fn title(&self) -> Result<String> {
        self.blocking(|tab| {
            tab.get_title()
                .map_err(|e| ScenarioError::AnyhowError(e.to_string()))
        })
        .await
    }

    async fn cookies(&self) -> Result<Vec<CookieData>> {
        self.blocking(|tab| {
            let cookies = tab
                .get_cookies()
                .map_err(|e| ScenarioError::AnyhowError(e.to_string()))?;
            Ok(cookies
                .into_iter()
                .map(|c| CookieData {
                    name: c.name,
                    value: c.value,
                    domain: c.domain,
                    path: c.path,
                    http_only: c.http_only,
                    secure: c.secure,
                })
                .collect())
        })
        .await
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.blocking(|tab| {
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
                .map_err(|e| ScenarioError::AnyhowError(e.to_string()))
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        self.blocking(|tab| {
            let closed = tab
                .close(true)
                .map_err(|e| ScenarioError::AnyhowError(e.to_string()))?;
            debug!("Tab close acknowledged: {}", closed);
            Ok(())
        })
        .await
    }
}
