//! In-memory browser, page and message channel for exercising scenarios
//! without launching Chrome.
//!
//! A [`FakeSite`] holds the routes a fake page can navigate to, the page
//! transitions triggered by clicks, key presses and form submissions, and a
//! shared call log. Every [`FakeBrowser`] built from the same site shares its
//! counters, so tests can check how many sessions were opened and released.

use crate::core::config::BrowserConfig;
use crate::core::{BrowserTrait, ChannelKind, MessageChannel, PageTrait};
use crate::errors::{Result, ScenarioError, StepError};
use crate::types::{CookieData, PageResponse};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct FakeElement {
    pub text: String,
    pub visible: bool,
}

/// Page content served for a URL or produced by an interaction.
#[derive(Debug, Clone)]
pub struct FakeRoute {
    status: u16,
    title: String,
    url: Option<String>,
    elements: Vec<(String, FakeElement)>,
    set_cookies: Vec<CookieData>,
    clear_cookies: bool,
    delay: Option<Duration>,
}

impl FakeRoute {
    pub fn new(title: &str) -> Self {
        Self {
            status: 200,
            title: title.to_string(),
            url: None,
            elements: Vec::new(),
            set_cookies: Vec::new(),
            clear_cookies: false,
            delay: None,
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn element(mut self, selector: &str, text: &str) -> Self {
        self.elements.push((
            selector.to_string(),
            FakeElement {
                text: text.to_string(),
                visible: true,
            },
        ));
        self
    }

    pub fn hidden_element(mut self, selector: &str) -> Self {
        self.elements.push((
            selector.to_string(),
            FakeElement {
                text: String::new(),
                visible: false,
            },
        ));
        self
    }

    pub fn set_cookie(mut self, name: &str, value: &str) -> Self {
        self.set_cookies.push(CookieData::new(name, value));
        self
    }

    pub fn clear_cookies(mut self) -> Self {
        self.clear_cookies = true;
        self
    }

    /// URL the page lands on, for transitions and redirects.
    pub fn lands_on(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Make navigation to this route take `delay`. On an interaction the
    /// old page stays loaded until the delay has passed.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct SiteState {
    routes: HashMap<String, FakeRoute>,
    transitions: HashMap<String, VecDeque<FakeRoute>>,
    calls: Vec<String>,
    fail_launch: bool,
    exit_after_launch: bool,
    fail_page_close: bool,
}

#[derive(Default)]
struct SiteCounters {
    launches: AtomicUsize,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    browsers_closed: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct FakeSite {
    state: Arc<Mutex<SiteState>>,
    counters: Arc<SiteCounters>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, route: FakeRoute) -> &Self {
        self.lock().routes.insert(url.to_string(), route);
        self
    }

    /// Queue a page change for an interaction key: `click:<selector>`,
    /// `key:<key>` or `submit:<selector>`. Queued changes are consumed in order.
    pub fn on(&self, action: &str, route: FakeRoute) -> &Self {
        self.lock()
            .transitions
            .entry(action.to_string())
            .or_default()
            .push_back(route);
        self
    }

    pub fn fail_launch(&self) -> &Self {
        self.lock().fail_launch = true;
        self
    }

    /// Launches succeed but the browser is gone straight after.
    pub fn exit_after_launch(&self) -> &Self {
        self.lock().exit_after_launch = true;
        self
    }

    pub fn fail_page_close(&self) -> &Self {
        self.lock().fail_page_close = true;
        self
    }

    pub fn browser(&self) -> FakeBrowser {
        FakeBrowser {
            site: self.clone(),
            launched: false,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn launches(&self) -> usize {
        self.counters.launches.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.counters.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.counters.pages_closed.load(Ordering::SeqCst)
    }

    pub fn browsers_closed(&self) -> usize {
        self.counters.browsers_closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SiteState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub struct FakeBrowser {
    site: FakeSite,
    launched: bool,
}

#[async_trait]
impl BrowserTrait for FakeBrowser {
    type Page = FakePage;

    async fn launch(&mut self, _config: &BrowserConfig) -> Result<()> {
        if self.site.lock().fail_launch {
            return Err(ScenarioError::Acquisition(
                "fake browser refused to launch".to_string(),
            ));
        }
        self.site.counters.launches.fetch_add(1, Ordering::SeqCst);
        self.launched = !self.site.lock().exit_after_launch;
        Ok(())
    }

    async fn new_page(&self) -> Result<Self::Page> {
        if !self.launched {
            return Err(ScenarioError::Acquisition(
                "browser not launched".to_string(),
            ));
        }
        self.site.counters.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakePage::with_site(self.site.clone()))
    }

    fn is_running(&self) -> bool {
        self.launched
    }

    async fn close(&mut self) -> Result<()> {
        self.site.record("browser.close".to_string());
        self.site
            .counters
            .browsers_closed
            .fetch_add(1, Ordering::SeqCst);
        self.launched = false;
        Ok(())
    }
}

#[derive(Default)]
struct PageState {
    url: String,
    title: String,
    elements: HashMap<String, FakeElement>,
    values: HashMap<String, String>,
    cookies: Vec<CookieData>,
    document: u64,
    loading: usize,
}

impl PageState {
    fn apply(&mut self, route: &FakeRoute, requested_url: Option<&str>) {
        self.document += 1;
        if let Some(url) = route.url.as_deref().or(requested_url) {
            self.url = url.to_string();
        }
        self.title = route.title.clone();
        self.elements = route.elements.iter().cloned().collect();
        self.values.clear();
        if route.clear_cookies {
            self.cookies.clear();
        }
        for cookie in &route.set_cookies {
            self.cookies.retain(|c| c.name != cookie.name);
            self.cookies.push(cookie.clone());
        }
    }
}

pub struct FakePage {
    site: FakeSite,
    state: Arc<Mutex<PageState>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::with_site(FakeSite::new())
    }

    pub fn with_site(site: FakeSite) -> Self {
        Self {
            site,
            state: Arc::new(Mutex::new(PageState::default())),
        }
    }

    pub fn show(&self, route: &FakeRoute) {
        self.lock().apply(route, None);
    }

    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.lock().values.get(selector).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PageState> {
        lock_page(&self.state)
    }

    /// Apply the next page queued for `action`. A delayed page loads in the
    /// background and the document reads as `loading` until it lands.
    fn transition(&self, action: String) {
        let next = self
            .site
            .lock()
            .transitions
            .get_mut(&action)
            .and_then(|queue| queue.pop_front());
        self.site.record(action);

        let Some(route) = next else { return };
        match route.delay {
            None => self.lock().apply(&route, None),
            Some(delay) => {
                self.lock().loading += 1;
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let mut page = lock_page(&state);
                    page.loading -= 1;
                    page.apply(&route, None);
                });
            }
        }
    }

    fn require(&self, selector: &str) -> Result<()> {
        if self.lock().elements.contains_key(selector) {
            Ok(())
        } else {
            Err(StepError::not_found(selector).into())
        }
    }
}

fn lock_page(state: &Mutex<PageState>) -> std::sync::MutexGuard<'_, PageState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageTrait for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<PageResponse> {
        self.site.record(format!("goto {}", url));
        let route = self.site.lock().routes.get(url).cloned();
        let route = route.ok_or_else(|| {
            StepError::navigation(format!("{}: net::ERR_CONNECTION_REFUSED", url))
        })?;

        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.apply(&route, Some(url));
        Ok(PageResponse::new(state.url.clone(), route.status))
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.require(selector)?;
        self.site.record(format!("type {} {}", selector, text));
        self.lock()
            .values
            .entry(selector.to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.require(selector)?;
        self.transition(format!("click:{}", selector));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.transition(format!("key:{}", key));
        Ok(())
    }

    async fn submit_form(&self, selector: &str) -> Result<()> {
        self.require(selector)?;
        self.transition(format!("submit:{}", selector));
        Ok(())
    }

    async fn element_exists(&self, selector: &str) -> Result<bool> {
        Ok(self.lock().elements.contains_key(selector))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        Ok(self
            .lock()
            .elements
            .get(selector)
            .map(|e| e.visible)
            .unwrap_or(false))
    }

    async fn inner_text(&self, selector: &str) -> Result<Option<String>> {
        Ok(self.lock().elements.get(selector).map(|e| e.text.clone()))
    }

    async fn ready_state(&self) -> Result<String> {
        let state = if self.lock().loading > 0 {
            "loading"
        } else {
            "complete"
        };
        Ok(state.to_string())
    }

    async fn document_id(&self) -> Result<String> {
        Ok(format!("fake-document-{}", self.lock().document))
    }

    async fn url(&self) -> Result<String> {
        Ok(self.lock().url.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.lock().title.clone())
    }

    async fn cookies(&self) -> Result<Vec<CookieData>> {
        Ok(self.lock().cookies.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.site.record("screenshot".to_string());
        Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
    }

    async fn close(&self) -> Result<()> {
        self.site.record("page.close".to_string());
        self.site.counters.pages_closed.fetch_add(1, Ordering::SeqCst);
        if self.site.lock().fail_page_close {
            return Err(ScenarioError::PageClosed(
                "fake page failed to close".to_string(),
            ));
        }
        Ok(())
    }
}

/// Message channel handing out queued codes.
#[derive(Default)]
pub struct FakeChannel {
    codes: Mutex<VecDeque<String>>,
    requests: AtomicUsize,
}

impl FakeChannel {
    pub fn with_codes(codes: &[&str]) -> Self {
        Self {
            codes: Mutex::new(codes.iter().map(|c| c.to_string()).collect()),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageChannel for FakeChannel {
    async fn extract_latest_code(&self, kind: ChannelKind) -> Result<String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.codes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| StepError::channel(format!("no {} message available", kind)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_page_follows_transitions() {
        let site = FakeSite::new();
        site.route(
            "https://localhost:8443/cas/login",
            FakeRoute::new("CAS - Central Authentication Service")
                .element("#username", "")
                .element("#password", ""),
        )
        .on(
            "key:Enter",
            FakeRoute::new("Log In Successful").set_cookie("TGC", "TGT-1"),
        );

        let page = FakePage::with_site(site.clone());
        let response = page
            .goto("https://localhost:8443/cas/login", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(response.ok());

        page.type_text("#username", "casuser").await.unwrap();
        assert_eq!(page.value_of("#username").as_deref(), Some("casuser"));

        page.press_key("Enter").await.unwrap();
        assert_eq!(page.title().await.unwrap(), "Log In Successful");
        assert_eq!(page.cookies().await.unwrap()[0].name, "TGC");
        assert_eq!(
            site.calls(),
            vec![
                "goto https://localhost:8443/cas/login".to_string(),
                "type #username casuser".to_string(),
                "key:Enter".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_transition_keeps_old_page_loaded() {
        let site = FakeSite::new();
        site.route(
            "https://localhost:8443/cas/login",
            FakeRoute::new("CAS").element("li #SAML2Client", "SAML2"),
        )
        .on(
            "click:li #SAML2Client",
            FakeRoute::new("SAML2 Identity Provider").delay(Duration::from_millis(300)),
        );

        let page = FakePage::with_site(site);
        page.goto("https://localhost:8443/cas/login", Duration::from_secs(1))
            .await
            .unwrap();
        let before = page.document_id().await.unwrap();

        page.click("li #SAML2Client").await.unwrap();
        assert_eq!(page.title().await.unwrap(), "CAS");
        assert_eq!(page.ready_state().await.unwrap(), "loading");
        assert_eq!(page.document_id().await.unwrap(), before);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(page.title().await.unwrap(), "SAML2 Identity Provider");
        assert_eq!(page.ready_state().await.unwrap(), "complete");
        assert_ne!(page.document_id().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_fake_channel_drains() {
        let channel = FakeChannel::with_codes(&["123456"]);
        assert_eq!(
            channel.extract_latest_code(ChannelKind::Email).await.unwrap(),
            "123456"
        );
        assert!(channel.extract_latest_code(ChannelKind::Email).await.is_err());
        assert_eq!(channel.requests(), 2);
    }
}
