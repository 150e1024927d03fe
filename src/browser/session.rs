use crate::core::config::BrowserConfig;
use crate::core::{BrowserTrait, PageTrait};
use crate::errors::{Result, ScenarioError};
use crate::utils::{remove_path, remove_path_blocking};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// One browser instance with exactly one page, owned by a single scenario run.
///
/// Every session launches its own instance, so closing the page always
/// releases the instance too.
pub struct Session<B: BrowserTrait> {
    session_id: String,
    browser: Option<B>,
    page: Option<B::Page>,
    cleanup: Vec<PathBuf>,
    closed: bool,
}

fn acquisition(err: ScenarioError) -> ScenarioError {
    match err {
        ScenarioError::Acquisition(_) => err,
        other => ScenarioError::Acquisition(other.to_string()),
    }
}

impl<B: BrowserTrait> Session<B> {
    /// Launch `browser` and open its page.
    pub async fn open(mut browser: B, config: &BrowserConfig) -> Result<Self> {
        let session_id = uuid::Uuid::new_v4().to_string();
        debug!(session = %session_id, headless = config.headless, "Launching browser");

        browser.launch(config).await.map_err(acquisition)?;

        let page = if browser.is_running() {
            browser.new_page().await
        } else {
            Err(ScenarioError::Acquisition(
                "browser exited right after launch".to_string(),
            ))
        };
        let page = match page {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!(session = %session_id, "Browser close after failed page creation: {}", close_err);
                }
                return Err(acquisition(e));
            }
        };

        info!(session = %session_id, "Session opened");

        Ok(Self {
            session_id,
            browser: Some(browser),
            page: Some(page),
            cleanup: Vec::new(),
            closed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    pub fn page(&self) -> Result<&B::Page> {
        self.page
            .as_ref()
            .ok_or_else(|| ScenarioError::PageClosed(self.session_id.clone()))
    }

    /// Register a transient file or directory to remove on close.
    pub fn add_cleanup(&mut self, path: impl Into<PathBuf>) {
        self.cleanup.push(path.into());
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the page, the browser instance and remove registered paths.
    ///
    /// Every release is attempted even if an earlier one fails; the first
    /// error is returned. A second call does nothing.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            debug!(session = %self.session_id, "Session already closed");
            return Ok(());
        }
        self.closed = true;

        let mut first_error: Option<ScenarioError> = None;

        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!(session = %self.session_id, "Page close failed: {}", e);
                first_error.get_or_insert(e);
            }
        }

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!(session = %self.session_id, "Browser close failed: {}", e);
                first_error.get_or_insert(e);
            }
        }

        for path in self.cleanup.drain(..) {
            match remove_path(&path).await {
                Ok(true) => debug!("Removed {}", path.display()),
                Ok(false) => {}
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }

        info!(session = %self.session_id, "Session closed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// A session dropped before `close` (its run was cancelled) is released here:
/// cleanup paths go at once, the page and browser are closed on a spawned task.
impl<B: BrowserTrait> Drop for Session<B> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        warn!(session = %self.session_id, "Session dropped without close, releasing");

        for path in self.cleanup.drain(..) {
            if let Err(e) = remove_path_blocking(&path) {
                warn!("Could not remove {}: {}", path.display(), e);
            }
        }

        let page = self.page.take();
        let browser = self.browser.take();
        let session_id = self.session_id.clone();

        // Outside a runtime the handles are simply dropped, which still ends
        // the browser process.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Some(page) = page {
                    if let Err(e) = page.close().await {
                        warn!(session = %session_id, "Page close failed: {}", e);
                    }
                }
                if let Some(mut browser) = browser {
                    if let Err(e) = browser.close().await {
                        warn!(session = %session_id, "Browser close failed: {}", e);
                    }
                }
                info!(session = %session_id, "Session released after drop");
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSite;

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let site = FakeSite::new();
        let mut session = Session::open(site.browser(), &BrowserConfig::default())
            .await
            .unwrap();
        assert!(session.page().is_ok());

        session.close().await.unwrap();
        session.close().await.unwrap();

        assert!(session.is_closed());
        assert!(session.page().is_err());
        assert_eq!(site.pages_closed(), 1);
        assert_eq!(site.browsers_closed(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_is_acquisition_error() {
        let site = FakeSite::new();
        site.fail_launch();

        let err = Session::open(site.browser(), &BrowserConfig::default())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, ScenarioError::Acquisition(_)));
        assert_eq!(site.pages_opened(), 0);
    }

    #[tokio::test]
    async fn test_browser_gone_after_launch_is_acquisition_error() {
        let site = FakeSite::new();
        site.exit_after_launch();

        let err = Session::open(site.browser(), &BrowserConfig::default())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, ScenarioError::Acquisition(_)));
        assert_eq!(site.launches(), 1);
        assert_eq!(site.pages_opened(), 0);
        assert_eq!(site.browsers_closed(), 1);
    }

    #[tokio::test]
    async fn test_close_removes_cleanup_paths() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = dir.path().join("saml-md");
        std::fs::create_dir_all(&metadata).unwrap();

        let site = FakeSite::new();
        let mut session = Session::open(site.browser(), &BrowserConfig::default())
            .await
            .unwrap();
        session.add_cleanup(&metadata);
        session.add_cleanup(dir.path().join("never-created"));

        session.close().await.unwrap();
        assert!(!metadata.exists());
    }

    #[tokio::test]
    async fn test_drop_without_close_releases_session() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = dir.path().join("saml-md");
        std::fs::create_dir_all(&metadata).unwrap();

        let site = FakeSite::new();
        let mut session = Session::open(site.browser(), &BrowserConfig::default())
            .await
            .unwrap();
        session.add_cleanup(&metadata);
        drop(session);

        assert!(!metadata.exists());
        tokio::task::yield_now().await;
        assert_eq!(site.pages_closed(), 1);
        assert_eq!(site.browsers_closed(), 1);
    }

    #[tokio::test]
    async fn test_drop_after_close_releases_nothing_twice() {
        let site = FakeSite::new();
        let mut session = Session::open(site.browser(), &BrowserConfig::default())
            .await
            .unwrap();
        session.close().await.unwrap();
        drop(session);

        tokio::task::yield_now().await;
        assert_eq!(site.pages_closed(), 1);
        assert_eq!(site.browsers_closed(), 1);
    }

    #[tokio::test]
    async fn test_page_close_failure_still_releases_browser() {
        let site = FakeSite::new();
        site.fail_page_close();
        let mut session = Session::open(site.browser(), &BrowserConfig::default())
            .await
            .unwrap();

        assert!(session.close().await.is_err());
        assert_eq!(site.browsers_closed(), 1);
        assert!(session.close().await.is_ok());
    }
}
