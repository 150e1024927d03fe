use crate::core::config::BrowserConfig;
use crate::core::page::PageTrait;
use crate::errors::Result;
use async_trait::async_trait;

/// A browser engine that can be launched and asked for pages.
#[async_trait]
pub trait BrowserTrait: Send + Sync + 'static {
    type Page: PageTrait + 'static;

    /// Launch a new browser instance
    async fn launch(&mut self, config: &BrowserConfig) -> Result<()>;

    /// Create a new page on the launched instance
    async fn new_page(&self) -> Result<Self::Page>;

    /// Check if browser is still running
    fn is_running(&self) -> bool;

    /// Close the browser and its process
    async fn close(&mut self) -> Result<()>;
}
