use crate::errors::Result;
use crate::types::{CookieData, PageResponse};
use async_trait::async_trait;
use std::time::Duration;

/// Page-level automation over one browser tab.
///
/// Element operations report a missing element as
/// `StepError { kind: ElementNotFound, .. }` so callers can tell it apart from
/// protocol failures.
#[async_trait]
pub trait PageTrait: Send + Sync {
    /// Navigate the top-level frame and wait for the load to settle
    async fn goto(&self, url: &str, timeout: Duration) -> Result<PageResponse>;

    /// Focus the element and type text into it
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Press a named key (e.g. `Enter`) on the focused element
    async fn press_key(&self, key: &str) -> Result<()>;

    /// Submit the form matched by `selector`
    async fn submit_form(&self, selector: &str) -> Result<()>;

    async fn element_exists(&self, selector: &str) -> Result<bool>;

    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// `innerText` of the first match, `None` when nothing matches
    async fn inner_text(&self, selector: &str) -> Result<Option<String>>;

    /// `document.readyState`
    async fn ready_state(&self) -> Result<String>;

    /// Marker of the loaded document; it changes whenever a new document
    /// replaces the current one.
    async fn document_id(&self) -> Result<String>;

    async fn url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// All cookies visible to the page, HttpOnly included
    async fn cookies(&self) -> Result<Vec<CookieData>>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn close(&self) -> Result<()>;
}
