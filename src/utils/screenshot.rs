use crate::core::PageTrait;
use crate::errors::Result;
use std::path::{Path, PathBuf};

pub struct ScreenshotManager;

impl ScreenshotManager {
    /// Capture the page and write it to `dir/<name>-<timestamp>.png`.
    pub async fn save_to_dir<P: PageTrait + ?Sized>(
        page: &P,
        dir: &Path,
        name: &str,
    ) -> Result<PathBuf> {
        let screenshot_bytes = page.screenshot().await?;
        tokio::fs::create_dir_all(dir).await?;

        let file_name = format!(
            "{}-{}.png",
            Self::sanitize(name),
            chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f")
        );
        let path = dir.join(file_name);
        tokio::fs::write(&path, screenshot_bytes).await?;
        Ok(path)
    }

    /// File-name-safe version of a scenario or step label.
    pub fn sanitize(name: &str) -> String {
        let cleaned: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if cleaned.is_empty() {
            "screenshot".to_string()
        } else {
            cleaned
        }
    }
}
