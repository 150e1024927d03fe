pub mod fs;
pub mod screenshot;

pub use fs::{remove_path, remove_path_blocking};
pub use screenshot::ScreenshotManager;
