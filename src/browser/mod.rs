#[cfg(feature = "chrome")]
pub mod chrome;
pub mod navigation;
pub mod scripts;
pub mod session;

#[cfg(feature = "chrome")]
pub use chrome::{ChromeBrowser, ChromePage};
pub use navigation::{NavigationManager, NavigationResult};
pub use session::Session;
