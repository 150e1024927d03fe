pub mod browser;
pub mod channel;
pub mod config;
pub mod page;

pub use browser::BrowserTrait;
pub use channel::{ChannelKind, MessageChannel};
pub use config::Config;
pub use page::PageTrait;
