pub mod browser;
pub mod channel;
pub mod core;
pub mod errors;
pub mod scenario;
pub mod testing;
pub mod types;
pub mod utils;

pub use browser::Session;
pub use channel::MailboxChannel;
pub use core::{BrowserTrait, ChannelKind, Config, MessageChannel, PageTrait};
pub use errors::{Result, ScenarioError, StepError, StepErrorKind};
pub use scenario::{
    ExpectedOutcome, Outcome, Scenario, ScenarioRegistry, ScenarioResult, ScenarioRunner, Step,
    SuiteReport,
};
pub use types::*;

#[cfg(feature = "chrome")]
pub use browser::ChromeBrowser;
