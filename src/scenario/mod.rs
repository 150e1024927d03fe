pub mod assertions;
pub mod catalog;
pub mod primitives;
pub mod registry;
pub mod result;
pub mod runner;
pub mod step;
pub mod variables;

pub use primitives::StepPrimitives;
pub use registry::ScenarioRegistry;
pub use result::{FailureReason, Outcome, RunState, ScenarioResult, StepRecord, StepStatus, SuiteReport};
pub use runner::{resolve_url, ScenarioRunner};
pub use step::{ExpectedOutcome, Scenario, Step, TextMatch};
pub use variables::Variables;
