use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Out-of-band channel a one-time code is delivered over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Email,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Email => f.write_str("email"),
        }
    }
}

#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Latest code delivered over `kind`.
    ///
    /// Fails with `StepError { kind: ExternalChannelError, .. }` when nothing
    /// arrives within the channel's timeout.
    async fn extract_latest_code(&self, kind: ChannelKind) -> Result<String>;
}
