//! Runtime-tunable engine settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the per-action pacing delay.
pub const MAX_ACTION_DELAY: Duration = Duration::from_secs(5);

/// Errors raised by settings validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("action delay must be between 0.0 and 5.0 seconds")]
    DelayOutOfRange,
}

/// Engine-wide tunables, shared by every namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Cooperative pause after every action invocation attempt during a
    /// flush. Zero skips the pause.
    pub action_delay: Duration,

    /// Surface unknown action identifiers at info severity instead of
    /// debug.
    pub log_missing: bool,
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.action_delay > MAX_ACTION_DELAY {
            return Err(SettingsError::DelayOutOfRange);
        }
        Ok(())
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            action_delay: Duration::ZERO,
            log_missing: false,
        }
    }
}
