//! The action sink contract.

use thiserror::Error;

/// Failure modes of an action invocation.
///
/// The engine only distinguishes "the identifier is unknown" from every
/// other failure: unknown identifiers are an expected condition (a host
/// simply has no action wired up for that address) and are logged and
/// skipped, while any other failure is logged as unexpected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("no action registered for '{0}'")]
    Unknown(String),

    #[error("action '{id}' failed: {reason}")]
    Failed { id: String, reason: String },
}

/// External executor of named actions.
///
/// Implementations are shared across namespaces and must tolerate calls
/// from several namespace locks held concurrently.
pub trait ActionSink: Send + Sync {
    /// Perform the action behind `action`. The engine never inspects a
    /// payload, only success or the error variant.
    fn invoke(&self, action: &str) -> Result<(), ActionError>;
}
