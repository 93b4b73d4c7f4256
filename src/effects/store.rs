//! The variable store contract.

use thiserror::Error;

/// Handle to a folder grouping one namespace's variables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FolderId(pub u64);

/// Handle to a single variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarId(pub u64);

/// Failure modes of the variable store.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown variable handle")]
    UnknownVariable,

    #[error("unknown folder handle")]
    UnknownFolder,

    #[error("variable store unavailable: {0}")]
    Unavailable(String),
}

/// External durable key/value mirror of engine state.
///
/// Values are always written as strings; booleans serialize as
/// `true`/`false` and timestamps as RFC 3339 so they stay distinguishable
/// on read. Keys are globally unique: getting a key that exists in a
/// different folder moves it into the requested folder.
pub trait VariableStore: Send + Sync {
    /// Resolve or create the folder for a namespace.
    fn get_or_create_folder(&self, name: &str) -> Result<FolderId, StoreError>;

    /// Resolve or create a variable by key, binding it to `folder`.
    /// Idempotent and safe to call repeatedly with the same key.
    fn get_or_create(&self, key: &str, folder: FolderId) -> Result<VarId, StoreError>;

    /// Overwrite a variable's value.
    fn write(&self, var: VarId, value: &str) -> Result<(), StoreError>;

    /// Read a variable's current value.
    fn read(&self, var: VarId) -> Result<String, StoreError>;

    /// Enumerate every variable in a folder as `(handle, key)` pairs.
    fn list_all(&self, folder: FolderId) -> Result<Vec<(VarId, String)>, StoreError>;
}
