//! Persistence types for surviving process restarts.
//!
//! The engine itself holds all state in memory; hosts persist it by
//! taking an [`EngineSnapshot`], serializing it with serde, and feeding
//! it back at startup. The snapshot format is versioned so a future
//! layout change can be detected instead of silently misread.
//!
//! This module also owns the wire codec for the active-context list that
//! is mirrored into the variable store: a JSON string array, parsed with
//! a real parser.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version identifier for the snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors raised by snapshot and codec handling.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("malformed context list: {0}")]
    MalformedContextList(String),
}

/// Persistable state of one namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceSnapshot {
    pub name: String,
    pub current_path: String,
    pub prior_path: String,
    /// Active contexts in insertion order.
    pub contexts: Vec<String>,
    /// Context group name to mutually exclusive members.
    pub groups: BTreeMap<String, Vec<String>>,
}

/// Persistable state of the whole engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub namespaces: Vec<NamespaceSnapshot>,
}

impl EngineSnapshot {
    pub fn check_version(&self) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Encode an active-context list for the store mirror variable.
pub fn encode_context_list(contexts: &[String]) -> String {
    serde_json::to_string(contexts).expect("a string list always serializes")
}

/// Parse a stored context list.
pub fn parse_context_list(raw: &str) -> Result<Vec<String>, SnapshotError> {
    serde_json::from_str(raw).map_err(|e| SnapshotError::MalformedContextList(e.to_string()))
}
