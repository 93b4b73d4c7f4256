//! Statetree: a hierarchical, context-aware state engine.
//!
//! Multiple independent named state machines ("namespaces") coexist.
//! Each owns a slash-of-levels state path (`"Awake>Morning"`), a set of
//! orthogonal boolean contexts active independently of the path, and
//! optional mutual-exclusion groups over those contexts. Transitions
//! compute the minimal enter/exit sequence between the old and new
//! branch, queue the resulting action invocations and state-mirror
//! writes into a batch, and flush it through two external collaborators:
//! an [`ActionSink`](effects::ActionSink) that executes named actions
//! and a [`VariableStore`](effects::VariableStore) that durably mirrors
//! engine state.
//!
//! The core diff logic is pure and lives in [`core`]; everything
//! side-effecting sits behind the collaborator traits in [`effects`].
//!
//! # Example
//!
//! ```rust
//! use statetree::{EngineSettings, StateEngine};
//! use statetree::effects::{MemorySink, MemoryStore};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::permissive());
//! let store = Arc::new(MemoryStore::new());
//! let engine = StateEngine::new(sink.clone(), store.clone(), EngineSettings::default());
//!
//! engine.add_namespace("Home").unwrap();
//! engine.change_state("Home", "Awake>Morning", false).unwrap();
//!
//! assert_eq!(engine.current_state("Home").unwrap(), "Awake>Morning");
//! assert_eq!(
//!     sink.invocations(),
//!     vec!["Home", "Home|Awake", "Home|Awake|Morning", "Home*"]
//! );
//! assert_eq!(store.value("Home_Awake_Morning").unwrap(), "true");
//! ```

pub mod core;
pub mod effects;
pub mod registry;
pub mod settings;
pub mod snapshot;
pub mod tree;

// Re-export commonly used types
pub use crate::core::{Branch, Leaf, TransitionBatch};
pub use registry::{EngineError, StateEngine};
pub use settings::{EngineSettings, SettingsError};
pub use snapshot::{EngineSnapshot, NamespaceSnapshot, SnapshotError};
pub use tree::StateTree;
