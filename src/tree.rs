//! The namespace controller: one hierarchical state machine instance.
//!
//! A `StateTree` owns a namespace's current and prior path, its active
//! contexts, and its context groups, and orchestrates transitions and
//! context changes. Each operation stages work into a
//! [`TransitionBatch`], flushes it through the shared collaborators, and
//! only then is the operation complete. Callers reach a tree through the
//! [`StateEngine`](crate::StateEngine) registry, which holds one lock
//! per namespace around every operation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::core::address::{
    self, CHANGED_SUFFIX, CONTEXT_FLAG_INFIX, CONTEXT_LIST_SUFFIX, PRIOR_SUFFIX,
};
use crate::core::diff;
use crate::core::{Branch, TransitionBatch};
use crate::effects::{flush_batch, ActionSink, FolderId, StoreError, VariableStore};
use crate::settings::EngineSettings;
use crate::snapshot::{self, NamespaceSnapshot};

/// Collaborators and settings shared by every namespace of one engine.
pub(crate) struct Shared {
    pub(crate) sink: Arc<dyn ActionSink>,
    pub(crate) store: Arc<dyn VariableStore>,
    pub(crate) settings: RwLock<EngineSettings>,
}

/// The mirror values a namespace left behind in the store.
pub(crate) struct StoredMirrors {
    pub(crate) current_path: String,
    pub(crate) prior_path: String,
    pub(crate) context_list: String,
}

/// A single named hierarchical state machine.
pub struct StateTree {
    name: String,
    current_path: String,
    prior_path: String,
    contexts: Vec<String>,
    groups: BTreeMap<String, Vec<String>>,
    branch: Branch,
    folder: FolderId,
    state_key: String,
    prior_key: String,
    changed_key: String,
    context_list_key: String,
    shared: Arc<Shared>,
}

impl StateTree {
    /// A fresh namespace with no state and no contexts.
    pub(crate) fn create(name: &str, shared: Arc<Shared>) -> Result<Self, StoreError> {
        Self::with_state(name, "", "", Vec::new(), BTreeMap::new(), shared)
    }

    /// A namespace rebuilt from persisted state. No actions fire.
    pub(crate) fn with_state(
        name: &str,
        current_path: &str,
        prior_path: &str,
        contexts: Vec<String>,
        groups: BTreeMap<String, Vec<String>>,
        shared: Arc<Shared>,
    ) -> Result<Self, StoreError> {
        let folder = shared.store.get_or_create_folder(name)?;
        let state_key = address::variable_key(name);
        let prior_key = address::technical_key(&format!("{name}{PRIOR_SUFFIX}"));
        let changed_key = address::technical_key(&format!("{name}{CHANGED_SUFFIX}"));
        let context_list_key =
            address::technical_key(&format!("{name}{CONTEXT_LIST_SUFFIX}"));
        // The mirror variables exist for the namespace's whole lifetime.
        for key in [&state_key, &prior_key, &changed_key, &context_list_key] {
            shared.store.get_or_create(key, folder)?;
        }
        Ok(StateTree {
            name: name.to_string(),
            current_path: current_path.to_string(),
            prior_path: prior_path.to_string(),
            contexts,
            groups,
            branch: Branch::new(name, current_path),
            folder,
            state_key,
            prior_key,
            changed_key,
            context_list_key,
            shared,
        })
    }

    pub(crate) fn from_snapshot(
        snapshot: &NamespaceSnapshot,
        shared: Arc<Shared>,
    ) -> Result<Self, StoreError> {
        Self::with_state(
            &snapshot.name,
            &snapshot.current_path,
            &snapshot.prior_path,
            snapshot.contexts.clone(),
            snapshot.groups.clone(),
            shared,
        )
    }

    pub(crate) fn to_snapshot(&self) -> NamespaceSnapshot {
        NamespaceSnapshot {
            name: self.name.clone(),
            current_path: self.current_path.clone(),
            prior_path: self.prior_path.clone(),
            contexts: self.contexts.clone(),
            groups: self.groups.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn prior_path(&self) -> &str {
        &self.prior_path
    }

    /// Active contexts in insertion order.
    pub fn active_contexts(&self) -> &[String] {
        &self.contexts
    }

    pub fn context_groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.groups
    }

    /// Declare (or replace) a mutual-exclusion group over contexts.
    pub fn define_group(&mut self, group: &str, members: Vec<String>) {
        self.groups.insert(group.to_string(), members);
    }

    pub fn remove_group(&mut self, group: &str) -> bool {
        self.groups.remove(group).is_some()
    }

    /// Transition to `new_path`.
    ///
    /// A repeat of the current path is a no-op unless `force` is set, in
    /// which case the old branch is treated as empty: nothing exits and
    /// every leaf of the path re-enters. The namespace-level enter and
    /// exit pseudo-actions frame every non-no-op transition regardless
    /// of how many leaves actually change.
    pub fn change_state(&mut self, new_path: &str, force: bool) {
        if new_path == self.current_path && !force {
            tracing::debug!(
                r#">> already in state "{}""#,
                address::qualify(&self.name, new_path)
            );
            return;
        }
        tracing::info!(
            r#">> go to state "{}""#,
            address::qualify(&self.name, new_path)
        );

        let mut batch = TransitionBatch::new();
        batch.push_action(self.name.as_str());

        let new_branch = Branch::new(&self.name, new_path);
        let forced_reentry = force && new_path == self.current_path;
        if forced_reentry {
            diff::stage_transition(&mut batch, &Branch::empty(), &new_branch, &self.contexts);
        } else {
            diff::stage_transition(&mut batch, &self.branch, &new_branch, &self.contexts);
        }

        self.prior_path = std::mem::replace(&mut self.current_path, new_path.to_string());
        batch.write(&self.state_key, self.current_path.as_str());
        batch.write(&self.prior_key, self.prior_path.as_str());
        batch.write(&self.changed_key, Utc::now().to_rfc3339());

        batch.push_action(address::exit_id(&self.name));

        self.flush(batch);
        self.branch = new_branch;
    }

    /// Return to the path held before the last successful transition.
    pub fn revert(&mut self) {
        let prior = self.prior_path.clone();
        self.change_state(&prior, false);
    }

    /// Enter or exit a context.
    ///
    /// Entering a grouped context first recursively exits every other
    /// member of every group containing it, so mutual exclusion is
    /// resolved before the target context's own actions run. Entering an
    /// already-active context (or exiting an inactive one) is a no-op
    /// unless `force` is set.
    pub fn change_context(&mut self, context: &str, entering: bool, force: bool) {
        if entering {
            let mut rivals: Vec<String> = Vec::new();
            for members in self.groups.values() {
                if members.iter().any(|m| m.as_str() == context) {
                    for member in members {
                        if member.as_str() != context && !rivals.contains(member) {
                            rivals.push(member.clone());
                        }
                    }
                }
            }
            for rival in rivals {
                self.change_context(&rival, false, force);
            }
        }

        let active = self.contexts.iter().any(|c| c.as_str() == context);
        if !force && entering == active {
            tracing::debug!(
                r#">> context "{}" unchanged"#,
                address::context_id(&self.name, context, true)
            );
            return;
        }
        tracing::info!(
            r#">> {} context "{}""#,
            if entering { "add" } else { "remove" },
            address::context_id(&self.name, context, true)
        );

        let mut batch = TransitionBatch::new();
        if entering {
            batch.push_action(address::context_id(&self.name, context, true));
            if !active {
                self.contexts.push(context.to_string());
            }
        }
        diff::stage_context_change(&mut batch, &self.branch, context, entering);
        if !entering {
            batch.push_action(address::context_id(&self.name, context, false));
            self.contexts.retain(|c| c.as_str() != context);
        }

        let flag_key = self.context_flag_key(context);
        batch.write_flag(&flag_key, entering);
        batch.write(
            &self.context_list_key,
            snapshot::encode_context_list(&self.contexts),
        );
        batch.write(&self.changed_key, Utc::now().to_rfc3339());

        self.flush(batch);
    }

    /// Re-derive the folder's ground truth from in-memory state.
    ///
    /// Every boolean variable in the namespace folder is unmarked except
    /// the non-boolean technical mirrors, then the indicators for the
    /// current branch and the active contexts are re-marked and the
    /// technical mirrors rewritten. Emits writes only, no actions.
    pub fn resync(&mut self) -> Result<(), StoreError> {
        let mut batch = TransitionBatch::new();
        let technical = [
            self.state_key.as_str(),
            self.prior_key.as_str(),
            self.changed_key.as_str(),
            self.context_list_key.as_str(),
        ];
        for (_, key) in self.shared.store.list_all(self.folder)? {
            if !technical.contains(&key.as_str()) {
                batch.write_flag(&key, false);
            }
        }
        for leaf in self.branch.leaves() {
            batch.write_flag(leaf.indicator(), true);
        }
        let active_flags: Vec<String> = self
            .contexts
            .iter()
            .map(|c| self.context_flag_key(c))
            .collect();
        for key in &active_flags {
            batch.write_flag(key, true);
        }
        batch.write(&self.state_key, self.current_path.as_str());
        batch.write(&self.prior_key, self.prior_path.as_str());
        batch.write(
            &self.context_list_key,
            snapshot::encode_context_list(&self.contexts),
        );
        batch.write(&self.changed_key, Utc::now().to_rfc3339());

        self.flush(batch);
        tracing::info!(r#">> namespace "{}" resynchronized"#, self.name);
        Ok(())
    }

    /// Read a variable by logical key from this namespace's folder.
    pub(crate) fn read_variable(&self, key: &str) -> Result<String, StoreError> {
        let var = self
            .shared
            .store
            .get_or_create(&address::variable_key(key), self.folder)?;
        self.shared.store.read(var)
    }

    /// Read the mirror variables back from the store by their exact keys.
    pub(crate) fn stored_mirrors(&self) -> Result<StoredMirrors, StoreError> {
        let read = |key: &str| -> Result<String, StoreError> {
            let var = self.shared.store.get_or_create(key, self.folder)?;
            self.shared.store.read(var)
        };
        Ok(StoredMirrors {
            current_path: read(&self.state_key)?,
            prior_path: read(&self.prior_key)?,
            context_list: read(&self.context_list_key)?,
        })
    }

    fn context_flag_key(&self, context: &str) -> String {
        address::technical_key(&format!(
            "{}{}{}",
            self.name, CONTEXT_FLAG_INFIX, context
        ))
    }

    fn flush(&self, batch: TransitionBatch) {
        let settings = *self.shared.settings.read();
        flush_batch(
            batch,
            self.shared.sink.as_ref(),
            self.shared.store.as_ref(),
            self.folder,
            &settings,
        );
    }
}
