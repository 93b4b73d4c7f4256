//! The engine registry: the caller-facing layer over namespaces.
//!
//! `StateEngine` owns every namespace, validates caller input against the
//! reserved-character rules before any core logic runs, and serializes
//! operations per namespace behind one lock each. Operations on distinct
//! namespaces proceed fully concurrently.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::core::address::{LEVEL_RESERVED, NAME_RESERVED};
use crate::effects::{ActionSink, StoreError, VariableStore};
use crate::settings::{EngineSettings, SettingsError};
use crate::snapshot::{
    self, EngineSnapshot, NamespaceSnapshot, SnapshotError, SNAPSHOT_VERSION,
};
use crate::tree::{Shared, StateTree};

/// Errors surfaced by the caller layer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("namespace '{0}' already exists")]
    NamespaceExists(String),

    #[error("namespace '{0}' does not exist")]
    NoSuchNamespace(String),

    #[error("name must be at least one character long")]
    EmptyName,

    #[error("name '{name}' may not contain '{reserved}'")]
    ReservedCharacter { name: String, reserved: char },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Registry of independently locked namespaces sharing one action sink
/// and one variable store.
pub struct StateEngine {
    shared: Arc<Shared>,
    trees: RwLock<HashMap<String, Arc<Mutex<StateTree>>>>,
}

impl StateEngine {
    pub fn new(
        sink: Arc<dyn ActionSink>,
        store: Arc<dyn VariableStore>,
        settings: EngineSettings,
    ) -> Self {
        StateEngine {
            shared: Arc::new(Shared {
                sink,
                store,
                settings: RwLock::new(settings),
            }),
            trees: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild an engine from a snapshot. No actions fire; every
    /// namespace comes back with its persisted path, contexts, and
    /// groups.
    pub fn restore(
        sink: Arc<dyn ActionSink>,
        store: Arc<dyn VariableStore>,
        settings: EngineSettings,
        snapshot: &EngineSnapshot,
    ) -> Result<Self, EngineError> {
        snapshot.check_version()?;
        let engine = StateEngine::new(sink, store, settings);
        {
            let mut trees = engine.trees.write();
            for namespace in &snapshot.namespaces {
                validate_name(&namespace.name)?;
                let tree = StateTree::from_snapshot(namespace, engine.shared.clone())?;
                trees.insert(namespace.name.clone(), Arc::new(Mutex::new(tree)));
            }
        }
        Ok(engine)
    }

    /// Declare a new namespace.
    pub fn add_namespace(&self, name: &str) -> Result<(), EngineError> {
        validate_name(name)?;
        let mut trees = self.trees.write();
        if trees.contains_key(name) {
            return Err(EngineError::NamespaceExists(name.to_string()));
        }
        let tree = StateTree::create(name, self.shared.clone())?;
        trees.insert(name.to_string(), Arc::new(Mutex::new(tree)));
        tracing::info!(r#">> namespace "{name}" added"#);
        Ok(())
    }

    /// Rebuild a namespace from its own mirror variables in the store.
    ///
    /// The stored path and context list become the namespace's state
    /// without firing any actions; a malformed or unparseable context
    /// list degrades to no contexts with a warning.
    pub fn adopt_namespace(&self, name: &str) -> Result<(), EngineError> {
        validate_name(name)?;
        let mut trees = self.trees.write();
        if trees.contains_key(name) {
            return Err(EngineError::NamespaceExists(name.to_string()));
        }
        let probe = StateTree::create(name, self.shared.clone())?;
        let mirrors = probe.stored_mirrors()?;
        let current = match validate_path(&mirrors.current_path) {
            Ok(()) => mirrors.current_path,
            Err(_) => {
                tracing::warn!(
                    r#">> namespace "{name}" has an invalid stored path, starting empty"#
                );
                String::new()
            }
        };
        let contexts = if mirrors.context_list.is_empty() {
            Vec::new()
        } else {
            match snapshot::parse_context_list(&mirrors.context_list) {
                Ok(contexts) => contexts,
                Err(err) => {
                    tracing::warn!(
                        r#">> namespace "{name}" has an unreadable context list ({err}), starting empty"#
                    );
                    Vec::new()
                }
            }
        };
        let tree = StateTree::with_state(
            name,
            &current,
            &mirrors.prior_path,
            contexts,
            BTreeMap::new(),
            self.shared.clone(),
        )?;
        trees.insert(name.to_string(), Arc::new(Mutex::new(tree)));
        tracing::info!(r#">> namespace "{name}" adopted"#);
        Ok(())
    }

    /// Remove a namespace. Its variables stay in the store.
    pub fn remove_namespace(&self, name: &str) -> Result<(), EngineError> {
        let removed = self.trees.write().remove(name);
        match removed {
            Some(_) => {
                tracing::info!(r#">> namespace "{name}" removed"#);
                Ok(())
            }
            None => Err(EngineError::NoSuchNamespace(name.to_string())),
        }
    }

    /// Names of every registered namespace, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.trees.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.trees.read().contains_key(name)
    }

    /// Transition a namespace to a new path. An empty path means "no
    /// state".
    pub fn change_state(
        &self,
        namespace: &str,
        new_path: &str,
        force: bool,
    ) -> Result<(), EngineError> {
        validate_path(new_path)?;
        let tree = self.tree(namespace)?;
        tree.lock().change_state(new_path, force);
        Ok(())
    }

    /// Transition a namespace to the path held in one of its own store
    /// variables, validating the stored value at call time.
    pub fn change_state_from_variable(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<(), EngineError> {
        let tree = self.tree(namespace)?;
        let mut guard = tree.lock();
        let path = guard.read_variable(key)?;
        if path.is_empty() {
            return Err(EngineError::EmptyName);
        }
        validate_path(&path)?;
        guard.change_state(&path, false);
        Ok(())
    }

    /// Activate a context.
    pub fn add_context(
        &self,
        namespace: &str,
        context: &str,
        force: bool,
    ) -> Result<(), EngineError> {
        validate_name(context)?;
        let tree = self.tree(namespace)?;
        tree.lock().change_context(context, true, force);
        Ok(())
    }

    /// Deactivate a context.
    pub fn remove_context(
        &self,
        namespace: &str,
        context: &str,
        force: bool,
    ) -> Result<(), EngineError> {
        validate_name(context)?;
        let tree = self.tree(namespace)?;
        tree.lock().change_context(context, false, force);
        Ok(())
    }

    /// Declare (or replace) a mutual-exclusion group over contexts.
    pub fn define_context_group(
        &self,
        namespace: &str,
        group: &str,
        members: Vec<String>,
    ) -> Result<(), EngineError> {
        validate_name(group)?;
        for member in &members {
            validate_name(member)?;
        }
        let tree = self.tree(namespace)?;
        tree.lock().define_group(group, members);
        Ok(())
    }

    pub fn remove_context_group(
        &self,
        namespace: &str,
        group: &str,
    ) -> Result<(), EngineError> {
        let tree = self.tree(namespace)?;
        tree.lock().remove_group(group);
        Ok(())
    }

    /// Return a namespace to its prior path.
    pub fn revert(&self, namespace: &str) -> Result<(), EngineError> {
        let tree = self.tree(namespace)?;
        tree.lock().revert();
        Ok(())
    }

    /// Re-derive a namespace's store variables from its in-memory state.
    pub fn resync(&self, namespace: &str) -> Result<(), EngineError> {
        let tree = self.tree(namespace)?;
        tree.lock().resync()?;
        Ok(())
    }

    pub fn current_state(&self, namespace: &str) -> Result<String, EngineError> {
        Ok(self.tree(namespace)?.lock().current_path().to_string())
    }

    pub fn prior_state(&self, namespace: &str) -> Result<String, EngineError> {
        Ok(self.tree(namespace)?.lock().prior_path().to_string())
    }

    pub fn active_contexts(&self, namespace: &str) -> Result<Vec<String>, EngineError> {
        Ok(self.tree(namespace)?.lock().active_contexts().to_vec())
    }

    pub fn settings(&self) -> EngineSettings {
        *self.shared.settings.read()
    }

    pub fn set_settings(&self, settings: EngineSettings) -> Result<(), EngineError> {
        settings.validate()?;
        *self.shared.settings.write() = settings;
        Ok(())
    }

    /// Capture every namespace for host-side persistence.
    pub fn snapshot(&self) -> EngineSnapshot {
        let trees = self.trees.read();
        let mut namespaces: Vec<NamespaceSnapshot> =
            trees.values().map(|tree| tree.lock().to_snapshot()).collect();
        namespaces.sort_by(|a, b| a.name.cmp(&b.name));
        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: Utc::now(),
            namespaces,
        }
    }

    fn tree(&self, namespace: &str) -> Result<Arc<Mutex<StateTree>>, EngineError> {
        self.trees
            .read()
            .get(namespace)
            .cloned()
            .ok_or_else(|| EngineError::NoSuchNamespace(namespace.to_string()))
    }
}

fn validate_name(name: &str) -> Result<(), EngineError> {
    if name.is_empty() {
        return Err(EngineError::EmptyName);
    }
    if let Some(reserved) = name.chars().find(|c| NAME_RESERVED.contains(c)) {
        return Err(EngineError::ReservedCharacter {
            name: name.to_string(),
            reserved,
        });
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<(), EngineError> {
    if let Some(reserved) = path.chars().find(|c| LEVEL_RESERVED.contains(c)) {
        return Err(EngineError::ReservedCharacter {
            name: path.to_string(),
            reserved,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{MemorySink, MemoryStore};

    fn engine() -> (Arc<MemorySink>, Arc<MemoryStore>, StateEngine) {
        let sink = Arc::new(MemorySink::permissive());
        let store = Arc::new(MemoryStore::new());
        let engine =
            StateEngine::new(sink.clone(), store.clone(), EngineSettings::default());
        (sink, store, engine)
    }

    #[test]
    fn namespaces_are_added_and_removed() {
        let (_, _, engine) = engine();
        engine.add_namespace("Home").unwrap();
        assert!(engine.has_namespace("Home"));
        assert_eq!(
            engine.add_namespace("Home"),
            Err(EngineError::NamespaceExists("Home".to_string()))
        );
        engine.remove_namespace("Home").unwrap();
        assert_eq!(
            engine.remove_namespace("Home"),
            Err(EngineError::NoSuchNamespace("Home".to_string()))
        );
    }

    #[test]
    fn namespace_names_reject_reserved_characters() {
        let (_, _, engine) = engine();
        assert_eq!(engine.add_namespace(""), Err(EngineError::EmptyName));
        for name in ["a|b", "a>b", "a+b", "a*b", "a_b"] {
            assert!(matches!(
                engine.add_namespace(name),
                Err(EngineError::ReservedCharacter { .. })
            ));
        }
    }

    #[test]
    fn paths_allow_the_level_separator_only() {
        let (_, _, engine) = engine();
        engine.add_namespace("Home").unwrap();
        engine.change_state("Home", "A>B", false).unwrap();
        for path in ["A|B", "A+B", "A*B", "A_B"] {
            assert!(matches!(
                engine.change_state("Home", path, false),
                Err(EngineError::ReservedCharacter { .. })
            ));
        }
    }

    #[test]
    fn operations_on_missing_namespaces_fail() {
        let (_, _, engine) = engine();
        assert_eq!(
            engine.change_state("Nowhere", "A", false),
            Err(EngineError::NoSuchNamespace("Nowhere".to_string()))
        );
        assert_eq!(
            engine.add_context("Nowhere", "day", false),
            Err(EngineError::NoSuchNamespace("Nowhere".to_string()))
        );
    }

    #[test]
    fn context_group_members_are_validated() {
        let (_, _, engine) = engine();
        engine.add_namespace("Home").unwrap();
        assert!(matches!(
            engine.define_context_group(
                "Home",
                "time",
                vec!["day".to_string(), "ni|ght".to_string()]
            ),
            Err(EngineError::ReservedCharacter { .. })
        ));
    }

    #[test]
    fn removed_groups_stop_enforcing_exclusion() {
        let (_, _, engine) = engine();
        engine.add_namespace("Home").unwrap();
        engine
            .define_context_group(
                "Home",
                "time",
                vec!["day".to_string(), "night".to_string()],
            )
            .unwrap();
        engine.add_context("Home", "day", false).unwrap();
        engine.remove_context_group("Home", "time").unwrap();

        engine.add_context("Home", "night", false).unwrap();
        assert_eq!(
            engine.active_contexts("Home").unwrap(),
            vec!["day", "night"]
        );
    }

    #[test]
    fn change_state_from_variable_validates_the_stored_value() {
        let (_, store, engine) = engine();
        engine.add_namespace("Home").unwrap();
        let folder = store.get_or_create_folder("Home").unwrap();
        store.poke("target", folder, "Awake>Morning");

        engine.change_state_from_variable("Home", "target").unwrap();
        assert_eq!(engine.current_state("Home").unwrap(), "Awake>Morning");

        store.poke("target", folder, "bad|path");
        assert!(matches!(
            engine.change_state_from_variable("Home", "target"),
            Err(EngineError::ReservedCharacter { .. })
        ));
        // The invalid value never transitioned the namespace.
        assert_eq!(engine.current_state("Home").unwrap(), "Awake>Morning");

        store.poke("target", folder, "");
        assert_eq!(
            engine.change_state_from_variable("Home", "target"),
            Err(EngineError::EmptyName)
        );
    }

    #[test]
    fn settings_updates_are_validated() {
        let (_, _, engine) = engine();
        let bad = EngineSettings {
            action_delay: std::time::Duration::from_secs(60),
            log_missing: false,
        };
        assert!(engine.set_settings(bad).is_err());

        let good = EngineSettings {
            action_delay: std::time::Duration::ZERO,
            log_missing: true,
        };
        engine.set_settings(good).unwrap();
        assert_eq!(engine.settings(), good);
    }

    #[test]
    fn snapshot_restores_state_without_firing_actions() {
        let (_sink, store, engine) = engine();
        engine.add_namespace("Home").unwrap();
        engine.add_namespace("Office").unwrap();
        engine
            .define_context_group(
                "Home",
                "time",
                vec!["day".to_string(), "night".to_string()],
            )
            .unwrap();
        engine.change_state("Home", "Awake>Morning", false).unwrap();
        engine.add_context("Home", "day", false).unwrap();
        engine.change_state("Office", "Closed", false).unwrap();

        let snapshot = engine.snapshot();
        snapshot.check_version().unwrap();

        let sink2 = Arc::new(MemorySink::permissive());
        let restored = StateEngine::restore(
            sink2.clone(),
            store,
            EngineSettings::default(),
            &snapshot,
        )
        .unwrap();

        assert!(sink2.invocations().is_empty());
        assert_eq!(restored.current_state("Home").unwrap(), "Awake>Morning");
        assert_eq!(restored.active_contexts("Home").unwrap(), vec!["day"]);
        assert_eq!(restored.current_state("Office").unwrap(), "Closed");
        assert_eq!(restored.snapshot().namespaces, snapshot.namespaces);
    }

    #[test]
    fn restore_rejects_future_versions() {
        let (_, store, _) = engine();
        let snapshot = EngineSnapshot {
            version: SNAPSHOT_VERSION + 1,
            taken_at: Utc::now(),
            namespaces: Vec::new(),
        };
        let result = StateEngine::restore(
            Arc::new(MemorySink::permissive()),
            store,
            EngineSettings::default(),
            &snapshot,
        );
        assert!(matches!(
            result,
            Err(EngineError::Snapshot(SnapshotError::UnsupportedVersion(_)))
        ));
    }

    #[test]
    fn adopt_namespace_rehydrates_from_the_store() {
        let (sink, store, engine) = engine();
        engine.add_namespace("Home").unwrap();
        engine.change_state("Home", "Awake>Morning", false).unwrap();
        engine.add_context("Home", "day", false).unwrap();
        engine.remove_namespace("Home").unwrap();
        sink.clear();

        engine.adopt_namespace("Home").unwrap();
        assert!(sink.invocations().is_empty());
        assert_eq!(engine.current_state("Home").unwrap(), "Awake>Morning");
        assert_eq!(engine.active_contexts("Home").unwrap(), vec!["day"]);
    }

    #[test]
    fn adopt_tolerates_an_unreadable_context_list() {
        let (_, store, engine) = engine();
        let folder = store.get_or_create_folder("Home").unwrap();
        store.poke("Home", folder, "Awake");
        store.poke("Home__Contexts", folder, "not json");

        engine.adopt_namespace("Home").unwrap();
        assert_eq!(engine.current_state("Home").unwrap(), "Awake");
        assert!(engine.active_contexts("Home").unwrap().is_empty());
    }
}
