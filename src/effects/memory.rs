//! In-memory collaborators for tests and host smoke runs.

use std::collections::HashSet;

use parking_lot::Mutex;

use super::sink::{ActionError, ActionSink};
use super::store::{FolderId, StoreError, VarId, VariableStore};

/// An [`ActionSink`] that records every invocation attempt in order.
///
/// In permissive mode every identifier resolves; otherwise only the
/// configured set is known and everything else reports
/// [`ActionError::Unknown`]. Identifiers in the failing set report
/// [`ActionError::Failed`] regardless.
pub struct MemorySink {
    known: Option<HashSet<String>>,
    failing: HashSet<String>,
    invoked: Mutex<Vec<String>>,
}

impl MemorySink {
    /// A sink that knows every action identifier.
    pub fn permissive() -> Self {
        MemorySink {
            known: None,
            failing: HashSet::new(),
            invoked: Mutex::new(Vec::new()),
        }
    }

    /// A sink that only knows the given identifiers.
    pub fn with_known<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MemorySink {
            known: Some(ids.into_iter().map(Into::into).collect()),
            failing: HashSet::new(),
            invoked: Mutex::new(Vec::new()),
        }
    }

    /// Make one identifier fail with a non-missing error.
    pub fn fail_on(mut self, id: impl Into<String>) -> Self {
        self.failing.insert(id.into());
        self
    }

    /// Every invocation attempt so far, in order, including failed ones.
    pub fn invocations(&self) -> Vec<String> {
        self.invoked.lock().clone()
    }

    /// Forget recorded invocations.
    pub fn clear(&self) {
        self.invoked.lock().clear();
    }
}

impl ActionSink for MemorySink {
    fn invoke(&self, action: &str) -> Result<(), ActionError> {
        self.invoked.lock().push(action.to_string());
        if self.failing.contains(action) {
            return Err(ActionError::Failed {
                id: action.to_string(),
                reason: "induced failure".to_string(),
            });
        }
        match &self.known {
            Some(known) if !known.contains(action) => {
                Err(ActionError::Unknown(action.to_string()))
            }
            _ => Ok(()),
        }
    }
}

struct VarRecord {
    key: String,
    folder: FolderId,
    value: String,
}

struct StoreInner {
    folders: Vec<String>,
    vars: Vec<VarRecord>,
}

/// A [`VariableStore`] backed by process memory.
///
/// Keys are globally unique; get-or-create moves a variable found in a
/// different folder, mirroring the host store contract.
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            inner: Mutex::new(StoreInner {
                folders: Vec::new(),
                vars: Vec::new(),
            }),
        }
    }

    /// The current value of a variable by key, if it exists.
    pub fn value(&self, key: &str) -> Option<String> {
        let inner = self.inner.lock();
        inner
            .vars
            .iter()
            .find(|v| v.key == key)
            .map(|v| v.value.clone())
    }

    /// The folder a key currently lives in.
    pub fn folder_of(&self, key: &str) -> Option<FolderId> {
        let inner = self.inner.lock();
        inner.vars.iter().find(|v| v.key == key).map(|v| v.folder)
    }

    /// All keys in a folder, in creation order.
    pub fn keys_in(&self, folder: FolderId) -> Vec<String> {
        let inner = self.inner.lock();
        inner
            .vars
            .iter()
            .filter(|v| v.folder == folder)
            .map(|v| v.key.clone())
            .collect()
    }

    /// Set a value directly, bypassing the engine. Test setup only.
    pub fn poke(&self, key: &str, folder: FolderId, value: &str) {
        let mut inner = self.inner.lock();
        if let Some(var) = inner.vars.iter_mut().find(|v| v.key == key) {
            var.value = value.to_string();
        } else {
            inner.vars.push(VarRecord {
                key: key.to_string(),
                folder,
                value: value.to_string(),
            });
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl VariableStore for MemoryStore {
    fn get_or_create_folder(&self, name: &str) -> Result<FolderId, StoreError> {
        let mut inner = self.inner.lock();
        if let Some(i) = inner.folders.iter().position(|f| f == name) {
            return Ok(FolderId(i as u64));
        }
        inner.folders.push(name.to_string());
        Ok(FolderId(inner.folders.len() as u64 - 1))
    }

    fn get_or_create(&self, key: &str, folder: FolderId) -> Result<VarId, StoreError> {
        let mut inner = self.inner.lock();
        if folder.0 as usize >= inner.folders.len() {
            return Err(StoreError::UnknownFolder);
        }
        if let Some(i) = inner.vars.iter().position(|v| v.key == key) {
            if inner.vars[i].folder != folder {
                inner.vars[i].folder = folder;
            }
            return Ok(VarId(i as u64));
        }
        inner.vars.push(VarRecord {
            key: key.to_string(),
            folder,
            value: String::new(),
        });
        Ok(VarId(inner.vars.len() as u64 - 1))
    }

    fn write(&self, var: VarId, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let record = inner
            .vars
            .get_mut(var.0 as usize)
            .ok_or(StoreError::UnknownVariable)?;
        record.value = value.to_string();
        Ok(())
    }

    fn read(&self, var: VarId) -> Result<String, StoreError> {
        let inner = self.inner.lock();
        inner
            .vars
            .get(var.0 as usize)
            .map(|v| v.value.clone())
            .ok_or(StoreError::UnknownVariable)
    }

    fn list_all(&self, folder: FolderId) -> Result<Vec<(VarId, String)>, StoreError> {
        let inner = self.inner.lock();
        if folder.0 as usize >= inner.folders.len() {
            return Err(StoreError::UnknownFolder);
        }
        Ok(inner
            .vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.folder == folder)
            .map(|(i, v)| (VarId(i as u64), v.key.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_records_every_attempt() {
        let sink = MemorySink::with_known(["a"]);
        assert_eq!(sink.invoke("a"), Ok(()));
        assert_eq!(
            sink.invoke("b"),
            Err(ActionError::Unknown("b".to_string()))
        );
        assert_eq!(sink.invocations(), vec!["a", "b"]);
    }

    #[test]
    fn sink_failing_set_beats_known_set() {
        let sink = MemorySink::permissive().fail_on("boom");
        assert!(matches!(
            sink.invoke("boom"),
            Err(ActionError::Failed { .. })
        ));
    }

    #[test]
    fn store_get_or_create_is_idempotent() {
        let store = MemoryStore::new();
        let folder = store.get_or_create_folder("Home").unwrap();
        let a = store.get_or_create("Home_Awake", folder).unwrap();
        let b = store.get_or_create("Home_Awake", folder).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.keys_in(folder), vec!["Home_Awake"]);
    }

    #[test]
    fn store_moves_variable_between_folders() {
        let store = MemoryStore::new();
        let first = store.get_or_create_folder("First").unwrap();
        let second = store.get_or_create_folder("Second").unwrap();
        let var = store.get_or_create("shared", first).unwrap();
        store.write(var, "kept").unwrap();

        let moved = store.get_or_create("shared", second).unwrap();
        assert_eq!(var, moved);
        assert_eq!(store.folder_of("shared"), Some(second));
        assert_eq!(store.read(moved).unwrap(), "kept");
    }

    #[test]
    fn store_lists_only_the_requested_folder() {
        let store = MemoryStore::new();
        let first = store.get_or_create_folder("First").unwrap();
        let second = store.get_or_create_folder("Second").unwrap();
        store.get_or_create("a", first).unwrap();
        store.get_or_create("b", second).unwrap();

        let keys: Vec<String> = store
            .list_all(first)
            .unwrap()
            .into_iter()
            .map(|(_, k)| k)
            .collect();
        assert_eq!(keys, vec!["a"]);
    }
}
