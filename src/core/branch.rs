//! Branches and leaves: the realized form of a hierarchical state path.
//!
//! A `Branch` is derived fresh from a path string whenever a transition or
//! diff needs one; it is never stored long-term state on its own. Each
//! `Leaf` knows its local name, its accumulated address, and the
//! identifiers derived from that address.

use super::address::{self, BRANCH_SEPARATOR, LEVEL_SEPARATOR};

/// One level on a hierarchical state path.
///
/// The address accumulates the level names above it, so for the path
/// `Awake>Morning` in namespace `Home` the second leaf has name
/// `Morning`, address `Awake|Morning`, action `Home|Awake|Morning`, and
/// indicator key `Home_Awake_Morning`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaf {
    name: String,
    address: String,
    action: String,
    indicator: String,
}

impl Leaf {
    fn new(namespace: &str, address: &str, name: &str) -> Self {
        let action = address::qualify(namespace, address);
        let indicator = address::variable_key(&action);
        Leaf {
            name: name.to_string(),
            address: address.to_string(),
            action,
            indicator,
        }
    }

    /// The local label of this level.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The accumulated address, unique within a branch by construction.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The namespace-qualified action identifier for this leaf.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The variable key of this leaf's boolean active indicator.
    pub fn indicator(&self) -> &str {
        &self.indicator
    }
}

/// The ordered leaf sequence for a path, root first.
///
/// Invariant: `leaves[i].address()` equals `leaves[i-1].address()` +
/// `'|'` + `leaves[i].name()`, with the first address equal to the first
/// name. An empty path produces an empty branch ("no state").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Branch {
    leaves: Vec<Leaf>,
}

impl Branch {
    /// Build the branch for `path` in `namespace` by splitting on the
    /// level separator and accumulating prefixes.
    pub fn new(namespace: &str, path: &str) -> Self {
        let mut leaves = Vec::new();
        if !path.is_empty() {
            let mut address = String::new();
            for (depth, name) in path.split(LEVEL_SEPARATOR).enumerate() {
                if depth > 0 {
                    address.push(BRANCH_SEPARATOR);
                }
                address.push_str(name);
                leaves.push(Leaf::new(namespace, &address, name));
            }
        }
        Branch { leaves }
    }

    /// The branch of the empty path.
    pub fn empty() -> Self {
        Branch::default()
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}
