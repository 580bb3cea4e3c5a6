use std::{collections::HashMap, fmt, hash::Hash};

use crate::{
    error::VerseError,
    types::{NodeId, SessionId},
};

/// A protocol identifier a registry can be keyed by.
pub trait Identity: Copy + Eq + Hash + Ord + fmt::Debug {
    /// Name used in error messages.
    const ENTITY: &'static str;

    fn raw(&self) -> u32;
}

impl Identity for NodeId {
    const ENTITY: &'static str = "node";

    fn raw(&self) -> u32 {
        self.value()
    }
}

impl Identity for SessionId {
    const ENTITY: &'static str = "session";

    fn raw(&self) -> u32 {
        self.value()
    }
}

/// Maps protocol-assigned identifiers to local handles.
///
/// Unlike a plain map, inserting over an existing identifier is refused: a
/// peer asserting an id that is already in use means the local model can no
/// longer be trusted.
pub struct IdentityRegistry<K: Identity, V> {
    entries: HashMap<K, V>,
}

impl<K: Identity, V> IdentityRegistry<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: K, handle: V) -> Result<(), VerseError> {
        if self.entries.contains_key(&id) {
            return Err(VerseError::DuplicateIdentity {
                entity: K::ENTITY,
                id: id.raw(),
            });
        }
        self.entries.insert(id, handle);
        Ok(())
    }

    pub fn lookup(&self, id: &K) -> Option<&V> {
        self.entries.get(id)
    }

    /// Removes and returns the handle. Unknown ids are a no-op.
    pub fn unregister(&mut self, id: &K) -> Option<V> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &K) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered ids, ascending.
    pub fn ids(&self) -> Vec<K> {
        let mut ids: Vec<K> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn handles(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    /// Unregisters every entry matching `predicate`, returning them.
    pub fn unregister_where(&mut self, mut predicate: impl FnMut(&K, &V) -> bool) -> Vec<(K, V)> {
        let matching: Vec<K> = self
            .entries
            .iter()
            .filter(|(id, handle)| predicate(id, handle))
            .map(|(id, _)| *id)
            .collect();

        matching
            .into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|handle| (id, handle)))
            .collect()
    }
}

impl<K: Identity, V> Default for IdentityRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
