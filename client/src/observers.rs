use std::sync::Arc;

use verse_shared::{Capability, Observer};

/// Handle returned when an observer is added, used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverKey(u64);

/// Registered observers, in the order they were added.
pub(crate) struct ObserverSet {
    next_key: u64,
    observers: Vec<(ObserverKey, Arc<dyn Observer>)>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self {
            next_key: 0,
            observers: Vec::new(),
        }
    }

    /// Adding an observer that is already present returns its existing key.
    pub fn add(&mut self, observer: Arc<dyn Observer>) -> ObserverKey {
        if let Some((key, _)) = self
            .observers
            .iter()
            .find(|(_, existing)| Arc::ptr_eq(existing, &observer))
        {
            return *key;
        }

        let key = ObserverKey(self.next_key);
        self.next_key += 1;
        self.observers.push((key, observer));
        key
    }

    pub fn remove(&mut self, key: &ObserverKey) -> Option<Arc<dyn Observer>> {
        let index = self
            .observers
            .iter()
            .position(|(existing, _)| existing == key)?;
        Some(self.observers.remove(index).1)
    }

    /// Snapshot of the observers that handle `capability`, so they can be
    /// notified after the set's lock is released.
    pub fn interested(&self, capability: Capability) -> Vec<Arc<dyn Observer>> {
        self.observers
            .iter()
            .filter(|(_, observer)| observer.capabilities().contains(capability))
            .map(|(_, observer)| observer.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }
}
