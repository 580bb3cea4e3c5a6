use std::collections::{HashSet, VecDeque};

use verse_client::NodeId;

/// Hands out ids for server-held nodes. Released ids are reused oldest
/// first; an id is never handed out while it is still in use.
pub struct NodeIdGenerator {
    // Ids run from zero up to, not including, this.
    capacity: u32,
    next: u32,
    recycled: VecDeque<NodeId>,
    in_use: HashSet<NodeId>,
}

impl NodeIdGenerator {
    pub fn new() -> Self {
        // The wire's unassigned sentinel is never handed out.
        Self::with_capacity(NodeId::UNASSIGNED_WIRE_VALUE)
    }

    fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity,
            next: 0,
            recycled: VecDeque::new(),
            in_use: HashSet::new(),
        }
    }

    /// `None` once every id is in use.
    pub fn generate(&mut self) -> Option<NodeId> {
        if let Some(id) = self.recycled.pop_front() {
            self.in_use.insert(id);
            return Some(id);
        }

        if self.is_full() {
            return None;
        }
        for _ in 0..self.capacity {
            let id = NodeId::new(self.next);
            self.next = (self.next + 1) % self.capacity;
            if self.in_use.insert(id) {
                return Some(id);
            }
        }
        None
    }

    /// Returns `id` for reuse. False if it was not in use.
    pub fn recycle(&mut self, id: NodeId) -> bool {
        if !self.in_use.remove(&id) {
            return false;
        }
        self.recycled.push_back(id);
        true
    }

    pub fn in_use(&self) -> usize {
        self.in_use.len()
    }

    fn is_full(&self) -> bool {
        self.in_use.len() as u64 >= u64::from(self.capacity)
    }
}

impl Default for NodeIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
