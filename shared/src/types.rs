use std::fmt;

/// Protocol-assigned identifier of a node.
///
/// On the wire the all-ones value means "not assigned yet"; locally an
/// unassigned id is simply `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const UNASSIGNED_WIRE_VALUE: u32 = u32::MAX;

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Decodes a wire value, mapping the unassigned sentinel to `None`.
    pub fn from_wire(value: u32) -> Option<Self> {
        if value == Self::UNASSIGNED_WIRE_VALUE {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn to_wire(id: Option<Self>) -> u32 {
        id.map_or(Self::UNASSIGNED_WIRE_VALUE, |id| id.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Transport-assigned handle of one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u32);

impl SessionId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Who created a node, from this runtime's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeOwner {
    Mine,
    Other,
}

impl NodeOwner {
    pub fn is_mine(self) -> bool {
        self == NodeOwner::Mine
    }
}
