use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::debug;

use crate::{
    command::NodeCommand,
    error::VerseError,
    node::{payload::NodePayload, tag_group::TagGroup, TagGroupId},
    node_kind::NodeKind,
    types::{NodeId, NodeOwner, SessionId},
};

/// Where a node is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeLifecycle {
    /// Constructed locally, not yet requested from any peer
    Unbound,
    /// Creation requested, waiting for the peer to assign an id
    PendingCreate,
    /// Registered under a protocol id
    Alive,
    /// The peer acknowledged destruction; the id stays registered
    Destroyed,
    /// Unregistered and torn down
    Finalized,
}

impl NodeLifecycle {
    pub fn name(self) -> &'static str {
        match self {
            NodeLifecycle::Unbound => "unbound",
            NodeLifecycle::PendingCreate => "pending create",
            NodeLifecycle::Alive => "alive",
            NodeLifecycle::Destroyed => "destroyed",
            NodeLifecycle::Finalized => "finalized",
        }
    }
}

struct NodeState {
    id: Option<NodeId>,
    owner: Option<NodeOwner>,
    name: String,
    tag_groups: Vec<TagGroup>,
    session: Option<SessionId>,
    lifecycle: NodeLifecycle,
    payload: Option<NodePayload>,
}

struct Node {
    kind: NodeKind,
    state: Mutex<NodeState>,
}

/// Shared handle to one node of the local graph.
///
/// Clones refer to the same node and compare equal; two separately
/// constructed nodes never do. The lifecycle methods are driven by the
/// runtime and enforce the node's invariants: the id is set at most once,
/// the session binding is set at most once, and destruction is permanent.
#[derive(Clone)]
pub struct NodeHandle {
    node: Arc<Node>,
}

impl NodeHandle {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            node: Arc::new(Node {
                kind,
                state: Mutex::new(NodeState {
                    id: None,
                    owner: None,
                    name: String::new(),
                    tag_groups: Vec::new(),
                    session: None,
                    lifecycle: NodeLifecycle::Unbound,
                    payload: Some(NodePayload::for_kind(kind)),
                }),
            }),
        }
    }

    // Node state is plain data with no cross-field invariant a panic could
    // break halfway, so a poisoned lock is recovered.
    fn state(&self) -> MutexGuard<'_, NodeState> {
        self.node.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind
    }

    pub fn id(&self) -> Option<NodeId> {
        self.state().id
    }

    pub fn owner(&self) -> Option<NodeOwner> {
        self.state().owner
    }

    pub fn name(&self) -> String {
        self.state().name.clone()
    }

    pub fn session(&self) -> Option<SessionId> {
        self.state().session
    }

    pub fn lifecycle(&self) -> NodeLifecycle {
        self.state().lifecycle
    }

    pub fn is_alive(&self) -> bool {
        self.lifecycle() == NodeLifecycle::Alive
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(
            self.lifecycle(),
            NodeLifecycle::Destroyed | NodeLifecycle::Finalized
        )
    }

    pub fn tag_groups(&self) -> Vec<TagGroup> {
        self.state().tag_groups.clone()
    }

    pub fn tag_group(&self, group: TagGroupId) -> Option<TagGroup> {
        self.state()
            .tag_groups
            .iter()
            .find(|tag_group| tag_group.id() == group)
            .cloned()
    }

    /// A copy of the kind-specific payload, `None` once finalized.
    pub fn payload(&self) -> Option<NodePayload> {
        self.state().payload.clone()
    }

    pub fn assign_id(&self, id: NodeId) -> Result<(), VerseError> {
        let mut state = self.state();
        if let Some(current) = state.id {
            return Err(VerseError::IdentityAlreadyAssigned {
                entity: "node",
                current: current.value(),
                attempted: id.value(),
            });
        }
        state.id = Some(id);
        Ok(())
    }

    pub fn bind_session(&self, session: SessionId) -> Result<(), VerseError> {
        let mut state = self.state();
        if let Some(current) = state.session {
            return Err(VerseError::session(format!(
                "{} is already bound to {}, cannot rebind it to {}",
                describe(self.node.kind, &state),
                current,
                session
            )));
        }
        state.session = Some(session);
        Ok(())
    }

    /// `Unbound -> PendingCreate`. The node must already be bound to the
    /// session that will create it.
    pub fn mark_pending_create(&self) -> Result<(), VerseError> {
        let mut state = self.state();
        if state.session.is_none() {
            return Err(VerseError::NotBound {
                entity: describe(self.node.kind, &state),
                reason: "a node must be bound to a session before it is created",
            });
        }
        if state.lifecycle != NodeLifecycle::Unbound {
            return Err(VerseError::session(format!(
                "{} is {}, creation can only be requested once",
                describe(self.node.kind, &state),
                state.lifecycle.name()
            )));
        }
        state.lifecycle = NodeLifecycle::PendingCreate;
        Ok(())
    }

    /// `Unbound | PendingCreate -> Alive` under a protocol id.
    pub fn activate(&self, id: NodeId, owner: NodeOwner) -> Result<(), VerseError> {
        let mut state = self.state();
        match state.lifecycle {
            NodeLifecycle::Unbound | NodeLifecycle::PendingCreate => {}
            NodeLifecycle::Destroyed | NodeLifecycle::Finalized => {
                return Err(VerseError::NodeDestroyed {
                    node: describe(self.node.kind, &state),
                    operation: "node_create",
                });
            }
            NodeLifecycle::Alive => {
                return Err(VerseError::session(format!(
                    "{} is already alive",
                    describe(self.node.kind, &state)
                )));
            }
        }
        if let Some(current) = state.id {
            if current != id {
                return Err(VerseError::IdentityAlreadyAssigned {
                    entity: "node",
                    current: current.value(),
                    attempted: id.value(),
                });
            }
        }
        state.id = Some(id);
        state.owner = Some(owner);
        state.lifecycle = NodeLifecycle::Alive;
        Ok(())
    }

    /// `Alive -> Destroyed`. Returns false if the node was not alive, so a
    /// repeated acknowledgment is harmless.
    pub fn mark_destroyed(&self) -> bool {
        let mut state = self.state();
        if state.lifecycle != NodeLifecycle::Alive {
            return false;
        }
        state.lifecycle = NodeLifecycle::Destroyed;
        true
    }

    /// `Destroyed -> Finalized`, running the payload teardown.
    pub fn finalize(&self) -> Result<(), VerseError> {
        let payload = {
            let mut state = self.state();
            if state.lifecycle != NodeLifecycle::Destroyed {
                return Err(VerseError::session(format!(
                    "{} is {}, only destroyed nodes can be finalized",
                    describe(self.node.kind, &state),
                    state.lifecycle.name()
                )));
            }
            state.lifecycle = NodeLifecycle::Finalized;
            state.payload.take()
        };
        if let Some(payload) = payload {
            payload.teardown();
        }
        debug!("Finalized {:?}", self);
        Ok(())
    }

    /// Fails with `NodeDestroyed` once the node is destroyed.
    pub fn ensure_not_destroyed(&self, operation: &'static str) -> Result<(), VerseError> {
        if self.is_destroyed() {
            return Err(VerseError::NodeDestroyed {
                node: self.to_string(),
                operation,
            });
        }
        Ok(())
    }

    /// The id and session a peer-directed command needs.
    pub fn require_bound(
        &self,
        operation: &'static str,
    ) -> Result<(NodeId, SessionId), VerseError> {
        let state = self.state();
        let reason = match (state.session, state.id) {
            (Some(session), Some(id)) => return Ok((id, session)),
            (None, _) => "node is not bound to a session",
            (Some(_), None) => "node has no id yet, its creation is still pending",
        };
        debug!("'{}' rejected: {}", operation, reason);
        Err(VerseError::NotBound {
            entity: describe(self.node.kind, &state),
            reason,
        })
    }

    pub fn set_name(&self, name: &str) {
        self.state().name = name.to_string();
    }

    /// Adds or replaces the tag group with the same id.
    pub fn insert_tag_group(&self, tag_group: TagGroup) {
        let mut state = self.state();
        match state
            .tag_groups
            .iter_mut()
            .find(|existing| existing.id() == tag_group.id())
        {
            Some(existing) => *existing = tag_group,
            None => state.tag_groups.push(tag_group),
        }
    }

    pub fn remove_tag_group(&self, group: TagGroupId) -> Option<TagGroup> {
        let mut state = self.state();
        let index = state
            .tag_groups
            .iter()
            .position(|tag_group| tag_group.id() == group)?;
        Some(state.tag_groups.remove(index))
    }

    pub fn apply_command(&self, command: &NodeCommand) {
        if let Some(payload) = self.state().payload.as_mut() {
            payload.apply(command);
        }
    }

    /// How many handles to this node exist, this one included.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.node)
    }
}

fn describe(kind: NodeKind, state: &NodeState) -> String {
    match state.id {
        Some(id) => format!("{} {}", kind, id),
        None => format!("unassigned {} node", kind),
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for NodeHandle {}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(self.node.kind, &self.state()))
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        write!(
            f,
            "NodeHandle({}, {})",
            describe(self.node.kind, &state),
            state.lifecycle.name()
        )
    }
}
