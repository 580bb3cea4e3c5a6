//! Node lifecycle transitions that need the command gate.
//!
//! Requests run inside a gate hold the caller already entered; peer
//! acknowledgments enter the gate themselves and hand back the node together
//! with its continuation, so the pump can invoke it with no lock held.

use log::{debug, error, warn};

use verse_shared::{
    Command, NodeCommand, NodeHandle, NodeId, NodeKind, NodeLifecycle, NodeOwner, SessionId,
    VerseError,
};

use crate::{
    gate::{CommandGate, GateContext},
    session::{CreateContinuation, DestroyContinuation, PendingCreate, SessionRecord},
};

/// A node whose lifecycle the peer just advanced, with the continuation
/// waiting for it.
pub(crate) struct Settled<C> {
    pub node: NodeHandle,
    pub continuation: Option<C>,
}

impl<C> Settled<C> {
    /// Hands the node to its continuation, if there is one.
    pub fn run(self) -> NodeHandle
    where
        C: FnOnce(&NodeHandle),
    {
        if let Some(continuation) = self.continuation {
            continuation(&self.node);
        }
        self.node
    }
}

/// Queues the request, then sends it. The queue entry exists before the
/// command leaves, so the acknowledgment always finds it.
pub(crate) fn request_create(
    ctx: &mut GateContext<'_>,
    record: &SessionRecord,
    kind: NodeKind,
    continuation: CreateContinuation,
) -> Result<NodeHandle, VerseError> {
    let session = match record.require_active("node_create") {
        Ok(session) => session,
        Err(error) => {
            ctx.release_later(continuation);
            return Err(error);
        }
    };

    let node = NodeHandle::new(kind);
    node.bind_session(session)?;
    node.mark_pending_create()?;
    record.enqueue_create(PendingCreate {
        node: node.clone(),
        continuation: Some(continuation),
    });

    let command = Command::NodeCreate {
        node: None,
        kind,
        owner: NodeOwner::Mine,
    };
    if let Err(error) = ctx.send(command) {
        if let Some(pending) = record.pop_last_create(kind) {
            ctx.release_later(pending);
        }
        return Err(error);
    }
    Ok(node)
}

/// Asks the peer to destroy `node`. The node stays alive until the peer
/// acknowledges.
pub(crate) fn request_destroy(
    ctx: &mut GateContext<'_>,
    record: &SessionRecord,
    node: &NodeHandle,
    continuation: Option<DestroyContinuation>,
) -> Result<(), VerseError> {
    let id = match destroy_target(record, node) {
        Ok(id) => id,
        Err(error) => {
            ctx.release_later(continuation);
            return Err(error);
        }
    };

    if let Some(continuation) = continuation {
        if let Some(replaced) = record.set_destroy_callback(id, continuation) {
            debug!("Replacing pending destroy continuation for {}", node);
            ctx.release_later(replaced);
        }
    }

    if let Err(error) = ctx.send(Command::NodeDestroy { node: id }) {
        if let Some(continuation) = record.take_destroy_callback(id) {
            ctx.release_later(continuation);
        }
        return Err(error);
    }
    Ok(())
}

fn destroy_target(record: &SessionRecord, node: &NodeHandle) -> Result<NodeId, VerseError> {
    let session = record.require_active("node_destroy")?;
    node.ensure_not_destroyed("node_destroy")?;
    let (id, owner) = node.require_bound("node_destroy")?;
    ensure_same_session(node, owner, session)?;
    Ok(id)
}

pub(crate) fn send_node_command(
    ctx: &mut GateContext<'_>,
    record: &SessionRecord,
    node: &NodeHandle,
    command: NodeCommand,
) -> Result<(), VerseError> {
    let operation = command.name();
    let session = record.require_active(operation)?;
    node.ensure_not_destroyed(operation)?;
    if let Some(expected) = command.required_kind() {
        if expected != node.kind() {
            return Err(VerseError::WrongNodeKind {
                operation,
                expected,
                actual: node.kind(),
            });
        }
    }
    let (id, owner) = node.require_bound(operation)?;
    ensure_same_session(node, owner, session)?;

    ctx.send(Command::Node {
        node: id,
        command: command.clone(),
    })?;
    node.apply_command(&command);
    Ok(())
}

fn ensure_same_session(
    node: &NodeHandle,
    owner: SessionId,
    session: SessionId,
) -> Result<(), VerseError> {
    if owner != session {
        return Err(VerseError::session(format!(
            "{} belongs to {}, not {}",
            node, owner, session
        )));
    }
    Ok(())
}

/// Handles the peer's `node_create` on `session`.
///
/// A destroyed node still waiting for finalization gives up its id to the
/// new node and is finalized early; only a live collision is fatal.
pub(crate) fn accept_create(
    gate: &CommandGate,
    record: &SessionRecord,
    session: SessionId,
    id: NodeId,
    kind: NodeKind,
    owner: NodeOwner,
) -> Result<Settled<CreateContinuation>, VerseError> {
    let (settled, superseded) = gate.with_gate(|ctx| {
        let superseded = match ctx.nodes().lookup(&id).cloned() {
            Some(existing) if existing.is_destroyed() => Some(existing),
            Some(_) => {
                error!(
                    "{} asserted {} for a new {} node, but it is already registered",
                    session, id, kind
                );
                return Err(VerseError::DuplicateIdentity {
                    entity: "node",
                    id: id.value(),
                });
            }
            None => None,
        };

        let pending = match owner {
            NodeOwner::Mine => record.shift_create(kind),
            NodeOwner::Other => None,
        };
        let (node, continuation) = match pending {
            Some(pending) => (pending.node, pending.continuation),
            None => {
                if owner.is_mine() {
                    warn!(
                        "{} reported {} as one of our {} nodes, but none was requested; materializing it",
                        session, id, kind
                    );
                }
                let node = NodeHandle::new(kind);
                node.bind_session(session)?;
                (node, None)
            }
        };

        if let Err(error) = node.activate(id, owner) {
            ctx.release_later(continuation);
            return Err(error);
        }
        if let Some(existing) = &superseded {
            debug!("{} reuses the id of {:?}", session, existing);
            ctx.nodes().unregister(&id);
        }
        ctx.nodes().register(id, node.clone())?;
        debug!("{} is alive on {}", node, session);
        Ok((Settled { node, continuation }, superseded))
    })?;

    // Payload teardown may call back into the runtime.
    if let Some(superseded) = superseded {
        if superseded.lifecycle() == NodeLifecycle::Destroyed {
            superseded.finalize()?;
        }
    }
    Ok(settled)
}

/// Handles the peer's `node_destroy` on `session`. Unknown and
/// already-destroyed nodes, and nodes bound to another session, yield `None`.
pub(crate) fn accept_destroy(
    gate: &CommandGate,
    record: &SessionRecord,
    session: SessionId,
    id: NodeId,
) -> Result<Option<Settled<DestroyContinuation>>, VerseError> {
    gate.with_gate(|ctx| {
        let Some(node) = ctx.nodes().lookup(&id).cloned() else {
            debug!("Dropping node_destroy for unknown {}", id);
            return Ok(None);
        };
        if node.session() != Some(session) {
            debug!("Dropping node_destroy from {} for {:?}", session, node);
            return Ok(None);
        }
        if !node.mark_destroyed() {
            debug!("Dropping node_destroy for {:?}", node);
            return Ok(None);
        }
        let continuation = record.take_destroy_callback(id);
        Ok(Some(Settled { node, continuation }))
    })
}

/// Unregisters and tears down every destroyed node that nothing outside the
/// registry refers to any more.
pub(crate) fn finalize_destroyed(gate: &CommandGate) -> Result<usize, VerseError> {
    let finalized = gate.with_gate(|ctx| {
        Ok(ctx
            .nodes()
            .unregister_where(|_, node| node.is_destroyed() && node.handle_count() == 1))
    })?;
    for (_, node) in &finalized {
        node.finalize()?;
    }
    Ok(finalized.len())
}

/// Registers a node whose id this runtime assigns itself, as hosts do.
pub(crate) fn register_local(
    gate: &CommandGate,
    kind: NodeKind,
    id: NodeId,
) -> Result<NodeHandle, VerseError> {
    let node = NodeHandle::new(kind);
    node.activate(id, NodeOwner::Mine)?;
    gate.with_gate(|ctx| ctx.nodes().register(id, node.clone()))?;
    Ok(node)
}

/// Destroys and unregisters a locally assigned node straight away; there is
/// no peer whose acknowledgment to wait for.
pub(crate) fn retire_local(gate: &CommandGate, node: &NodeHandle) -> Result<bool, VerseError> {
    let Some(id) = node.id() else {
        return Ok(false);
    };
    let retired = gate.with_gate(|ctx| {
        if ctx.nodes().lookup(&id) != Some(node) {
            return Ok(false);
        }
        node.mark_destroyed();
        ctx.nodes().unregister(&id);
        Ok(true)
    })?;
    if retired && node.lifecycle() == NodeLifecycle::Destroyed {
        node.finalize()?;
    }
    Ok(retired)
}
