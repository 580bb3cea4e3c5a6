use std::{
    fmt,
    sync::{Arc, Weak},
};

use log::{debug, info, warn};

use verse_shared::{
    Command, ConnectRequest, HostId, NodeCommand, NodeHandle, NodeId, NodeKind, NodeOwner,
    SessionId, VerseError,
};

use crate::{
    gate::CommandGate,
    node_manager,
    session::record::{DestroyContinuation, SessionRecord, SessionState},
    verse::Runtime,
};

pub(crate) struct SessionInner {
    pub(crate) record: SessionRecord,
    runtime: Arc<Runtime>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let record = &self.record;
        let finalized = self.runtime.gate.with_gate(|ctx| {
            let (registered, leftovers) = record.mark_finalized();
            ctx.release_later(leftovers);
            if let Some(id) = registered {
                ctx.sessions().unregister(&id);
                ctx.sender().destroy_session(id);
            }
            Ok(registered)
        });
        match finalized {
            Ok(Some(id)) => info!("Finalized {}, its last handle was dropped", id),
            Ok(None) => {}
            Err(error) => warn!("Couldn't finalize session: {}", error),
        }
    }
}

/// Handle to one connection with a Verse peer.
///
/// Clones share the session. When the last handle is dropped a session that
/// is still registered is unregistered and its connection destroyed.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub(crate) fn new(runtime: Arc<Runtime>, address: Option<String>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                record: SessionRecord::new(address),
                runtime,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<SessionInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<SessionInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn record(&self) -> &SessionRecord {
        &self.inner.record
    }

    fn gate(&self) -> &CommandGate {
        &self.inner.runtime.gate
    }

    pub fn id(&self) -> Option<SessionId> {
        self.record().id()
    }

    pub fn address(&self) -> Option<String> {
        self.record().address()
    }

    /// Only possible before connecting.
    pub fn set_address(&self, address: &str) -> Result<(), VerseError> {
        self.record().set_address(address)
    }

    pub fn state(&self) -> SessionState {
        self.record().state()
    }

    /// True once the peer has accepted the connection.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// The avatar node the host assigned on acceptance.
    pub fn avatar(&self) -> Option<NodeId> {
        self.record().avatar()
    }

    /// The host's identity, known once accepted.
    pub fn host_id(&self) -> Option<HostId> {
        self.record().host_id()
    }

    /// Creation requests of `kind` still waiting for the peer.
    pub fn pending_creates(&self, kind: NodeKind) -> usize {
        self.record().pending_creates(kind)
    }

    /// Destroy continuations still waiting for the peer.
    pub fn pending_destroys(&self) -> usize {
        self.record().pending_destroys()
    }

    /// Opens the connection. The session is registered under the returned id
    /// right away, but only counts as connected once the peer accepts.
    pub fn connect(
        &self,
        name: &str,
        pass: &str,
        expected_host_id: Option<&HostId>,
    ) -> Result<SessionId, VerseError> {
        let record = self.record();
        let weak = self.downgrade();
        let (id, address) = self.gate().with_session(None, |ctx| {
            let address = record.connect_address()?;
            let request = ConnectRequest {
                name: name.to_string(),
                pass: pass.to_string(),
                address: address.clone(),
                expected_host_id: expected_host_id.cloned(),
            };
            debug!("Connecting to '{}' as '{}'", address, name);
            let id = ctx
                .sender()
                .connect(&request)
                .map_err(|source| VerseError::ConnectError {
                    address: address.clone(),
                    source,
                })?;
            ctx.sessions().register(id, weak)?;
            record.begin_connecting(id)?;
            Ok((id, address))
        })?;
        info!("Opened {} to '{}'", id, address);
        Ok(id)
    }

    /// Tells the peer the session is over and releases it. Pending
    /// continuations are dropped without being called.
    pub fn terminate(&self, message: &str) -> Result<(), VerseError> {
        let record = self.record();
        self.gate().with_session(record.id(), |ctx| {
            let (address, registered) = record.terminate_target()?;
            ctx.send(Command::ConnectTerminate {
                address: address.clone(),
                message: message.to_string(),
            })?;
            if let Some(id) = registered {
                ctx.sessions().unregister(&id);
                ctx.sender().destroy_session(id);
            }
            ctx.release_later(record.mark_terminated());
            info!("Terminated session with '{}': {}", address, message);
            Ok(())
        })
    }

    /// The peer ended the session.
    pub(crate) fn terminated_by_peer(&self, message: &str) -> Result<(), VerseError> {
        let record = self.record();
        self.gate().with_gate(|ctx| {
            if let Some(id) = record.id().filter(|_| record.state().is_active()) {
                ctx.sessions().unregister(&id);
                ctx.sender().destroy_session(id);
                info!("{} terminated by peer: {}", id, message);
            }
            ctx.release_later(record.mark_terminated());
            Ok(())
        })
    }

    /// Asks the peer for a new node of `kind`. The returned node stays
    /// pending until the peer assigns its id; `on_create` then runs during
    /// the next update that sees the acknowledgment.
    pub fn create_node<F>(&self, kind: NodeKind, on_create: F) -> Result<NodeHandle, VerseError>
    where
        F: FnOnce(&NodeHandle) + Send + 'static,
    {
        let record = self.record();
        self.gate().with_session(record.id(), |ctx| {
            node_manager::request_create(ctx, record, kind, Box::new(on_create))
        })
    }

    /// Asks the peer to destroy `node`.
    pub fn destroy_node(&self, node: &NodeHandle) -> Result<(), VerseError> {
        let record = self.record();
        self.gate().with_session(record.id(), |ctx| {
            node_manager::request_destroy(ctx, record, node, None)
        })
    }

    /// Like `destroy_node`, with `on_destroy` run once the peer
    /// acknowledges. A later request for the same node replaces it.
    pub fn destroy_node_with<F>(&self, node: &NodeHandle, on_destroy: F) -> Result<(), VerseError>
    where
        F: FnOnce(&NodeHandle) + Send + 'static,
    {
        let record = self.record();
        let on_destroy: DestroyContinuation = Box::new(on_destroy);
        self.gate().with_session(record.id(), |ctx| {
            node_manager::request_destroy(ctx, record, node, Some(on_destroy))
        })
    }

    /// Asks the peer to rename `node`; the local name follows the peer's
    /// `node_name_set`.
    pub fn rename_node(&self, node: &NodeHandle, name: &str) -> Result<(), VerseError> {
        self.send_node_command(
            node,
            NodeCommand::NameSet {
                name: name.to_string(),
            },
        )
    }

    pub fn send_node_command(&self, node: &NodeHandle, command: NodeCommand) -> Result<(), VerseError> {
        let record = self.record();
        self.gate().with_session(record.id(), |ctx| {
            node_manager::send_node_command(ctx, record, node, command)
        })
    }

    /// Subscribes to creation notices for `kinds`; an empty slice
    /// unsubscribes from all of them.
    pub fn subscribe_node_index(&self, kinds: &[NodeKind]) -> Result<(), VerseError> {
        let record = self.record();
        self.gate().with_session(record.id(), |ctx| {
            record.require_active("node_index_subscribe")?;
            ctx.send(Command::NodeIndexSubscribe {
                mask: NodeKind::index_mask(kinds),
            })
        })
    }

    /// Tells the peer about a node this runtime holds, as a host does for
    /// index subscribers.
    pub fn announce_node(&self, node: &NodeHandle) -> Result<(), VerseError> {
        let record = self.record();
        self.gate().with_session(record.id(), |ctx| {
            record.require_active("node_create")?;
            node.ensure_not_destroyed("node_create")?;
            let id = node.id().ok_or_else(|| VerseError::NotBound {
                entity: node.to_string(),
                reason: "only nodes with an id can be announced",
            })?;
            ctx.send(Command::NodeCreate {
                node: Some(id),
                kind: node.kind(),
                owner: NodeOwner::Other,
            })
        })
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Session {}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record();
        f.debug_struct("Session")
            .field("id", &record.id())
            .field("address", &record.address())
            .field("state", &record.state())
            .finish()
    }
}
