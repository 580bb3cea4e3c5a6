use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use verse_shared::{HostId, NodeHandle, NodeId, NodeKind, SessionId, VerseError};

/// Called with the node once the peer has assigned it an id.
pub type CreateContinuation = Box<dyn FnOnce(&NodeHandle) + Send>;
/// Called with the node once the peer has acknowledged its destruction.
pub type DestroyContinuation = Box<dyn FnOnce(&NodeHandle) + Send>;

/// Where a session is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    Unconnected,
    /// The transport opened the connection; the peer has not accepted yet
    Connecting,
    Connected,
    Terminated,
    Finalized,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Unconnected => "unconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Terminated => "terminated",
            SessionState::Finalized => "finalized",
        }
    }

    /// Whether the session's protocol context can carry commands.
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Connected)
    }
}

/// A node waiting for the peer to assign its id.
pub(crate) struct PendingCreate {
    pub node: NodeHandle,
    pub continuation: Option<CreateContinuation>,
}

/// Continuations a session held when it stopped, released by the caller once
/// no lock is held.
pub(crate) struct Leftovers {
    _creates: Vec<PendingCreate>,
    _destroys: Vec<DestroyContinuation>,
}

struct SessionData {
    id: Option<SessionId>,
    address: Option<String>,
    state: SessionState,
    avatar: Option<NodeId>,
    host_id: Option<HostId>,
    create_callbacks: HashMap<NodeKind, VecDeque<PendingCreate>>,
    destroy_callbacks: HashMap<NodeId, DestroyContinuation>,
}

/// State of one session, guarded by its own lock. Callers that also need
/// the command gate take the gate first.
pub(crate) struct SessionRecord {
    data: Mutex<SessionData>,
}

impl SessionRecord {
    pub fn new(address: Option<String>) -> Self {
        // One queue per kind up front, so the pump never has to create one
        // while a create request is being queued.
        let create_callbacks = NodeKind::ALL
            .iter()
            .map(|kind| (*kind, VecDeque::new()))
            .collect();

        Self {
            data: Mutex::new(SessionData {
                id: None,
                address,
                state: SessionState::Unconnected,
                avatar: None,
                host_id: None,
                create_callbacks,
                destroy_callbacks: HashMap::new(),
            }),
        }
    }

    fn data(&self) -> MutexGuard<'_, SessionData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> Option<SessionId> {
        self.data().id
    }

    pub fn address(&self) -> Option<String> {
        self.data().address.clone()
    }

    pub fn state(&self) -> SessionState {
        self.data().state
    }

    pub fn avatar(&self) -> Option<NodeId> {
        self.data().avatar
    }

    pub fn host_id(&self) -> Option<HostId> {
        self.data().host_id.clone()
    }

    pub fn set_address(&self, address: &str) -> Result<(), VerseError> {
        let mut data = self.data();
        if data.state != SessionState::Unconnected {
            return Err(VerseError::session(format!(
                "cannot change the address of a {} session",
                data.state.name()
            )));
        }
        data.address = Some(address.to_string());
        Ok(())
    }

    /// The address to connect to, if the session may connect at all.
    pub fn connect_address(&self) -> Result<String, VerseError> {
        let data = self.data();
        if data.state != SessionState::Unconnected {
            return Err(VerseError::session("Session already established."));
        }
        data.address
            .clone()
            .ok_or_else(|| VerseError::session("No address set."))
    }

    /// Records the transport's handle; the session is now connecting.
    pub fn begin_connecting(&self, id: SessionId) -> Result<(), VerseError> {
        let mut data = self.data();
        assign_id(&mut data, id)?;
        data.state = SessionState::Connecting;
        Ok(())
    }

    /// A host accepted the peer: the session starts out connected.
    pub fn accept_incoming(&self, id: SessionId, avatar: NodeId, host_id: HostId) -> Result<(), VerseError> {
        let mut data = self.data();
        assign_id(&mut data, id)?;
        data.state = SessionState::Connected;
        data.avatar = Some(avatar);
        data.host_id = Some(host_id);
        Ok(())
    }

    /// `Connecting -> Connected`. Returns false if the session was not
    /// waiting for an acceptance.
    pub fn accept(&self, avatar: NodeId, host_id: HostId) -> bool {
        let mut data = self.data();
        if data.state != SessionState::Connecting {
            return false;
        }
        data.state = SessionState::Connected;
        data.avatar = Some(avatar);
        data.host_id = Some(host_id);
        true
    }

    /// The session's id, provided its context can carry commands.
    pub fn require_active(&self, operation: &'static str) -> Result<SessionId, VerseError> {
        let data = self.data();
        match (data.state.is_active(), data.id) {
            (true, Some(id)) => Ok(id),
            _ => Err(VerseError::session(format!(
                "cannot '{}' on a {} session",
                operation,
                data.state.name()
            ))),
        }
    }

    /// What a termination notice needs: the address, plus the id when the
    /// session is registered.
    pub fn terminate_target(&self) -> Result<(String, Option<SessionId>), VerseError> {
        let data = self.data();
        match data.state {
            SessionState::Unconnected | SessionState::Connecting | SessionState::Connected => {}
            SessionState::Terminated | SessionState::Finalized => {
                return Err(VerseError::session("Session already terminated."));
            }
        }
        let address = data
            .address
            .clone()
            .ok_or_else(|| VerseError::session("No address set."))?;
        let registered = if data.state.is_active() { data.id } else { None };
        Ok((address, registered))
    }

    /// Moves to `Terminated` and hands back every pending continuation.
    pub fn mark_terminated(&self) -> Leftovers {
        let mut data = self.data();
        data.state = SessionState::Terminated;
        take_leftovers(&mut data)
    }

    /// Moves to `Finalized`. Returns the id if the session was still
    /// registered, along with every pending continuation.
    pub fn mark_finalized(&self) -> (Option<SessionId>, Leftovers) {
        let mut data = self.data();
        let registered = if data.state.is_active() { data.id } else { None };
        data.state = SessionState::Finalized;
        (registered, take_leftovers(&mut data))
    }

    pub fn enqueue_create(&self, pending: PendingCreate) {
        let kind = pending.node.kind();
        self.data()
            .create_callbacks
            .entry(kind)
            .or_default()
            .push_back(pending);
    }

    /// Removes the most recent request, undoing `enqueue_create`.
    pub fn pop_last_create(&self, kind: NodeKind) -> Option<PendingCreate> {
        self.data().create_callbacks.get_mut(&kind)?.pop_back()
    }

    /// Takes the oldest request for `kind`.
    pub fn shift_create(&self, kind: NodeKind) -> Option<PendingCreate> {
        self.data().create_callbacks.get_mut(&kind)?.pop_front()
    }

    pub fn pending_creates(&self, kind: NodeKind) -> usize {
        self.data()
            .create_callbacks
            .get(&kind)
            .map_or(0, VecDeque::len)
    }

    /// Stores the continuation for `node`, returning the one it replaces.
    pub fn set_destroy_callback(
        &self,
        node: NodeId,
        continuation: DestroyContinuation,
    ) -> Option<DestroyContinuation> {
        self.data().destroy_callbacks.insert(node, continuation)
    }

    pub fn take_destroy_callback(&self, node: NodeId) -> Option<DestroyContinuation> {
        self.data().destroy_callbacks.remove(&node)
    }

    pub fn pending_destroys(&self) -> usize {
        self.data().destroy_callbacks.len()
    }
}

fn assign_id(data: &mut SessionData, id: SessionId) -> Result<(), VerseError> {
    if let Some(current) = data.id {
        return Err(VerseError::IdentityAlreadyAssigned {
            entity: "session",
            current: current.value(),
            attempted: id.value(),
        });
    }
    data.id = Some(id);
    Ok(())
}

fn take_leftovers(data: &mut SessionData) -> Leftovers {
    let creates = data
        .create_callbacks
        .values_mut()
        .flat_map(|queue| queue.drain(..))
        .collect();
    let destroys = data.destroy_callbacks.drain().map(|(_, continuation)| continuation).collect();
    Leftovers {
        _creates: creates,
        _destroys: destroys,
    }
}
