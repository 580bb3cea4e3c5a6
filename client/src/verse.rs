use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::info;

use verse_shared::{
    Command, EventReceiver, HostId, NodeHandle, NodeId, NodeKind, Observer, SessionId, Transport,
    VerseError, MAX_PING_MESSAGE_LEN,
};

use crate::{
    config::VerseConfig,
    gate::{CommandGate, GateContext},
    node_manager,
    observers::{ObserverKey, ObserverSet},
    session::{Session, SessionInner},
};

pub(crate) struct Runtime {
    pub(crate) config: VerseConfig,
    pub(crate) gate: CommandGate,
    pub(crate) receiver: Mutex<Box<dyn EventReceiver>>,
    observers: Mutex<ObserverSet>,
    host: Mutex<Option<ObserverKey>>,
}

impl Runtime {
    pub(crate) fn observers(&self) -> MutexGuard<'_, ObserverSet> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn host(&self) -> MutexGuard<'_, Option<ObserverKey>> {
        self.host.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A Verse runtime: the local node graph, every session, and the observers
/// told about inbound events.
///
/// Cheap to clone; clones share the runtime. Any number of threads may issue
/// commands, while `update` should be driven from one place.
#[derive(Clone)]
pub struct Verse {
    pub(crate) runtime: Arc<Runtime>,
}

impl Verse {
    /// Opens `transport` and hands it the configured port.
    pub fn new<T: Transport + 'static>(config: VerseConfig, transport: T) -> Self {
        let (mut sender, receiver) = Box::new(transport).open();
        sender.set_port(config.port);
        info!("Verse runtime started on port {}", config.port);

        Self {
            runtime: Arc::new(Runtime {
                config,
                gate: CommandGate::new(sender),
                receiver: Mutex::new(receiver),
                observers: Mutex::new(ObserverSet::new()),
                host: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &VerseConfig {
        &self.runtime.config
    }

    /// A session with no address yet.
    pub fn new_session(&self) -> Session {
        Session::new(self.runtime.clone(), None)
    }

    pub fn session_at(&self, address: &str) -> Session {
        Session::new(self.runtime.clone(), Some(address.to_string()))
    }

    /// A session pointed at the configured default address.
    pub fn session_at_default(&self) -> Session {
        self.session_at(&self.runtime.config.default_address)
    }

    /// Runs `body` with `session` as the ambient protocol context, holding
    /// the command gate throughout.
    pub fn with_session<R>(
        &self,
        session: Option<SessionId>,
        body: impl FnOnce(&mut GateContext<'_>) -> Result<R, VerseError>,
    ) -> Result<R, VerseError> {
        self.runtime.gate.with_session(session, body)
    }

    pub fn ping(&self, address: &str, message: &str) -> Result<(), VerseError> {
        if message.len() > MAX_PING_MESSAGE_LEN {
            return Err(VerseError::MessageTooLong {
                what: "ping message",
                max: MAX_PING_MESSAGE_LEN,
                actual: message.len(),
            });
        }
        self.with_session(None, |ctx| {
            ctx.send(Command::Ping {
                address: address.to_string(),
                message: message.to_string(),
            })
        })
    }

    /// Generates a new host identity through the transport.
    pub fn create_host_id(&self) -> Result<HostId, VerseError> {
        self.runtime
            .gate
            .with_gate(|ctx| Ok(ctx.sender().create_host_id()))
    }

    pub fn set_host_id(&self, host_id: &HostId) -> Result<(), VerseError> {
        self.runtime.gate.with_gate(|ctx| {
            ctx.sender().set_host_id(host_id);
            Ok(())
        })
    }

    /// Accepts a peer's connection request. `avatar` must be a live object
    /// node with an id; it becomes bound to the new session.
    pub fn accept_connection(
        &self,
        avatar: &NodeHandle,
        address: &str,
        host_id: &HostId,
    ) -> Result<Session, VerseError> {
        if avatar.kind() != NodeKind::Object {
            return Err(VerseError::WrongNodeKind {
                operation: "connect_accept",
                expected: NodeKind::Object,
                actual: avatar.kind(),
            });
        }
        avatar.ensure_not_destroyed("connect_accept")?;
        let avatar_id = avatar.id().ok_or_else(|| VerseError::NotBound {
            entity: avatar.to_string(),
            reason: "an avatar needs an id before a connection is accepted",
        })?;
        if let Some(bound) = avatar.session() {
            return Err(VerseError::session(format!(
                "{} is already the avatar of {}",
                avatar, bound
            )));
        }

        let session = Session::new(self.runtime.clone(), Some(address.to_string()));
        let weak = session.downgrade();
        let record = session.record();
        let id = self.with_session(None, |ctx| {
            let id = ctx.sender().accept(avatar_id, address, host_id)?;
            ctx.sessions().register(id, weak)?;
            record.accept_incoming(id, avatar_id, host_id.clone())?;
            Ok(id)
        })?;
        avatar.bind_session(id)?;

        info!(
            "Accepted connection from '{}' as {}, avatar {}",
            address, id, avatar_id
        );
        Ok(session)
    }

    /// Sends a termination notice to `address` from the global context.
    pub fn terminate_connection(&self, address: &str, message: &str) -> Result<(), VerseError> {
        self.with_session(None, |ctx| {
            ctx.send(Command::ConnectTerminate {
                address: address.to_string(),
                message: message.to_string(),
            })
        })
    }

    /// Registers an alive node under an id this runtime chose itself.
    pub fn register_local_node(&self, kind: NodeKind, id: NodeId) -> Result<NodeHandle, VerseError> {
        node_manager::register_local(&self.runtime.gate, kind, id)
    }

    /// Destroys, unregisters and tears down a node registered with
    /// `register_local_node`. Returns false if it was not registered.
    pub fn retire_local_node(&self, node: &NodeHandle) -> Result<bool, VerseError> {
        node_manager::retire_local(&self.runtime.gate, node)
    }

    pub fn lookup_node(&self, id: NodeId) -> Result<Option<NodeHandle>, VerseError> {
        self.runtime
            .gate
            .with_gate(|ctx| Ok(ctx.nodes().lookup(&id).cloned()))
    }

    pub fn lookup_session(&self, id: SessionId) -> Result<Option<Session>, VerseError> {
        let inner = self
            .runtime
            .gate
            .with_gate(|ctx| Ok(ctx.sessions().lookup(&id).and_then(Weak::upgrade)))?;
        Ok(inner.map(Session::from_inner))
    }

    /// Every registered session, ascending by id.
    pub fn connected_sessions(&self) -> Result<Vec<Session>, VerseError> {
        let sessions: Vec<Arc<SessionInner>> = self.runtime.gate.with_gate(|ctx| {
            let sessions = ctx.sessions();
            Ok(sessions
                .ids()
                .iter()
                .filter_map(|id| sessions.lookup(id).and_then(Weak::upgrade))
                .collect())
        })?;
        Ok(sessions.into_iter().map(Session::from_inner).collect())
    }

    pub fn node_count(&self) -> Result<usize, VerseError> {
        self.runtime.gate.with_gate(|ctx| Ok(ctx.nodes().len()))
    }

    pub fn session_count(&self) -> Result<usize, VerseError> {
        self.runtime.gate.with_gate(|ctx| Ok(ctx.sessions().len()))
    }

    /// Adds an observer; adding the same one again returns its existing key.
    pub fn add_observer(&self, observer: Arc<dyn Observer>) -> ObserverKey {
        self.runtime.observers().add(observer)
    }

    pub fn remove_observer(&self, key: &ObserverKey) -> Option<Arc<dyn Observer>> {
        self.runtime.observers().remove(key)
    }

    pub fn observer_count(&self) -> usize {
        self.runtime.observers().len()
    }

    /// Installs `observer` as this runtime's host, the one observer that
    /// answers connection requests. Returns `None` if a host is already
    /// installed.
    pub fn claim_host(&self, observer: Arc<dyn Observer>) -> Option<ObserverKey> {
        let mut host = self.runtime.host();
        if host.is_some() {
            return None;
        }
        let key = self.add_observer(observer);
        *host = Some(key);
        Some(key)
    }

    /// Removes the host installed under `key`. Returns false if it is not
    /// the current host.
    pub fn release_host(&self, key: &ObserverKey) -> bool {
        let mut host = self.runtime.host();
        if host.as_ref() != Some(key) {
            return false;
        }
        *host = None;
        let observer = self.remove_observer(key);
        drop(host);
        drop(observer);
        true
    }

    pub fn has_host(&self) -> bool {
        self.runtime.host().is_some()
    }

    /// Runs the finalization sweep outside of `update`.
    pub fn finalize_destroyed(&self) -> Result<usize, VerseError> {
        node_manager::finalize_destroyed(&self.runtime.gate)
    }
}
