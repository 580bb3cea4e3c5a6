use std::{
    collections::{BTreeMap, HashMap},
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, info, warn};

use verse_client::{
    Capabilities, Capability, HostId, NodeHandle, NodeId, NodeKind, Observer, ObserverKey,
    SessionId, Verse,
};

use crate::{
    connection::Connection, error::ServerError, host_id_store, node_id_generator::NodeIdGenerator,
    server_config::ServerConfig,
};

struct ServerState {
    host_key: Option<ObserverKey>,
    connections: HashMap<String, Connection>,
    nodes: BTreeMap<NodeId, NodeHandle>,
    ids: NodeIdGenerator,
}

/// Hosts Verse connections on top of a runtime.
///
/// While running, the server answers connection requests: each accepted
/// peer gets an avatar object node, and node index subscriptions are served
/// from the nodes the server holds.
pub struct Server {
    verse: Verse,
    config: ServerConfig,
    host_id: HostId,
    state: Mutex<ServerState>,
}

impl Server {
    /// Loads or creates the host id and hands it to the runtime.
    pub fn new(config: ServerConfig, verse: &Verse) -> Result<Arc<Self>, ServerError> {
        let host_id = host_id_store::load_or_create(&config.host_id_path, verse)?;
        verse.set_host_id(&host_id)?;

        Ok(Arc::new(Self {
            verse: verse.clone(),
            config,
            host_id,
            state: Mutex::new(ServerState {
                host_key: None,
                connections: HashMap::new(),
                nodes: BTreeMap::new(),
                ids: NodeIdGenerator::new(),
            }),
        }))
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn host_id(&self) -> &HostId {
        &self.host_id
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn verse(&self) -> &Verse {
        &self.verse
    }

    /// Starts answering connection requests. A runtime runs at most one
    /// server at a time.
    pub fn run(self: &Arc<Self>) -> Result<(), ServerError> {
        let mut state = self.state();
        if state.host_key.is_some() {
            return Err(ServerError::AlreadyRunning);
        }
        let observer: Arc<dyn Observer> = self.clone();
        let key = self
            .verse
            .claim_host(observer)
            .ok_or(ServerError::AlreadyRunning)?;
        state.host_key = Some(key);
        info!("Server running, holding {} nodes", state.nodes.len());
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.state().host_key.is_some()
    }

    /// Terminates every connection with `reason`, releases their avatars and
    /// stops answering connection requests.
    pub fn shutdown(&self, reason: &str) -> Result<(), ServerError> {
        let (key, connections) = {
            let mut state = self.state();
            let key = state.host_key.take().ok_or(ServerError::NotRunning)?;
            (key, mem::take(&mut state.connections))
        };

        for connection in connections.values() {
            if let Err(error) = connection.session().terminate(reason) {
                warn!(
                    "Couldn't terminate connection with '{}': {}",
                    connection.address(),
                    error
                );
            }
        }
        let avatars: Vec<NodeId> = connections
            .values()
            .filter_map(|connection| connection.avatar().id())
            .collect();
        drop(connections);

        for avatar in avatars {
            if let Err(error) = self.remove_node(avatar) {
                warn!("Couldn't release avatar {}: {}", avatar, error);
            }
        }

        self.verse.release_host(&key);
        info!("Server shut down: {}", reason);
        Ok(())
    }

    /// Registers a server-held node under a freshly generated id.
    pub fn add_node(&self, kind: NodeKind) -> Result<NodeHandle, ServerError> {
        let id = self
            .state()
            .ids
            .generate()
            .ok_or(ServerError::NodeIdsExhausted)?;

        match self.verse.register_local_node(kind, id) {
            Ok(node) => {
                self.state().nodes.insert(id, node.clone());
                debug!("Server holds {}", node);
                Ok(node)
            }
            Err(error) => {
                self.state().ids.recycle(id);
                Err(error.into())
            }
        }
    }

    /// Destroys a server-held node and frees its id.
    pub fn remove_node(&self, id: NodeId) -> Result<Option<NodeHandle>, ServerError> {
        let Some(node) = self.state().nodes.remove(&id) else {
            return Ok(None);
        };
        self.verse.retire_local_node(&node)?;
        self.state().ids.recycle(id);
        debug!("Server released {}", id);
        Ok(Some(node))
    }

    pub fn node(&self, id: NodeId) -> Option<NodeHandle> {
        self.state().nodes.get(&id).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.state().nodes.len()
    }

    pub fn connection(&self, address: &str) -> Option<Connection> {
        self.state().connections.get(address).cloned()
    }

    pub fn connection_count(&self) -> usize {
        self.state().connections.len()
    }

    fn accept(&self, user: &str, address: &str) -> Result<(), ServerError> {
        if self.state().connections.contains_key(address) {
            warn!("'{}' is already connected, ignoring its connect", address);
            return Ok(());
        }

        let avatar = self.add_node(NodeKind::Object)?;
        let session = match self.verse.accept_connection(&avatar, address, &self.host_id) {
            Ok(session) => session,
            Err(error) => {
                if let Some(id) = avatar.id() {
                    self.remove_node(id)?;
                }
                return Err(error.into());
            }
        };

        info!("'{}' connected from '{}', avatar {}", user, address, avatar);
        let connection = Connection::new(address, user, session, avatar);
        let replaced = self
            .state()
            .connections
            .insert(address.to_string(), connection);
        drop(replaced);
        Ok(())
    }

    fn connection_for(state: &mut ServerState, session: SessionId) -> Option<&mut Connection> {
        state
            .connections
            .values_mut()
            .find(|connection| connection.session().id() == Some(session))
    }
}

impl Observer for Server {
    fn capabilities(&self) -> Capabilities {
        Capabilities::none()
            .with(Capability::Ping)
            .with(Capability::Connect)
            .with(Capability::ConnectTerminate)
            .with(Capability::NodeIndexSubscribe)
    }

    fn on_ping(&self, address: &str, message: &str) {
        info!("Ping from '{}': {}", address, message);
    }

    fn on_connect(&self, name: &str, _pass: &str, address: &str, expected_host_id: Option<&HostId>) {
        if let Some(expected) = expected_host_id {
            if !expected.admits(&self.host_id) {
                warn!(
                    "Ignoring connect from '{}': it expects a different host",
                    address
                );
                return;
            }
        }
        if let Err(error) = self.accept(name, address) {
            warn!("Couldn't accept connection from '{}': {}", address, error);
        }
    }

    fn on_connect_terminate(&self, session: Option<SessionId>, address: &str, message: &str) {
        let removed = {
            let mut state = self.state();
            let address = match session {
                Some(session) => Server::connection_for(&mut state, session)
                    .map(|connection| connection.address().to_string()),
                None => Some(address.to_string()),
            };
            address.and_then(|address| state.connections.remove(&address))
        };
        let Some(connection) = removed else {
            debug!("connect_terminate from '{}' matches no connection", address);
            return;
        };

        info!(
            "'{}' disconnected from '{}': {}",
            connection.user(),
            connection.address(),
            message
        );
        if let Some(avatar) = connection.avatar().id() {
            if let Err(error) = self.remove_node(avatar) {
                warn!("Couldn't release avatar {}: {}", avatar, error);
            }
        }
    }

    fn on_node_index_subscribe(&self, session: Option<SessionId>, kinds: &[NodeKind]) {
        let Some(session_id) = session else {
            debug!("Ignoring node_index_subscribe outside any session");
            return;
        };

        let (session, announce) = {
            let mut state = self.state();
            let Some(connection) = Server::connection_for(&mut state, session_id) else {
                warn!("node_index_subscribe on {} matches no connection", session_id);
                return;
            };
            if kinds.is_empty() {
                connection.clear_subscriptions();
                info!("{} unsubscribed from the node index", session_id);
                return;
            }
            let added = connection.subscribe(kinds);
            let session = connection.session().clone();
            let announce: Vec<NodeHandle> = state
                .nodes
                .values()
                .filter(|node| added.contains(&node.kind()))
                .cloned()
                .collect();
            (session, announce)
        };

        debug!(
            "Announcing {} nodes to {} for {:?}",
            announce.len(),
            session_id,
            kinds
        );
        for node in &announce {
            if let Err(error) = session.announce_node(node) {
                warn!("Couldn't announce {} to {}: {}", node, session_id, error);
                break;
            }
        }
    }
}
