/// In-memory transport for tests.
/// Commands are recorded instead of encoded, and events are queued by the
/// test (scripted) or produced by an auto-acknowledging peer.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use verse_client::{
    Command, CommandSender, ConnectRequest, EventReceiver, HostId, NodeCommand, NodeId, NodeOwner,
    SessionId, Transport, TransportError, VerseEvent,
};
use verse_shared::HOST_ID_SIZE;

/// Host id the simulated peer reports when accepting a connection.
pub fn peer_host_id() -> HostId {
    HostId::from_bytes(&[0x5a; HOST_ID_SIZE]).unwrap()
}

#[derive(Default)]
struct Network {
    auto_acknowledge: bool,
    refuse_connections: bool,
    fail_sends: bool,
    selected: Option<SessionId>,
    selections: usize,
    next_session: u32,
    next_node: u32,
    next_host_id: u8,
    connections: HashMap<SessionId, String>,
    sent: Vec<(Option<SessionId>, Command)>,
    inbound: HashMap<Option<SessionId>, VecDeque<VerseEvent>>,
    polls: Vec<(Option<SessionId>, Duration)>,
    destroyed: Vec<SessionId>,
    host_id: Option<HostId>,
    port: Option<u16>,
}

impl Network {
    fn open_connection(&mut self, address: &str) -> SessionId {
        self.next_session += 1;
        let id = SessionId::new(self.next_session);
        self.connections.insert(id, address.to_string());
        id
    }

    fn assign_node(&mut self) -> NodeId {
        // Peer-assigned ids start high so they never meet host-assigned ones
        let id = NodeId::new(1000 + self.next_node);
        self.next_node += 1;
        id
    }

    fn push(&mut self, context: Option<SessionId>, event: VerseEvent) {
        self.inbound.entry(context).or_default().push_back(event);
    }

    // What a well-behaved peer answers on the selected session.
    fn acknowledge(&mut self, command: &Command) {
        let Some(session) = self.selected else {
            return;
        };
        let reply = match command {
            Command::NodeCreate {
                node: None,
                kind,
                owner: NodeOwner::Mine,
            } => VerseEvent::NodeCreate {
                node: self.assign_node(),
                kind: *kind,
                owner: NodeOwner::Mine,
            },
            Command::NodeDestroy { node } => VerseEvent::NodeDestroy { node: *node },
            Command::Node {
                node,
                command: NodeCommand::NameSet { name },
            } => VerseEvent::NodeNameSet {
                node: *node,
                name: name.clone(),
            },
            Command::Node {
                node,
                command: NodeCommand::TagGroupCreate { group, name },
            } => VerseEvent::TagGroupCreate {
                node: *node,
                group: *group,
                name: name.clone(),
            },
            Command::Node {
                node,
                command: NodeCommand::TagGroupDestroy { group },
            } => VerseEvent::TagGroupDestroy {
                node: *node,
                group: *group,
            },
            _ => return,
        };
        self.push(Some(session), reply);
    }
}

/// The runtime's side of the loopback. Hand it to `Verse::new`.
pub struct LocalTransport {
    network: Arc<Mutex<Network>>,
}

/// The test's side of the loopback: scripts events and inspects what the
/// runtime sent.
#[derive(Clone)]
pub struct LocalPeer {
    network: Arc<Mutex<Network>>,
}

impl LocalTransport {
    /// A loopback where the test scripts every event.
    pub fn scripted() -> (Self, LocalPeer) {
        Self::with_network(Network::default())
    }

    /// A loopback whose peer accepts connections and acknowledges node
    /// creation, destruction, renames and tag group changes on its own.
    pub fn auto_acknowledging() -> (Self, LocalPeer) {
        Self::with_network(Network {
            auto_acknowledge: true,
            ..Network::default()
        })
    }

    fn with_network(network: Network) -> (Self, LocalPeer) {
        let network = Arc::new(Mutex::new(network));
        (
            Self {
                network: network.clone(),
            },
            LocalPeer { network },
        )
    }
}

impl Transport for LocalTransport {
    fn open(self: Box<Self>) -> (Box<dyn CommandSender>, Box<dyn EventReceiver>) {
        (
            Box::new(LocalSender {
                network: self.network.clone(),
            }),
            Box::new(LocalReceiver {
                network: self.network,
            }),
        )
    }
}

struct LocalSender {
    network: Arc<Mutex<Network>>,
}

impl LocalSender {
    fn network(&self) -> MutexGuard<'_, Network> {
        self.network.lock().unwrap()
    }
}

impl CommandSender for LocalSender {
    fn select_session(&mut self, session: Option<SessionId>) {
        let mut network = self.network();
        network.selected = session;
        network.selections += 1;
    }

    fn connect(&mut self, request: &ConnectRequest) -> Result<SessionId, TransportError> {
        let mut network = self.network();
        if network.refuse_connections {
            return Err(TransportError::ConnectRefused {
                address: request.address.clone(),
                reason: "peer refused".to_string(),
            });
        }
        let id = network.open_connection(&request.address);
        if network.auto_acknowledge {
            let avatar = network.assign_node();
            network.push(
                Some(id),
                VerseEvent::ConnectAccept {
                    avatar,
                    address: request.address.clone(),
                    host_id: peer_host_id(),
                },
            );
        }
        Ok(id)
    }

    fn accept(
        &mut self,
        _avatar: NodeId,
        address: &str,
        _host_id: &HostId,
    ) -> Result<SessionId, TransportError> {
        Ok(self.network().open_connection(address))
    }

    fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        let mut network = self.network();
        if network.fail_sends {
            return Err(TransportError::SendFailed {
                command: command.name(),
                reason: "link down".to_string(),
            });
        }
        let selected = network.selected;
        network.sent.push((selected, command.clone()));
        if network.auto_acknowledge {
            network.acknowledge(command);
        }
        Ok(())
    }

    fn destroy_session(&mut self, session: SessionId) {
        let mut network = self.network();
        network.connections.remove(&session);
        network.destroyed.push(session);
    }

    fn create_host_id(&mut self) -> HostId {
        let mut network = self.network();
        network.next_host_id = network.next_host_id.wrapping_add(1).max(1);
        HostId::from_bytes(&[network.next_host_id; HOST_ID_SIZE]).unwrap()
    }

    fn set_host_id(&mut self, host_id: &HostId) {
        self.network().host_id = Some(host_id.clone());
    }

    fn set_port(&mut self, port: u16) {
        self.network().port = Some(port);
    }
}

struct LocalReceiver {
    network: Arc<Mutex<Network>>,
}

impl EventReceiver for LocalReceiver {
    fn poll(
        &mut self,
        context: Option<SessionId>,
        timeout: Duration,
    ) -> Result<Vec<VerseEvent>, TransportError> {
        let mut network = self.network.lock().unwrap();
        network.polls.push((context, timeout));
        Ok(network
            .inbound
            .get_mut(&context)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default())
    }
}

impl LocalPeer {
    fn network(&self) -> MutexGuard<'_, Network> {
        self.network.lock().unwrap()
    }

    /// Queues `event` for delivery in `context`.
    pub fn push_event(&self, context: Option<SessionId>, event: VerseEvent) {
        self.network().push(context, event);
    }

    /// Every command sent so far, with the session selected at the time.
    pub fn sent(&self) -> Vec<(Option<SessionId>, Command)> {
        self.network().sent.clone()
    }

    pub fn sent_on(&self, session: Option<SessionId>) -> Vec<Command> {
        self.network()
            .sent
            .iter()
            .filter(|(selected, _)| *selected == session)
            .map(|(_, command)| command.clone())
            .collect()
    }

    pub fn take_sent(&self) -> Vec<(Option<SessionId>, Command)> {
        std::mem::take(&mut self.network().sent)
    }

    /// Every poll the pump made, in order.
    pub fn polls(&self) -> Vec<(Option<SessionId>, Duration)> {
        self.network().polls.clone()
    }

    pub fn clear_polls(&self) {
        self.network().polls.clear();
    }

    pub fn selected(&self) -> Option<SessionId> {
        self.network().selected
    }

    pub fn selections(&self) -> usize {
        self.network().selections
    }

    pub fn destroyed_sessions(&self) -> Vec<SessionId> {
        self.network().destroyed.clone()
    }

    pub fn open_connections(&self) -> usize {
        self.network().connections.len()
    }

    pub fn host_id(&self) -> Option<HostId> {
        self.network().host_id.clone()
    }

    pub fn port(&self) -> Option<u16> {
        self.network().port
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.network().refuse_connections = refuse;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.network().fail_sends = fail;
    }

    /// Takes the auto-acknowledging peer off the line; events are only
    /// what the test pushes from here on.
    pub fn stop_acknowledging(&self) {
        self.network().auto_acknowledge = false;
    }
}
