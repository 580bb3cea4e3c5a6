use std::sync::{Arc, Mutex};

use verse_client::{
    Capabilities, HostId, NodeHandle, NodeId, NodeKind, Observer, SessionId, TagGroup, TagGroupId,
};

/// What an observer was told. Nodes are recorded by id so the recording
/// never keeps a node alive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Observed {
    Ping {
        address: String,
        message: String,
    },
    Connect {
        name: String,
        address: String,
    },
    ConnectAccept {
        session: SessionId,
        avatar: NodeId,
    },
    ConnectTerminate {
        session: Option<SessionId>,
        message: String,
    },
    NodeIndexSubscribe {
        session: Option<SessionId>,
        kinds: Vec<NodeKind>,
    },
    NodeCreate {
        session: SessionId,
        node: Option<NodeId>,
        kind: NodeKind,
    },
    NodeDestroy {
        session: SessionId,
        node: Option<NodeId>,
    },
    NodeNameSet {
        node: Option<NodeId>,
        name: String,
    },
    TagGroupCreate {
        node: Option<NodeId>,
        group: TagGroupId,
        name: String,
    },
    TagGroupDestroy {
        node: Option<NodeId>,
        group: TagGroupId,
    },
}

/// Observer that records every hook call it declared a capability for.
pub struct RecordingObserver {
    capabilities: Capabilities,
    seen: Mutex<Vec<Observed>>,
}

impl RecordingObserver {
    pub fn new(capabilities: Capabilities) -> Arc<Self> {
        Arc::new(Self {
            capabilities,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn all() -> Arc<Self> {
        Self::new(Capabilities::all())
    }

    pub fn seen(&self) -> Vec<Observed> {
        self.seen.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<Observed> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }

    fn record(&self, observed: Observed) {
        self.seen.lock().unwrap().push(observed);
    }
}

impl Observer for RecordingObserver {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn on_ping(&self, address: &str, message: &str) {
        self.record(Observed::Ping {
            address: address.to_string(),
            message: message.to_string(),
        });
    }

    fn on_connect(&self, name: &str, _pass: &str, address: &str, _expected_host_id: Option<&HostId>) {
        self.record(Observed::Connect {
            name: name.to_string(),
            address: address.to_string(),
        });
    }

    fn on_connect_accept(&self, session: SessionId, avatar: NodeId, _address: &str, _host_id: &HostId) {
        self.record(Observed::ConnectAccept { session, avatar });
    }

    fn on_connect_terminate(&self, session: Option<SessionId>, _address: &str, message: &str) {
        self.record(Observed::ConnectTerminate {
            session,
            message: message.to_string(),
        });
    }

    fn on_node_index_subscribe(&self, session: Option<SessionId>, kinds: &[NodeKind]) {
        self.record(Observed::NodeIndexSubscribe {
            session,
            kinds: kinds.to_vec(),
        });
    }

    fn on_node_create(&self, session: SessionId, node: &NodeHandle) {
        self.record(Observed::NodeCreate {
            session,
            node: node.id(),
            kind: node.kind(),
        });
    }

    fn on_node_destroy(&self, session: SessionId, node: &NodeHandle) {
        self.record(Observed::NodeDestroy {
            session,
            node: node.id(),
        });
    }

    fn on_node_name_set(&self, node: &NodeHandle, name: &str) {
        self.record(Observed::NodeNameSet {
            node: node.id(),
            name: name.to_string(),
        });
    }

    fn on_tag_group_create(&self, node: &NodeHandle, tag_group: &TagGroup) {
        self.record(Observed::TagGroupCreate {
            node: node.id(),
            group: tag_group.id(),
            name: tag_group.name().to_string(),
        });
    }

    fn on_tag_group_destroy(&self, node: &NodeHandle, tag_group: &TagGroup) {
        self.record(Observed::TagGroupDestroy {
            node: node.id(),
            group: tag_group.id(),
        });
    }
}
