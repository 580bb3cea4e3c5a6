use std::fmt;

use crate::{
    host_id::HostId,
    node::TagGroupId,
    node_kind::NodeKind,
    types::{NodeId, NodeOwner},
};

/// An inbound protocol event, as decoded by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerseEvent {
    Ping {
        address: String,
        message: String,
    },
    /// A peer asks to connect to this host
    Connect {
        name: String,
        pass: String,
        address: String,
        expected_host_id: Option<HostId>,
    },
    ConnectAccept {
        avatar: NodeId,
        address: String,
        host_id: HostId,
    },
    ConnectTerminate {
        address: String,
        message: String,
    },
    NodeIndexSubscribe {
        mask: u32,
    },
    NodeCreate {
        node: NodeId,
        kind: NodeKind,
        owner: NodeOwner,
    },
    NodeDestroy {
        node: NodeId,
    },
    NodeNameSet {
        node: NodeId,
        name: String,
    },
    TagGroupCreate {
        node: NodeId,
        group: TagGroupId,
        name: String,
    },
    TagGroupDestroy {
        node: NodeId,
        group: TagGroupId,
    },
}

impl VerseEvent {
    /// The capability an observer needs to be told about this event.
    pub fn capability(&self) -> Capability {
        match self {
            VerseEvent::Ping { .. } => Capability::Ping,
            VerseEvent::Connect { .. } => Capability::Connect,
            VerseEvent::ConnectAccept { .. } => Capability::ConnectAccept,
            VerseEvent::ConnectTerminate { .. } => Capability::ConnectTerminate,
            VerseEvent::NodeIndexSubscribe { .. } => Capability::NodeIndexSubscribe,
            VerseEvent::NodeCreate { .. } => Capability::NodeCreate,
            VerseEvent::NodeDestroy { .. } => Capability::NodeDestroy,
            VerseEvent::NodeNameSet { .. } => Capability::NodeNameSet,
            VerseEvent::TagGroupCreate { .. } => Capability::TagGroupCreate,
            VerseEvent::TagGroupDestroy { .. } => Capability::TagGroupDestroy,
        }
    }
}

/// One kind of event an observer can subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Ping,
    Connect,
    ConnectAccept,
    ConnectTerminate,
    NodeIndexSubscribe,
    NodeCreate,
    NodeDestroy,
    NodeNameSet,
    TagGroupCreate,
    TagGroupDestroy,
}

impl Capability {
    pub const ALL: [Capability; 10] = [
        Capability::Ping,
        Capability::Connect,
        Capability::ConnectAccept,
        Capability::ConnectTerminate,
        Capability::NodeIndexSubscribe,
        Capability::NodeCreate,
        Capability::NodeDestroy,
        Capability::NodeNameSet,
        Capability::TagGroupCreate,
        Capability::TagGroupDestroy,
    ];

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// The set of events an observer declares it handles.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u16);

impl Capabilities {
    pub const fn none() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Capability::ALL.iter().copied().collect()
    }

    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .iter()
            .copied()
            .filter(move |capability| self.contains(*capability))
    }
}

impl From<Capability> for Capabilities {
    fn from(capability: Capability) -> Self {
        Capabilities::none().with(capability)
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Capabilities::none(), |capabilities, capability| {
                capabilities.with(capability)
            })
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
