use crate::{
    host_id::HostId,
    node::TagGroupId,
    node_kind::NodeKind,
    types::{NodeId, NodeOwner},
};

/// Everything a transport needs to open a connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectRequest {
    pub name: String,
    pub pass: String,
    pub address: String,
    /// Host the caller expects to reach, if it cares.
    pub expected_host_id: Option<HostId>,
}

/// An outbound protocol command. Commands are only ever handed to the
/// transport from inside the command gate.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Ping {
        address: String,
        message: String,
    },
    ConnectTerminate {
        address: String,
        message: String,
    },
    NodeIndexSubscribe {
        mask: u32,
    },
    /// Clients ask for a node with `node: None`; hosts announce an existing
    /// node with its id.
    NodeCreate {
        node: Option<NodeId>,
        kind: NodeKind,
        owner: NodeOwner,
    },
    NodeDestroy {
        node: NodeId,
    },
    Node {
        node: NodeId,
        command: NodeCommand,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping { .. } => "ping",
            Command::ConnectTerminate { .. } => "connect_terminate",
            Command::NodeIndexSubscribe { .. } => "node_index_subscribe",
            Command::NodeCreate { .. } => "node_create",
            Command::NodeDestroy { .. } => "node_destroy",
            Command::Node { command, .. } => command.name(),
        }
    }
}

/// Commands addressed to one node. The kind-specific ones are carried
/// through to the transport as they are.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeCommand {
    NameSet {
        name: String,
    },
    Subscribe,
    Unsubscribe,
    TagGroupCreate {
        group: TagGroupId,
        name: String,
    },
    TagGroupDestroy {
        group: TagGroupId,
    },
    ObjectLightSet {
        red: f64,
        green: f64,
        blue: f64,
    },
    ObjectHide {
        hidden: bool,
    },
    ObjectLinkSet {
        link_id: u16,
        link: NodeId,
        label: String,
        target_id: u32,
    },
    ObjectLinkDestroy {
        link_id: u16,
    },
    GeometryLayerCreate {
        layer_id: u16,
        name: String,
    },
    GeometryLayerDestroy {
        layer_id: u16,
    },
    MaterialFragmentDestroy {
        fragment_id: u16,
    },
    BitmapDimensionsSet {
        width: u16,
        height: u16,
        depth: u16,
    },
    TextLanguageSet {
        language: String,
    },
    TextBufferCreate {
        buffer_id: u16,
        name: String,
    },
    CurveCreate {
        curve_id: u16,
        name: String,
        dimensions: u8,
    },
    AudioBufferCreate {
        buffer_id: u16,
        name: String,
        frequency: f64,
    },
    AudioStreamCreate {
        stream_id: u16,
        name: String,
    },
}

impl NodeCommand {
    /// The kind of node this command applies to, or `None` when any node
    /// accepts it.
    pub fn required_kind(&self) -> Option<NodeKind> {
        match self {
            NodeCommand::NameSet { .. }
            | NodeCommand::Subscribe
            | NodeCommand::Unsubscribe
            | NodeCommand::TagGroupCreate { .. }
            | NodeCommand::TagGroupDestroy { .. } => None,
            NodeCommand::ObjectLightSet { .. }
            | NodeCommand::ObjectHide { .. }
            | NodeCommand::ObjectLinkSet { .. }
            | NodeCommand::ObjectLinkDestroy { .. } => Some(NodeKind::Object),
            NodeCommand::GeometryLayerCreate { .. } | NodeCommand::GeometryLayerDestroy { .. } => {
                Some(NodeKind::Geometry)
            }
            NodeCommand::MaterialFragmentDestroy { .. } => Some(NodeKind::Material),
            NodeCommand::BitmapDimensionsSet { .. } => Some(NodeKind::Bitmap),
            NodeCommand::TextLanguageSet { .. } | NodeCommand::TextBufferCreate { .. } => {
                Some(NodeKind::Text)
            }
            NodeCommand::CurveCreate { .. } => Some(NodeKind::Curve),
            NodeCommand::AudioBufferCreate { .. } | NodeCommand::AudioStreamCreate { .. } => {
                Some(NodeKind::Audio)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeCommand::NameSet { .. } => "node_name_set",
            NodeCommand::Subscribe => "node_subscribe",
            NodeCommand::Unsubscribe => "node_unsubscribe",
            NodeCommand::TagGroupCreate { .. } => "tag_group_create",
            NodeCommand::TagGroupDestroy { .. } => "tag_group_destroy",
            NodeCommand::ObjectLightSet { .. } => "object_light_set",
            NodeCommand::ObjectHide { .. } => "object_hide",
            NodeCommand::ObjectLinkSet { .. } => "object_link_set",
            NodeCommand::ObjectLinkDestroy { .. } => "object_link_destroy",
            NodeCommand::GeometryLayerCreate { .. } => "geometry_layer_create",
            NodeCommand::GeometryLayerDestroy { .. } => "geometry_layer_destroy",
            NodeCommand::MaterialFragmentDestroy { .. } => "material_fragment_destroy",
            NodeCommand::BitmapDimensionsSet { .. } => "bitmap_dimensions_set",
            NodeCommand::TextLanguageSet { .. } => "text_language_set",
            NodeCommand::TextBufferCreate { .. } => "text_buffer_create",
            NodeCommand::CurveCreate { .. } => "curve_create",
            NodeCommand::AudioBufferCreate { .. } => "audio_buffer_create",
            NodeCommand::AudioStreamCreate { .. } => "audio_stream_create",
        }
    }
}
