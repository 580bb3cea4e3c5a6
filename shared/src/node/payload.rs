use std::collections::BTreeMap;

use log::debug;

use crate::{command::NodeCommand, node_kind::NodeKind, types::NodeId};

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectLink {
    pub link: NodeId,
    pub label: String,
    pub target_id: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: [f64; 3],
    pub rotation: [f64; 4],
    pub scale: [f64; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectPayload {
    pub links: BTreeMap<u16, ObjectLink>,
    pub transform: Transform,
    pub light: [f64; 3],
    pub hidden: bool,
    pub method_groups: BTreeMap<u16, String>,
    pub animations: BTreeMap<u16, String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryPayload {
    pub layers: BTreeMap<u16, String>,
    pub bones: BTreeMap<u16, String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialPayload {
    pub fragments: BTreeMap<u16, String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BitmapPayload {
    pub dimensions: (u16, u16, u16),
    pub layers: BTreeMap<u16, String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextPayload {
    pub language: String,
    pub buffers: BTreeMap<u16, String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Curve {
    pub name: String,
    pub dimensions: u8,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurvePayload {
    pub curves: BTreeMap<u16, Curve>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    pub name: String,
    pub frequency: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioPayload {
    pub buffers: BTreeMap<u16, AudioBuffer>,
    pub streams: BTreeMap<u16, String>,
}

/// Kind-specific state of a node.
///
/// This is the single place that branches on node kind: setup, command
/// application and teardown all match here.
#[derive(Clone, Debug, PartialEq)]
pub enum NodePayload {
    Object(ObjectPayload),
    Geometry(GeometryPayload),
    Material(MaterialPayload),
    Bitmap(BitmapPayload),
    Text(TextPayload),
    Curve(CurvePayload),
    Audio(AudioPayload),
    System,
}

impl NodePayload {
    pub fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Object => NodePayload::Object(ObjectPayload::default()),
            NodeKind::Geometry => NodePayload::Geometry(GeometryPayload::default()),
            NodeKind::Material => NodePayload::Material(MaterialPayload::default()),
            NodeKind::Bitmap => NodePayload::Bitmap(BitmapPayload::default()),
            NodeKind::Text => NodePayload::Text(TextPayload::default()),
            NodeKind::Curve => NodePayload::Curve(CurvePayload::default()),
            NodeKind::Audio => NodePayload::Audio(AudioPayload::default()),
            NodeKind::System => NodePayload::System,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodePayload::Object(_) => NodeKind::Object,
            NodePayload::Geometry(_) => NodeKind::Geometry,
            NodePayload::Material(_) => NodeKind::Material,
            NodePayload::Bitmap(_) => NodeKind::Bitmap,
            NodePayload::Text(_) => NodeKind::Text,
            NodePayload::Curve(_) => NodeKind::Curve,
            NodePayload::Audio(_) => NodeKind::Audio,
            NodePayload::System => NodeKind::System,
        }
    }

    /// Mirrors a command the application issued. Commands for other kinds,
    /// and generic node commands, leave the payload untouched.
    pub fn apply(&mut self, command: &NodeCommand) {
        match (self, command) {
            (NodePayload::Object(object), NodeCommand::ObjectLightSet { red, green, blue }) => {
                object.light = [*red, *green, *blue];
            }
            (NodePayload::Object(object), NodeCommand::ObjectHide { hidden }) => {
                object.hidden = *hidden;
            }
            (
                NodePayload::Object(object),
                NodeCommand::ObjectLinkSet {
                    link_id,
                    link,
                    label,
                    target_id,
                },
            ) => {
                object.links.insert(
                    *link_id,
                    ObjectLink {
                        link: *link,
                        label: label.clone(),
                        target_id: *target_id,
                    },
                );
            }
            (NodePayload::Object(object), NodeCommand::ObjectLinkDestroy { link_id }) => {
                object.links.remove(link_id);
            }
            (NodePayload::Geometry(geometry), NodeCommand::GeometryLayerCreate { layer_id, name }) => {
                geometry.layers.insert(*layer_id, name.clone());
            }
            (NodePayload::Geometry(geometry), NodeCommand::GeometryLayerDestroy { layer_id }) => {
                geometry.layers.remove(layer_id);
            }
            (NodePayload::Material(material), NodeCommand::MaterialFragmentDestroy { fragment_id }) => {
                material.fragments.remove(fragment_id);
            }
            (
                NodePayload::Bitmap(bitmap),
                NodeCommand::BitmapDimensionsSet {
                    width,
                    height,
                    depth,
                },
            ) => {
                bitmap.dimensions = (*width, *height, *depth);
            }
            (NodePayload::Text(text), NodeCommand::TextLanguageSet { language }) => {
                text.language = language.clone();
            }
            (NodePayload::Text(text), NodeCommand::TextBufferCreate { buffer_id, name }) => {
                text.buffers.insert(*buffer_id, name.clone());
            }
            (
                NodePayload::Curve(curve),
                NodeCommand::CurveCreate {
                    curve_id,
                    name,
                    dimensions,
                },
            ) => {
                curve.curves.insert(
                    *curve_id,
                    Curve {
                        name: name.clone(),
                        dimensions: *dimensions,
                    },
                );
            }
            (
                NodePayload::Audio(audio),
                NodeCommand::AudioBufferCreate {
                    buffer_id,
                    name,
                    frequency,
                },
            ) => {
                audio.buffers.insert(
                    *buffer_id,
                    AudioBuffer {
                        name: name.clone(),
                        frequency: *frequency,
                    },
                );
            }
            (NodePayload::Audio(audio), NodeCommand::AudioStreamCreate { stream_id, name }) => {
                audio.streams.insert(*stream_id, name.clone());
            }
            _ => {}
        }
    }

    /// Releases kind-specific resources once the node is finalized.
    pub fn teardown(self) {
        let released = match &self {
            NodePayload::Object(object) => {
                object.links.len() + object.method_groups.len() + object.animations.len()
            }
            NodePayload::Geometry(geometry) => geometry.layers.len() + geometry.bones.len(),
            NodePayload::Material(material) => material.fragments.len(),
            NodePayload::Bitmap(bitmap) => bitmap.layers.len(),
            NodePayload::Text(text) => text.buffers.len(),
            NodePayload::Curve(curve) => curve.curves.len(),
            NodePayload::Audio(audio) => audio.buffers.len() + audio.streams.len(),
            NodePayload::System => 0,
        };
        debug!(
            "Tore down {} payload, releasing {} entries",
            self.kind(),
            released
        );
    }
}
