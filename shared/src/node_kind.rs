use std::fmt;

use crate::error::VerseError;

/// The closed set of node types the protocol knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Object,
    Geometry,
    Material,
    Bitmap,
    Text,
    Curve,
    Audio,
    System,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Object,
        NodeKind::Geometry,
        NodeKind::Material,
        NodeKind::Bitmap,
        NodeKind::Text,
        NodeKind::Curve,
        NodeKind::Audio,
        NodeKind::System,
    ];

    /// Kinds a node index subscription can ask for.
    pub const INDEXABLE: [NodeKind; 7] = [
        NodeKind::Object,
        NodeKind::Geometry,
        NodeKind::Material,
        NodeKind::Bitmap,
        NodeKind::Text,
        NodeKind::Curve,
        NodeKind::Audio,
    ];

    pub fn type_number(self) -> u8 {
        match self {
            NodeKind::Object => 0,
            NodeKind::Geometry => 1,
            NodeKind::Material => 2,
            NodeKind::Bitmap => 3,
            NodeKind::Text => 4,
            NodeKind::Curve => 5,
            NodeKind::Audio => 6,
            NodeKind::System => 7,
        }
    }

    pub fn from_type_number(type_number: u8) -> Result<Self, VerseError> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.type_number() == type_number)
            .ok_or(VerseError::UnknownNodeKind { type_number })
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Object => "object",
            NodeKind::Geometry => "geometry",
            NodeKind::Material => "material",
            NodeKind::Bitmap => "bitmap",
            NodeKind::Text => "text",
            NodeKind::Curve => "curve",
            NodeKind::Audio => "audio",
            NodeKind::System => "system",
        }
    }

    pub fn is_indexable(self) -> bool {
        self != NodeKind::System
    }

    /// Builds a node index subscription mask. System nodes are never indexed
    /// and are left out.
    pub fn index_mask(kinds: &[NodeKind]) -> u32 {
        kinds
            .iter()
            .filter(|kind| kind.is_indexable())
            .fold(0, |mask, kind| mask | (1 << kind.type_number()))
    }

    /// Expands a node index subscription mask, in type-number order. Unknown
    /// bits are ignored.
    pub fn kinds_from_index_mask(mask: u32) -> Vec<NodeKind> {
        NodeKind::INDEXABLE
            .iter()
            .copied()
            .filter(|kind| mask & (1 << kind.type_number()) != 0)
            .collect()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
