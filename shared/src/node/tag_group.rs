pub type TagGroupId = u16;

/// A named group of tags attached to a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagGroup {
    id: TagGroupId,
    name: String,
}

impl TagGroup {
    pub fn new(id: TagGroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> TagGroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
