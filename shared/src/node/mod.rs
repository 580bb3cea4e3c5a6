mod handle;
mod payload;
mod tag_group;

pub use handle::{NodeHandle, NodeLifecycle};
pub use payload::{
    AudioBuffer, AudioPayload, BitmapPayload, Curve, CurvePayload, GeometryPayload,
    MaterialPayload, NodePayload, ObjectLink, ObjectPayload, TextPayload, Transform,
};
pub use tag_group::{TagGroup, TagGroupId};
