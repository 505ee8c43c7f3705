//! Handle types for the landmark graph.

use slotmap::new_key_type;

new_key_type! {
    /// Generational handle to an [`Anchor`](super::Anchor).
    ///
    /// Releasing the anchor bumps the slot generation, so an old handle can
    /// never alias a record created later in the same slot.
    pub struct AnchorId;

    /// Generational handle to a [`Landmark`](super::Landmark).
    pub struct LandmarkId;
}

/// Which arena a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Anchor,
    Landmark,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Anchor => write!(f, "anchor"),
            RecordKind::Landmark => write!(f, "landmark"),
        }
    }
}
