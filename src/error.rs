//! Error taxonomy for the landmark graph and the Jacobian engine.
//!
//! All variants are local and synchronous. A call that returns one of these
//! leaves the pools and any Jacobian cache exactly as they were.

use thiserror::Error;

use crate::atlas::RecordKind;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GraphError {
    /// The arena for `kind` is full. The caller must prune before retrying.
    #[error("{kind} pool exhausted (capacity {capacity})")]
    PoolExhausted { kind: RecordKind, capacity: usize },

    /// A handle was used after its slot was released.
    #[error("stale {kind} handle")]
    StaleReference { kind: RecordKind },

    /// Inverse depth must be finite, strictly positive, and large enough that
    /// `1/ρ` stays finite.
    #[error("degenerate inverse depth {inverse_depth}")]
    DegenerateDepth { inverse_depth: f64 },

    /// The normalized ray `(x, y)` has a NaN or infinite component.
    #[error("non-finite landmark ray ({x}, {y})")]
    NonFiniteRay { x: f64, y: f64 },

    /// A landmark was evaluated against an anchor other than its own.
    #[error("landmark evaluated against a foreign anchor")]
    ForeignAnchor,

    /// The anchor is still referenced by landmarks and cannot be released.
    #[error("anchor still referenced by {references} landmark(s)")]
    AnchorInUse { references: usize },
}
