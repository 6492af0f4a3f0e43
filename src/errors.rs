//! Boolean pipeline errors

/// Everything that can stop a Boolean operation from producing a mesh.
///
/// Non-solid input is *not* an error: the pipeline still produces a best-effort
/// result and reports it through [`BooleanOutput::valid`](crate::boolean::BooleanOutput).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BooleanError {
    /// (UnknownOperation) The name does not match any Boolean type
    #[error("(UnknownOperation) '{0}' is not a Boolean operation (expected union, intersect, minus, xor or resolve)")]
    UnknownOperation(String),

    /// (InconsistentDuplicateFaces) Positive and negative copies of one triangle differ by more than one
    #[error(
        "(InconsistentDuplicateFaces) triangle {vertices:?} is kept {positive} times positively and {negative} times negatively"
    )]
    InconsistentDuplicateFaces {
        vertices: [usize; 3],
        positive: usize,
        negative: usize,
    },

    /// (FaceIndexOutOfRange) A face references a vertex that does not exist
    #[error("(FaceIndexOutOfRange) face {face} references vertex {index} but only {vertex_count} vertices exist")]
    FaceIndexOutOfRange {
        face: usize,
        index: usize,
        vertex_count: usize,
    },

    /// (NonFiniteCoordinate) A NaN or infinite coordinate cannot be converted exactly
    #[error("(NonFiniteCoordinate) vertex {vertex} has a NaN or infinite coordinate")]
    NonFiniteCoordinate { vertex: usize },

    /// (LengthMismatch) Per-input face counts do not add up to the combined face count
    #[error("(LengthMismatch) per-input face counts sum to {expected} but the combined mesh has {actual} faces")]
    LengthMismatch { expected: usize, actual: usize },

    /// (MissingNode) A CSG tree node id that was never created
    #[error("(MissingNode) CSG tree has no node {0}")]
    MissingNode(usize),
}

/// Result type used across the crate.
pub type BooleanResult<T> = Result<T, BooleanError>;
