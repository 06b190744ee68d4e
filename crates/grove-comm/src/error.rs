/// Errors from process-group collectives.
///
/// Every variant reported by a collective is detected after the rendezvous,
/// so all members of the group observe the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    /// Returned when a group is created with zero members.
    #[error("process group size must be at least 1, got {size}")]
    InvalidGroupSize {
        /// The invalid size provided.
        size: usize,
    },

    /// Returned when a collective names a root outside the group.
    #[error("root rank {root} is outside a group of size {size}")]
    InvalidRoot {
        /// The requested root rank.
        root: usize,
        /// The size of the group.
        size: usize,
    },

    /// Returned when the root member supplied no value to a broadcast.
    #[error("broadcast root {root} supplied no value")]
    EmptyBroadcast {
        /// The root rank of the broadcast.
        root: usize,
    },

    /// Returned when members disagree on the payload type of a collective.
    #[error("collective payload type mismatch at rank {rank}")]
    PayloadMismatch {
        /// The rank that observed the mismatch.
        rank: usize,
    },

    /// Returned when members contribute slices of different lengths to a reduction.
    #[error("all-reduce length mismatch: rank {rank} contributed {got} values, expected {expected}")]
    ReduceLengthMismatch {
        /// The rank whose contribution differs.
        rank: usize,
        /// Length of the calling member's contribution.
        expected: usize,
        /// Length of the offending contribution.
        got: usize,
    },

    /// Returned when a member thread panicked.
    #[error("group member {rank} panicked")]
    MemberPanicked {
        /// The rank of the member that panicked.
        rank: usize,
    },
}
