use std::fmt;

use crate::GroupError;

/// Zero-based position of a member within its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank(usize);

impl Rank {
    /// The member that loads inputs and originates broadcasts.
    pub const ROOT: Rank = Rank(0);

    /// Create a rank from a zero-based position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }

    /// Return `true` for rank 0.
    #[must_use]
    pub fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A handle to one member of a process group.
///
/// All methods except [`rank`](Communicator::rank) and
/// [`size`](Communicator::size) are collectives: each member must call them
/// the same number of times, in the same order, with matching arguments.
pub trait Communicator {
    /// Return this member's rank.
    fn rank(&self) -> Rank;

    /// Return the number of members in the group.
    fn size(&self) -> usize;

    /// Distribute the root's value to every member.
    ///
    /// The root passes `Some(value)`; every other member passes `None`.
    /// Each member returns its own clone of the root's value.
    ///
    /// # Errors
    ///
    /// | Variant                         | When                                   |
    /// |---------------------------------|----------------------------------------|
    /// | [`GroupError::InvalidRoot`]     | `root` is not a rank of this group     |
    /// | [`GroupError::EmptyBroadcast`]  | the root passed `None`                 |
    /// | [`GroupError::PayloadMismatch`] | members disagree on `T`                |
    fn broadcast<T>(&self, root: Rank, value: Option<T>) -> Result<T, GroupError>
    where
        T: Clone + Send + 'static;

    /// Sum every member's slice element-wise; every member receives the total.
    ///
    /// Contributions are added in rank order, so the result does not depend
    /// on arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::ReduceLengthMismatch`] when contributions differ in length.
    fn all_reduce_sum(&self, local: &[u64]) -> Result<Vec<u64>, GroupError>;

    /// Block until every member has reached this call.
    fn barrier(&self);
}
