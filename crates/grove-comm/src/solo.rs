use crate::{Communicator, GroupError, Rank};

/// A group with a single member. Every collective is an identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoloGroup;

impl Communicator for SoloGroup {
    fn rank(&self) -> Rank {
        Rank::ROOT
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast<T>(&self, root: Rank, value: Option<T>) -> Result<T, GroupError>
    where
        T: Clone + Send + 'static,
    {
        if !root.is_root() {
            return Err(GroupError::InvalidRoot {
                root: root.index(),
                size: 1,
            });
        }
        value.ok_or(GroupError::EmptyBroadcast { root: 0 })
    }

    fn all_reduce_sum(&self, local: &[u64]) -> Result<Vec<u64>, GroupError> {
        Ok(local.to_vec())
    }

    fn barrier(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_returns_own_value() {
        assert_eq!(SoloGroup.broadcast(Rank::ROOT, Some(7u64)).unwrap(), 7);
    }

    #[test]
    fn broadcast_without_value_fails() {
        let err = SoloGroup.broadcast::<u64>(Rank::ROOT, None).unwrap_err();
        assert_eq!(err, GroupError::EmptyBroadcast { root: 0 });
    }

    #[test]
    fn broadcast_from_foreign_root_fails() {
        let err = SoloGroup.broadcast(Rank::new(1), Some(1u8)).unwrap_err();
        assert!(matches!(err, GroupError::InvalidRoot { root: 1, size: 1 }));
    }

    #[test]
    fn reduce_is_identity() {
        assert_eq!(SoloGroup.all_reduce_sum(&[3, 4]).unwrap(), vec![3, 4]);
    }
}
