//! Thread-backed process group.
//!
//! Each member runs on its own scoped thread. Collectives rendezvous on a
//! shared [`Barrier`]; payloads travel through one slot per rank. A slot is
//! written only by its owner and read by others strictly between the two
//! barrier waits of a collective.

use std::any::Any;
use std::sync::{Arc, Barrier, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, info_span};

use crate::{Communicator, GroupError, Rank};

type Payload = Box<dyn Any + Send>;

struct Rendezvous {
    barrier: Barrier,
    slots: Mutex<Vec<Option<Payload>>>,
}

/// A fixed-size group of members launched together.
///
/// ```
/// use grove_comm::{Communicator, LocalGroup};
///
/// let totals = LocalGroup::new(3)
///     .unwrap()
///     .run(|comm| comm.all_reduce_sum(&[1]).unwrap()[0])
///     .unwrap();
/// assert_eq!(totals, vec![3, 3, 3]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LocalGroup {
    size: usize,
}

impl LocalGroup {
    /// Create a group description with `size` members.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::InvalidGroupSize`] if `size` is zero.
    pub fn new(size: usize) -> Result<Self, GroupError> {
        if size == 0 {
            return Err(GroupError::InvalidGroupSize { size });
        }
        Ok(Self { size })
    }

    /// Return the number of members.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Launch every member on `member` and wait for all of them.
    ///
    /// Returns the per-member results in rank order. A member that panics
    /// while the others wait in a collective hangs the group; a member that
    /// panics outside collectives is reported once the rest finish.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::MemberPanicked`] for the lowest rank that panicked.
    pub fn run<F, R>(&self, member: F) -> Result<Vec<R>, GroupError>
    where
        F: Fn(LocalComm) -> R + Sync,
        R: Send,
    {
        let shared = Arc::new(Rendezvous {
            barrier: Barrier::new(self.size),
            slots: Mutex::new((0..self.size).map(|_| None).collect()),
        });
        debug!(size = self.size, "launching process group");

        thread::scope(|scope| {
            let member = &member;
            let handles: Vec<_> = (0..self.size)
                .map(|rank| {
                    let comm = LocalComm {
                        rank: Rank::new(rank),
                        size: self.size,
                        shared: Arc::clone(&shared),
                    };
                    scope.spawn(move || {
                        let _span = info_span!("member", rank).entered();
                        member(comm)
                    })
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| {
                    handle
                        .join()
                        .map_err(|_| GroupError::MemberPanicked { rank })
                })
                .collect()
        })
    }
}

/// One member's handle into a [`LocalGroup`].
pub struct LocalComm {
    rank: Rank,
    size: usize,
    shared: Arc<Rendezvous>,
}

impl LocalComm {
    fn slots(&self) -> MutexGuard<'_, Vec<Option<Payload>>> {
        self.shared
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, payload: Payload) {
        self.slots()[self.rank.index()] = Some(payload);
    }

    fn retract(&self) {
        self.slots()[self.rank.index()] = None;
    }
}

impl std::fmt::Debug for LocalComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast<T>(&self, root: Rank, value: Option<T>) -> Result<T, GroupError>
    where
        T: Clone + Send + 'static,
    {
        let is_root = self.rank == root;
        if is_root {
            self.publish(Box::new(value));
        }
        self.shared.barrier.wait();

        let received = if root.index() >= self.size {
            Err(GroupError::InvalidRoot {
                root: root.index(),
                size: self.size,
            })
        } else {
            let slots = self.slots();
            match slots[root.index()]
                .as_ref()
                .and_then(|payload| payload.downcast_ref::<Option<T>>())
            {
                Some(Some(v)) => Ok(v.clone()),
                Some(None) => Err(GroupError::EmptyBroadcast { root: root.index() }),
                None => Err(GroupError::PayloadMismatch {
                    rank: self.rank.index(),
                }),
            }
        };

        self.shared.barrier.wait();
        if is_root {
            self.retract();
        }
        received
    }

    fn all_reduce_sum(&self, local: &[u64]) -> Result<Vec<u64>, GroupError> {
        self.publish(Box::new(local.to_vec()));
        self.shared.barrier.wait();

        let total = sum_contributions(&self.slots(), local.len(), self.rank);

        self.shared.barrier.wait();
        self.retract();
        total
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }
}

fn sum_contributions(
    slots: &[Option<Payload>],
    len: usize,
    me: Rank,
) -> Result<Vec<u64>, GroupError> {
    let mut total = vec![0u64; len];
    for (rank, slot) in slots.iter().enumerate() {
        let contribution = slot
            .as_ref()
            .and_then(|payload| payload.downcast_ref::<Vec<u64>>())
            .ok_or(GroupError::PayloadMismatch { rank: me.index() })?;
        if contribution.len() != len {
            return Err(GroupError::ReduceLengthMismatch {
                rank,
                expected: len,
                got: contribution.len(),
            });
        }
        for (acc, &v) in total.iter_mut().zip(contribution) {
            *acc += v;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_rejected() {
        assert_eq!(
            LocalGroup::new(0).unwrap_err(),
            GroupError::InvalidGroupSize { size: 0 }
        );
    }

    #[test]
    fn results_in_rank_order() {
        let ranks = LocalGroup::new(4)
            .unwrap()
            .run(|comm| comm.rank().index())
            .unwrap();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn broadcast_reaches_every_member() {
        let got = LocalGroup::new(3)
            .unwrap()
            .run(|comm| {
                let value = comm.rank().is_root().then(|| vec![1.5f64, 2.5]);
                comm.broadcast(Rank::ROOT, value).unwrap()
            })
            .unwrap();
        for v in got {
            assert_eq!(v, vec![1.5, 2.5]);
        }
    }

    #[test]
    fn broadcast_from_non_zero_root() {
        let got = LocalGroup::new(3)
            .unwrap()
            .run(|comm| {
                let value = (comm.rank().index() == 2).then_some(99u32);
                comm.broadcast(Rank::new(2), value).unwrap()
            })
            .unwrap();
        assert_eq!(got, vec![99, 99, 99]);
    }

    #[test]
    fn empty_broadcast_fails_everywhere() {
        let got = LocalGroup::new(2)
            .unwrap()
            .run(|comm| comm.broadcast::<u64>(Rank::ROOT, None))
            .unwrap();
        for r in got {
            assert_eq!(r.unwrap_err(), GroupError::EmptyBroadcast { root: 0 });
        }
    }

    #[test]
    fn all_reduce_sums_elementwise() {
        let got = LocalGroup::new(3)
            .unwrap()
            .run(|comm| {
                let r = comm.rank().index() as u64;
                comm.all_reduce_sum(&[r, 1]).unwrap()
            })
            .unwrap();
        for v in got {
            assert_eq!(v, vec![3, 3]);
        }
    }

    #[test]
    fn reduce_length_mismatch_fails_everywhere() {
        let got = LocalGroup::new(2)
            .unwrap()
            .run(|comm| {
                let local = vec![1u64; comm.rank().index() + 1];
                comm.all_reduce_sum(&local)
            })
            .unwrap();
        for r in got {
            assert!(matches!(r, Err(GroupError::ReduceLengthMismatch { .. })));
        }
    }

    #[test]
    fn repeated_collectives_stay_in_step() {
        let got = LocalGroup::new(3)
            .unwrap()
            .run(|comm| {
                let mut seen = Vec::new();
                for round in 0..20u64 {
                    let seed = comm
                        .broadcast(Rank::ROOT, comm.rank().is_root().then_some(round * 10))
                        .unwrap();
                    let total = comm.all_reduce_sum(&[seed]).unwrap()[0];
                    seen.push(total);
                }
                seen
            })
            .unwrap();
        let expected: Vec<u64> = (0..20).map(|r| r * 30).collect();
        for v in got {
            assert_eq!(v, expected);
        }
    }

    #[test]
    fn panicking_member_reported() {
        let err = LocalGroup::new(3)
            .unwrap()
            .run(|comm| {
                if comm.rank().index() == 1 {
                    panic!("member failure");
                }
                0
            })
            .unwrap_err();
        assert_eq!(err, GroupError::MemberPanicked { rank: 1 });
    }
}
