//! Process-group collectives for grove.
//!
//! A group is a fixed set of members that all run the same program and
//! coordinate only through synchronous collectives: broadcast, sum
//! all-reduce, and barrier. Every member must reach every collective call
//! in the same order, otherwise the group hangs.

mod communicator;
mod error;
mod local;
mod solo;

pub use communicator::{Communicator, Rank};
pub use error::GroupError;
pub use local::{LocalComm, LocalGroup};
pub use solo::SoloGroup;
