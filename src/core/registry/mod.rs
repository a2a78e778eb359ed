//! Market registry and pair store.
//!
//! Both stores hand out immutable `Arc` snapshots so a single computation
//! always sees a consistent view; mutations build a new snapshot and swap
//! the pointer (copy-on-write).

mod fee_registry;
mod pair_store;

pub use fee_registry::{FeeRegistry, FeeSchedule};
pub use pair_store::{PairSet, PairStore};
