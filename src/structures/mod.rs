//! The concurrent collections.
//!
//! [`Queue`] and [`Stack`] are lock-free. [`StripedHashSet`] takes a reader-writer lock per
//! stripe of buckets and grows by taking all of them.

pub use self::hash_set::{ConfigError, HashSetOptions, StripedHashSet};
pub use self::queue::Queue;
pub use self::stack::Stack;

pub mod hash_set;
pub mod utils;
mod queue;
mod stack;
