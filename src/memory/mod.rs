//! Memory reclamation for the lock-free structures.
//!
//! Nodes unlinked from a lock-free structure cannot be freed straight away, as another thread
//! may still be reading them. [`Quiescence`] counts the operations in flight on a structure, so
//! that retired nodes are only freed when the thread doing the freeing is the only one inside.
//! This is cheap but offers no bound on memory: under constant overlap nothing is reclaimed
//! until the structure is dropped.

pub use self::quiescence::{OperationGuard, Quiescence};

mod quiescence;
