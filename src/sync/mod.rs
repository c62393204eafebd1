//! Blocking synchronization primitives used by the lock-based structures.

pub use self::rw_mutex::{FairnessPolicy, ReadGuard, ReadWriteLock, ReadWriteMutex, WriteGuard};

mod rw_mutex;
