//! Building blocks shared by the structures.

pub mod atomic;
pub mod backoff;
