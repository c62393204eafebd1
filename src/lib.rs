//! A concurrency library for Rust.
//!
//! This crate provides a lock-free queue and stack, a lock-striped hash set along with the
//! reader-writer lock it is built on, and the tools used to test them for linearizability.
//! The queue reclaims memory whenever it observes it is the only operation in flight; the
//! stack keeps every popped node until it is dropped.

#[macro_use]
extern crate log;

pub mod structures;
pub mod memory;
pub mod sync;
pub mod testing;
