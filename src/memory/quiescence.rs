use crate::structures::utils::atomic::AtomicCounter;
use std::fmt;
use std::sync::atomic::Ordering::SeqCst;

/// Counts the operations currently in flight on one structure.
///
/// Every operation holds an [`OperationGuard`] for its whole duration. An operation that
/// finds itself to be the only one in flight may free memory that it has unlinked, since
/// nobody else can still be holding a pointer into it.
///
/// This is a heuristic rather than a general reclamation scheme: it only ever frees anything
/// when the structure goes quiet, so under sustained contention retired records pile up until
/// the next quiescent moment (or until the structure is dropped).
pub struct Quiescence<C: AtomicCounter> {
    in_flight: C
}

impl<C: AtomicCounter> Quiescence<C> {
    pub fn new() -> Self {
        Quiescence {
            in_flight: C::new(0)
        }
    }

    /// Register an operation. It is deregistered when the guard is dropped.
    pub fn enter(&self) -> OperationGuard<C> {
        self.in_flight.fetch_add(1, SeqCst);
        OperationGuard { tracker: self }
    }

    /// The number of operations in flight at this instant.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(SeqCst)
    }
}

impl<C: AtomicCounter> Default for Quiescence<C> {
    fn default() -> Self {
        Quiescence::new()
    }
}

impl<C: AtomicCounter> fmt::Debug for Quiescence<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Quiescence(in_flight: {})", self.in_flight())
    }
}

/// Proof that an operation is registered with a [`Quiescence`] tracker.
#[must_use]
pub struct OperationGuard<'a, C: AtomicCounter + 'a> {
    tracker: &'a Quiescence<C>
}

impl<'a, C: AtomicCounter> OperationGuard<'a, C> {
    /// True if the guard's own operation is the only one in flight.
    pub fn is_alone(&self) -> bool {
        self.tracker.in_flight.load(SeqCst) == 1
    }
}

impl<'a, C: AtomicCounter> Drop for OperationGuard<'a, C> {
    fn drop(&mut self) {
        self.tracker.in_flight.fetch_sub(1, SeqCst);
    }
}
