//! The atomic memory cells used inside the lock-free structures.
//!
//! `Queue` and `Stack` never name `AtomicPtr` or `AtomicUsize` directly. They are
//! generic over an [`Atomics`] family instead, so that tests can swap in cells which
//! perturb the scheduling around every load, store and CAS (see
//! [`YieldingAtomics`](crate::testing::YieldingAtomics)).

use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

/// An atomic cell holding a raw pointer.
pub trait AtomicPointer<T>: Send + Sync {
    fn new(ptr: *mut T) -> Self;

    fn load(&self, order: Ordering) -> *mut T;

    fn store(&self, ptr: *mut T, order: Ordering);

    fn compare_exchange(&self, current: *mut T, new: *mut T,
                        success: Ordering, failure: Ordering) -> Result<*mut T, *mut T>;

    /// May fail spuriously even when the comparison succeeds.
    fn compare_exchange_weak(&self, current: *mut T, new: *mut T,
                             success: Ordering, failure: Ordering) -> Result<*mut T, *mut T>;
}

/// An atomic cell holding a counter.
pub trait AtomicCounter: Send + Sync {
    fn new(value: usize) -> Self;

    fn load(&self, order: Ordering) -> usize;

    /// Returns the previous value.
    fn fetch_add(&self, value: usize, order: Ordering) -> usize;

    /// Returns the previous value.
    fn fetch_sub(&self, value: usize, order: Ordering) -> usize;
}

/// A family of atomic cell types used together by one structure.
pub trait Atomics: 'static {
    type Pointer<T>: AtomicPointer<T>;
    type Counter: AtomicCounter;
}

/// The standard library atomics. This is the default for every structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdAtomics;

impl Atomics for StdAtomics {
    type Pointer<T> = AtomicPtr<T>;
    type Counter = AtomicUsize;
}

impl<T> AtomicPointer<T> for AtomicPtr<T> {
    #[inline]
    fn new(ptr: *mut T) -> Self {
        AtomicPtr::new(ptr)
    }

    #[inline]
    fn load(&self, order: Ordering) -> *mut T {
        AtomicPtr::load(self, order)
    }

    #[inline]
    fn store(&self, ptr: *mut T, order: Ordering) {
        AtomicPtr::store(self, ptr, order)
    }

    #[inline]
    fn compare_exchange(&self, current: *mut T, new: *mut T,
                        success: Ordering, failure: Ordering) -> Result<*mut T, *mut T> {
        AtomicPtr::compare_exchange(self, current, new, success, failure)
    }

    #[inline]
    fn compare_exchange_weak(&self, current: *mut T, new: *mut T,
                             success: Ordering, failure: Ordering) -> Result<*mut T, *mut T> {
        AtomicPtr::compare_exchange_weak(self, current, new, success, failure)
    }
}

impl AtomicCounter for AtomicUsize {
    #[inline]
    fn new(value: usize) -> Self {
        AtomicUsize::new(value)
    }

    #[inline]
    fn load(&self, order: Ordering) -> usize {
        AtomicUsize::load(self, order)
    }

    #[inline]
    fn fetch_add(&self, value: usize, order: Ordering) -> usize {
        AtomicUsize::fetch_add(self, value, order)
    }

    #[inline]
    fn fetch_sub(&self, value: usize, order: Ordering) -> usize {
        AtomicUsize::fetch_sub(self, value, order)
    }
}

#[cfg(test)]
mod tests {
    use super::{AtomicCounter, AtomicPointer, Atomics, StdAtomics};
    use std::ptr;
    use std::sync::atomic::Ordering;

    type Ptr = <StdAtomics as Atomics>::Pointer<u32>;
    type Counter = <StdAtomics as Atomics>::Counter;

    #[test]
    fn test_pointer_compare_exchange() {
        let mut a = 1u32;
        let mut b = 2u32;
        let pa: *mut u32 = &mut a;
        let pb: *mut u32 = &mut b;
        let cell: Ptr = AtomicPointer::new(pa);

        assert_eq!(cell.compare_exchange(pb, ptr::null_mut(), Ordering::AcqRel, Ordering::Acquire), Err(pa));
        assert!(cell.compare_exchange(pa, pb, Ordering::AcqRel, Ordering::Acquire).is_ok());
        assert_eq!(AtomicPointer::load(&cell, Ordering::Acquire), pb);

        AtomicPointer::store(&cell, ptr::null_mut(), Ordering::Release);
        assert!(AtomicPointer::load(&cell, Ordering::Acquire).is_null());
    }

    #[test]
    fn test_counter() {
        let counter: Counter = AtomicCounter::new(0);
        assert_eq!(AtomicCounter::fetch_add(&counter, 2, Ordering::SeqCst), 0);
        assert_eq!(AtomicCounter::fetch_sub(&counter, 1, Ordering::SeqCst), 2);
        assert_eq!(AtomicCounter::load(&counter, Ordering::SeqCst), 1);
    }
}
