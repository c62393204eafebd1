use crate::structures::utils::atomic::{AtomicCounter, AtomicPointer, Atomics};
use rand::{thread_rng, Rng};
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use std::thread;

const YIELD_PROBABILITY: f64 = 0.2;

/// Atomics that give up the time slice at random before touching memory.
///
/// Plugging these into a `Queue` or `Stack` makes threads interleave at far more points than
/// they would on their own, which flushes out orderings that rarely happen on real hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldingAtomics;

impl Atomics for YieldingAtomics {
    type Pointer<T> = YieldingPtr<T>;
    type Counter = YieldingCounter;
}

fn perturb() {
    if thread_rng().gen_bool(YIELD_PROBABILITY) {
        thread::yield_now();
    }
}

#[derive(Debug)]
pub struct YieldingPtr<T> {
    inner: AtomicPtr<T>
}

impl<T> AtomicPointer<T> for YieldingPtr<T> {
    fn new(ptr: *mut T) -> Self {
        YieldingPtr {
            inner: AtomicPtr::new(ptr)
        }
    }

    fn load(&self, order: Ordering) -> *mut T {
        perturb();
        self.inner.load(order)
    }

    fn store(&self, ptr: *mut T, order: Ordering) {
        perturb();
        self.inner.store(ptr, order)
    }

    fn compare_exchange(&self, current: *mut T, new: *mut T,
                        success: Ordering, failure: Ordering) -> Result<*mut T, *mut T> {
        perturb();
        self.inner.compare_exchange(current, new, success, failure)
    }

    fn compare_exchange_weak(&self, current: *mut T, new: *mut T,
                             success: Ordering, failure: Ordering) -> Result<*mut T, *mut T> {
        perturb();
        self.inner.compare_exchange_weak(current, new, success, failure)
    }
}

#[derive(Debug)]
pub struct YieldingCounter {
    inner: AtomicUsize
}

impl AtomicCounter for YieldingCounter {
    fn new(value: usize) -> Self {
        YieldingCounter {
            inner: AtomicUsize::new(value)
        }
    }

    fn load(&self, order: Ordering) -> usize {
        perturb();
        self.inner.load(order)
    }

    fn fetch_add(&self, value: usize, order: Ordering) -> usize {
        perturb();
        self.inner.fetch_add(value, order)
    }

    fn fetch_sub(&self, value: usize, order: Ordering) -> usize {
        perturb();
        self.inner.fetch_sub(value, order)
    }
}
