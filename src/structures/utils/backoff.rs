use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::cmp;
use std::fmt;
use std::hint;
use std::thread;
use thread_local::ThreadLocal;

const MAX_BACKOFF: u32 = 2048;

/// Randomized exponential backoff for CAS retry loops.
///
/// Every thread touching the owning structure gets its own generator, so pausing never
/// needs any synchronization between the contending threads.
pub struct Backoff {
    rng: ThreadLocal<RefCell<SmallRng>>
}

impl Backoff {
    pub fn new() -> Self {
        Backoff {
            rng: ThreadLocal::new()
        }
    }

    /// Spin for a random number of steps below `limit`, and return the limit to use
    /// after the next failure.
    pub fn pause(&self, limit: u32) -> u32 {
        let limit = limit.clamp(1, MAX_BACKOFF);
        let steps = self.rng
            .get_or(|| RefCell::new(SmallRng::from_entropy()))
            .borrow_mut()
            .gen_range(0..limit);
        for _ in 0..steps {
            hint::spin_loop();
        }
        // At the ceiling, also give up the time slice
        if limit >= MAX_BACKOFF {
            thread::yield_now();
        }
        cmp::min(limit.saturating_mul(2), MAX_BACKOFF)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new()
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Backoff(max: {})", MAX_BACKOFF)
    }
}
