use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A readers-writer lock that can guard one stripe of a striped structure.
///
/// The raw acquire/release pairs are what a structure needs when it takes locks in bulk
/// (such as every stripe of a hash set during a resize); [`write`](ReadWriteLock::write) and
/// [`read`](ReadWriteLock::read) wrap them in guards which release on drop.
pub trait ReadWriteLock: Default + Send + Sync {
    /// Block until this thread holds the lock exclusively.
    fn acquire_exclusive(&self);

    /// # Safety
    /// The calling thread must hold the lock exclusively.
    unsafe fn release_exclusive(&self);

    /// Block until this thread holds the lock shared with any other readers.
    fn acquire_shared(&self);

    /// # Safety
    /// The calling thread must hold a shared lock.
    unsafe fn release_shared(&self);

    fn write(&self) -> WriteGuard<Self> where Self: Sized {
        self.acquire_exclusive();
        WriteGuard { lock: self }
    }

    fn read(&self) -> ReadGuard<Self> where Self: Sized {
        self.acquire_shared();
        ReadGuard { lock: self }
    }
}

/// Holds a [`ReadWriteLock`] exclusively until dropped.
#[must_use]
pub struct WriteGuard<'a, L: ReadWriteLock + 'a> {
    lock: &'a L
}

impl<'a, L: ReadWriteLock> Drop for WriteGuard<'a, L> {
    fn drop(&mut self) {
        unsafe { self.lock.release_exclusive() }
    }
}

/// Holds a [`ReadWriteLock`] shared until dropped.
#[must_use]
pub struct ReadGuard<'a, L: ReadWriteLock + 'a> {
    lock: &'a L
}

impl<'a, L: ReadWriteLock> Drop for ReadGuard<'a, L> {
    fn drop(&mut self) {
        unsafe { self.lock.release_shared() }
    }
}

/// Who gets the lock first when readers and writers are both waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FairnessPolicy {
    /// New readers queue up behind any waiting writer. Writers cannot be starved, but a
    /// steady stream of writers can starve readers.
    #[default]
    WriterPreferred,
    /// Readers only wait for an active writer, never for a waiting one.
    ReaderPreferred
}

#[derive(Debug, Default)]
struct State {
    readers: usize,
    // Waiting writers plus the active one, if any
    writers: usize,
    writing: bool
}

/// A [`ReadWriteLock`] built on a mutex and a condition variable.
pub struct ReadWriteMutex {
    state: Mutex<State>,
    unlocked: Condvar,
    policy: FairnessPolicy
}

impl ReadWriteMutex {
    pub fn new() -> Self {
        ReadWriteMutex::with_policy(FairnessPolicy::default())
    }

    pub fn with_policy(policy: FairnessPolicy) -> Self {
        ReadWriteMutex {
            state: Mutex::new(State::default()),
            unlocked: Condvar::new(),
            policy
        }
    }

    pub fn policy(&self) -> FairnessPolicy {
        self.policy
    }

    // Nothing panics while the state is held, so a poisoned state is still consistent
    fn state(&self) -> MutexGuard<State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReadWriteLock for ReadWriteMutex {
    fn acquire_exclusive(&self) {
        let mut state = self.state();
        state.writers += 1;
        let mut state = self.unlocked
            .wait_while(state, |s| s.writing || s.readers > 0)
            .unwrap_or_else(PoisonError::into_inner);
        state.writing = true;
    }

    unsafe fn release_exclusive(&self) {
        let mut state = self.state();
        state.writing = false;
        state.writers -= 1;
        self.unlocked.notify_all();
    }

    fn acquire_shared(&self) {
        let state = self.state();
        let policy = self.policy;
        let mut state = self.unlocked
            .wait_while(state, |s| match policy {
                FairnessPolicy::WriterPreferred => s.writing || s.writers > 0,
                FairnessPolicy::ReaderPreferred => s.writing
            })
            .unwrap_or_else(PoisonError::into_inner);
        state.readers += 1;
    }

    unsafe fn release_shared(&self) {
        let mut state = self.state();
        state.readers -= 1;
        if state.readers == 0 && state.writers > 0 {
            self.unlocked.notify_all();
        }
    }
}

impl Default for ReadWriteMutex {
    fn default() -> Self {
        ReadWriteMutex::new()
    }
}

impl fmt::Debug for ReadWriteMutex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ReadWriteMutex")
            .field("readers", &state.readers)
            .field("writers", &state.writers)
            .field("writing", &state.writing)
            .field("policy", &self.policy)
            .finish()
    }
}
