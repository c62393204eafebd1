use super::options::{ConfigError, HashSetOptions};
use crate::sync::{ReadWriteLock, ReadWriteMutex};
use std::borrow::Borrow;
use std::cell::UnsafeCell;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};

/// A hash set guarded by a fixed number of readers-writer locks ("stripes").
///
/// An element with hash `h` lives in bucket `h % buckets` and is guarded by stripe
/// `h % concurrency_level`. The bucket count is always a multiple of the stripe count, so each
/// bucket belongs to exactly one stripe and operations on different stripes never contend.
///
/// When an insert pushes the load factor to the configured maximum, the bucket array grows by
/// the growth factor. Growing takes every stripe exclusively, in ascending index order starting
/// from stripe 0. No other operation ever holds more than one stripe, so that order is enough to
/// rule out deadlock between resizes.
///
/// # Examples
/// ```
/// # use concurrent_collections::structures::StripedHashSet;
/// let set: StripedHashSet<String> = StripedHashSet::new(4);
/// assert!(set.insert("a".to_owned()));
/// assert!(!set.insert("a".to_owned()));
/// assert!(set.contains("a"));
/// assert!(set.remove("a"));
/// assert!(!set.contains("a"));
/// ```
pub struct StripedHashSet<T, S = RandomState, L = ReadWriteMutex> {
    locks: Box<[L]>,
    buckets: UnsafeCell<Vec<Bucket<T>>>,
    len: AtomicUsize,
    growth_factor: usize,
    max_load_factor: f64,
    hasher: S
}

unsafe impl<T: Send + Sync, S: Sync, L: Sync> Sync for StripedHashSet<T, S, L> {}

struct Bucket<T> {
    chain: UnsafeCell<Vec<T>>
}

impl<T> Bucket<T> {
    fn new() -> Self {
        Bucket {
            chain: UnsafeCell::new(Vec::new())
        }
    }
}

impl<T: Hash + Eq> StripedHashSet<T> {
    /// Create a set with `concurrency_level` stripes, a growth factor of 3 and a maximum load
    /// factor of 0.75.
    ///
    /// # Panics
    /// If `concurrency_level` is zero.
    pub fn new(concurrency_level: usize) -> Self {
        match StripedHashSet::with_options(HashSetOptions::new(concurrency_level)) {
            Ok(set) => set,
            Err(err) => panic!("invalid hash set: {}", err)
        }
    }

    pub fn with_options(options: HashSetOptions) -> Result<Self, ConfigError> {
        StripedHashSet::with_options_and_hasher(options, RandomState::new())
    }
}

impl<T: Hash + Eq> Default for StripedHashSet<T> {
    fn default() -> Self {
        StripedHashSet::new(HashSetOptions::default().concurrency_level)
    }
}

impl<T, S, L> StripedHashSet<T, S, L>
where T: Hash + Eq,
      S: BuildHasher,
      L: ReadWriteLock
{
    pub fn with_options_and_hasher(options: HashSetOptions, hasher: S) -> Result<Self, ConfigError> {
        options.validate()?;
        let locks: Vec<L> = (0..options.concurrency_level).map(|_| L::default()).collect();
        let buckets: Vec<Bucket<T>> = (0..options.initial_buckets()).map(|_| Bucket::new()).collect();
        Ok(StripedHashSet {
            locks: locks.into_boxed_slice(),
            buckets: UnsafeCell::new(buckets),
            len: AtomicUsize::new(0),
            growth_factor: options.growth_factor,
            max_load_factor: options.max_load_factor,
            hasher
        })
    }

    fn hash<Q: ?Sized + Hash>(&self, value: &Q) -> u64 {
        let mut hasher = self.hasher.build_hasher();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn stripe(&self, hash: u64) -> &L {
        &self.locks[index(hash, self.locks.len())]
    }

    /// The chain that `hash` maps to.
    ///
    /// The caller must hold the stripe of `hash`: shared to read the chain, exclusive to mutate it.
    unsafe fn chain(&self, hash: u64) -> *mut Vec<T> {
        let buckets = &*self.buckets.get();
        buckets[index(hash, buckets.len())].chain.get()
    }

    fn exceeds_load(&self, len: usize, buckets: usize) -> bool {
        len as f64 / buckets as f64 >= self.max_load_factor
    }

    /// Add `value` to the set. Returns false if an equal element was already present.
    pub fn insert(&self, value: T) -> bool {
        let hash = self.hash(&value);
        let guard = self.stripe(hash).write();

        let chain = unsafe { &mut *self.chain(hash) };
        if chain.contains(&value) {
            return false;
        }
        chain.push(value);
        let len = self.len.fetch_add(1, SeqCst) + 1;
        let buckets = unsafe { (*self.buckets.get()).len() };
        let needs_resize = self.exceeds_load(len, buckets);
        drop(guard);

        if needs_resize {
            self.resize();
        }
        true
    }

    /// Remove the element equal to `value`. Returns whether it was present.
    pub fn remove<Q>(&self, value: &Q) -> bool
    where T: Borrow<Q>,
          Q: ?Sized + Hash + Eq
    {
        let hash = self.hash(value);
        let _guard = self.stripe(hash).write();

        let chain = unsafe { &mut *self.chain(hash) };
        match chain.iter().position(|element| element.borrow() == value) {
            Some(position) => {
                chain.swap_remove(position);
                self.len.fetch_sub(1, SeqCst);
                true
            },
            None => false
        }
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where T: Borrow<Q>,
          Q: ?Sized + Hash + Eq
    {
        let hash = self.hash(value);
        let _guard = self.stripe(hash).read();

        let chain = unsafe { &*self.chain(hash) };
        chain.iter().any(|element| element.borrow() == value)
    }

    fn resize(&self) {
        let mut guards = Vec::with_capacity(self.locks.len());
        guards.push(self.locks[0].write());

        // Somebody else may have resized while we waited for stripe 0
        let old_len = unsafe { (*self.buckets.get()).len() };
        if !self.exceeds_load(self.len.load(SeqCst), old_len) {
            return;
        }
        let new_len = match old_len.checked_mul(self.growth_factor) {
            Some(new_len) => new_len,
            None => return
        };

        for lock in self.locks[1..].iter() {
            guards.push(lock.write());
        }

        let buckets = unsafe { &mut *self.buckets.get() };
        // Hash everything before moving anything, so that a panicking Hash leaves the old array whole
        let targets: Vec<Vec<usize>> = buckets.iter_mut()
            .map(|bucket| {
                bucket.chain.get_mut().iter()
                    .map(|value| index(self.hash(value), new_len))
                    .collect()
            })
            .collect();
        let mut new_buckets: Vec<Bucket<T>> = (0..new_len).map(|_| Bucket::new()).collect();
        for (bucket, targets) in buckets.iter_mut().zip(targets) {
            for (value, target) in bucket.chain.get_mut().drain(..).zip(targets) {
                new_buckets[target].chain.get_mut().push(value);
            }
        }
        *buckets = new_buckets;
        debug!("Resized striped hash set from {} to {} buckets", old_len, new_len);
    }

    /// The number of elements, as of some instant during the call. Not synchronized with
    /// concurrent inserts and removes.
    pub fn len(&self) -> usize {
        self.len.load(SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current length of the bucket array.
    pub fn bucket_count(&self) -> usize {
        let _guard = self.locks[0].read();
        unsafe { (*self.buckets.get()).len() }
    }

    pub fn concurrency_level(&self) -> usize {
        self.locks.len()
    }
}

impl<T, S, L> fmt::Debug for StripedHashSet<T, S, L>
where T: Hash + Eq,
      S: BuildHasher,
      L: ReadWriteLock
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StripedHashSet")
            .field("len", &self.len())
            .field("concurrency_level", &self.concurrency_level())
            .field("buckets", &self.bucket_count())
            .finish()
    }
}

fn index(hash: u64, len: usize) -> usize {
    (hash % len as u64) as usize
}
