use crate::memory::Quiescence;
use crate::structures::utils::atomic::{AtomicPointer, Atomics, StdAtomics};
use crate::structures::utils::backoff::Backoff;
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::Ordering::SeqCst;

/// A lock-free Michael-Scott queue.
///
/// This queue is an implementation of that described in [Simple, Fast, and Practical
/// Non-blocking and Blocking Concurrent Queue Algorithms](https://dl.acm.org/citation.cfm?id=248106).
/// It is implemented as a linked-list of nodes, starting from a sentinel node which holds no value.
///
/// Dequeued nodes are not freed straight away. They stay linked behind the head as garbage,
/// and are freed by the next dequeue which finds that no other operation is in flight on the
/// queue. Whatever garbage is left is freed when the queue is dropped.
///
/// The atomic cells can be swapped out through `A`, which defaults to the standard atomics.
pub struct Queue<T: Send, A: Atomics = StdAtomics> {
    head: A::Pointer<Node<T, A>>,
    tail: A::Pointer<Node<T, A>>,
    garbage: A::Pointer<Node<T, A>>,
    operations: Quiescence<A::Counter>,
    backoff: Backoff,
    marker: PhantomData<T>
}

unsafe impl<T: Send, A: Atomics> Sync for Queue<T, A> {}
unsafe impl<T: Send, A: Atomics> Send for Queue<T, A> {}

struct Node<T, A: Atomics> {
    value: UnsafeCell<Option<T>>,
    next: A::Pointer<Node<T, A>>
}

impl<T: Send> Queue<T> {
    /// Create a new Queue.
    /// # Examples
    /// ```
    /// # use concurrent_collections::structures::Queue;
    /// let queue: Queue<String> = Queue::new();
    /// ```
    pub fn new() -> Self {
        Queue::with_atomics()
    }
}

impl<T: Send, A: Atomics> Queue<T, A> {
    /// Create a new Queue on top of the atomic cells of `A`.
    pub fn with_atomics() -> Self {
        let dummy_node = Box::into_raw(Box::new(Node::new_dummy_node()));
        Queue {
            head: AtomicPointer::new(dummy_node),
            tail: AtomicPointer::new(dummy_node),
            garbage: AtomicPointer::new(dummy_node),
            operations: Quiescence::new(),
            backoff: Backoff::new(),
            marker: PhantomData
        }
    }

    /// Add a new element to the back of the queue.
    /// # Examples
    /// ```
    /// # use concurrent_collections::structures::Queue;
    /// let queue: Queue<String> = Queue::new();
    /// queue.enqueue("hello".to_owned());
    /// ```
    pub fn enqueue(&self, val: T) {
        let _operation = self.operations.enter();
        let node = Box::into_raw(Box::new(Node::new(val)));
        let mut backoff = 1;
        loop {
            let tail = self.tail.load(SeqCst);
            if self.try_enqueue(tail, node) {
                // Swing the tail to our node, unless someone already helped us along
                let _ = self.tail.compare_exchange(tail, node, SeqCst, SeqCst);
                return;
            }
            backoff = self.backoff.pause(backoff);
        }
    }

    fn try_enqueue(&self, tail: *mut Node<T, A>, node: *mut Node<T, A>) -> bool {
        let next = unsafe { (*tail).next.load(SeqCst) };

        // Is the tail actually the end of the queue?
        if !next.is_null() {
            // If it isn't, try to make next the end of the queue
            let _ = self.tail.compare_exchange(tail, next, SeqCst, SeqCst);
            return false;
        }

        unsafe {
            (*tail).next.compare_exchange(ptr::null_mut(), node, SeqCst, SeqCst).is_ok()
        }
    }

    /// Take an element from the front of the queue, or return None if the queue is empty.
    /// # Examples
    /// ```
    /// # use concurrent_collections::structures::Queue;
    /// let queue: Queue<String> = Queue::new();
    /// queue.enqueue("hello".to_owned());
    /// assert_eq!(queue.dequeue(), Some("hello".to_owned()));
    /// assert_eq!(queue.dequeue(), None);
    /// ```
    pub fn dequeue(&self) -> Option<T> {
        let operation = self.operations.enter();
        let mut backoff = 1;
        loop {
            match self.try_dequeue() {
                Ok(None) => return None,
                Ok(Some(val)) => {
                    // The head must be read before the count: an operation entering after the
                    // check can only hold this head or a later one
                    let head = self.head.load(SeqCst);
                    if operation.is_alone() {
                        let freed = unsafe { self.collect_garbage(head) };
                        if freed > 0 {
                            trace!("Reclaimed {} dequeued nodes", freed);
                        }
                    }
                    return Some(val);
                },
                Err(()) => {
                    backoff = self.backoff.pause(backoff);
                }
            }
        }
    }

    fn try_dequeue(&self) -> Result<Option<T>, ()> {
        let head = self.head.load(SeqCst);
        let tail = self.tail.load(SeqCst);
        let next = unsafe { (*head).next.load(SeqCst) };

        if ptr::eq(head, tail) {
            if next.is_null() {
                return Ok(None);
            }
            // The tail is lagging behind, help it along before touching the head
            let _ = self.tail.compare_exchange(tail, next, SeqCst, SeqCst);
            return Err(());
        }

        if next.is_null() {
            return Err(());
        }

        match self.head.compare_exchange(head, next, SeqCst, SeqCst) {
            Ok(_) => {
                // next is the new sentinel; only the winner of the CAS reads its value
                let data = unsafe { (*(*next).value.get()).take() };
                Ok(data)
            },
            Err(_) => Err(())
        }
    }

    /// Returns whether the queue held no elements at the instant of the check.
    pub fn is_empty(&self) -> bool {
        let _operation = self.operations.enter();
        let head = self.head.load(SeqCst);
        unsafe { (*head).next.load(SeqCst).is_null() }
    }

    /// Free every retired node from the garbage pointer up to, but not including, `until`.
    /// A null `until` frees the whole list.
    ///
    /// The caller must be the only operation in flight, or hold the queue mutably.
    unsafe fn collect_garbage(&self, until: *mut Node<T, A>) -> usize {
        let mut freed = 0;
        loop {
            let garbage = self.garbage.load(SeqCst);
            if garbage.is_null() || ptr::eq(garbage, until) {
                return freed;
            }
            self.garbage.store((*garbage).next.load(SeqCst), SeqCst);
            drop(Box::from_raw(garbage));
            freed += 1;
        }
    }
}

impl<T: Send, A: Atomics> Drop for Queue<T, A> {
    fn drop(&mut self) {
        let freed = unsafe { self.collect_garbage(ptr::null_mut()) };
        trace!("Dropped queue, freeing {} nodes", freed);
    }
}

impl<T: Send> Default for Queue<T> {
    fn default() -> Self {
        Queue::new()
    }
}

impl<T: Send, A: Atomics> fmt::Debug for Queue<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Queue")
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}

impl<T, A: Atomics> Node<T, A> {
    fn new(value: T) -> Self {
        Node {
            value: UnsafeCell::new(Some(value)),
            next: AtomicPointer::new(ptr::null_mut())
        }
    }

    fn new_dummy_node() -> Self {
        Node {
            value: UnsafeCell::new(None),
            next: AtomicPointer::new(ptr::null_mut())
        }
    }
}
