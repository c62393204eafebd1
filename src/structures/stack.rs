use crate::structures::utils::atomic::{AtomicPointer, Atomics, StdAtomics};
use crate::structures::utils::backoff::Backoff;
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed};

/// A lock-free Treiber stack.
///
/// Popped nodes are never handed back to the allocator while the stack is alive: they are
/// moved onto a separate garbage chain, and both chains are freed together when the stack is
/// dropped. A thread in the middle of a pop may still be reading a node that someone else has
/// just unlinked, and since no node address is ever reused the CAS on the top cannot suffer
/// from ABA either. The price is that memory grows with the number of pops; use
/// [`retired`](Stack::retired) to see how far.
pub struct Stack<T: Send, A: Atomics = StdAtomics> {
    top: A::Pointer<Node<T, A>>,
    garbage: A::Pointer<Node<T, A>>,
    backoff: Backoff,
    marker: PhantomData<T>
}

unsafe impl<T: Send, A: Atomics> Sync for Stack<T, A> {}
unsafe impl<T: Send, A: Atomics> Send for Stack<T, A> {}

struct Node<T, A: Atomics> {
    data: UnsafeCell<Option<T>>,
    next: A::Pointer<Node<T, A>>
}

impl<T: Send> Stack<T> {
    /// Create a new, empty Stack.
    /// # Examples
    /// ```
    /// # use concurrent_collections::structures::Stack;
    /// let stack: Stack<u32> = Stack::new();
    /// stack.push(1);
    /// stack.push(2);
    /// assert_eq!(stack.pop(), Some(2));
    /// assert_eq!(stack.pop(), Some(1));
    /// assert_eq!(stack.pop(), None);
    /// ```
    pub fn new() -> Stack<T> {
        Stack::with_atomics()
    }
}

impl<T: Send, A: Atomics> Stack<T, A> {
    pub fn with_atomics() -> Stack<T, A> {
        Stack {
            top: AtomicPointer::new(ptr::null_mut()),
            garbage: AtomicPointer::new(ptr::null_mut()),
            backoff: Backoff::new(),
            marker: PhantomData
        }
    }

    pub fn push(&self, val: T) {
        let node = Node::new_as_pointer(val);
        Self::push_node(&self.top, node, &self.backoff);
    }

    /// Link `node` on top of `chain`. Shared by the live chain and the garbage chain.
    fn push_node(chain: &A::Pointer<Node<T, A>>, node: *mut Node<T, A>, backoff: &Backoff) {
        let mut old_top = chain.load(Acquire);
        let mut limit = 1;
        loop {
            unsafe {
                (*node).next.store(old_top, Relaxed);
            }
            match chain.compare_exchange_weak(old_top, node, AcqRel, Acquire) {
                Ok(_) => return,
                Err(current) => {
                    // A spurious failure leaves the top untouched; only back off on real contention
                    if !ptr::eq(current, old_top) {
                        limit = backoff.pause(limit);
                    }
                    old_top = current;
                }
            }
        }
    }

    pub fn pop(&self) -> Option<T> {
        let mut old_top = self.top.load(Acquire);
        let mut limit = 1;
        loop {
            if old_top.is_null() {
                return None;
            }
            // old_top may be popped and retired under our feet, but it is never freed
            let new_top = unsafe { (*old_top).next.load(Acquire) };
            match self.top.compare_exchange(old_top, new_top, AcqRel, Acquire) {
                Ok(_) => {
                    let data = unsafe { (*(*old_top).data.get()).take() };
                    Self::push_node(&self.garbage, old_top, &self.backoff);
                    return data;
                },
                Err(current) => {
                    old_top = current;
                    limit = self.backoff.pause(limit);
                }
            }
        }
    }

    /// Returns whether the stack held no elements at the instant of the check.
    pub fn is_empty(&self) -> bool {
        self.top.load(Acquire).is_null()
    }

    /// The number of popped nodes waiting on the garbage chain to be freed on drop.
    ///
    /// Under concurrent pops this is only a snapshot.
    pub fn retired(&self) -> usize {
        let mut count = 0;
        let mut current = self.garbage.load(Acquire);
        while !current.is_null() {
            count += 1;
            current = unsafe { (*current).next.load(Acquire) };
        }
        count
    }

    unsafe fn delete_list(mut current: *mut Node<T, A>) -> usize {
        let mut freed = 0;
        while !current.is_null() {
            let next = (*current).next.load(Relaxed);
            drop(Box::from_raw(current));
            current = next;
            freed += 1;
        }
        freed
    }
}

impl<T: Send, A: Atomics> Drop for Stack<T, A> {
    fn drop(&mut self) {
        let (live, retired) = unsafe {
            (Self::delete_list(self.top.load(Relaxed)), Self::delete_list(self.garbage.load(Relaxed)))
        };
        trace!("Dropped stack, freeing {} live and {} retired nodes", live, retired);
    }
}

impl<T: Send> Default for Stack<T> {
    fn default() -> Self {
        Stack::new()
    }
}

impl<T: Send, A: Atomics> fmt::Debug for Stack<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Stack")
            .field("empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}

impl<T, A: Atomics> Node<T, A> {
    fn new_as_pointer(val: T) -> *mut Self {
        Box::into_raw(Box::new(Node {
            data: UnsafeCell::new(Some(val)),
            next: AtomicPointer::new(ptr::null_mut())
        }))
    }
}

#[cfg(test)]
mod tests {
    use im::Vector;
    use rand::{thread_rng, Rng};

    use super::Stack;
    use crate::testing::{LinearizabilityResult, LinearizabilityTester, ThreadLog, YieldingAtomics};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[derive(Debug)]
    struct Foo {
        data: u8,
        drops: Arc<AtomicUsize>
    }

    impl Drop for Foo {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_push_single_threaded() {
        let stack: Stack<u8> = Stack::new();

        stack.push(4u8);
        stack.push(3);
        stack.push(1);
        unsafe {
            let top = stack.top.load(Ordering::Relaxed);
            assert_eq!(*(*top).data.get(), Some(1));
            let next = (*top).next.load(Ordering::Relaxed);
            assert_eq!(*(*next).data.get(), Some(3));
        }
    }

    #[test]
    fn test_pop_single_threaded() {
        let drops = Arc::new(AtomicUsize::new(0));
        let stack: Stack<Foo> = Stack::new();

        stack.push(Foo { data: 1, drops: drops.clone() });
        stack.push(Foo { data: 2, drops: drops.clone() });
        stack.push(Foo { data: 4, drops: drops.clone() });

        assert_eq!(stack.pop().map(|foo| foo.data), Some(4));
        assert_eq!(stack.pop().map(|foo| foo.data), Some(2));
        assert_eq!(stack.pop().map(|foo| foo.data), Some(1));
        assert!(stack.pop().is_none());
        assert!(stack.pop().is_none());
        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_push_two_pop_three() {
        let stack: Stack<u32> = Stack::default();
        assert!(stack.is_empty());
        stack.push(1);
        stack.push(2);
        assert!(!stack.is_empty());
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_popped_nodes_are_retired_not_freed() {
        let stack: Stack<u32> = Stack::new();
        for i in 0..10 {
            stack.push(i);
        }
        assert_eq!(stack.retired(), 0);
        for _ in 0..4 {
            stack.pop();
        }
        assert_eq!(stack.retired(), 4);
        assert_eq!(stack.pop(), Some(5));
        assert_eq!(stack.retired(), 5);
    }

    #[test]
    fn test_drop_frees_live_values() {
        let drops = Arc::new(AtomicUsize::new(0));
        {
            let stack: Stack<Foo> = Stack::new();
            for data in 0..6 {
                stack.push(Foo { data, drops: drops.clone() });
            }
            drop(stack.pop());
            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }
        assert_eq!(drops.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_stack_multithreaded() {
        let stack: Arc<Stack<u8>> = Arc::new(Stack::new());
        let mut waitvec: Vec<thread::JoinHandle<()>> = Vec::new();
        for _ in 0..8 {
            let stack_copy = stack.clone();
            waitvec.push(thread::spawn(move || {
                for _ in 0..10000 {
                    stack_copy.push(2);
                }
            }));
        }
        for _ in 0..8 {
            let stack_copy = stack.clone();
            waitvec.push(thread::spawn(move || {
                for _ in 0..10000 {
                    loop {
                        if stack_copy.pop().is_some() {
                            break;
                        }
                    }
                }
            }));
        }
        for handle in waitvec {
            handle.join().unwrap();
        }
        assert_eq!(None, stack.pop());
        assert_eq!(stack.retired(), 80000);
    }

    #[test]
    fn test_no_value_lost_or_duplicated() {
        let stack: Arc<Stack<usize>> = Arc::new(Stack::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut waitvec = Vec::new();

        for id in 0..4 {
            let s = stack.clone();
            waitvec.push(thread::spawn(move || {
                for i in 0..3000 {
                    s.push(id * 3000 + i);
                }
            }));
            let s = stack.clone();
            let out = seen.clone();
            waitvec.push(thread::spawn(move || {
                let mut local = Vec::new();
                while local.len() < 3000 {
                    if let Some(v) = s.pop() {
                        local.push(v);
                    }
                }
                out.lock().unwrap().extend(local);
            }));
        }
        for handle in waitvec {
            handle.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        let distinct: HashSet<usize> = seen.iter().cloned().collect();
        assert_eq!(seen.len(), 12000);
        assert_eq!(distinct.len(), 12000);
    }

    #[test]
    fn test_yielding_atomics_lifo() {
        let stack: Stack<u32, YieldingAtomics> = Stack::with_atomics();
        for i in 0..50 {
            stack.push(i);
        }
        for i in (0..50).rev() {
            assert_eq!(stack.pop(), Some(i));
        }
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_yielding_atomics_no_value_lost_or_duplicated() {
        let stack: Arc<Stack<usize, YieldingAtomics>> = Arc::new(Stack::with_atomics());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut waitvec = Vec::new();

        for id in 0..4 {
            let s = stack.clone();
            waitvec.push(thread::spawn(move || {
                for i in 0..500 {
                    s.push(id * 500 + i);
                }
            }));
            let s = stack.clone();
            let out = seen.clone();
            waitvec.push(thread::spawn(move || {
                let mut local = Vec::new();
                while local.len() < 500 {
                    if let Some(v) = s.pop() {
                        local.push(v);
                    }
                }
                out.lock().unwrap().extend(local);
            }));
        }
        for handle in waitvec {
            handle.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        let distinct: HashSet<usize> = seen.iter().cloned().collect();
        assert_eq!(seen.len(), 2000);
        assert_eq!(distinct, (0..2000).collect::<HashSet<usize>>());
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.retired(), 2000);
    }

    #[test]
    fn test_linearizable() {
        let stack: Stack<usize> = Stack::new();
        let sequential: Vector<usize> = Vector::new();
        let mut linearizer: LinearizabilityTester<Stack<usize>, Vector<usize>, Option<usize>>
                = LinearizabilityTester::new(4, 200, stack, sequential);

        fn worker(_id: usize, log: &mut ThreadLog<Stack<usize>, Vector<usize>, Option<usize>>) {
            for _ in 0..200 {
                let rand = thread_rng().gen_range(0..101);
                if rand < 50 {
                    let val: usize = thread_rng().gen_range(0..122222);
                    log.log(format!("push: {}", val),
                            move |stack: &Stack<usize>| { stack.push(val); None },
                            move |seq: &Vector<usize>| {
                                let mut next = seq.clone();
                                next.push_back(val);
                                (next, None)
                            });
                } else {
                    log.log("pop",
                            |stack: &Stack<usize>| stack.pop(),
                            |seq: &Vector<usize>| {
                                let mut next = seq.clone();
                                let res = next.pop_back();
                                (next, res)
                            });
                }
            }
        }

        let result = linearizer.run(worker).unwrap();
        assert_eq!(result, LinearizabilityResult::Success);
    }
}
