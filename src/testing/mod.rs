//! Utilities for testing linearizability of concurrent data structures based on the strategy
//! defined by Lowe in [Testing for Linearizability](http://www.cs.ox.ac.uk/people/gavin.lowe/LinearizabiltyTesting/paper.pdf).
//! This should be done by using the LinearizabilityTester struct and the ThreadLog.
//!
//! [`YieldingAtomics`] can be plugged into the `Queue` and the `Stack` in place of the standard
//! atomics, to shake out more interleavings than the scheduler would produce by itself.
//!
//! # Example
//! This is an example of how to use the LinearizabilityTester on a stack. The tester needs
//! a sequential reference data structure along with operations defined on it to match those on
//! the concurrent object.
//! ```
//! # use concurrent_collections::structures::Stack;
//! # use concurrent_collections::testing::{LinearizabilityResult, LinearizabilityTester, ThreadLog};
//! # use im::Vector;
//! let stack: Stack<usize> = Stack::new();
//! let sequential: Vector<usize> = Vector::new();
//! let mut linearizer: LinearizabilityTester<Stack<usize>, Vector<usize>, Option<usize>>
//!         = LinearizabilityTester::new(4, 100, stack, sequential);
//!
//! fn worker(id: usize, log: &mut ThreadLog<Stack<usize>, Vector<usize>, Option<usize>>) {
//!     for i in 0..100 {
//!         if i % 3 == 0 {
//!             log.log("pop",
//!                     |stack: &Stack<usize>| stack.pop(),
//!                     |seq: &Vector<usize>| {
//!                         let mut next = seq.clone();
//!                         let res = next.pop_back();
//!                         (next, res)
//!                     });
//!         } else {
//!             let val = id * 100 + i;
//!             log.log(format!("push: {}", val),
//!                     move |stack: &Stack<usize>| { stack.push(val); None },
//!                     move |seq: &Vector<usize>| {
//!                         let mut next = seq.clone();
//!                         next.push_back(val);
//!                         (next, None)
//!                     });
//!         }
//!     }
//! }
//!
//! let result = linearizer.run(worker).unwrap();
//! assert_eq!(result, LinearizabilityResult::Success);
//! ```

pub use self::interleaving::{YieldingAtomics, YieldingCounter, YieldingPtr};
pub use self::linearizability_tester::{LinearizabilityResult, LinearizabilityTester, ThreadLog};
pub use self::time_stamped::SequentialOp;

pub mod linearizability_tester;
mod automaton;
mod interleaving;
mod time_stamped;
