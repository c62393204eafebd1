use rayon::{ThreadPoolBuildError, ThreadPoolBuilder};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use super::automaton;
use super::time_stamped::TimeStamped;

/// The verdict on one run of a [`LinearizabilityTester`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinearizabilityResult {
    Success,
    /// No ordering of the history agrees with the sequential model. `linearized` is the length
    /// of the longest prefix that could be ordered.
    Failure { linearized: usize, total: usize }
}

/// Runs workers against one concurrent object and checks the recorded history against a
/// sequential model.
///
/// `C` is the concurrent object, `Seq` the sequential model and `Ret` what every operation
/// returns. Model states must be cheap to clone, which is what the persistent collections of
/// `im` are for.
pub struct LinearizabilityTester<C, Seq, Ret> {
    num_threads: usize,
    iterations: usize,
    concurrent: C,
    sequential: Seq,
    marker: PhantomData<fn() -> Ret>
}

impl<C, Seq, Ret> LinearizabilityTester<C, Seq, Ret>
where C: Sync,
      Seq: Clone + Hash + Eq,
      Ret: PartialEq + Send
{
    /// A tester running `num_threads` workers, each expected to log about `iterations` operations.
    pub fn new(num_threads: usize, iterations: usize, concurrent: C, sequential: Seq) -> Self {
        LinearizabilityTester {
            num_threads,
            iterations,
            concurrent,
            sequential,
            marker: PhantomData
        }
    }

    /// Run `worker` once on each of the threads, then search for a linearization of everything
    /// they logged.
    pub fn run<W>(&mut self, worker: W) -> Result<LinearizabilityResult, ThreadPoolBuildError>
    where W: Fn(usize, &mut ThreadLog<C, Seq, Ret>) + Sync
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .thread_name(|id| format!("linearizability-worker-{}", id))
            .build()?;

        let history: Mutex<Vec<TimeStamped<Seq, Ret>>> = Mutex::new(Vec::new());
        let iterations = self.iterations;
        let concurrent = &self.concurrent;
        let worker = &worker;
        let history_ref = &history;

        pool.scope(|scope| {
            for id in 0..self.num_threads {
                scope.spawn(move |_| {
                    let mut log = ThreadLog::new(id, iterations, concurrent);
                    worker(id, &mut log);
                    history_ref.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend(log.operations);
                });
            }
        });

        let history = history.into_inner().unwrap_or_else(PoisonError::into_inner);
        debug!("Checking a history of {} operations from {} threads", history.len(), self.num_threads);
        Ok(automaton::check(history, self.sequential.clone()))
    }
}

/// The record of the operations one worker performed.
pub struct ThreadLog<'a, C: 'a, Seq, Ret> {
    id: usize,
    concurrent: &'a C,
    operations: Vec<TimeStamped<Seq, Ret>>
}

impl<'a, C: 'a, Seq, Ret> ThreadLog<'a, C, Seq, Ret> {
    fn new(id: usize, iterations: usize, concurrent: &'a C) -> Self {
        ThreadLog {
            id,
            concurrent,
            operations: Vec::with_capacity(iterations)
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Perform `op` on the concurrent object and log it, along with `sequential`, the same
    /// operation on the model.
    pub fn log<M, Op, SeqOp>(&mut self, message: M, op: Op, sequential: SeqOp)
    where M: Into<String>,
          Op: FnOnce(&C) -> Ret,
          SeqOp: Fn(&Seq) -> (Seq, Ret) + Send + 'static
    {
        let message = message.into();
        let invoked = Instant::now();
        let result = op(self.concurrent);
        let returned = Instant::now();
        self.operations.push(TimeStamped {
            thread: self.id,
            message,
            invoked,
            returned,
            result,
            op: Box::new(sequential)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{LinearizabilityResult, LinearizabilityTester, ThreadLog};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_atomic_counter_is_linearizable() {
        let mut tester: LinearizabilityTester<AtomicUsize, usize, usize> =
            LinearizabilityTester::new(4, 100, AtomicUsize::new(0), 0);

        let result = tester.run(|_, log: &mut ThreadLog<AtomicUsize, usize, usize>| {
            for _ in 0..100 {
                log.log("fetch_add", |c: &AtomicUsize| c.fetch_add(1, Ordering::SeqCst), |s: &usize| (s + 1, *s));
            }
        }).unwrap();
        assert_eq!(result, LinearizabilityResult::Success);
    }

    #[test]
    fn test_racy_counter_is_caught() {
        // Each thread bumps its own counter but claims to bump a shared one
        let mut tester: LinearizabilityTester<Mutex<Vec<usize>>, usize, usize> =
            LinearizabilityTester::new(2, 50, Mutex::new(vec![0, 0]), 0);

        let result = tester.run(|id, log: &mut ThreadLog<Mutex<Vec<usize>>, usize, usize>| {
            assert!(log.id() == id);
            for _ in 0..50 {
                log.log("increment", move |c: &Mutex<Vec<usize>>| {
                    let mut counters = c.lock().unwrap();
                    counters[id] += 1;
                    counters[id] - 1
                }, |s: &usize| (s + 1, *s));
            }
        }).unwrap();
        match result {
            LinearizabilityResult::Failure { total, .. } => assert_eq!(total, 100),
            LinearizabilityResult::Success => panic!("private counters passed as a shared counter")
        }
    }
}
