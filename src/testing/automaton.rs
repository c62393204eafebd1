//! The search for a linearization of a recorded history.
//!
//! This is the Wing & Gong depth-first search with Lowe's memoization: a configuration is the
//! set of operations linearized so far together with the state of the sequential model, and no
//! configuration is explored twice.

use super::linearizability_tester::LinearizabilityResult;
use super::time_stamped::TimeStamped;
use std::collections::HashSet;
use std::hash::Hash;

#[derive(Clone, PartialEq, Eq, Hash)]
struct Configuration<Seq> {
    linearized: Vec<u64>,
    sequential: Seq
}

impl<Seq> Configuration<Seq> {
    fn is_linearized(&self, index: usize) -> bool {
        self.linearized[index / 64] & (1 << (index % 64)) != 0
    }

    fn with_linearized(&self, index: usize, sequential: Seq) -> Self {
        let mut linearized = self.linearized.clone();
        linearized[index / 64] |= 1 << (index % 64);
        Configuration { linearized, sequential }
    }
}

struct Frame<Seq> {
    configuration: Configuration<Seq>,
    pending: Vec<usize>
}

enum Step<Seq> {
    Backtrack,
    Skip,
    Descend(Configuration<Seq>)
}

/// The operations which may be linearized next: those not yet linearized which no other
/// unlinearized operation precedes in real time. `history` must be sorted by invocation.
fn candidates<Seq, Ret>(history: &[TimeStamped<Seq, Ret>], configuration: &Configuration<Seq>) -> Vec<usize> {
    let mut result = Vec::new();
    let mut earliest_return: Option<&TimeStamped<Seq, Ret>> = None;
    for (index, op) in history.iter().enumerate() {
        if configuration.is_linearized(index) {
            continue;
        }
        if let Some(earliest) = earliest_return {
            // Everything from here on was invoked after some pending operation returned
            if earliest.precedes(op) {
                break;
            }
        }
        result.push(index);
        earliest_return = match earliest_return {
            Some(earliest) if earliest.returned <= op.returned => Some(earliest),
            _ => Some(op)
        };
    }
    result
}

pub fn check<Seq, Ret>(mut history: Vec<TimeStamped<Seq, Ret>>, initial: Seq) -> LinearizabilityResult
where Seq: Clone + Hash + Eq,
      Ret: PartialEq
{
    let total = history.len();
    if total == 0 {
        return LinearizabilityResult::Success;
    }
    history.sort_by_key(|op| op.invoked);

    let start = Configuration {
        linearized: vec![0; (total + 63) / 64],
        sequential: initial
    };
    let mut visited: HashSet<Configuration<Seq>> = HashSet::new();
    let mut stack = vec![Frame {
        pending: candidates(&history, &start),
        configuration: start
    }];
    let mut deepest = 0;

    loop {
        let depth = stack.len() - 1;
        let step = match stack.last_mut() {
            None => break,
            Some(frame) => match frame.pending.pop() {
                None => Step::Backtrack,
                Some(index) => {
                    let op = &history[index];
                    let (sequential, result) = (op.op)(&frame.configuration.sequential);
                    if result == op.result {
                        Step::Descend(frame.configuration.with_linearized(index, sequential))
                    } else {
                        Step::Skip
                    }
                }
            }
        };

        match step {
            Step::Backtrack => {
                stack.pop();
                if stack.is_empty() {
                    break;
                }
            },
            Step::Skip => {},
            Step::Descend(configuration) => {
                if depth + 1 == total {
                    return LinearizabilityResult::Success;
                }
                if !visited.insert(configuration.clone()) {
                    continue;
                }
                if depth + 1 > deepest {
                    deepest = depth + 1;
                }
                stack.push(Frame {
                    pending: candidates(&history, &configuration),
                    configuration
                });
            }
        }
    }

    LinearizabilityResult::Failure {
        linearized: deepest,
        total
    }
}
