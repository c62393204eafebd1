use std::fmt;
use std::time::Instant;

/// What a sequential model does for one operation: the next model state and the result the
/// concurrent operation should have returned.
pub type SequentialOp<Seq, Ret> = Box<dyn Fn(&Seq) -> (Seq, Ret) + Send>;

/// One completed operation on the concurrent object, with the interval it ran in.
pub struct TimeStamped<Seq, Ret> {
    pub thread: usize,
    pub message: String,
    pub invoked: Instant,
    pub returned: Instant,
    pub result: Ret,
    pub op: SequentialOp<Seq, Ret>
}

impl<Seq, Ret> TimeStamped<Seq, Ret> {
    /// True if this operation returned before `other` was invoked, so that every
    /// linearization must order it first.
    pub fn precedes(&self, other: &Self) -> bool {
        self.returned < other.invoked
    }
}

impl<Seq, Ret: fmt::Debug> fmt::Debug for TimeStamped<Seq, Ret> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[thread {}] {} -> {:?}", self.thread, self.message, self.result)
    }
}
