//! Deferred tasks on a cooperative event loop.
//!
//! The reconciler never mutates the stack inside an intercepted native
//! call. It defers the mutation by a short delay so the native call (and
//! whatever the browser does synchronously with it) has finished and the
//! mutation sees the final location. Deferred tasks run in due-time order,
//! ties in submission order, and cannot be cancelled.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A fire-and-forget unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run a task later.
pub trait Scheduler: Send + Sync {
    fn defer(&self, delay: Duration, task: Task);
}

struct Submitted {
    due: Duration,
    seq: u64,
    task: Task,
}

impl PartialEq for Submitted {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Submitted {}

impl PartialOrd for Submitted {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Submitted {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

struct Clock {
    now: Mutex<Duration>,
    next_seq: AtomicU64,
}

/// Handle for submitting tasks to an [`EventLoop`].
#[derive(Clone)]
pub struct LoopHandle {
    clock: Arc<Clock>,
    sender: Sender<Submitted>,
}

impl Scheduler for LoopHandle {
    fn defer(&self, delay: Duration, task: Task) {
        let submitted = Submitted {
            due: *self.clock.now.lock() + delay,
            seq: self.clock.next_seq.fetch_add(1, Ordering::SeqCst),
            task,
        };
        if self.sender.send(submitted).is_err() {
            tracing::warn!("event loop gone, deferred task dropped");
        }
    }
}

/// Single-threaded event loop with a virtual clock.
///
/// The host drives it: [`EventLoop::advance`] moves time forward running
/// everything that falls due, [`EventLoop::run_until_idle`] runs until
/// nothing is queued. Tasks submitted while running are picked up in the
/// same turn if they fall due.
pub struct EventLoop {
    clock: Arc<Clock>,
    sender: Sender<Submitted>,
    receiver: Receiver<Submitted>,
    queue: Mutex<BinaryHeap<Reverse<Submitted>>>,
}

impl EventLoop {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            clock: Arc::new(Clock {
                now: Mutex::new(Duration::ZERO),
                next_seq: AtomicU64::new(0),
            }),
            sender,
            receiver,
            queue: Mutex::new(BinaryHeap::new()),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            clock: Arc::clone(&self.clock),
            sender: self.sender.clone(),
        }
    }

    /// Virtual time elapsed since the loop was created.
    pub fn now(&self) -> Duration {
        *self.clock.now.lock()
    }

    /// Tasks submitted and not yet run.
    pub fn pending(&self) -> usize {
        self.collect();
        self.queue.lock().len()
    }

    /// Move time forward by `by`, running every task that falls due.
    /// Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut ran = 0;

        while let Some(task) = self.pop_due(Some(target)) {
            task();
            ran += 1;
        }

        *self.clock.now.lock() = target;
        ran
    }

    /// Run until nothing is queued, moving time to each task's due time.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.pop_due(None) {
            task();
            ran += 1;
        }
        ran
    }

    fn collect(&self) {
        let mut queue = self.queue.lock();
        for submitted in self.receiver.try_iter() {
            queue.push(Reverse(submitted));
        }
    }

    /// Pop the earliest task due by `limit` (any task with no limit) and
    /// move the clock to its due time.
    fn pop_due(&self, limit: Option<Duration>) -> Option<Task> {
        self.collect();
        let mut queue = self.queue.lock();

        let due = queue.peek()?.0.due;
        if limit.map_or(false, |limit| due > limit) {
            return None;
        }

        let Reverse(submitted) = queue.pop()?;
        let mut now = self.clock.now.lock();
        if submitted.due > *now {
            *now = submitted.due;
        }
        Some(submitted.task)
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for EventLoop {
    fn defer(&self, delay: Duration, task: Task) {
        self.handle().defer(delay, task)
    }
}
