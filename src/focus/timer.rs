//! Delayed task execution.
//!
//! The autofocus cadence only needs "run this once after a delay, unless
//! cancelled". [`TokioScheduler`] does that on a tokio runtime;
//! [`ManualScheduler`] does it on a virtual clock that tests advance by
//! hand.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// A one-shot task.
pub type Task = Box<dyn FnOnce() + Send>;

/// A scheduled task that has not run yet.
pub trait TimerTask: Send {
    /// Prevents the task from running. No-op if it already ran.
    fn cancel(self: Box<Self>);
}

/// Runs tasks after a delay.
pub trait Scheduler: Send + Sync {
    /// Schedules `task` to run once after `delay`.
    fn schedule(&self, delay: Duration, task: Task) -> Box<dyn TimerTask>;
}

/// Scheduler backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Creates a scheduler on the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Creates a scheduler on the runtime of the calling task.
    ///
    /// Returns `None` outside a tokio runtime.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Box<dyn TimerTask> {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        Box::new(join)
    }
}

impl TimerTask for JoinHandle<()> {
    fn cancel(self: Box<Self>) {
        self.abort();
    }
}

struct Entry {
    id: u64,
    due: Duration,
    task: Task,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    queue: Vec<Entry>,
}

/// Scheduler driven by an explicit virtual clock.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    /// Creates a scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Moves the clock forward, running every task that falls due in
    /// due order. Tasks scheduled while advancing run too if they fall
    /// due within the window.
    ///
    /// Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let deadline = self.state.lock().now + by;
        let mut ran = 0;
        loop {
            let next = {
                let mut state = self.state.lock();
                let earliest = state
                    .queue
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| entry.due <= deadline)
                    .min_by_key(|(_, entry)| (entry.due, entry.id))
                    .map(|(index, _)| index);
                match earliest {
                    Some(index) => {
                        let entry = state.queue.remove(index);
                        state.now = entry.due;
                        Some(entry.task)
                    }
                    None => {
                        state.now = deadline;
                        None
                    }
                }
            };
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Box<dyn TimerTask> {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay;
        state.queue.push(Entry { id, due, task });
        Box::new(ManualTask {
            id,
            state: Arc::downgrade(&self.state),
        })
    }
}

struct ManualTask {
    id: u64,
    state: Weak<Mutex<ManualState>>,
}

impl TimerTask for ManualTask {
    fn cancel(self: Box<Self>) {
        if let Some(state) = self.state.upgrade() {
            state.lock().queue.retain(|entry| entry.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(counter: &Arc<AtomicUsize>) -> Task {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_manual_runs_when_due() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let _task = scheduler.schedule(Duration::from_millis(1000), counting_task(&hits));

        assert_eq!(scheduler.advance(Duration::from_millis(999)), 0);
        assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.now(), Duration::from_millis(1000));
    }

    #[test]
    fn test_manual_cancel() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let task = scheduler.schedule(Duration::from_millis(10), counting_task(&hits));
        task.cancel();

        assert_eq!(scheduler.advance(Duration::from_secs(1)), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_manual_runs_rescheduled_tasks_in_window() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let inner_scheduler = scheduler.clone();
        let inner_hits = Arc::clone(&hits);
        let _task = scheduler.schedule(
            Duration::from_millis(100),
            Box::new(move || {
                inner_hits.fetch_add(1, Ordering::SeqCst);
                let _ = inner_scheduler.schedule(Duration::from_millis(100), counting_task(&inner_hits));
            }),
        );

        assert_eq!(scheduler.advance(Duration::from_millis(250)), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_cancel() {
        let scheduler = TokioScheduler::current().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let fired = scheduler.schedule(Duration::from_millis(5), counting_task(&hits));
        let cancelled = scheduler.schedule(Duration::from_millis(5), counting_task(&hits));
        cancelled.cancel();
        drop(fired);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
