//! A FIFO task queue drained by one dedicated worker thread.
//!
//! Each tab owns a [`TaskRunner`] whose worker thread owns the tab state.
//! Other threads never touch that state directly; they enqueue closures
//! through a [`TaskSender`] and the worker runs them one at a time, in the
//! order they were scheduled.
//!
//! Worker loop:
//!
//! 1. If quit was requested, run the exit hook and stop.
//! 2. Pop the oldest task, if any, and run it with the lock released.
//! 3. If the queue is empty and quit was not requested, wait for a signal.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::error::BrowserError;

type TaskCode<S> = Box<dyn FnOnce(&mut S) + Send>;

/// A deferred unit of work against the worker's state.
///
/// A task runs at most once; running it again is a no-op.
pub struct Task<S> {
    name: &'static str,
    code: Option<TaskCode<S>>,
}

impl<S> Task<S> {
    /// Wrap `code` as a task called `name` (used in traces).
    pub fn new(name: &'static str, code: impl FnOnce(&mut S) + Send + 'static) -> Self {
        Self {
            name,
            code: Some(Box::new(code)),
        }
    }

    /// The task's name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the task has already run.
    #[must_use]
    pub const fn has_run(&self) -> bool {
        self.code.is_none()
    }

    /// Run the task against `state`. Does nothing the second time.
    pub fn run(&mut self, state: &mut S) {
        if let Some(code) = self.code.take() {
            tracing::trace!(task = self.name, "running task");
            code(state);
        }
    }
}

impl<S> fmt::Debug for Task<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("has_run", &self.has_run())
            .finish()
    }
}

struct QueueState<S> {
    tasks: VecDeque<Task<S>>,
    needs_quit: bool,
}

struct TaskQueue<S> {
    state: Mutex<QueueState<S>>,
    condition: Condvar,
}

impl<S> TaskQueue<S> {
    /// Lock the queue. A panic inside a task never holds this lock, so a
    /// poisoned guard still protects consistent data.
    fn lock(&self) -> MutexGuard<'_, QueueState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle for enqueueing work on a [`TaskRunner`] from any thread.
pub struct TaskSender<S> {
    queue: Arc<TaskQueue<S>>,
}

impl<S> Clone for TaskSender<S> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<S> TaskSender<S> {
    /// Append a task and wake the worker.
    pub fn schedule(&self, task: Task<S>) {
        let mut state = self.queue.lock();
        state.tasks.push_back(task);
        self.queue.condition.notify_all();
    }

    /// Drop every task that has not started yet.
    pub fn clear_pending(&self) {
        let mut state = self.queue.lock();
        let dropped = state.tasks.len();
        state.tasks.clear();
        if dropped > 0 {
            tracing::trace!(dropped, "cleared pending tasks");
        }
    }

    /// Ask the worker to stop after the task it is running, if any.
    pub fn request_quit(&self) {
        let mut state = self.queue.lock();
        state.needs_quit = true;
        self.queue.condition.notify_all();
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().tasks.len()
    }

    /// Whether quit has been requested.
    #[must_use]
    pub fn is_quitting(&self) -> bool {
        self.queue.lock().needs_quit
    }
}

/// Owns a task queue and the worker thread that drains it.
pub struct TaskRunner<S> {
    name: String,
    sender: TaskSender<S>,
    worker: Option<JoinHandle<S>>,
}

impl<S: Send + 'static> TaskRunner<S> {
    /// Create an idle runner. Tasks may be scheduled before [`start`](Self::start);
    /// they run once the worker starts.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sender: TaskSender {
                queue: Arc::new(TaskQueue {
                    state: Mutex::new(QueueState {
                        tasks: VecDeque::new(),
                        needs_quit: false,
                    }),
                    condition: Condvar::new(),
                }),
            },
            worker: None,
        }
    }

    /// A handle for scheduling onto this runner.
    #[must_use]
    pub fn sender(&self) -> TaskSender<S> {
        self.sender.clone()
    }

    /// Move `state` onto a new worker thread and start draining the queue.
    /// `on_exit` runs on the worker, after the last task, once quit is
    /// requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn start(
        &mut self,
        mut state: S,
        on_exit: impl FnOnce(&mut S) + Send + 'static,
    ) -> Result<(), BrowserError> {
        let queue = Arc::clone(&self.sender.queue);
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                run_worker(&queue, &mut state);
                on_exit(&mut state);
                state
            })
            .map_err(|source| BrowserError::Spawn {
                name: self.name.clone(),
                source,
            })?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Append a task and wake the worker.
    pub fn schedule(&self, task: Task<S>) {
        self.sender.schedule(task);
    }

    /// Drop every task that has not started yet.
    pub fn clear_pending(&self) {
        self.sender.clear_pending();
    }

    /// Ask the worker to stop.
    pub fn request_quit(&self) {
        self.sender.request_quit();
    }

    /// Request quit, wait for the worker, and hand back its state.
    ///
    /// Returns `None` if the worker was never started or panicked.
    pub fn join(mut self) -> Option<S> {
        self.sender.request_quit();
        let handle = self.worker.take()?;
        match handle.join() {
            Ok(state) => Some(state),
            Err(_) => {
                tracing::error!(worker = %self.name, "worker thread panicked");
                None
            }
        }
    }
}

impl<S> Drop for TaskRunner<S> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.sender.request_quit();
        }
    }
}

fn run_worker<S>(queue: &TaskQueue<S>, state: &mut S) {
    loop {
        let task = {
            let mut guard = queue.lock();
            if guard.needs_quit {
                return;
            }
            guard.tasks.pop_front()
        };

        if let Some(mut task) = task {
            task.run(state);
        }

        let guard = queue.lock();
        if guard.tasks.is_empty() && !guard.needs_quit {
            drop(
                queue
                    .condition
                    .wait(guard)
                    .unwrap_or_else(PoisonError::into_inner),
            );
        }
    }
}
