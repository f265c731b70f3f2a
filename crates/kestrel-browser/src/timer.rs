//! One-shot delayed callbacks on a shared timer thread.
//!
//! Used for the compositor's animation-frame timer and for page-scheduled
//! timeouts. Callbacks run on the timer thread, so they should only hand
//! work to the thread that owns the state they touch (by scheduling a
//! task), never do it themselves.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::BrowserError;

type Callback = Box<dyn FnOnce() + Send>;

/// Identifies a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct TimerState {
    next_id: u64,
    deadlines: BinaryHeap<Reverse<(Instant, u64)>>,
    callbacks: HashMap<u64, Callback>,
    shutdown: bool,
}

struct TimerShared {
    state: Mutex<TimerState>,
    condition: Condvar,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TimerShared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the timer thread. Clones share the same thread.
#[derive(Clone)]
pub struct TimerService {
    shared: Arc<TimerShared>,
}

impl TimerService {
    /// Spawn the timer thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn start() -> Result<Self, BrowserError> {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                next_id: 0,
                deadlines: BinaryHeap::new(),
                callbacks: HashMap::new(),
                shutdown: false,
            }),
            condition: Condvar::new(),
            worker: Mutex::new(None),
        });
        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("timer".to_string())
            .spawn(move || run_timers(&worker))
            .map_err(|source| BrowserError::Spawn {
                name: "timer".to_string(),
                source,
            })?;
        *shared.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(Self { shared })
    }

    /// Run `callback` once, no earlier than `delay` from now.
    pub fn schedule(&self, delay: Duration, callback: impl FnOnce() + Send + 'static) -> TimerId {
        let mut state = self.shared.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.deadlines.push(Reverse((Instant::now() + delay, id)));
        let _ = state.callbacks.insert(id, Box::new(callback));
        self.shared.condition.notify_all();
        TimerId(id)
    }

    /// Cancel a callback that has not fired. Returns whether it was pending.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.shared.lock().callbacks.remove(&id.0).is_some()
    }

    /// Number of callbacks still waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.lock().callbacks.len()
    }

    /// Stop the timer thread and wait for it to exit. Pending callbacks are
    /// dropped unrun. A callback that calls this from the timer thread
    /// itself only stops the thread.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            state.shutdown = true;
            state.callbacks.clear();
            self.shared.condition.notify_all();
        }
        let handle = self
            .shared
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::warn!("timer thread panicked");
        }
    }

    /// Whether the timer thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

fn run_timers(shared: &TimerShared) {
    let mut state = shared.lock();
    loop {
        if state.shutdown {
            return;
        }
        let next = state.deadlines.peek().map(|Reverse(entry)| *entry);
        match next {
            None => {
                state = shared
                    .condition
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            Some((deadline, id)) => {
                let now = Instant::now();
                if deadline <= now {
                    let _ = state.deadlines.pop();
                    // Cancelled timers leave a deadline with no callback.
                    if let Some(callback) = state.callbacks.remove(&id) {
                        drop(state);
                        callback();
                        state = shared.lock();
                    }
                } else {
                    state = shared
                        .condition
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }
}
