// src/debounce.rs

//! Keyed trailing-edge debouncer with a cooldown window.
//!
//! [`Debouncer::schedule`] arms a timer for a key, replacing any timer that
//! is still pending for that key. When a timer elapses, its action runs only
//! if at least `cooldown` has passed since the last action that actually ran
//! for the same key; otherwise it is dropped for good (nothing is queued or
//! rescheduled).
//!
//! Timers are Tokio tasks and the clock is `tokio::time::Instant`, so
//! `schedule` must be called from within a Tokio runtime, and tests can drive
//! the debouncer with paused time.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::debug;

struct PendingTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

struct DebounceState<K> {
    timers: HashMap<K, PendingTimer>,
    last_fired: HashMap<K, Instant>,
    next_generation: u64,
}

/// Delay + cooldown scheduler keyed by `K` (the command name in practice).
///
/// Cloning is cheap; clones share the same timers and cooldown bookkeeping.
pub struct Debouncer<K> {
    state: Arc<Mutex<DebounceState<K>>>,
    cooldown: Duration,
}

impl<K> Clone for Debouncer<K> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            cooldown: self.cooldown,
        }
    }
}

impl<K> std::fmt::Debug for Debouncer<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(DebounceState {
                timers: HashMap::new(),
                last_fired: HashMap::new(),
                next_generation: 0,
            })),
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Cancel any pending timer for `key` and arm a new one that runs
    /// `action` after `delay`, subject to the cooldown check.
    pub fn schedule<F>(&self, key: K, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = lock(&self.state);

        state.next_generation += 1;
        let generation = state.next_generation;

        if let Some(previous) = state.timers.remove(&key) {
            previous.handle.abort();
            debug!(?key, "debounce: replaced pending timer");
        }

        let shared = Arc::clone(&self.state);
        let cooldown = self.cooldown;
        let timer_key = key.clone();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            fire(&shared, timer_key, generation, cooldown, action);
        });

        state.timers.insert(key, PendingTimer { generation, handle });
    }

    /// Whether a timer is currently armed for `key`.
    pub fn is_pending(&self, key: &K) -> bool {
        lock(&self.state).timers.contains_key(key)
    }
}

fn fire<K, F>(
    state: &Mutex<DebounceState<K>>,
    key: K,
    generation: u64,
    cooldown: Duration,
    action: F,
) where
    K: Eq + Hash + Debug,
    F: FnOnce(),
{
    let now = Instant::now();

    {
        let mut state = lock(state);

        // An aborted timer can still get here if it woke up while `schedule`
        // held the lock.
        match state.timers.get(&key) {
            Some(timer) if timer.generation == generation => {}
            _ => return,
        }
        state.timers.remove(&key);

        if let Some(last) = state.last_fired.get(&key) {
            let elapsed = now.duration_since(*last);
            if elapsed < cooldown {
                debug!(
                    ?key,
                    elapsed_ms = elapsed.as_millis() as u64,
                    cooldown_ms = cooldown.as_millis() as u64,
                    "debounce: within cooldown; dropping action"
                );
                return;
            }
        }

        state.last_fired.insert(key, now);
    }

    action();
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
