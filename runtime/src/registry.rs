//! Bundle registry: publish/subscribe over named bundle results.
//!
//! A bundle id is published at most once. Its failed-path list is cached
//! for the life of the registry and every later subscriber is served from
//! that cache immediately. Subscribers that arrive before settlement are
//! queued per id and drained in FIFO order when the id is published.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Per-id settlement handler: receives `(bundle_id, failed_paths)`.
type Handler = Box<dyn FnOnce(&str, &[String]) + Send>;

/// Callback fired once all of a waiter's ids settled, with the failed ids.
pub type SettledFn = Box<dyn FnOnce(Vec<String>) + Send>;

#[derive(Default)]
struct RegistryState {
    /// Bumped by `reset`; loads dispatched under an older generation may not publish.
    generation: u64,
    results: HashMap<String, Vec<String>>,
    pending: HashMap<String, VecDeque<Handler>>,
}

/// Cached bundle results plus queues of handlers waiting on unsettled ids.
#[derive(Default)]
pub struct BundleRegistry {
    state: Mutex<RegistryState>,
}

impl BundleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // Handlers never run under the lock, so a poisoned guard still holds
        // consistent maps.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for every id in `bundle_ids` to settle.
    ///
    /// `on_all_settled` fires exactly once with the ids whose load had at
    /// least one failed path. Cached ids settle immediately, on the caller's
    /// stack. Duplicate ids are counted independently. An empty id list
    /// fires immediately with no failures.
    pub fn subscribe(
        &self,
        bundle_ids: Vec<String>,
        on_all_settled: impl FnOnce(Vec<String>) + Send + 'static,
    ) {
        if bundle_ids.is_empty() {
            on_all_settled(Vec::new());
            return;
        }

        let waiter = Arc::new(Waiter::new(bundle_ids.len(), Box::new(on_all_settled)));

        for id in bundle_ids {
            let cached = {
                let mut state = self.lock();
                match state.results.get(&id) {
                    Some(failed) => Some(failed.clone()),
                    None => {
                        let w = Arc::clone(&waiter);
                        state
                            .pending
                            .entry(id.clone())
                            .or_default()
                            .push_back(Box::new(move |id, failed| w.settle(id, failed)));
                        None
                    }
                }
            };

            match cached {
                Some(failed) => waiter.settle(&id, &failed),
                None => debug!(bundle = %id, "queued waiter for unsettled bundle"),
            }
        }
    }

    /// Record the result for `bundle_id` and drain its waiters.
    ///
    /// An empty id is an anonymous load and is ignored. A second publish for
    /// an id keeps the first result.
    pub fn publish(&self, bundle_id: &str, failed_paths: Vec<String>) {
        self.publish_in(None, bundle_id, failed_paths);
    }

    /// Like [`publish`](Self::publish), but dropped when the registry was
    /// reset after `generation` was read. Returns whether it was applied.
    pub fn publish_for(&self, generation: u64, bundle_id: &str, failed_paths: Vec<String>) -> bool {
        self.publish_in(Some(generation), bundle_id, failed_paths)
    }

    /// Current reset generation.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn publish_in(&self, generation: Option<u64>, bundle_id: &str, failed_paths: Vec<String>) -> bool {
        if bundle_id.is_empty() {
            return false;
        }

        let failed = {
            let mut state = self.lock();
            if generation.is_some_and(|g| g != state.generation) {
                debug!(bundle = %bundle_id, "dropping publish from before reset");
                return false;
            }
            match state.results.get(bundle_id) {
                Some(existing) => {
                    debug!(bundle = %bundle_id, "bundle already settled, keeping first result");
                    existing.clone()
                }
                None => {
                    state
                        .results
                        .insert(bundle_id.to_string(), failed_paths.clone());
                    failed_paths
                }
            }
        };

        // Pop one handler at a time so handlers may re-enter the registry.
        let mut drained = 0usize;
        loop {
            let handler = {
                let mut state = self.lock();
                let next = state
                    .pending
                    .get_mut(bundle_id)
                    .and_then(VecDeque::pop_front);
                if next.is_none() {
                    state.pending.remove(bundle_id);
                }
                next
            };
            match handler {
                Some(handler) => {
                    handler(bundle_id, &failed);
                    drained += 1;
                }
                None => break,
            }
        }

        debug!(
            bundle = %bundle_id,
            failed = failed.len(),
            waiters = drained,
            "published bundle"
        );
        true
    }

    /// Cached failed paths for a settled bundle.
    pub fn result(&self, bundle_id: &str) -> Option<Vec<String>> {
        self.lock().results.get(bundle_id).cloned()
    }

    pub fn is_settled(&self, bundle_id: &str) -> bool {
        self.lock().results.contains_key(bundle_id)
    }

    /// Number of handlers still queued for `bundle_id`.
    pub fn pending_count(&self, bundle_id: &str) -> usize {
        self.lock().pending.get(bundle_id).map_or(0, VecDeque::len)
    }

    /// Forget every result and drop queued handlers without calling them.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.results.clear();
        state.pending.clear();
    }
}

/// One `subscribe` registration: counts down its unsettled ids.
struct Waiter {
    state: Mutex<WaiterState>,
}

struct WaiterState {
    remaining: usize,
    failed_ids: Vec<String>,
    callback: Option<SettledFn>,
}

impl Waiter {
    fn new(remaining: usize, callback: SettledFn) -> Self {
        Self {
            state: Mutex::new(WaiterState {
                remaining,
                failed_ids: Vec::new(),
                callback: Some(callback),
            }),
        }
    }

    fn settle(&self, bundle_id: &str, failed_paths: &[String]) {
        let fire = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !failed_paths.is_empty() {
                state.failed_ids.push(bundle_id.to_string());
            }
            state.remaining = state.remaining.saturating_sub(1);
            if state.remaining == 0 {
                let failed_ids = std::mem::take(&mut state.failed_ids);
                state.callback.take().map(|cb| (cb, failed_ids))
            } else {
                None
            }
        };

        if let Some((callback, failed_ids)) = fire {
            callback(failed_ids);
        }
    }
}
