//! File load coordinator and the public loader context.
//!
//! [`BundleLoader`] owns the three pieces of mutable state a loader needs:
//! the set of bundle ids already claimed by `load`, and (through
//! [`BundleRegistry`]) the cached bundle results and queues of pending
//! waiters. Each instance is independent.
//!
//! `load` dispatches one unit per path through the configured
//! [`ResourceLoader`] and joins them on a single task. A unit resolves at
//! its first terminal [`LoadEvent`]; the bundle settles once every unit has
//! resolved. Outcome callbacks fire before the bundle is published.

use crate::error::{LoaderError, Result};
use crate::loaders::{EventSink, LoadEvent, ResourceLoader};
use crate::options::{LoadOptions, ReadyOptions};
use crate::registry::BundleRegistry;
use crate::resource::{OneOrMany, ResourceRequest};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Aggregate result of one `load` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub bundle_id: Option<String>,
    /// Paths that failed, in completion order.
    pub failed_paths: Vec<String>,
}

impl Settlement {
    pub fn is_success(&self) -> bool {
        self.failed_paths.is_empty()
    }
}

/// Handle to an in-flight load. Dropping it does not cancel the load.
#[derive(Debug)]
pub struct LoadHandle {
    bundle_id: Option<String>,
    rx: oneshot::Receiver<Settlement>,
}

impl LoadHandle {
    pub fn bundle_id(&self) -> Option<&str> {
        self.bundle_id.as_deref()
    }

    /// Wait for every path to resolve.
    ///
    /// Never resolves if a unit loses its loader without a terminal event.
    pub async fn wait(self) -> Result<Settlement> {
        self.rx.await.map_err(|_| LoaderError::Cancelled)
    }
}

/// An independent loader context.
pub struct BundleLoader {
    loader: Arc<dyn ResourceLoader>,
    registry: Arc<BundleRegistry>,
    used_ids: Mutex<HashSet<String>>,
}

impl BundleLoader {
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            loader,
            registry: Arc::new(BundleRegistry::new()),
            used_ids: Mutex::new(HashSet::new()),
        }
    }

    pub fn registry(&self) -> &BundleRegistry {
        &self.registry
    }

    fn used_ids(&self) -> MutexGuard<'_, HashSet<String>> {
        self.used_ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start loading `paths`, optionally as the named bundle `bundle_id`.
    ///
    /// Fails synchronously, without dispatching anything, if `bundle_id`
    /// was already claimed by an earlier call. An empty id is treated as no
    /// id. Must be called from within a tokio runtime.
    pub fn load(
        &self,
        paths: impl OneOrMany,
        bundle_id: Option<&str>,
        options: LoadOptions,
    ) -> Result<LoadHandle> {
        let paths = paths.into_vec();
        let bundle_id = bundle_id.filter(|id| !id.is_empty()).map(str::to_string);

        let generation = {
            let mut used = self.used_ids();
            if let Some(id) = &bundle_id {
                if !used.insert(id.clone()) {
                    warn!(bundle = %id, "rejected duplicate bundle id");
                    return Err(LoaderError::DuplicateBundle(id.clone()));
                }
            }
            self.registry.generation()
        };

        let units: Vec<(String, ResourceRequest)> = paths
            .into_iter()
            .map(|path| {
                let mut request = ResourceRequest::new(&path, options.kind, options.async_load);
                if let Some(before) = &options.before {
                    before(&mut request);
                }
                (path, request)
            })
            .collect();

        debug!(
            bundle = bundle_id.as_deref().unwrap_or("-"),
            paths = units.len(),
            "dispatching load"
        );

        let (tx, rx) = oneshot::channel();
        let loader = Arc::clone(&self.loader);
        let registry = Arc::clone(&self.registry);
        let task_id = bundle_id.clone();

        tokio::spawn(async move {
            let failed_paths = load_all(loader, units).await;

            let label = task_id.as_deref().unwrap_or("-");
            if failed_paths.is_empty() {
                info!(bundle = label, "bundle loaded");
            } else {
                warn!(bundle = label, failed = ?failed_paths, "bundle loaded with failures");
            }

            options.finish(&failed_paths);
            if let Some(id) = task_id.as_deref() {
                if !registry.publish_for(generation, id, failed_paths.clone()) {
                    debug!(bundle = id, "context was reset during load, result not published");
                }
            }

            let _ = tx.send(Settlement {
                bundle_id: task_id,
                failed_paths,
            });
        });

        Ok(LoadHandle { bundle_id, rx })
    }

    /// Run `options` once every id in `bundle_ids` has settled.
    ///
    /// `on_fail` receives the ids (not paths) that had failures.
    pub fn ready(&self, bundle_ids: impl OneOrMany, options: ReadyOptions) -> &Self {
        self.registry
            .subscribe(bundle_ids.into_vec(), move |failed_ids| {
                options.finish(failed_ids)
            });
        self
    }

    /// Future form of [`ready`](Self::ready), resolving to the failed ids.
    ///
    /// The subscription is registered immediately, not on first poll.
    pub fn settled(
        &self,
        bundle_ids: impl OneOrMany,
    ) -> impl Future<Output = Result<Vec<String>>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.registry.subscribe(bundle_ids.into_vec(), move |failed_ids| {
            let _ = tx.send(failed_ids);
        });
        async move { rx.await.map_err(|_| LoaderError::Cancelled) }
    }

    /// Mark `bundle_id` as settled with no failures, without loading anything.
    pub fn done(&self, bundle_id: &str) {
        debug!(bundle = %bundle_id, "bundle marked done");
        self.registry.publish(bundle_id, Vec::new());
    }

    /// Claim `bundle_id` without loading and publish `failed_paths` for it.
    ///
    /// Used for bundles that are given up before dispatch, so that a later
    /// `load` under the same id is rejected like any other duplicate.
    pub(crate) fn settle_unloaded(&self, bundle_id: &str, failed_paths: Vec<String>) -> Result<()> {
        if !self.used_ids().insert(bundle_id.to_string()) {
            return Err(LoaderError::DuplicateBundle(bundle_id.to_string()));
        }
        self.registry.publish(bundle_id, failed_paths);
        Ok(())
    }

    /// Whether `bundle_id` has been claimed by a `load` call.
    pub fn is_defined(&self, bundle_id: &str) -> bool {
        self.used_ids().contains(bundle_id)
    }

    /// Forget all bundle ids, results and pending waiters.
    ///
    /// In-flight loads still run their callbacks, but their results are
    /// not published into the reset registry.
    pub fn reset(&self) {
        let mut used = self.used_ids();
        used.clear();
        self.registry.reset();
    }
}

/// Resolve every unit and collect the failed paths in completion order.
async fn load_all(
    loader: Arc<dyn ResourceLoader>,
    units: Vec<(String, ResourceRequest)>,
) -> Vec<String> {
    let mut waiting = units.len();
    let mut failed_paths = Vec::new();

    let mut in_flight: FuturesUnordered<_> = units
        .into_iter()
        .map(|(path, request)| {
            let loader = Arc::clone(&loader);
            async move {
                let event = resolve_unit(loader.as_ref(), request).await;
                (path, event)
            }
        })
        .collect();

    while let Some((path, event)) = in_flight.next().await {
        waiting -= 1;
        debug!(path = %path, ?event, waiting, "resource resolved");
        if event.is_failure() {
            failed_paths.push(path);
        }
    }

    failed_paths
}

/// Drive one loader call until it reports a terminal event.
async fn resolve_unit(loader: &dyn ResourceLoader, request: ResourceRequest) -> LoadEvent {
    let path = request.path.clone();
    let kind = request.kind;
    debug!(path = %path, %kind, async_load = request.async_load, "dispatching resource");
    let (sink, mut events) = EventSink::channel();
    let mut drive = loader.load(request, sink);
    let mut driving = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) if event.is_terminal() => return event,
                Some(event) => debug!(path = %path, %kind, ?event, "ignoring non-terminal event"),
                None => {
                    warn!(path = %path, "loader finished without a terminal event, bundle will not settle");
                    return std::future::pending().await;
                }
            },
            _ = &mut drive, if driving => driving = false,
        }
    }
}
