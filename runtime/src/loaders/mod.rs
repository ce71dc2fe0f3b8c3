//! Host-side single-resource loaders.
//!
//! A [`ResourceLoader`] is the environment capability the coordinator
//! depends on: it takes one [`ResourceRequest`] and reports what happened
//! through an [`EventSink`]. A loader may report several events for one
//! request (an unconfirmed block followed by the real outcome, for
//! instance); the coordinator stops listening at the first terminal event.

pub mod blocker;
pub mod fs;
pub mod http;

use crate::resource::ResourceRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use blocker::BlockingLoader;
pub use fs::FsLoader;
pub use http::HttpLoader;

/// One event reported by a loader for a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum LoadEvent {
    Loaded,
    Errored,
    /// Insertion was intercepted before loading. Only a confirmed
    /// (`default_prevented`) block is final.
    Blocked { default_prevented: bool },
}

impl LoadEvent {
    /// Whether this event ends the resource's load.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            LoadEvent::Blocked {
                default_prevented: false
            }
        )
    }

    /// Whether a terminal event marks the path as failed.
    pub fn is_failure(&self) -> bool {
        !matches!(self, LoadEvent::Loaded)
    }
}

/// Sending half handed to a loader for one request.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<LoadEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LoadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report an event. Events sent after the coordinator stopped listening
    /// are dropped.
    pub fn emit(&self, event: LoadEvent) {
        let _ = self.tx.send(event);
    }
}

/// Loads a single resource and reports its outcome.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    async fn load(&self, request: ResourceRequest, events: EventSink);
}

#[cfg(test)]
pub(crate) mod scripted {
    //! In-memory loader for tests: replays a fixed event script per path.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    pub struct ScriptedLoader {
        scripts: HashMap<String, (Duration, Vec<LoadEvent>)>,
        pub requests: Mutex<Vec<ResourceRequest>>,
    }

    impl ScriptedLoader {
        pub fn new() -> Self {
            Self::default()
        }

        /// Emit `events` for `path` after `delay_ms`.
        pub fn script(mut self, path: &str, delay_ms: u64, events: &[LoadEvent]) -> Self {
            self.scripts.insert(
                path.to_string(),
                (Duration::from_millis(delay_ms), events.to_vec()),
            );
            self
        }

        pub fn dispatched(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.path.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ResourceLoader for ScriptedLoader {
        async fn load(&self, request: ResourceRequest, events: EventSink) {
            let (delay, script) = self
                .scripts
                .get(&request.path)
                .cloned()
                .unwrap_or((Duration::ZERO, vec![LoadEvent::Loaded]));
            self.requests.lock().unwrap().push(request);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            for event in script {
                events.emit(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(LoadEvent::Loaded.is_terminal());
        assert!(LoadEvent::Errored.is_terminal());
        assert!(LoadEvent::Blocked {
            default_prevented: true
        }
        .is_terminal());
        assert!(!LoadEvent::Blocked {
            default_prevented: false
        }
        .is_terminal());
    }

    #[test]
    fn test_failure_classification() {
        assert!(!LoadEvent::Loaded.is_failure());
        assert!(LoadEvent::Errored.is_failure());
        assert!(LoadEvent::Blocked {
            default_prevented: true
        }
        .is_failure());
    }

    #[tokio::test]
    async fn test_sink_survives_closed_receiver() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(LoadEvent::Loaded);
    }
}
