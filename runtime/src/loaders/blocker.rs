//! Content blocker: intercepts paths matching a deny list before insertion.
//!
//! A confirmed block fails the path outright. An unconfirmed block is only
//! advisory: the inner loader still runs and reports the real outcome.

use super::{EventSink, LoadEvent, ResourceLoader};
use crate::error::Result;
use crate::resource::ResourceRequest;
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

pub struct BlockingLoader {
    inner: Arc<dyn ResourceLoader>,
    patterns: Vec<Regex>,
    confirm: bool,
}

impl BlockingLoader {
    pub fn new(inner: Arc<dyn ResourceLoader>, patterns: &[String], confirm: bool) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            inner,
            patterns,
            confirm,
        })
    }

    pub fn is_blocked(&self, path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(path))
    }
}

#[async_trait]
impl ResourceLoader for BlockingLoader {
    async fn load(&self, request: ResourceRequest, events: EventSink) {
        if self.is_blocked(&request.path) {
            debug!(path = %request.path, confirmed = self.confirm, "blocked resource");
            events.emit(LoadEvent::Blocked {
                default_prevented: self.confirm,
            });
            if self.confirm {
                return;
            }
        }
        self.inner.load(request, events).await;
    }
}
