//! HTTP host: fetches resources relative to a base URL.

use super::{EventSink, LoadEvent, ResourceLoader};
use crate::error::Result;
use crate::resource::{ResourceKind, ResourceRequest};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Loads resources over HTTP(S) with a shared client.
pub struct HttpLoader {
    base: Url,
    client: reqwest::Client,
}

impl HttpLoader {
    pub fn new(base: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("loadkit/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Self::with_client(base, client)
    }

    pub fn with_client(base: &str, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            base: Url::parse(base)?,
            client,
        })
    }

    async fn fetch(&self, request: &ResourceRequest) -> anyhow::Result<LoadEvent> {
        let url = self.base.join(&request.path)?;
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            debug!(path = %request.path, status = resp.status().as_u16(), "http load failed");
            return Ok(LoadEvent::Errored);
        }

        if request.kind == ResourceKind::Stylesheet {
            let body = resp.text().await?;
            if body.trim().is_empty() {
                return Ok(LoadEvent::Errored);
            }
        }

        Ok(LoadEvent::Loaded)
    }
}

#[async_trait]
impl ResourceLoader for HttpLoader {
    async fn load(&self, request: ResourceRequest, events: EventSink) {
        let event = match self.fetch(&request).await {
            Ok(event) => event,
            Err(e) => {
                debug!(path = %request.path, "http load failed: {e}");
                LoadEvent::Errored
            }
        };
        events.emit(event);
    }
}
