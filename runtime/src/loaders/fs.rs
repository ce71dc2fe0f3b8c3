//! Filesystem host: resolves paths against a root directory.

use super::{EventSink, LoadEvent, ResourceLoader};
use crate::resource::{ResourceKind, ResourceRequest};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Loads resources from local files under `root`.
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a request path (URL-ish, may carry a query) onto the root.
    fn resolve(&self, path: &str) -> PathBuf {
        let bare = path.split(['?', '#']).next().unwrap_or(path);
        self.root.join(bare.trim_start_matches('/'))
    }

    async fn probe(&self, request: &ResourceRequest) -> std::io::Result<LoadEvent> {
        let file = self.resolve(&request.path);

        if request.kind == ResourceKind::Stylesheet {
            // An empty sheet counts as a failed load.
            let text = tokio::fs::read_to_string(&file).await?;
            return Ok(if text.trim().is_empty() {
                LoadEvent::Errored
            } else {
                LoadEvent::Loaded
            });
        }

        let meta = tokio::fs::metadata(&file).await?;
        if !meta.is_file() {
            return Ok(LoadEvent::Errored);
        }
        tokio::fs::File::open(&file).await?;
        Ok(LoadEvent::Loaded)
    }
}

#[async_trait]
impl ResourceLoader for FsLoader {
    async fn load(&self, request: ResourceRequest, events: EventSink) {
        let event = match self.probe(&request).await {
            Ok(event) => event,
            Err(e) => {
                debug!(path = %request.path, "fs load failed: {e}");
                LoadEvent::Errored
            }
        };
        events.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(loader: &FsLoader, path: &str) -> LoadEvent {
        let (sink, mut rx) = EventSink::channel();
        loader
            .load(ResourceRequest::new(path, None, true), sink)
            .await;
        rx.recv().await.unwrap()
    }

    #[tokio::test]
    async fn test_existing_script_loads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        let loader = FsLoader::new(dir.path());

        assert_eq!(run(&loader, "app.js").await, LoadEvent::Loaded);
        assert_eq!(run(&loader, "/app.js?v=2").await, LoadEvent::Loaded);
    }

    #[tokio::test]
    async fn test_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FsLoader::new(dir.path());
        assert_eq!(run(&loader, "nope.js").await, LoadEvent::Errored);
    }

    #[tokio::test]
    async fn test_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        let loader = FsLoader::new(dir.path());
        assert_eq!(run(&loader, "lib").await, LoadEvent::Errored);
    }

    #[tokio::test]
    async fn test_empty_stylesheet_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty.css"), "  \n").unwrap();
        std::fs::write(dir.path().join("site.css"), "body{margin:0}").unwrap();
        let loader = FsLoader::new(dir.path());

        assert_eq!(run(&loader, "empty.css").await, LoadEvent::Errored);
        assert_eq!(run(&loader, "site.css").await, LoadEvent::Loaded);
    }
}
