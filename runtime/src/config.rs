//! Loader configuration: JSON file plus `LOADKIT_*` environment overrides.

use crate::error::{LoaderError, Result};
use crate::loaders::{BlockingLoader, FsLoader, HttpLoader, ResourceLoader};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn default_true() -> bool {
    true
}

/// Which host loader to build and how to wrap it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Directory that relative paths resolve against (filesystem host).
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Base URL for the HTTP host. Takes precedence over `root`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Regex deny list applied before loading.
    #[serde(default)]
    pub block: Vec<String>,
    /// Whether a blocked path fails outright.
    #[serde(default = "default_true")]
    pub confirm_blocks: bool,
    /// Default for `LoadOptions::async_load`.
    #[serde(default = "default_true")]
    pub async_load: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root: None,
            base_url: None,
            block: Vec::new(),
            confirm_blocks: true,
            async_load: true,
        }
    }
}

impl LoaderConfig {
    /// Default config file location: `~/.loadkit/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".loadkit")
            .join("config.json")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let read = || -> Result<Self> {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        };
        read().map_err(|e| LoaderError::Config {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    /// Resolve the effective config.
    ///
    /// An explicit path must exist. Without one, the default file is used
    /// when present. Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `LOADKIT_ROOT`, `LOADKIT_BASE_URL` and `LOADKIT_BLOCK`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(root) = var("LOADKIT_ROOT") {
            self.root = Some(PathBuf::from(root));
        }
        if let Some(base) = var("LOADKIT_BASE_URL") {
            self.base_url = Some(base);
        }
        if let Some(block) = var("LOADKIT_BLOCK") {
            self.block = block
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Build the host loader stack described by this config.
    pub fn build_loader(&self) -> Result<Arc<dyn ResourceLoader>> {
        let host: Arc<dyn ResourceLoader> = match &self.base_url {
            Some(base) => Arc::new(HttpLoader::new(base)?),
            None => {
                let root = match &self.root {
                    Some(root) => root.clone(),
                    None => std::env::current_dir()?,
                };
                Arc::new(FsLoader::new(root))
            }
        };

        if self.block.is_empty() {
            return Ok(host);
        }
        Ok(Arc::new(BlockingLoader::new(
            host,
            &self.block,
            self.confirm_blocks,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "block": ["ads/"] }"#).unwrap();

        let config = LoaderConfig::from_file(&path).unwrap();
        assert_eq!(config.block, vec!["ads/"]);
        assert!(config.confirm_blocks);
        assert!(config.async_load);
        assert!(config.root.is_none());
    }

    #[test]
    fn test_bad_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = LoaderConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, LoaderError::Config { .. }));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LoaderConfig::load(Some(&dir.path().join("absent.json"))).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("LOADKIT_ROOT", "/srv/static"),
            ("LOADKIT_BLOCK", "ads/, tracker ,"),
        ]
        .into_iter()
        .collect();

        let mut config = LoaderConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.root, Some(PathBuf::from("/srv/static")));
        assert_eq!(config.block, vec!["ads/", "tracker"]);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_build_loader_variants() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LoaderConfig {
            root: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(config.build_loader().is_ok());

        config.block = vec!["[".to_string()];
        assert!(matches!(
            config.build_loader(),
            Err(LoaderError::InvalidPattern(_))
        ));

        config.block.clear();
        config.base_url = Some("::nope".to_string());
        assert!(matches!(
            config.build_loader(),
            Err(LoaderError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_configured_stack_end_to_end() {
        use crate::coordinator::BundleLoader;
        use crate::options::LoadOptions;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "run()").unwrap();
        std::fs::write(dir.path().join("site.css"), "html{}").unwrap();
        std::fs::write(dir.path().join("ads.js"), "track()").unwrap();

        let config = LoaderConfig {
            root: Some(dir.path().to_path_buf()),
            block: vec!["^ads".to_string()],
            ..Default::default()
        };
        let loader = BundleLoader::new(config.build_loader().unwrap());

        let settlement = loader
            .load(
                ["app.js", "site.css", "ads.js", "gone.js"],
                Some("page"),
                LoadOptions::new(),
            )
            .unwrap()
            .wait()
            .await
            .unwrap();

        let mut failed = settlement.failed_paths.clone();
        failed.sort();
        assert_eq!(failed, vec!["ads.js", "gone.js"]);
        assert_eq!(loader.settled("page").await.unwrap(), vec!["page"]);
    }
}
