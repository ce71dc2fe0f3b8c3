//! Bundle manifests: named bundles with paths and dependencies.
//!
//! Every bundle waits on its dependencies through the loader's registry and
//! then loads its own paths. A bundle with a failed dependency is skipped
//! and published as failed, so the failure propagates down the chain.

use crate::coordinator::BundleLoader;
use crate::error::{LoaderError, Result};
use crate::options::LoadOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSpec {
    pub id: String,
    pub paths: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub bundles: Vec<BundleSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleStatus {
    Loaded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleReport {
    pub id: String,
    pub status: BundleStatus,
    pub failed_paths: Vec<String>,
    /// Dependencies that failed, for skipped bundles.
    pub failed_dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestReport {
    pub finished_at: DateTime<Utc>,
    pub bundles: Vec<BundleReport>,
}

impl ManifestReport {
    pub fn is_success(&self) -> bool {
        self.bundles
            .iter()
            .all(|b| b.status == BundleStatus::Loaded)
    }
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Check ids, paths and the dependency graph.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for bundle in &self.bundles {
            if bundle.id.is_empty() {
                return Err(LoaderError::Manifest("bundle with empty id".into()));
            }
            if !ids.insert(bundle.id.as_str()) {
                return Err(LoaderError::Manifest(format!(
                    "duplicate bundle '{}'",
                    bundle.id
                )));
            }
            if bundle.paths.is_empty() {
                return Err(LoaderError::Manifest(format!(
                    "bundle '{}' lists no paths",
                    bundle.id
                )));
            }
        }

        for bundle in &self.bundles {
            if let Some(dep) = bundle.depends_on.iter().find(|d| !ids.contains(d.as_str())) {
                return Err(LoaderError::Manifest(format!(
                    "bundle '{}' depends on unknown bundle '{dep}'",
                    bundle.id
                )));
            }
        }

        if let Some(id) = self.find_cycle() {
            return Err(LoaderError::Manifest(format!(
                "dependency cycle through '{id}'"
            )));
        }
        Ok(())
    }

    /// Depth-first search; returns a bundle id on a cycle.
    fn find_cycle(&self) -> Option<&str> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            id: &'a str,
            deps: &HashMap<&'a str, &'a [String]>,
            marks: &mut HashMap<&'a str, Mark>,
        ) -> Option<&'a str> {
            match marks.get(id) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => return Some(id),
                None => {}
            }
            marks.insert(id, Mark::Visiting);
            for dep in deps.get(id).copied().unwrap_or_default() {
                if let Some(found) = visit(dep, deps, marks) {
                    return Some(found);
                }
            }
            marks.insert(id, Mark::Done);
            None
        }

        let deps: HashMap<&str, &[String]> = self
            .bundles
            .iter()
            .map(|b| (b.id.as_str(), b.depends_on.as_slice()))
            .collect();
        let mut marks = HashMap::new();

        self.bundles
            .iter()
            .find_map(|b| visit(b.id.as_str(), &deps, &mut marks))
    }

    /// Load every bundle once its dependencies settle.
    pub async fn run(&self, loader: &BundleLoader, async_load: bool) -> Result<ManifestReport> {
        self.validate()?;

        let runs = self.bundles.iter().map(|spec| async move {
            let failed_deps = loader.settled(spec.depends_on.clone()).await?;
            if !failed_deps.is_empty() {
                warn!(bundle = %spec.id, deps = ?failed_deps, "skipping bundle with failed dependencies");
                loader.settle_unloaded(&spec.id, spec.paths.clone())?;
                return Ok(BundleReport {
                    id: spec.id.clone(),
                    status: BundleStatus::Skipped,
                    failed_paths: spec.paths.clone(),
                    failed_dependencies: failed_deps,
                });
            }

            let settlement = loader
                .load(
                    spec.paths.clone(),
                    Some(spec.id.as_str()),
                    LoadOptions::new().async_load(async_load),
                )?
                .wait()
                .await?;

            Ok::<_, LoaderError>(BundleReport {
                id: spec.id.clone(),
                status: if settlement.is_success() {
                    BundleStatus::Loaded
                } else {
                    BundleStatus::Failed
                },
                failed_paths: settlement.failed_paths,
                failed_dependencies: Vec::new(),
            })
        });

        let bundles = futures::future::try_join_all(runs).await?;
        info!(bundles = bundles.len(), "manifest finished");

        Ok(ManifestReport {
            finished_at: Utc::now(),
            bundles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::scripted::ScriptedLoader;
    use crate::loaders::LoadEvent;
    use std::sync::Arc;

    fn bundle(id: &str, paths: &[&str], deps: &[&str]) -> BundleSpec {
        BundleSpec {
            id: id.to_string(),
            paths: paths.iter().map(|s| s.to_string()).collect(),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundles.json");
        std::fs::write(
            &path,
            r#"{ "bundles": [
                { "id": "core", "paths": ["core.js", "core.css"] },
                { "id": "app", "paths": ["app.js"], "depends_on": ["core"] }
            ] }"#,
        )
        .unwrap();

        let manifest = Manifest::from_file(&path).unwrap();
        assert_eq!(manifest.bundles.len(), 2);
        assert!(manifest.bundles[0].depends_on.is_empty());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            vec![bundle("", &["a.js"], &[])],
            vec![bundle("a", &["a.js"], &[]), bundle("a", &["b.js"], &[])],
            vec![bundle("a", &[], &[])],
            vec![bundle("a", &["a.js"], &["ghost"])],
            vec![
                bundle("a", &["a.js"], &["c"]),
                bundle("b", &["b.js"], &["a"]),
                bundle("c", &["c.js"], &["b"]),
            ],
            vec![bundle("self", &["s.js"], &["self"])],
        ];
        for bundles in cases {
            let manifest = Manifest { bundles };
            assert!(
                matches!(manifest.validate(), Err(LoaderError::Manifest(_))),
                "expected rejection for {manifest:?}"
            );
        }
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let manifest = Manifest {
            bundles: vec![
                bundle("base", &["base.js"], &[]),
                bundle("left", &["l.js"], &["base"]),
                bundle("right", &["r.js"], &["base"]),
                bundle("top", &["t.js"], &["left", "right"]),
            ],
        };
        assert!(manifest.validate().is_ok());
    }

    #[tokio::test]
    async fn test_dependents_load_after_dependencies() {
        let scripted = Arc::new(
            ScriptedLoader::new()
                .script("core.js", 30, &[LoadEvent::Loaded])
                .script("app.js", 0, &[LoadEvent::Loaded]),
        );
        let loader = BundleLoader::new(scripted.clone());
        let manifest = Manifest {
            bundles: vec![
                bundle("app", &["app.js"], &["core"]),
                bundle("core", &["core.js"], &[]),
            ],
        };

        let report = manifest.run(&loader, true).await.unwrap();

        assert!(report.is_success());
        assert_eq!(scripted.dispatched(), vec!["core.js", "app.js"]);
    }

    #[tokio::test]
    async fn test_failure_skips_transitive_dependents() {
        let scripted = Arc::new(ScriptedLoader::new().script("a.js", 0, &[LoadEvent::Errored]));
        let loader = BundleLoader::new(scripted.clone());
        let manifest = Manifest {
            bundles: vec![
                bundle("a", &["a.js"], &[]),
                bundle("b", &["b.js"], &["a"]),
                bundle("c", &["c.js"], &["b"]),
                bundle("d", &["d.js"], &[]),
            ],
        };

        let report = manifest.run(&loader, true).await.unwrap();
        let status: Vec<_> = report.bundles.iter().map(|b| b.status).collect();

        assert_eq!(
            status,
            vec![
                BundleStatus::Failed,
                BundleStatus::Skipped,
                BundleStatus::Skipped,
                BundleStatus::Loaded
            ]
        );
        assert_eq!(report.bundles[1].failed_dependencies, vec!["a"]);
        assert_eq!(report.bundles[2].failed_dependencies, vec!["b"]);
        assert!(!scripted.dispatched().contains(&"b.js".to_string()));
        assert!(!report.is_success());

        // A skipped bundle keeps its id: reloading it is a duplicate.
        assert!(loader.is_defined("b"));
        assert!(matches!(
            loader.load("b.js", Some("b"), LoadOptions::new()),
            Err(LoaderError::DuplicateBundle(_))
        ));
        assert_eq!(loader.registry().result("b"), Some(vec!["b.js".to_string()]));
    }

    #[tokio::test]
    async fn test_rerun_hits_duplicate_ids() {
        let loader = BundleLoader::new(Arc::new(ScriptedLoader::new()));
        let manifest = Manifest {
            bundles: vec![bundle("a", &["a.js"], &[])],
        };
        manifest.run(&loader, true).await.unwrap();
        assert!(matches!(
            manifest.run(&loader, true).await,
            Err(LoaderError::DuplicateBundle(_))
        ));
    }
}
