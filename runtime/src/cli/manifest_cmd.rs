//! `loadkit manifest <file>` — load every bundle of a manifest in dependency order.

use crate::cli::output::{self, Styled};
use crate::config::LoaderConfig;
use crate::coordinator::BundleLoader;
use crate::manifest::{BundleStatus, Manifest};
use anyhow::{Context, Result};
use std::path::Path;

/// Run the manifest command. Returns whether every bundle loaded.
pub async fn run(config: &LoaderConfig, manifest_path: &Path) -> Result<bool> {
    let s = Styled::new();
    let manifest = Manifest::from_file(manifest_path)
        .with_context(|| format!("reading manifest {}", manifest_path.display()))?;
    let loader = BundleLoader::new(config.build_loader().context("building loader")?);

    let report = manifest.run(&loader, config.async_load).await?;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&report)?);
    } else if !output::is_quiet() {
        output::print_header(&s);
        for bundle in &report.bundles {
            let (symbol, detail) = match bundle.status {
                BundleStatus::Loaded => (s.ok_sym(), "loaded".to_string()),
                BundleStatus::Failed => (
                    s.fail_sym(),
                    format!("{} path(s) failed", bundle.failed_paths.len()),
                ),
                BundleStatus::Skipped => (
                    s.warn_sym(),
                    format!("skipped, failed deps: {}", bundle.failed_dependencies.join(", ")),
                ),
            };
            let failed: &[String] = if bundle.status == BundleStatus::Failed {
                &bundle.failed_paths
            } else {
                &[]
            };
            output::print_bundle(&s, symbol, &bundle.id, &detail, failed);
        }
    }

    Ok(report.is_success())
}
