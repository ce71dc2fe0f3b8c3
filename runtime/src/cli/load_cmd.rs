//! `loadkit load <paths>...` — load one bundle and report failed paths.

use crate::cli::output::{self, Styled};
use crate::config::LoaderConfig;
use crate::coordinator::BundleLoader;
use crate::options::LoadOptions;
use anyhow::{Context, Result};
use std::time::Instant;

/// Run the load command. Returns whether every path loaded.
pub async fn run(
    config: &LoaderConfig,
    paths: Vec<String>,
    bundle: Option<&str>,
    sync: bool,
) -> Result<bool> {
    let s = Styled::new();
    let loader = BundleLoader::new(config.build_loader().context("building loader")?);

    let started = Instant::now();
    let settlement = loader
        .load(
            paths.clone(),
            bundle,
            LoadOptions::new().async_load(config.async_load && !sync),
        )?
        .wait()
        .await?;
    let elapsed = started.elapsed().as_millis();

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "bundle": settlement.bundle_id,
            "paths": paths.len(),
            "failed_paths": settlement.failed_paths,
            "success": settlement.is_success(),
            "elapsed_ms": elapsed,
        }));
    } else if !output::is_quiet() {
        output::print_header(&s);
        let label = bundle.unwrap_or("(anonymous)");
        let detail = format!(
            "{}/{} loaded in {}",
            paths.len() - settlement.failed_paths.len(),
            paths.len(),
            output::format_millis(elapsed)
        );
        let symbol = if settlement.is_success() {
            s.ok_sym()
        } else {
            s.fail_sym()
        };
        output::print_bundle(&s, symbol, label, &detail, &settlement.failed_paths);
    }

    Ok(settlement.is_success())
}
