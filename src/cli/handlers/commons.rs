// src/cli/handlers/commons.rs

// Shared pieces of the command handlers: banners, output paths and the
// cluster selection used by every MSK command.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::{
    cli::dispatcher::AppContext,
    core::{
        msk::{self, ClusterInfo},
        paths,
        report::OutputTarget,
    },
    system::executor::ProcessRunner,
};

/// Prints a command title underlined with `=`.
pub fn banner(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(60));
}

/// Where a report goes: the explicit file if one was given, otherwise a
/// timestamped name in the configured output directory.
///
/// # Arguments
/// * `ctx` - Supplies the configured output directory.
/// * `explicit` - The FILE given to a `--save-*` flag, if any.
/// * `domain`, `entity`, `extension` - Parts of the generated name.
/// * `now` - The timestamp written into the generated name.
pub fn output_path<R: ProcessRunner>(
    ctx: &AppContext<R>,
    explicit: Option<&Path>,
    domain: &str,
    entity: &str,
    extension: &str,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let output_dir = ctx
        .settings
        .output_dir()
        .context("Invalid output directory in config.toml")?;
    let default_name = paths::default_filename(domain, entity, extension, now);
    Ok(paths::resolve_output_path(
        explicit,
        output_dir.as_deref(),
        &default_name,
    ))
}

/// [`output_path`] for a `--save-*` target.
pub fn target_path<R: ProcessRunner>(
    ctx: &AppContext<R>,
    target: &OutputTarget,
    domain: &str,
    entity: &str,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    output_path(
        ctx,
        target.path.as_deref(),
        domain,
        entity,
        target.format.extension(),
        now,
    )
}

/// The clusters an MSK command works on.
///
/// With an ARN, the cluster is described; if that fails the ARN is still used
/// with `fallback_name`. Without one, every cluster is listed; a failed
/// listing is logged and yields no clusters.
pub fn select_clusters<R: ProcessRunner>(
    ctx: &AppContext<R>,
    cluster_arn: Option<&str>,
    fallback_name: &str,
) -> Vec<ClusterInfo> {
    match cluster_arn {
        Some(arn) => match msk::describe_cluster(&ctx.invoker, arn) {
            Ok(info) => vec![info],
            Err(e) => {
                log::warn!("Could not describe cluster {}: {}", arn, e);
                vec![ClusterInfo::from_arn(arn, fallback_name)]
            }
        },
        None => msk::list_clusters(&ctx.invoker).unwrap_or_else(|e| {
            log::error!("Error getting MSK clusters: {}", e);
            Vec::new()
        }),
    }
}

/// Prints the "saved to" line after a report was written.
pub fn report_saved(what: &str, path: &Path) {
    println!("\n{} saved to: {}", what, path.display().to_string().green());
}
