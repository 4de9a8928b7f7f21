// src/cli/handlers/msk_brokers.rs

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;

use crate::{
    cli::{dispatcher::AppContext, handlers::commons},
    core::{
        msk::{self, BrokersReport},
        report,
    },
    system::{executor::ProcessRunner, tool::Tool},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Shows the bootstrap servers and broker nodes of MSK clusters."
)]
struct MskBrokersArgs {
    /// Only show this cluster.
    #[arg(long, value_name = "ARN")]
    cluster_arn: Option<String>,

    /// Save the broker information to a JSON file.
    #[arg(long, value_name = "FILE")]
    save_json: Option<Option<PathBuf>>,
}

/// Runs `msk-brokers`.
pub fn handle<R: ProcessRunner>(args: Vec<String>, ctx: &AppContext<R>) -> Result<()> {
    let args = MskBrokersArgs::try_parse_from(&args)?;

    commons::banner("AWS MSK Brokers");
    ctx.invoker.ensure_ready(Tool::Aws)?;

    let clusters = commons::select_clusters(ctx, args.cluster_arn.as_deref(), "Specified Cluster");
    if clusters.is_empty() {
        println!("No MSK clusters found or accessible.");
        return Ok(());
    }

    let mut report = BrokersReport {
        generated_at: Local::now(),
        clusters: Vec::with_capacity(clusters.len()),
    };
    for cluster in &clusters {
        let brokers = msk::cluster_brokers(&ctx.invoker, cluster);
        print!("{}", msk::render_brokers(&brokers));
        report.clusters.push(brokers);
    }

    if let Some(explicit) = &args.save_json {
        let path = commons::output_path(
            ctx,
            explicit.as_deref(),
            "msk",
            "brokers",
            "json",
            report.generated_at,
        )?;
        report::write_json(&path, &report)
            .with_context(|| format!("Could not save broker information to {}", path.display()))?;
        commons::report_saved("Broker information", &path);
    }

    Ok(())
}
