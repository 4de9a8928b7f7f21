// src/cli/handlers/msk_clusters.rs

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::{args::SaveArgs, dispatcher::AppContext, handlers::commons},
    core::{
        msk::{self, ClusterInfo, ClusterOverview, ClusterReport},
        report::{self, OutputFormat},
    },
    system::{executor::ProcessRunner, tool::Tool},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Lists MSK clusters with their broker counts and tags."
)]
struct MskClustersArgs {
    /// Describe only this cluster.
    #[arg(long, value_name = "ARN")]
    cluster_arn: Option<String>,

    /// Also print the full description of every listed cluster.
    #[arg(long)]
    detailed: bool,

    #[command(flatten)]
    save: SaveArgs,
}

/// Runs `msk-clusters`.
pub fn handle<R: ProcessRunner>(args: Vec<String>, ctx: &AppContext<R>) -> Result<()> {
    let args = MskClustersArgs::try_parse_from(&args)?;

    commons::banner("AWS MSK Cluster Lister");
    ctx.invoker.ensure_ready(Tool::Aws)?;

    if let Some(arn) = &args.cluster_arn {
        let info = msk::describe_cluster(&ctx.invoker, arn)
            .with_context(|| format!("Could not describe cluster {}", arn))?;
        print!("{}", msk::render_details(&info));
        return save(ctx, &args, vec![msk::overview(&ctx.invoker, info)]);
    }

    println!("Getting MSK clusters...");
    let clusters = match msk::list_clusters(&ctx.invoker) {
        Ok(clusters) => clusters,
        Err(e) => {
            log::error!("Error getting MSK clusters: {}", e);
            Vec::new()
        }
    };
    if clusters.is_empty() {
        println!("No MSK clusters found");
        println!("Total clusters found: 0");
        return Ok(());
    }

    println!("\nFound {} MSK cluster(s):\n", clusters.len());
    let mut overviews = Vec::with_capacity(clusters.len());
    for info in clusters {
        let overview = msk::overview(&ctx.invoker, info);
        print!("{}", msk::render_overview(&overview));
        overviews.push(overview);
    }

    if args.detailed {
        for overview in &overviews {
            match msk::describe_cluster(&ctx.invoker, &overview.info.cluster_arn) {
                Ok(info) => print!("{}", msk::render_details(&info)),
                Err(e) => println!(
                    "{} {}: {}",
                    "Could not describe cluster".yellow(),
                    overview.info.cluster_name,
                    e
                ),
            }
        }
    }

    println!("\nTotal clusters found: {}", overviews.len());
    save(ctx, &args, overviews)
}

fn save<R: ProcessRunner>(
    ctx: &AppContext<R>,
    args: &MskClustersArgs,
    overviews: Vec<ClusterOverview>,
) -> Result<()> {
    let Some(target) = args.save.target() else {
        return Ok(());
    };
    let now = Local::now();
    let path = commons::target_path(ctx, &target, "msk", "clusters", now)?;
    match target.format {
        OutputFormat::Json => {
            let clusters: Vec<ClusterInfo> = overviews.into_iter().map(|o| o.info).collect();
            report::write_json(&path, &ClusterReport::new(clusters, now))
        }
        OutputFormat::Csv => report::write_csv(&path, &overviews),
        OutputFormat::Text => report::write_text(&path, &msk::render_text_report(&overviews, now)),
    }
    .with_context(|| format!("Could not save cluster information to {}", path.display()))?;
    commons::report_saved(
        &format!("Cluster information ({})", target.format.label()),
        &path,
    );
    Ok(())
}
