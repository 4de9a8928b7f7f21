// src/cli/handlers/msk_topics.rs

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use crate::{
    cli::{dispatcher::AppContext, handlers::commons},
    core::{
        msk, paths, report,
        topics::{self, KafkaMetadataSource, MetadataSource, TopicsReport},
    },
    system::{executor::ProcessRunner, tool::Tool},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Lists the topics and partitions of MSK clusters by asking the brokers."
)]
struct MskTopicsArgs {
    /// Only list this cluster.
    #[arg(long, value_name = "ARN")]
    cluster_arn: Option<String>,

    /// Save each cluster's layout to a JSON file. With several clusters, FILE
    /// gets the cluster name appended.
    #[arg(long, value_name = "FILE")]
    save_json: Option<Option<PathBuf>>,

    /// Also print the configuration of every topic.
    #[arg(long)]
    detailed: bool,
}

/// Runs `msk-topics` against the real brokers.
pub fn handle<R: ProcessRunner>(args: Vec<String>, ctx: &AppContext<R>) -> Result<()> {
    let source = KafkaMetadataSource::from_settings(&ctx.settings.kafka);
    run(args, ctx, &source)
}

fn run<R: ProcessRunner, S: MetadataSource>(
    args: Vec<String>,
    ctx: &AppContext<R>,
    source: &S,
) -> Result<()> {
    let args = MskTopicsArgs::try_parse_from(&args)?;

    commons::banner("AWS MSK Topics and Partitions");
    ctx.invoker.ensure_ready(Tool::Aws)?;

    let clusters = commons::select_clusters(ctx, args.cluster_arn.as_deref(), "Specified Cluster");
    if clusters.is_empty() {
        println!("No MSK clusters found or accessible.");
        return Ok(());
    }

    for cluster in &clusters {
        println!("\nAnalyzing cluster: {}", cluster.cluster_name.bold());
        println!("ARN: {}", cluster.cluster_arn);

        let servers: Vec<String> = msk::bootstrap_brokers(&ctx.invoker, &cluster.cluster_arn)
            .unwrap_or_else(|e| {
                log::error!("Error getting bootstrap servers: {}", e);
                Vec::new()
            })
            .into_iter()
            .map(|endpoint| endpoint.servers)
            .collect();
        if servers.is_empty() {
            println!(
                "{}",
                format!("Could not get bootstrap servers for cluster {}", cluster.cluster_name)
                    .yellow()
            );
            continue;
        }

        let topology = topics::fetch_topology(source, &cluster.cluster_name, &servers)
            .filter(|t| !t.topics.is_empty());
        let Some(topology) = topology else {
            println!("No topics found in cluster {}", cluster.cluster_name);
            continue;
        };

        let now = Local::now();
        let report = TopicsReport::new(&cluster.cluster_name, servers, topology, now);
        print!("{}", topics::render_summary(&report));

        if let Some(explicit) = &args.save_json {
            let entity = format!("topics_partitions_{}", cluster.cluster_name);
            let explicit = match explicit.as_deref() {
                Some(file) if clusters.len() > 1 => {
                    Some(paths::with_file_suffix(file, &cluster.cluster_name))
                }
                other => other.map(PathBuf::from),
            };
            let path = commons::output_path(ctx, explicit.as_deref(), "msk", &entity, "json", now)?;
            report::write_json(&path, &report)
                .with_context(|| format!("Could not save topics to {}", path.display()))?;
            commons::report_saved("Detailed information", &path);
        }

        if args.detailed {
            print!("{}", topics::render_configs_header());
            for topic in report.topics.keys() {
                let entries = topics::topic_configs(source, &report.bootstrap_servers, topic);
                print!("{}", topics::render_topic_configs(topic, &entries));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{
            config_loader::{OutputSettings, Settings},
            topics::{
                ClusterTopology, TopicConfigEntry,
                testing::{CannedSource, topology},
            },
        },
        system::{
            invoker::Invoker,
            strategy::Platform,
            testing::{ScriptedRunner, exit, ok},
        },
    };
    use tempfile::tempdir;

    fn ready() -> ScriptedRunner {
        ScriptedRunner::new()
            .on(&["--version"], ok("aws-cli/2.15.0"))
            .on(&["sts", "get-caller-identity"], ok(r#"{"Account": "1"}"#))
    }

    fn one_cluster() -> ScriptedRunner {
        ready()
            .on(
                &["list-clusters"],
                ok(r#"{"ClusterInfoList": [{"ClusterName": "orders", "ClusterArn": "arn:x", "State": "ACTIVE"}]}"#),
            )
            .on(
                &["get-bootstrap-brokers"],
                ok(r#"{"BootstrapBrokerString": "b-1.orders:9092,b-2.orders:9092",
                      "BootstrapBrokerStringTls": "b-1.orders:9094,b-2.orders:9094"}"#),
            )
    }

    fn context(runner: ScriptedRunner, settings: Settings) -> AppContext<ScriptedRunner> {
        AppContext::new(Invoker::new(runner).with_platform(Platform::Posix), settings)
    }

    #[test]
    fn test_flags() {
        let args = MskTopicsArgs::try_parse_from(["--detailed", "--save-json"]).unwrap();
        assert!(args.detailed);
        assert_eq!(args.save_json, Some(None));
        assert_eq!(args.cluster_arn, None);
    }

    #[test]
    fn test_layout_saved_from_second_bootstrap_string() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("topics.json");
        let mut source = CannedSource::new(topology());
        source.down = vec!["b-1.orders:9092,b-2.orders:9092".to_string()];

        run(
            vec!["--save-json".to_string(), out.display().to_string()],
            &context(one_cluster(), Settings::default()),
            &source,
        )
        .unwrap();

        let saved: TopicsReport = report::read_json(&out).unwrap();
        assert_eq!(saved.cluster_name, "orders");
        assert_eq!(saved.bootstrap_servers.len(), 2);
        assert_eq!(saved.total_topics, 2);
        assert_eq!(saved.total_partitions, 4);
        assert_eq!(saved.topics.get("orders").map(|t| t.replication_factor), Some(2));
        assert_eq!(source.asked.borrow().len(), 2);
    }

    #[test]
    fn test_default_name_in_output_directory() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            output: OutputSettings {
                directory: Some(dir.path().display().to_string()),
            },
            ..Default::default()
        };

        run(
            vec!["--save-json".to_string()],
            &context(one_cluster(), settings),
            &CannedSource::new(topology()),
        )
        .unwrap();

        let saved: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(saved.len(), 1);
        let name = saved[0].as_ref().unwrap().file_name();
        assert!(name.to_string_lossy().starts_with("msk_topics_partitions_orders_"));
    }

    #[test]
    fn test_detailed_reads_config_of_every_topic() {
        let mut source = CannedSource::new(topology());
        source.configs.insert(
            "orders".to_string(),
            vec![TopicConfigEntry {
                name: "retention.ms".to_string(),
                value: Some("604800000".to_string()),
                is_default: true,
                source: "Default".to_string(),
            }],
        );

        run(
            vec!["--detailed".to_string()],
            &context(one_cluster(), Settings::default()),
            &source,
        )
        .unwrap();

        // One metadata request, then one config request per topic.
        assert_eq!(source.asked.borrow().len(), 3);
    }

    #[test]
    fn test_cluster_without_bootstrap_servers_is_skipped() {
        let runner = ready()
            .on(
                &["describe-cluster"],
                ok(r#"{"ClusterInfo": {"ClusterName": "orders", "ClusterArn": "arn:x", "State": "CREATING"}}"#),
            )
            .on(&["get-bootstrap-brokers"], exit(254, "BadRequestException"));
        let source = CannedSource::new(topology());

        run(
            vec!["--cluster-arn".to_string(), "arn:x".to_string()],
            &context(runner, Settings::default()),
            &source,
        )
        .unwrap();
        assert!(source.asked.borrow().is_empty());
    }

    #[test]
    fn test_cluster_without_topics_saves_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("topics.json");

        run(
            vec!["--save-json".to_string(), out.display().to_string()],
            &context(one_cluster(), Settings::default()),
            &CannedSource::new(ClusterTopology::default()),
        )
        .unwrap();
        assert!(!out.exists());
    }
}
