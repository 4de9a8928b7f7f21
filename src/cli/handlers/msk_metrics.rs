// src/cli/handlers/msk_metrics.rs

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use clap::Parser;
use colored::Colorize;
use std::{collections::BTreeMap, path::PathBuf};

use crate::{
    cli::{dispatcher::AppContext, handlers::commons},
    constants::MAX_LOOKBACK_HOURS,
    core::{
        metrics::{self, MetricsReport, TimeRange},
        paths, report,
    },
    system::{executor::ProcessRunner, tool::Tool},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Reads the CloudWatch metrics of MSK clusters."
)]
struct MskMetricsArgs {
    /// Only read metrics for this cluster.
    #[arg(long, value_name = "ARN")]
    cluster_arn: Option<String>,

    /// How many hours back to look. Defaults to `metrics.lookback_hours`.
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_LOOKBACK_HOURS))
    )]
    hours: Option<u32>,

    /// Also read per-broker metrics.
    #[arg(long)]
    broker_metrics: bool,

    /// Save the metrics of each cluster to a JSON file. With several clusters,
    /// FILE gets the cluster name appended.
    #[arg(long, value_name = "FILE")]
    save_json: Option<Option<PathBuf>>,
}

/// Runs `msk-metrics`.
pub fn handle<R: ProcessRunner>(args: Vec<String>, ctx: &AppContext<R>) -> Result<()> {
    let args = MskMetricsArgs::try_parse_from(&args)?;

    commons::banner("AWS MSK CloudWatch Metrics");
    ctx.invoker.ensure_ready(Tool::Aws)?;

    let hours = args.hours.unwrap_or(ctx.settings.metrics.lookback_hours);
    let period = ctx.settings.metrics.period_secs;
    let Some(range) = TimeRange::last_hours(hours, Utc::now()) else {
        bail!("A lookback of {} hours is out of range", hours);
    };
    println!(
        "Time range: {} to {}",
        range.start.format("%Y-%m-%d %H:%M:%S UTC"),
        range.end.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let clusters = commons::select_clusters(ctx, args.cluster_arn.as_deref(), "Specified Cluster");
    if clusters.is_empty() {
        println!("No MSK clusters found or accessible.");
        return Ok(());
    }

    for cluster in &clusters {
        println!("\nAnalyzing cluster: {}", cluster.cluster_name.bold());

        let Some(cluster_metrics) = metrics::cluster_metrics(&ctx.invoker, cluster, &range, period)
        else {
            println!(
                "{}",
                format!("Could not get metrics for cluster {}", cluster.cluster_name).yellow()
            );
            continue;
        };
        let broker_metrics = if args.broker_metrics {
            metrics::broker_metrics(&ctx.invoker, cluster, &range, period)
        } else {
            BTreeMap::new()
        };

        print!("{}", metrics::render_cluster(&cluster_metrics, &broker_metrics));

        if let Some(explicit) = &args.save_json {
            let now = Local::now();
            let entity = format!("cloudwatch_metrics_{}", cluster.cluster_name);
            let explicit = match explicit.as_deref() {
                Some(file) if clusters.len() > 1 => {
                    Some(paths::with_file_suffix(file, &cluster.cluster_name))
                }
                other => other.map(PathBuf::from),
            };
            let path = commons::output_path(ctx, explicit.as_deref(), "msk", &entity, "json", now)?;
            let report = MetricsReport {
                cluster_metrics,
                broker_metrics,
                generated_at: now,
            };
            report::write_json(&path, &report)
                .with_context(|| format!("Could not save metrics to {}", path.display()))?;
            commons::report_saved("Metrics", &path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::config_loader::{OutputSettings, Settings},
        system::{
            invoker::Invoker,
            strategy::Platform,
            testing::{ScriptedRunner, exit, ok},
        },
    };
    use tempfile::tempdir;

    const DATAPOINTS: &str = r#"{"Label": "TopicCount", "Datapoints": [
        {"Timestamp": "2024-01-01T10:00:00Z", "Average": 10.0, "Maximum": 10.0, "Minimum": 10.0, "Unit": "Count"},
        {"Timestamp": "2024-01-01T11:00:00Z", "Average": 12.0, "Maximum": 12.0, "Minimum": 12.0, "Unit": "Count"}
    ]}"#;

    fn ready() -> ScriptedRunner {
        ScriptedRunner::new()
            .on(&["--version"], ok("aws-cli/2.15.0"))
            .on(&["sts", "get-caller-identity"], ok(r#"{"Account": "1"}"#))
    }

    fn context(runner: ScriptedRunner, settings: Settings) -> AppContext<ScriptedRunner> {
        AppContext::new(Invoker::new(runner).with_platform(Platform::Posix), settings)
    }

    #[test]
    fn test_hours_flag_overrides_config() {
        let args = MskMetricsArgs::try_parse_from(["--hours", "6", "--broker-metrics"]).unwrap();
        assert_eq!(args.hours, Some(6));
        assert!(args.broker_metrics);
        assert_eq!(args.save_json, None);
    }

    #[test]
    fn test_hours_outside_retention_are_rejected() {
        assert!(MskMetricsArgs::try_parse_from(["--hours", "0"]).is_err());
        assert!(MskMetricsArgs::try_parse_from(["--hours", "4294967295"]).is_err());
        let max = MAX_LOOKBACK_HOURS.to_string();
        assert!(MskMetricsArgs::try_parse_from(["--hours", max.as_str()]).is_ok());
    }

    #[test]
    fn test_configured_lookback_out_of_range_is_an_error() {
        let mut settings = Settings::default();
        settings.metrics.lookback_hours = u32::MAX;
        let err = handle(vec![], &context(ready(), settings)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_explicit_file_is_split_per_cluster() {
        let dir = tempdir().unwrap();
        let runner = ready()
            .on(
                &["list-clusters"],
                ok(r#"{"ClusterInfoList": [
                    {"ClusterName": "orders", "ClusterArn": "arn:a", "State": "ACTIVE"},
                    {"ClusterName": "audit", "ClusterArn": "arn:b", "State": "ACTIVE"}
                ]}"#),
            )
            .on(&["get-metric-statistics"], ok(DATAPOINTS));
        let file = dir.path().join("metrics.json");

        handle(
            vec!["--save-json".to_string(), file.display().to_string()],
            &context(runner, Settings::default()),
        )
        .unwrap();

        assert!(!file.exists());
        for name in ["orders", "audit"] {
            let report: MetricsReport =
                report::read_json(&dir.path().join(format!("metrics_{}.json", name))).unwrap();
            assert_eq!(report.cluster_metrics.cluster_name, name);
        }
    }

    #[test]
    fn test_no_clusters_is_not_an_error() {
        let runner = ready().on(&["list-clusters"], ok(r#"{"ClusterInfoList": []}"#));
        let ctx = context(runner, Settings::default());
        handle(vec![], &ctx).unwrap();
        assert_eq!(ctx.invoker.runner().count_matching(&["get-metric-statistics"]), 0);
    }

    #[test]
    fn test_cluster_with_no_metrics_is_skipped() {
        let dir = tempdir().unwrap();
        let runner = ready()
            .on(
                &["list-clusters"],
                ok(r#"{"ClusterInfoList": [{"ClusterName": "orders", "ClusterArn": "arn:x", "State": "ACTIVE"}]}"#),
            )
            .on(&["get-metric-statistics"], exit(255, "AccessDenied"));
        let settings = Settings {
            output: OutputSettings {
                directory: Some(dir.path().display().to_string()),
            },
            ..Default::default()
        };

        handle(vec!["--save-json".to_string()], &context(runner, settings)).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_metrics_are_saved_per_cluster() {
        let dir = tempdir().unwrap();
        let runner = ready()
            .on(
                &["describe-cluster"],
                ok(r#"{"ClusterInfo": {"ClusterName": "orders-prod", "ClusterArn": "arn:x", "State": "ACTIVE"}}"#),
            )
            .on(&["get-metric-statistics"], ok(DATAPOINTS));
        let settings = Settings {
            output: OutputSettings {
                directory: Some(dir.path().display().to_string()),
            },
            ..Default::default()
        };
        let ctx = context(runner, settings);

        handle(
            vec![
                "--cluster-arn".to_string(),
                "arn:x".to_string(),
                "--save-json".to_string(),
            ],
            &ctx,
        )
        .unwrap();

        let calls = ctx.invoker.runner().calls();
        let metric_call = calls
            .iter()
            .find(|c| c.args.iter().any(|a| a == "get-metric-statistics"))
            .unwrap();
        assert!(metric_call.args.contains(&"Name=Cluster Name,Value=orders_prod".to_string()));

        let saved: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(saved.len(), 1);
        let path = saved[0].as_ref().unwrap().path();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("msk_cloudwatch_metrics_orders-prod_"));
        let report: MetricsReport = report::read_json(&path).unwrap();
        assert_eq!(report.cluster_metrics.summary.get("TopicCount"), Some(&12.0));
        assert!(report.broker_metrics.is_empty());
    }
}
