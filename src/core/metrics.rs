// src/core/metrics.rs

//! CloudWatch metrics for MSK clusters and their brokers, read through
//! `aws cloudwatch get-metric-statistics`.

use crate::{
    constants::MSK_NAMESPACE,
    core::{msk, table},
    error::CloudError,
    system::{
        executor::ProcessRunner,
        invoker::{Invoker, LogicalCommand},
        tool::Tool,
    },
};
use chrono::{DateTime, Duration as ChronoDuration, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A CloudWatch metric and how it is labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDefinition {
    /// CloudWatch metric name.
    pub name: &'static str,
    /// Display label.
    pub description: &'static str,
    /// Unit shown next to values.
    pub unit: &'static str,
}

const fn metric(name: &'static str, description: &'static str, unit: &'static str) -> MetricDefinition {
    MetricDefinition {
        name,
        description,
        unit,
    }
}

/// Cluster-level metrics, in display order.
pub const CLUSTER_METRICS: &[MetricDefinition] = &[
    metric("BytesInPerSec", "Bytes In Per Second", "Bytes/Second"),
    metric("BytesOutPerSec", "Bytes Out Per Second", "Bytes/Second"),
    metric("MessagesInPerSec", "Messages In Per Second", "Count/Second"),
    metric("PartitionCount", "Number of Partitions", "Count"),
    metric("TopicCount", "Number of Topics", "Count"),
    metric("OfflinePartitionsCount", "Offline Partitions Count", "Count"),
    metric("UnderReplicatedPartitions", "Under Replicated Partitions", "Count"),
    metric("ActiveControllerCount", "Active Controller Count", "Count"),
    metric("GlobalTopicCount", "Global Topic Count", "Count"),
    metric("GlobalPartitionCount", "Global Partition Count", "Count"),
];

/// Metrics read per broker (with an extra `Broker ID` dimension).
pub const BROKER_METRICS: &[&str] = &[
    "BytesInPerSec",
    "BytesOutPerSec",
    "MessagesInPerSec",
    "PartitionCount",
    "OfflinePartitionsCount",
    "UnderReplicatedPartitions",
];

/// Metrics whose latest average is copied into the cluster summary, with
/// their display labels.
pub const SUMMARY_METRICS: &[(&str, &str)] = &[
    ("TopicCount", "Topics"),
    ("PartitionCount", "Partitions"),
    ("GlobalTopicCount", "Global Topics"),
    ("GlobalPartitionCount", "Global Partitions"),
];

const STATISTICS: [&str; 3] = ["Average", "Maximum", "Minimum"];

/// A query window, both ends in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// `hours` back from `now`, or `None` if that falls outside the range
    /// `chrono` can represent.
    pub fn last_hours(hours: u32, now: DateTime<Utc>) -> Option<Self> {
        let span = ChronoDuration::try_hours(i64::from(hours))?;
        Some(Self {
            start: now.checked_sub_signed(span)?,
            end: now,
        })
    }
}

/// The `Cluster Name` dimension value: CloudWatch is queried with `-`
/// replaced by `_`.
pub fn cluster_dimension(cluster_name: &str) -> String {
    cluster_name.replace('-', "_")
}

// --- CloudWatch payloads ---

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
struct StatisticsResponse {
    datapoints: Vec<RawDatapoint>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct RawDatapoint {
    timestamp: DateTime<Utc>,
    #[serde(default)]
    average: Option<f64>,
    #[serde(default)]
    maximum: Option<f64>,
    #[serde(default)]
    minimum: Option<f64>,
}

/// One CloudWatch datapoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatapointSample {
    /// Start of the aggregation period.
    pub timestamp: DateTime<Utc>,
    /// `Average` statistic.
    pub average: Option<f64>,
    /// `Maximum` statistic.
    pub maximum: Option<f64>,
    /// `Minimum` statistic.
    pub minimum: Option<f64>,
}

impl RawDatapoint {
    fn into_sample(self) -> DatapointSample {
        DatapointSample {
            timestamp: self.timestamp,
            average: self.average,
            maximum: self.maximum,
            minimum: self.minimum,
        }
    }
}

/// The datapoint with the greatest timestamp.
pub fn latest(samples: &[DatapointSample]) -> Option<&DatapointSample> {
    samples.iter().max_by_key(|s| s.timestamp)
}

/// A cluster metric: its newest datapoint and every datapoint in the window.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetricSeries {
    /// Display label.
    pub description: String,
    /// Display unit.
    pub unit: String,
    /// The datapoint with the greatest timestamp.
    pub latest_value: DatapointSample,
    /// As returned, unsorted.
    pub all_datapoints: Vec<DatapointSample>,
}

/// Metrics of one cluster. Metrics without datapoints are absent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClusterMetrics {
    /// Cluster name.
    pub cluster_name: String,
    /// Cluster ARN.
    pub cluster_arn: String,
    /// By metric name.
    pub metrics: BTreeMap<String, MetricSeries>,
    /// Latest averages of the summary metrics, by label.
    pub summary: BTreeMap<String, f64>,
}

/// One broker metric.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BrokerMetric {
    /// Newest datapoint.
    pub latest_value: DatapointSample,
}

/// Metrics of one broker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BrokerMetrics {
    /// As written in the `Broker ID` dimension.
    pub broker_id: String,
    /// By metric name.
    pub metrics: BTreeMap<String, BrokerMetric>,
}

/// The JSON dump of `msk-metrics` for one cluster.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetricsReport {
    /// Cluster-level metrics.
    pub cluster_metrics: ClusterMetrics,
    /// Empty without `--broker-metrics`.
    pub broker_metrics: BTreeMap<String, BrokerMetrics>,
    /// When the report was written.
    pub generated_at: DateTime<Local>,
}

// --- Retrieval ---

/// Builds `aws cloudwatch get-metric-statistics` for one metric.
pub fn statistics_command(
    metric_name: &str,
    dimensions: &[(&str, &str)],
    range: &TimeRange,
    period_secs: u32,
) -> LogicalCommand {
    let mut args: Vec<String> = [
        "cloudwatch",
        "get-metric-statistics",
        "--namespace",
        MSK_NAMESPACE,
        "--metric-name",
        metric_name,
        "--dimensions",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.extend(
        dimensions
            .iter()
            .map(|(name, value)| format!("Name={},Value={}", name, value)),
    );
    args.extend([
        "--start-time".to_string(),
        range.start.to_rfc3339_opts(SecondsFormat::Secs, true),
        "--end-time".to_string(),
        range.end.to_rfc3339_opts(SecondsFormat::Secs, true),
        "--period".to_string(),
        period_secs.to_string(),
        "--statistics".to_string(),
    ]);
    args.extend(STATISTICS.iter().map(|s| s.to_string()));
    args.extend(["--output".to_string(), "json".to_string()]);
    LogicalCommand::new(Tool::Aws, args)
}

/// Fetches one metric's datapoints.
pub fn fetch_datapoints<R: ProcessRunner>(
    invoker: &Invoker<R>,
    command: &LogicalCommand,
) -> Result<Vec<DatapointSample>, CloudError> {
    let response: StatisticsResponse = invoker.invoke_as(command)?;
    Ok(response
        .datapoints
        .into_iter()
        .map(RawDatapoint::into_sample)
        .collect())
}

/// Reads the cluster metric catalog.
///
/// A failed metric is logged and skipped. Returns `None` only when every
/// metric call failed.
pub fn cluster_metrics<R: ProcessRunner>(
    invoker: &Invoker<R>,
    cluster: &msk::ClusterInfo,
    range: &TimeRange,
    period_secs: u32,
) -> Option<ClusterMetrics> {
    let dimension = cluster_dimension(&cluster.cluster_name);
    let mut result = ClusterMetrics {
        cluster_name: cluster.cluster_name.clone(),
        cluster_arn: cluster.cluster_arn.clone(),
        metrics: BTreeMap::new(),
        summary: BTreeMap::new(),
    };
    let mut failures = 0;

    for definition in CLUSTER_METRICS {
        let command = statistics_command(
            definition.name,
            &[("Cluster Name", dimension.as_str())],
            range,
            period_secs,
        );
        let samples = match fetch_datapoints(invoker, &command) {
            Ok(samples) => samples,
            Err(e) => {
                log::error!(
                    "Error getting metric {} for cluster {}: {}",
                    definition.name,
                    cluster.cluster_name,
                    e
                );
                failures += 1;
                continue;
            }
        };
        let Some(latest) = latest(&samples).cloned() else {
            log::warn!(
                "No datapoints found for metric {} in cluster {}",
                definition.name,
                cluster.cluster_name
            );
            continue;
        };

        if SUMMARY_METRICS.iter().any(|(name, _)| *name == definition.name) {
            result
                .summary
                .insert(definition.name.to_string(), latest.average.unwrap_or(0.0));
        }
        result.metrics.insert(
            definition.name.to_string(),
            MetricSeries {
                description: definition.description.to_string(),
                unit: definition.unit.to_string(),
                latest_value: latest,
                all_datapoints: samples,
            },
        );
    }

    (failures < CLUSTER_METRICS.len()).then_some(result)
}

/// Reads [`BROKER_METRICS`] for every broker of the cluster. Failures only
/// shrink the result.
pub fn broker_metrics<R: ProcessRunner>(
    invoker: &Invoker<R>,
    cluster: &msk::ClusterInfo,
    range: &TimeRange,
    period_secs: u32,
) -> BTreeMap<String, BrokerMetrics> {
    let nodes = match msk::list_nodes(invoker, &cluster.cluster_arn) {
        Ok(nodes) => nodes,
        Err(e) => {
            log::warn!(
                "Could not get broker nodes for cluster {}: {}",
                cluster.cluster_name,
                e
            );
            return BTreeMap::new();
        }
    };
    let dimension = cluster_dimension(&cluster.cluster_name);
    let mut brokers = BTreeMap::new();

    for broker_id in nodes.iter().filter_map(msk::NodeInfo::broker_id) {
        let mut metrics = BTreeMap::new();
        for metric_name in BROKER_METRICS {
            let command = statistics_command(
                metric_name,
                &[("Cluster Name", dimension.as_str()), ("Broker ID", broker_id.as_str())],
                range,
                period_secs,
            );
            match fetch_datapoints(invoker, &command) {
                Ok(samples) => {
                    if let Some(latest) = latest(&samples) {
                        metrics.insert(
                            metric_name.to_string(),
                            BrokerMetric {
                                latest_value: latest.clone(),
                            },
                        );
                    }
                }
                Err(e) => log::debug!(
                    "Error getting broker metric {} for broker {}: {}",
                    metric_name,
                    broker_id,
                    e
                ),
            }
        }
        brokers.insert(broker_id.clone(), BrokerMetrics { broker_id, metrics });
    }
    brokers
}

// --- Rendering ---

fn value(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

/// Cluster metrics, summary, then per-broker latest values.
pub fn render_cluster(cluster: &ClusterMetrics, brokers: &BTreeMap<String, BrokerMetrics>) -> String {
    let wide = table::rule(80);
    let narrow = table::rule(40);
    let mut out = format!(
        "\n{wide}\nCLUSTER: {}\n{wide}\nARN: {}\n",
        cluster.cluster_name, cluster.cluster_arn
    );

    out.push_str(&format!("\n{narrow}\nSUMMARY METRICS\n{narrow}\n"));
    for (name, label) in SUMMARY_METRICS {
        out.push_str(&format!(
            "{}: {}\n",
            label,
            value(cluster.summary.get(*name).copied())
        ));
    }

    out.push_str(&format!("\n{narrow}\nDETAILED METRICS\n{narrow}\n"));
    for definition in CLUSTER_METRICS {
        let Some(series) = cluster.metrics.get(definition.name) else {
            continue;
        };
        let latest = &series.latest_value;
        out.push_str(&format!(
            "\n{} ({}):\n  Unit: {}\n  Latest Average: {}\n  Latest Maximum: {}\n  Latest Minimum: {}\n  Timestamp: {}\n",
            series.description,
            definition.name,
            series.unit,
            value(latest.average),
            value(latest.maximum),
            value(latest.minimum),
            latest.timestamp.to_rfc3339(),
        ));
    }

    if !brokers.is_empty() {
        out.push_str(&format!("\n{narrow}\nBROKER METRICS\n{narrow}\n"));
        for broker in brokers.values() {
            out.push_str(&format!("\nBroker {}:\n", broker.broker_id));
            for metric_name in BROKER_METRICS {
                let Some(metric) = broker.metrics.get(*metric_name) else {
                    continue;
                };
                let latest = &metric.latest_value;
                out.push_str(&format!(
                    "  {}:\n    Average: {}\n    Maximum: {}\n    Minimum: {}\n",
                    metric_name,
                    value(latest.average),
                    value(latest.maximum),
                    value(latest.minimum),
                ));
            }
        }
    }
    out
}
