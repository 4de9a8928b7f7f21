// src/core/msk.rs

//! Amazon MSK inventory through `aws kafka`: clusters, broker nodes, tags and
//! bootstrap broker strings.

use crate::{
    core::{report::CsvRecord, table},
    error::CloudError,
    system::{
        executor::ProcessRunner,
        invoker::{Invoker, LogicalCommand},
        tool::Tool,
    },
};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fmt};

// --- Payloads returned by `aws kafka` ---

/// A cluster as returned by `list-clusters` / `describe-cluster`.
///
/// Only the fields the inventory reads are typed. Everything else AWS returns
/// is kept in `extra` so JSON dumps carry the full response.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ClusterInfo {
    /// Cluster name.
    pub cluster_name: String,
    /// Cluster ARN.
    pub cluster_arn: String,
    /// Lifecycle state, e.g. `ACTIVE` or `CREATING`.
    pub state: String,
    /// ISO 8601, as AWS returns it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    /// Kafka version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_broker_software_info: Option<BrokerSoftwareInfo>,
    /// Configured broker count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_broker_nodes: Option<u32>,
    /// Instance type and networking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_node_group_info: Option<BrokerNodeGroupInfo>,
    /// Kept as raw JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_info: Option<Value>,
    /// Every other field of the response.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// `CurrentBrokerSoftwareInfo`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct BrokerSoftwareInfo {
    /// Kafka version, e.g. `3.5.1`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_version: Option<String>,
    /// Other fields, e.g. the configuration ARN.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// `BrokerNodeGroupInfo`: how the brokers are provisioned.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct BrokerNodeGroupInfo {
    /// Instance type, e.g. `kafka.m5.large`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    /// Subnet IDs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_subnets: Option<Vec<String>>,
    /// Security group IDs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<String>>,
    /// Storage and connectivity settings.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ClusterInfo {
    /// The Kafka version, or `Unknown`.
    pub fn kafka_version(&self) -> &str {
        self.current_broker_software_info
            .as_ref()
            .and_then(|s| s.kafka_version.as_deref())
            .unwrap_or("Unknown")
    }

    /// The broker instance type, if AWS reported one.
    pub fn instance_type(&self) -> Option<&str> {
        self.broker_node_group_info
            .as_ref()
            .and_then(|b| b.instance_type.as_deref())
    }

    /// Whether the cluster is `ACTIVE`; only active clusters have nodes to list.
    pub fn is_active(&self) -> bool {
        self.state == "ACTIVE"
    }

    /// A cluster known only by its ARN, for when `describe-cluster` fails.
    pub fn from_arn(arn: &str, name: &str) -> Self {
        Self {
            cluster_name: name.to_string(),
            cluster_arn: arn.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ListClustersResponse {
    cluster_info_list: Vec<ClusterInfo>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct DescribeClusterResponse {
    cluster_info: ClusterInfo,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ListNodesResponse {
    node_info_list: Vec<NodeInfo>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ListTagsResponse {
    tags: BTreeMap<String, String>,
}

/// An entry of `list-nodes`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct NodeInfo {
    /// Absent for non-broker nodes.
    pub broker_node_info: Option<BrokerNodeInfo>,
    /// Instance type.
    pub instance_type: Option<String>,
    /// Node ARN.
    #[serde(rename = "NodeARN")]
    pub node_arn: Option<String>,
    /// Node type, e.g. `BROKER`.
    pub node_type: Option<String>,
}

/// Broker facts of a node.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct BrokerNodeInfo {
    /// AWS returns broker ids as JSON numbers with a fractional part (`1.0`).
    pub broker_id: Option<f64>,
    /// Private IP in the client VPC.
    pub client_vpc_ip_address: Option<String>,
    /// Subnet of that IP.
    pub client_subnet: Option<String>,
    /// DNS names.
    pub endpoints: Vec<String>,
}

impl NodeInfo {
    /// The broker id as CloudWatch writes it in the `Broker ID` dimension.
    pub fn broker_id(&self) -> Option<String> {
        self.broker_node_info
            .as_ref()
            .and_then(|b| b.broker_id)
            .map(format_broker_id)
    }
}

fn format_broker_id(id: f64) -> String {
    if id.fract() == 0.0 {
        format!("{:.0}", id)
    } else {
        id.to_string()
    }
}

// --- Bootstrap brokers ---

/// The kinds of bootstrap string MSK can return, one per listener.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootstrapKind {
    /// Unauthenticated, unencrypted (port 9092).
    Plaintext,
    /// TLS (port 9094).
    Tls,
    /// SASL/SCRAM over TLS (port 9096).
    SaslScram,
    /// IAM auth over TLS (port 9098).
    SaslIam,
    /// TLS over public access.
    PublicTls,
    /// SASL/SCRAM over public access.
    PublicSaslScram,
    /// IAM auth over public access.
    PublicSaslIam,
}

impl BootstrapKind {
    const ALL: [BootstrapKind; 7] = [
        Self::Plaintext,
        Self::Tls,
        Self::SaslScram,
        Self::SaslIam,
        Self::PublicTls,
        Self::PublicSaslScram,
        Self::PublicSaslIam,
    ];

    /// The `get-bootstrap-brokers` response key holding this kind.
    fn response_key(self) -> &'static str {
        match self {
            Self::Plaintext => "BootstrapBrokerString",
            Self::Tls => "BootstrapBrokerStringTls",
            Self::SaslScram => "BootstrapBrokerStringSaslScram",
            Self::SaslIam => "BootstrapBrokerStringSaslIam",
            Self::PublicTls => "BootstrapBrokerStringPublicTls",
            Self::PublicSaslScram => "BootstrapBrokerStringPublicSaslScram",
            Self::PublicSaslIam => "BootstrapBrokerStringPublicSaslIam",
        }
    }
}

impl fmt::Display for BootstrapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Plaintext => "Plaintext",
            Self::Tls => "TLS",
            Self::SaslScram => "SASL/SCRAM",
            Self::SaslIam => "SASL/IAM",
            Self::PublicTls => "Public TLS",
            Self::PublicSaslScram => "Public SASL/SCRAM",
            Self::PublicSaslIam => "Public SASL/IAM",
        };
        write!(f, "{}", label)
    }
}

/// One bootstrap string and its listener kind.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BootstrapEndpoint {
    /// Which listener.
    pub kind: BootstrapKind,
    /// Comma-separated `host:port` list.
    pub servers: String,
}

/// Picks the non-empty bootstrap strings out of a `get-bootstrap-brokers`
/// response, in a fixed order.
pub fn parse_bootstrap(payload: &Value) -> Vec<BootstrapEndpoint> {
    BootstrapKind::ALL
        .iter()
        .filter_map(|kind| {
            payload
                .get(kind.response_key())
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(|servers| BootstrapEndpoint {
                    kind: *kind,
                    servers: servers.to_string(),
                })
        })
        .collect()
}

// --- Calls ---

fn kafka(args: &[&str]) -> LogicalCommand {
    LogicalCommand::new(
        Tool::Aws,
        std::iter::once("kafka")
            .chain(args.iter().copied())
            .chain(["--output", "json"]),
    )
}

/// Every cluster in the account and region.
pub fn list_clusters<R: ProcessRunner>(invoker: &Invoker<R>) -> Result<Vec<ClusterInfo>, CloudError> {
    let response: ListClustersResponse = invoker.invoke_as(&kafka(&["list-clusters"]))?;
    Ok(response.cluster_info_list)
}

/// One cluster by ARN.
pub fn describe_cluster<R: ProcessRunner>(
    invoker: &Invoker<R>,
    cluster_arn: &str,
) -> Result<ClusterInfo, CloudError> {
    let response: DescribeClusterResponse =
        invoker.invoke_as(&kafka(&["describe-cluster", "--cluster-arn", cluster_arn]))?;
    Ok(response.cluster_info)
}

/// The nodes of one cluster.
pub fn list_nodes<R: ProcessRunner>(
    invoker: &Invoker<R>,
    cluster_arn: &str,
) -> Result<Vec<NodeInfo>, CloudError> {
    let response: ListNodesResponse =
        invoker.invoke_as(&kafka(&["list-nodes", "--cluster-arn", cluster_arn]))?;
    Ok(response.node_info_list)
}

/// Tags of one cluster.
pub fn list_tags<R: ProcessRunner>(
    invoker: &Invoker<R>,
    cluster_arn: &str,
) -> Result<BTreeMap<String, String>, CloudError> {
    let response: ListTagsResponse = invoker.invoke_as(&kafka(&[
        "list-tags-for-resource",
        "--resource-arn",
        cluster_arn,
    ]))?;
    Ok(response.tags)
}

/// The non-empty bootstrap strings of one cluster.
pub fn bootstrap_brokers<R: ProcessRunner>(
    invoker: &Invoker<R>,
    cluster_arn: &str,
) -> Result<Vec<BootstrapEndpoint>, CloudError> {
    let payload = invoker.invoke(&kafka(&["get-bootstrap-brokers", "--cluster-arn", cluster_arn]))?;
    Ok(parse_bootstrap(&payload))
}

// --- Overview ---

/// How many brokers the overview shows.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerCount {
    /// Only `ACTIVE` clusters are asked for their nodes.
    NotQueried,
    /// Number of nodes `list-nodes` returned.
    Active(usize),
    /// `list-nodes` failed with this message.
    Unavailable(String),
}

/// A cluster plus the facts fetched about it for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOverview {
    /// The cluster.
    pub info: ClusterInfo,
    /// Broker count.
    pub brokers: BrokerCount,
    /// `None` when the tags call failed.
    pub tags: Option<BTreeMap<String, String>>,
}

/// Adds broker count and tags to a listed cluster. Failed calls do not fail the overview.
pub fn overview<R: ProcessRunner>(invoker: &Invoker<R>, info: ClusterInfo) -> ClusterOverview {
    let brokers = if info.is_active() {
        match list_nodes(invoker, &info.cluster_arn) {
            Ok(nodes) => BrokerCount::Active(nodes.len()),
            Err(e) => BrokerCount::Unavailable(e.to_string()),
        }
    } else {
        BrokerCount::NotQueried
    };
    let tags = match list_tags(invoker, &info.cluster_arn) {
        Ok(tags) => Some(tags),
        Err(e) => {
            log::debug!("Tags unavailable for {}: {}", info.cluster_name, e);
            None
        }
    };
    ClusterOverview { info, brokers, tags }
}

/// The JSON dump of `msk-clusters`: the clusters as AWS returned them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClusterReport {
    /// When the report was written.
    pub generated_at: DateTime<Local>,
    /// `clusters.len()`.
    pub total_clusters: usize,
    /// The clusters as AWS returned them.
    pub clusters: Vec<ClusterInfo>,
}

impl ClusterReport {
    /// Wraps `clusters` with a count and timestamp.
    pub fn new(clusters: Vec<ClusterInfo>, generated_at: DateTime<Local>) -> Self {
        Self {
            generated_at,
            total_clusters: clusters.len(),
            clusters,
        }
    }
}

/// Connection facts for one cluster, as printed by `msk-brokers`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClusterBrokers {
    /// Cluster name.
    pub cluster_name: String,
    /// Cluster ARN.
    pub cluster_arn: String,
    /// Empty when the call failed.
    pub bootstrap: Vec<BootstrapEndpoint>,
    /// Empty when the call failed.
    pub nodes: Vec<NodeInfo>,
}

/// The JSON dump of `msk-brokers`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BrokersReport {
    /// When the report was written.
    pub generated_at: DateTime<Local>,
    /// One entry per cluster.
    pub clusters: Vec<ClusterBrokers>,
}

/// Fetches bootstrap strings and broker nodes. Either call may fail on its own;
/// the failure is logged and that part is left empty.
pub fn cluster_brokers<R: ProcessRunner>(invoker: &Invoker<R>, info: &ClusterInfo) -> ClusterBrokers {
    let bootstrap = bootstrap_brokers(invoker, &info.cluster_arn).unwrap_or_else(|e| {
        log::warn!("Could not get bootstrap brokers for {}: {}", info.cluster_name, e);
        Vec::new()
    });
    let nodes = list_nodes(invoker, &info.cluster_arn).unwrap_or_else(|e| {
        log::warn!("Could not get broker nodes for {}: {}", info.cluster_name, e);
        Vec::new()
    });
    ClusterBrokers {
        cluster_name: info.cluster_name.clone(),
        cluster_arn: info.cluster_arn.clone(),
        bootstrap,
        nodes,
    }
}

/// Bootstrap strings and nodes of one cluster.
pub fn render_brokers(brokers: &ClusterBrokers) -> String {
    let mut out = format!(
        "\nCluster: {}\nARN: {}\n\nBootstrap servers:\n",
        brokers.cluster_name, brokers.cluster_arn
    );
    if brokers.bootstrap.is_empty() {
        out.push_str("  None available\n");
    }
    for endpoint in &brokers.bootstrap {
        out.push_str(&format!("  {}: {}\n", endpoint.kind, endpoint.servers));
    }
    out.push_str("\nBroker nodes:\n");
    if brokers.nodes.is_empty() {
        out.push_str("  None available\n");
    } else {
        out.push_str(&render_nodes(&brokers.nodes));
    }
    out
}

// --- Rendering ---

/// The summary block of one cluster in `msk-clusters`.
pub fn render_overview(overview: &ClusterOverview) -> String {
    let info = &overview.info;
    let mut out = format!(
        "Cluster Name: {}\nCluster ARN: {}\nState: {}\nKafka Version: {}\nNumber of Broker Nodes: {}\n",
        info.cluster_name,
        info.cluster_arn,
        info.state,
        info.kafka_version(),
        optional(info.number_of_broker_nodes),
    );
    match &overview.brokers {
        BrokerCount::Active(count) => out.push_str(&format!("Active Brokers: {}\n", count)),
        BrokerCount::Unavailable(e) => out.push_str(&format!("Could not get broker info: {}\n", e)),
        BrokerCount::NotQueried => {}
    }
    match &overview.tags {
        Some(tags) if !tags.is_empty() => {
            out.push_str("Tags:\n");
            for (key, value) in tags {
                out.push_str(&format!("  {}: {}\n", key, value));
            }
        }
        Some(_) => {}
        None => out.push_str("Tags: Not available\n"),
    }
    out.push_str(&"-".repeat(50));
    out.push('\n');
    out
}

/// The `describe-cluster` view of one cluster.
pub fn render_details(info: &ClusterInfo) -> String {
    let mut out = format!(
        "\nDetailed information for cluster: {}\nARN: {}\nState: {}\nCreation Time: {}\nKafka Version: {}\nNumber of Broker Nodes: {}\n",
        info.cluster_name,
        info.cluster_arn,
        info.state,
        info.creation_time.as_deref().unwrap_or("Unknown"),
        info.kafka_version(),
        optional(info.number_of_broker_nodes),
    );
    if let Some(group) = &info.broker_node_group_info {
        out.push_str(&format!(
            "Instance Type: {}\n",
            group.instance_type.as_deref().unwrap_or("Unknown")
        ));
        out.push_str(&format!(
            "Client Subnets: {}\n",
            group.client_subnets.as_deref().unwrap_or_default().join(", ")
        ));
        if let Some(groups) = &group.security_groups {
            out.push_str(&format!("Security Groups: {}\n", groups.join(", ")));
        }
    }
    if let Some(encryption) = &info.encryption_info {
        for (label, key) in [
            ("Encryption at Rest", "EncryptionAtRest"),
            ("Encryption in Transit", "EncryptionInTransit"),
        ] {
            let value = encryption
                .get(key)
                .map(Value::to_string)
                .unwrap_or_else(|| "Not configured".to_string());
            out.push_str(&format!("{}: {}\n", label, value));
        }
    }
    out
}

/// The `--save-text` report of `msk-clusters`.
pub fn render_text_report(overviews: &[ClusterOverview], at: DateTime<Local>) -> String {
    let rule = table::rule(50);
    let mut out = format!(
        "AWS MSK Cluster Report\n{rule}\nGenerated: {}\nTotal clusters: {}\n\nSUMMARY\n{}\n",
        at.format("%Y-%m-%d %H:%M:%S"),
        overviews.len(),
        "-".repeat(20),
    );
    let states = table::distribution(overviews.iter().map(|o| o.info.state.as_str()));
    out.push_str(&table::render_distribution("State Distribution", &states));
    let versions = table::distribution(overviews.iter().map(|o| o.info.kafka_version()));
    out.push('\n');
    out.push_str(&table::render_distribution("Kafka Version Distribution", &versions));
    out.push_str(&format!("\n{rule}\nCLUSTER DETAILS\n{rule}\n\n"));
    for overview in overviews {
        out.push_str(&render_overview(overview));
        out.push('\n');
    }
    out
}

fn optional<T: fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

impl CsvRecord for ClusterOverview {
    const HEADERS: &'static [&'static str] = &[
        "Cluster Name",
        "Cluster ARN",
        "State",
        "Kafka Version",
        "Broker Nodes",
        "Active Brokers",
        "Instance Type",
        "Creation Time",
        "Tags",
    ];

    fn csv_row(&self) -> Vec<String> {
        let info = &self.info;
        vec![
            info.cluster_name.clone(),
            info.cluster_arn.clone(),
            info.state.clone(),
            info.kafka_version().to_string(),
            info.number_of_broker_nodes
                .map(|n| n.to_string())
                .unwrap_or_default(),
            match self.brokers {
                BrokerCount::Active(count) => count.to_string(),
                _ => String::new(),
            },
            info.instance_type().unwrap_or_default().to_string(),
            info.creation_time.clone().unwrap_or_default(),
            self.tags
                .iter()
                .flatten()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        ]
    }
}

/// The broker node list printed by `msk-brokers`.
pub fn render_nodes(nodes: &[NodeInfo]) -> String {
    let mut table = table::Table::new(["Broker ID", "Client IP", "Instance Type", "Endpoints"]);
    for node in nodes {
        let broker = node.broker_node_info.as_ref();
        table.push_row(vec![
            node.broker_id().unwrap_or_else(|| "?".to_string()),
            broker
                .and_then(|b| b.client_vpc_ip_address.clone())
                .unwrap_or_default(),
            node.instance_type.clone().unwrap_or_default(),
            broker.map(|b| b.endpoints.join(", ")).unwrap_or_default(),
        ]);
    }
    table.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::report,
        system::{
            strategy::Platform,
            testing::{ScriptedRunner, exit, ok},
        },
    };
    use chrono::TimeZone;
    use tempfile::tempdir;

    const ARN: &str = "arn:aws:kafka:eu-west-1:123456789012:cluster/orders-prod/abcd-1";

    fn cluster_json(state: &str) -> String {
        format!(
            r#"{{
                "ClusterName": "orders-prod",
                "ClusterArn": "{ARN}",
                "State": "{state}",
                "CreationTime": "2023-02-01T10:00:00.000Z",
                "CurrentBrokerSoftwareInfo": {{"KafkaVersion": "3.5.1", "ConfigurationRevision": 1}},
                "NumberOfBrokerNodes": 3,
                "BrokerNodeGroupInfo": {{
                    "InstanceType": "kafka.m5.large",
                    "ClientSubnets": ["subnet-a", "subnet-b"],
                    "StorageInfo": {{"EbsStorageInfo": {{"VolumeSize": 100}}}}
                }},
                "EnhancedMonitoring": "DEFAULT"
            }}"#
        )
    }

    const NODES: &str = r#"{"NodeInfoList": [
        {"BrokerNodeInfo": {"BrokerId": 1.0, "ClientVpcIpAddress": "10.0.1.10",
            "Endpoints": ["b-1.orders.kafka.eu-west-1.amazonaws.com"]},
         "InstanceType": "kafka.m5.large", "NodeARN": "arn:node/1", "NodeType": "BROKER"},
        {"BrokerNodeInfo": {"BrokerId": 2.0, "ClientVpcIpAddress": "10.0.2.10",
            "Endpoints": ["b-2.orders.kafka.eu-west-1.amazonaws.com"]},
         "InstanceType": "kafka.m5.large", "NodeARN": "arn:node/2", "NodeType": "BROKER"}
    ]}"#;

    fn invoker(runner: ScriptedRunner) -> Invoker<ScriptedRunner> {
        Invoker::new(runner).with_platform(Platform::Posix)
    }

    #[test]
    fn test_list_clusters_keeps_unmodelled_fields() {
        let payload = format!(r#"{{"ClusterInfoList": [{}]}}"#, cluster_json("ACTIVE"));
        let runner = ScriptedRunner::new().on(&["kafka", "list-clusters"], ok(&payload));

        let clusters = list_clusters(&invoker(runner)).unwrap();
        assert_eq!(clusters.len(), 1);
        let cluster = &clusters[0];
        assert_eq!(cluster.kafka_version(), "3.5.1");
        assert_eq!(cluster.instance_type(), Some("kafka.m5.large"));
        assert_eq!(cluster.extra["EnhancedMonitoring"], "DEFAULT");

        let dumped = serde_json::to_value(cluster).unwrap();
        assert_eq!(dumped["BrokerNodeGroupInfo"]["StorageInfo"]["EbsStorageInfo"]["VolumeSize"], 100);
        assert_eq!(dumped["CurrentBrokerSoftwareInfo"]["ConfigurationRevision"], 1);
    }

    #[test]
    fn test_list_command_shape() {
        let runner = ScriptedRunner::new().on(&["list-clusters"], ok(r#"{"ClusterInfoList": []}"#));
        let invoker = invoker(runner);
        assert!(list_clusters(&invoker).unwrap().is_empty());
        assert_eq!(
            invoker.runner().calls()[0].args,
            vec!["kafka", "list-clusters", "--output", "json"]
        );
    }

    #[test]
    fn test_overview_of_active_cluster() {
        let runner = ScriptedRunner::new()
            .on(&["list-nodes"], ok(NODES))
            .on(&["list-tags-for-resource"], ok(r#"{"Tags": {"team": "payments"}}"#));
        let info: ClusterInfo = serde_json::from_str(&cluster_json("ACTIVE")).unwrap();

        let overview = overview(&invoker(runner), info);
        assert_eq!(overview.brokers, BrokerCount::Active(2));

        let rendered = render_overview(&overview);
        assert!(rendered.contains("Active Brokers: 2\n"));
        assert!(rendered.contains("Tags:\n  team: payments\n"));
    }

    #[test]
    fn test_overview_of_creating_cluster_without_tags() {
        let runner = ScriptedRunner::new().on(&["list-tags-for-resource"], exit(254, "AccessDenied"));
        let info: ClusterInfo = serde_json::from_str(&cluster_json("CREATING")).unwrap();
        let invoker = invoker(runner);

        let overview = overview(&invoker, info);
        assert_eq!(overview.brokers, BrokerCount::NotQueried);
        assert_eq!(invoker.runner().count_matching(&["list-nodes"]), 0);
        assert!(render_overview(&overview).contains("Tags: Not available\n"));
    }

    #[test]
    fn test_details_rendering() {
        let info: ClusterInfo = serde_json::from_str(&cluster_json("ACTIVE")).unwrap();
        let rendered = render_details(&info);
        assert!(rendered.contains("Creation Time: 2023-02-01T10:00:00.000Z\n"));
        assert!(rendered.contains("Client Subnets: subnet-a, subnet-b\n"));
        assert!(!rendered.contains("Security Groups"));
        assert!(!rendered.contains("Encryption"));
    }

    #[test]
    fn test_bootstrap_kinds_in_fixed_order() {
        let payload = serde_json::json!({
            "BootstrapBrokerStringSaslIam": "b-1:9098,b-2:9098",
            "BootstrapBrokerStringTls": "b-1:9094,b-2:9094",
            "BootstrapBrokerString": ""
        });
        let endpoints = parse_bootstrap(&payload);
        assert_eq!(
            endpoints,
            vec![
                BootstrapEndpoint {
                    kind: BootstrapKind::Tls,
                    servers: "b-1:9094,b-2:9094".to_string()
                },
                BootstrapEndpoint {
                    kind: BootstrapKind::SaslIam,
                    servers: "b-1:9098,b-2:9098".to_string()
                },
            ]
        );
        assert_eq!(BootstrapKind::SaslIam.to_string(), "SASL/IAM");
    }

    #[test]
    fn test_broker_ids_print_as_integers() {
        let response: ListNodesResponse = serde_json::from_str(NODES).unwrap();
        let ids: Vec<_> = response
            .node_info_list
            .iter()
            .filter_map(NodeInfo::broker_id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);

        let rendered = render_nodes(&response.node_info_list);
        assert!(rendered.contains("10.0.2.10"));
    }

    #[test]
    fn test_csv_row_and_report_round_trip() {
        let info: ClusterInfo = serde_json::from_str(&cluster_json("ACTIVE")).unwrap();
        let overview = ClusterOverview {
            info: info.clone(),
            brokers: BrokerCount::Active(3),
            tags: Some(BTreeMap::from([("team".to_string(), "payments".to_string())])),
        };
        assert_eq!(
            overview.csv_row(),
            vec![
                "orders-prod",
                ARN,
                "ACTIVE",
                "3.5.1",
                "3",
                "3",
                "kafka.m5.large",
                "2023-02-01T10:00:00.000Z",
                "team=payments"
            ]
        );

        let dir = tempdir().unwrap();
        let path = dir.path().join("clusters.json");
        let at = Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let original = ClusterReport::new(vec![info], at);
        report::write_json(&path, &original).unwrap();
        let reloaded: ClusterReport = report::read_json(&path).unwrap();
        assert_eq!(reloaded, original);
    }

    #[test]
    fn test_cluster_brokers_survives_failed_bootstrap_call() {
        let runner = ScriptedRunner::new()
            .on(&["get-bootstrap-brokers"], exit(254, "BadRequestException"))
            .on(&["list-nodes"], ok(NODES));
        let info: ClusterInfo = serde_json::from_str(&cluster_json("ACTIVE")).unwrap();

        let brokers = cluster_brokers(&invoker(runner), &info);
        assert!(brokers.bootstrap.is_empty());
        assert_eq!(brokers.nodes.len(), 2);

        let rendered = render_brokers(&brokers);
        assert!(rendered.contains("Bootstrap servers:\n  None available\n"));
        assert!(rendered.contains("b-2.orders.kafka.eu-west-1.amazonaws.com"));
    }

    #[test]
    fn test_text_report_with_no_clusters() {
        let at = Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let text = render_text_report(&[], at);
        assert!(text.contains("Total clusters: 0\n"));
    }
}
