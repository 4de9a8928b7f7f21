// src/core/topics.rs

//! Topic and partition layout of MSK clusters, read from the brokers over the
//! Kafka protocol.
//!
//! The `aws` CLI cannot see inside a cluster, so this module talks to the
//! bootstrap servers that [`crate::core::msk::bootstrap_brokers`] returns. The
//! connection sits behind [`MetadataSource`]; [`KafkaMetadataSource`] is the
//! librdkafka-backed implementation.

use crate::core::{config_loader::KafkaSettings, table};
use chrono::{DateTime, Local};
use futures::executor::block_on;
use rdkafka::{
    admin::{AdminClient, AdminOptions, ResourceSpecifier},
    client::DefaultClientContext,
    config::ClientConfig,
    consumer::{BaseConsumer, Consumer},
    error::{KafkaError, RDKafkaErrorCode},
    metadata::Metadata,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};
use thiserror::Error;

const SECTION_WIDTH: usize = 60;

/// Why the brokers could not be read.
#[derive(Error, Debug)]
pub enum TopicsError {
    /// Creating the client or a request failed.
    #[error("Kafka client error: {0}")]
    Kafka(#[from] KafkaError),
    /// The broker refused to describe a topic's configuration.
    #[error("Could not describe topic '{topic}': {code}")]
    DescribeConfigs {
        /// The topic asked about.
        topic: String,
        /// The broker's error code.
        code: RDKafkaErrorCode,
    },
}

// --- Records ---

/// Where a broker listens.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    /// Advertised host name.
    pub host: String,
    /// Advertised port.
    pub port: i32,
    /// Always `None`: librdkafka does not expose the rack in metadata.
    pub rack: Option<String>,
}

/// Leader and replica placement of one partition, as broker IDs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PartitionDetail {
    /// `-1` while the partition has no leader.
    pub leader: i32,
    /// Every broker holding a replica.
    pub replicas: Vec<i32>,
    /// The replicas in sync with the leader.
    pub isr: Vec<i32>,
}

/// The partitions of one topic.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TopicLayout {
    /// `partition_details.len()`.
    pub partitions: usize,
    /// The largest replica set of any partition.
    pub replication_factor: usize,
    /// By partition ID.
    pub partition_details: BTreeMap<i32, PartitionDetail>,
}

impl TopicLayout {
    /// Derives the counts from `partition_details`.
    pub fn new(partition_details: BTreeMap<i32, PartitionDetail>) -> Self {
        Self {
            partitions: partition_details.len(),
            replication_factor: partition_details
                .values()
                .map(|p| p.replicas.len())
                .max()
                .unwrap_or(0),
            partition_details,
        }
    }
}

/// What one metadata request tells about a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterTopology {
    /// By broker ID.
    pub brokers: BTreeMap<i32, BrokerAddress>,
    /// By topic name, internal topics left out.
    pub topics: BTreeMap<String, TopicLayout>,
}

/// The JSON dump of `msk-topics` for one cluster.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TopicsReport {
    /// Cluster name.
    pub cluster_name: String,
    /// Every bootstrap string of the cluster, not only the one that answered.
    pub bootstrap_servers: Vec<String>,
    /// `topics.len()`.
    pub total_topics: usize,
    /// Sum of the partition counts.
    pub total_partitions: usize,
    /// By broker ID.
    pub broker_info: BTreeMap<i32, BrokerAddress>,
    /// By topic name.
    pub topics: BTreeMap<String, TopicLayout>,
    /// When the metadata was read.
    pub generated_at: DateTime<Local>,
}

impl TopicsReport {
    /// Totals the topology of `cluster_name`.
    pub fn new(
        cluster_name: &str,
        bootstrap_servers: Vec<String>,
        topology: ClusterTopology,
        generated_at: DateTime<Local>,
    ) -> Self {
        Self {
            cluster_name: cluster_name.to_string(),
            bootstrap_servers,
            total_topics: topology.topics.len(),
            total_partitions: topology.topics.values().map(|t| t.partitions).sum(),
            broker_info: topology.brokers,
            topics: topology.topics,
            generated_at,
        }
    }
}

/// One entry of a topic's configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TopicConfigEntry {
    /// Config key, e.g. `retention.ms`.
    pub name: String,
    /// `None` for sensitive or unset values.
    pub value: Option<String>,
    /// Whether the broker default applies.
    pub is_default: bool,
    /// Where the value comes from, e.g. `DynamicTopic`.
    pub source: String,
}

/// Partition counts per broker: how many it leads and how many replicas it holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerLoad {
    /// Partitions led.
    pub leader: usize,
    /// Replicas held, led ones included.
    pub replicas: usize,
}

/// Leader and replica counts per broker ID over every partition.
pub fn broker_load(topics: &BTreeMap<String, TopicLayout>) -> BTreeMap<i32, BrokerLoad> {
    let mut load: BTreeMap<i32, BrokerLoad> = BTreeMap::new();
    for partition in topics.values().flat_map(|t| t.partition_details.values()) {
        load.entry(partition.leader).or_default().leader += 1;
        for replica in &partition.replicas {
            load.entry(*replica).or_default().replicas += 1;
        }
    }
    load
}

/// Kafka's own bookkeeping topics (`__consumer_offsets`, MSK's canary) are not
/// part of the inventory.
pub fn is_internal_topic(name: &str) -> bool {
    name.starts_with("__")
}

// --- Connection ---

/// Reads cluster metadata from a bootstrap server string.
pub trait MetadataSource {
    /// Brokers and topics as `bootstrap` reports them.
    fn topology(&self, bootstrap: &str) -> Result<ClusterTopology, TopicsError>;

    /// The configuration of `topic`, sorted by key.
    fn topic_configs(&self, bootstrap: &str, topic: &str)
    -> Result<Vec<TopicConfigEntry>, TopicsError>;
}

/// [`MetadataSource`] over librdkafka.
#[derive(Debug, Clone)]
pub struct KafkaMetadataSource {
    security_protocol: String,
    timeout: Duration,
}

impl KafkaMetadataSource {
    /// A source using `security_protocol` with `timeout` per request.
    pub fn new(security_protocol: impl Into<String>, timeout: Duration) -> Self {
        Self {
            security_protocol: security_protocol.into(),
            timeout,
        }
    }

    /// A source configured from the `[kafka]` section.
    pub fn from_settings(settings: &KafkaSettings) -> Self {
        Self::new(
            settings.security_protocol.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    fn client_config(&self, bootstrap: &str) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", bootstrap)
            .set("security.protocol", &self.security_protocol)
            .set("socket.timeout.ms", self.timeout.as_millis().to_string());
        config
    }
}

fn topology_from_metadata(metadata: &Metadata) -> ClusterTopology {
    let brokers = metadata
        .brokers()
        .iter()
        .map(|b| {
            let address = BrokerAddress {
                host: b.host().to_string(),
                port: b.port(),
                rack: None,
            };
            (b.id(), address)
        })
        .collect();

    let mut topics = BTreeMap::new();
    for topic in metadata.topics() {
        if is_internal_topic(topic.name()) {
            continue;
        }
        if let Some(err) = topic.error() {
            log::warn!(
                "Skipping topic {}: broker reported {}",
                topic.name(),
                RDKafkaErrorCode::from(err)
            );
            continue;
        }
        let details = topic
            .partitions()
            .iter()
            .map(|p| {
                let detail = PartitionDetail {
                    leader: p.leader(),
                    replicas: p.replicas().to_vec(),
                    isr: p.isr().to_vec(),
                };
                (p.id(), detail)
            })
            .collect();
        topics.insert(topic.name().to_string(), TopicLayout::new(details));
    }

    ClusterTopology { brokers, topics }
}

impl MetadataSource for KafkaMetadataSource {
    fn topology(&self, bootstrap: &str) -> Result<ClusterTopology, TopicsError> {
        let consumer: BaseConsumer = self.client_config(bootstrap).create()?;
        let metadata = consumer.fetch_metadata(None, self.timeout)?;
        Ok(topology_from_metadata(&metadata))
    }

    fn topic_configs(
        &self,
        bootstrap: &str,
        topic: &str,
    ) -> Result<Vec<TopicConfigEntry>, TopicsError> {
        let admin: AdminClient<DefaultClientContext> = self.client_config(bootstrap).create()?;
        let options = AdminOptions::new().request_timeout(Some(self.timeout));
        let specifiers = [ResourceSpecifier::Topic(topic)];
        let results = block_on(admin.describe_configs(&specifiers, &options))?;

        let mut entries = Vec::new();
        for result in results {
            let resource = result.map_err(|code| TopicsError::DescribeConfigs {
                topic: topic.to_string(),
                code,
            })?;
            entries.extend(resource.entries.into_iter().map(|e| TopicConfigEntry {
                name: e.name,
                value: e.value,
                is_default: e.is_default,
                source: format!("{:?}", e.source),
            }));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// Asks each bootstrap string in turn; the first one that answers wins.
///
/// # Arguments
/// * `source` - The connection to the brokers.
/// * `cluster_name` - Only used in log lines.
/// * `bootstrap_servers` - One entry per listener kind, tried in order.
///
/// # Returns
/// `None` when no bootstrap string answered.
pub fn fetch_topology<S: MetadataSource>(
    source: &S,
    cluster_name: &str,
    bootstrap_servers: &[String],
) -> Option<ClusterTopology> {
    for bootstrap in bootstrap_servers {
        log::info!("Connecting to {} for cluster {}", bootstrap, cluster_name);
        match source.topology(bootstrap) {
            Ok(topology) => return Some(topology),
            Err(e) => log::error!("Error connecting to {}: {}", bootstrap, e),
        }
    }
    None
}

/// A topic's configuration from the first bootstrap string that answers.
/// Empty when none does.
pub fn topic_configs<S: MetadataSource>(
    source: &S,
    bootstrap_servers: &[String],
    topic: &str,
) -> Vec<TopicConfigEntry> {
    for bootstrap in bootstrap_servers {
        match source.topic_configs(bootstrap, topic) {
            Ok(entries) => return entries,
            Err(e) => log::error!("Error getting topic config for {}: {}", topic, e),
        }
    }
    Vec::new()
}

// --- Rendering ---

fn section(title: &str) -> String {
    let rule = table::rule(SECTION_WIDTH);
    format!("\n{}\n{}\n{}\n", rule, title, rule)
}

/// Cluster header, brokers, topic table and partition distribution.
pub fn render_summary(report: &TopicsReport) -> String {
    let mut out = section(&format!("Cluster: {}", report.cluster_name));
    out.push_str(&format!(
        "Bootstrap Servers: {}\nTotal Topics: {}\nTotal Partitions: {}\nNumber of Brokers: {}\n",
        report.bootstrap_servers.join(", "),
        report.total_topics,
        report.total_partitions,
        report.broker_info.len()
    ));

    out.push_str(&section("BROKER INFORMATION"));
    for (id, broker) in &report.broker_info {
        out.push_str(&format!("Broker {}: {}:{}\n", id, broker.host, broker.port));
        if let Some(rack) = &broker.rack {
            out.push_str(&format!("  Rack: {}\n", rack));
        }
    }

    out.push_str(&section("TOPICS AND PARTITIONS"));
    let mut topics = table::Table::new(["Topic Name", "Partitions", "Replication"]);
    for (name, topic) in &report.topics {
        topics.push_row(vec![
            name.clone(),
            topic.partitions.to_string(),
            topic.replication_factor.to_string(),
        ]);
    }
    out.push_str(&topics.render());

    out.push_str(&section("PARTITION DISTRIBUTION BY BROKER"));
    let mut load = table::Table::new(["Broker", "Leader Partitions", "Total Replicas"]);
    for (id, counts) in broker_load(&report.topics) {
        load.push_row(vec![
            id.to_string(),
            counts.leader.to_string(),
            counts.replicas.to_string(),
        ]);
    }
    if load.is_empty() {
        out.push_str("No partitions reported\n");
    } else {
        out.push_str(&load.render());
    }
    out
}

/// The title printed before the per-topic configurations.
pub fn render_configs_header() -> String {
    section("DETAILED TOPIC CONFIGURATIONS")
}

/// ```text
/// Topic: orders
///   retention.ms: 604800000 (default: true)
/// ```
pub fn render_topic_configs(topic: &str, entries: &[TopicConfigEntry]) -> String {
    let mut out = format!("\nTopic: {}\n", topic);
    for entry in entries {
        out.push_str(&format!(
            "  {}: {} (default: {})\n",
            entry.name,
            entry.value.as_deref().unwrap_or("-"),
            entry.is_default
        ));
    }
    out
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Answers from canned metadata; bootstrap strings listed in `down` fail.
    #[derive(Debug, Default)]
    pub(crate) struct CannedSource {
        pub(crate) topology: ClusterTopology,
        pub(crate) configs: BTreeMap<String, Vec<TopicConfigEntry>>,
        pub(crate) down: Vec<String>,
        pub(crate) asked: RefCell<Vec<String>>,
    }

    impl CannedSource {
        pub(crate) fn new(topology: ClusterTopology) -> Self {
            Self {
                topology,
                ..Default::default()
            }
        }

        fn check(&self, bootstrap: &str) -> Result<(), TopicsError> {
            self.asked.borrow_mut().push(bootstrap.to_string());
            if self.down.iter().any(|d| d == bootstrap) {
                return Err(KafkaError::MetadataFetch(RDKafkaErrorCode::AllBrokersDown).into());
            }
            Ok(())
        }
    }

    impl MetadataSource for CannedSource {
        fn topology(&self, bootstrap: &str) -> Result<ClusterTopology, TopicsError> {
            self.check(bootstrap)?;
            Ok(self.topology.clone())
        }

        fn topic_configs(
            &self,
            bootstrap: &str,
            topic: &str,
        ) -> Result<Vec<TopicConfigEntry>, TopicsError> {
            self.check(bootstrap)?;
            Ok(self.configs.get(topic).cloned().unwrap_or_default())
        }
    }

    pub(crate) fn partition(leader: i32, replicas: &[i32]) -> PartitionDetail {
        PartitionDetail {
            leader,
            replicas: replicas.to_vec(),
            isr: replicas.to_vec(),
        }
    }

    /// Brokers 1-3 and two topics: `orders` (3 partitions, RF 2) and
    /// `audit` (1 partition, RF 3).
    pub(crate) fn topology() -> ClusterTopology {
        let brokers = (1..=3)
            .map(|id| {
                let address = BrokerAddress {
                    host: format!("b-{}.orders.kafka.eu-west-1.amazonaws.com", id),
                    port: 9092,
                    rack: None,
                };
                (id, address)
            })
            .collect();
        let orders = TopicLayout::new(BTreeMap::from([
            (0, partition(1, &[1, 2])),
            (1, partition(2, &[2, 3])),
            (2, partition(3, &[3, 1])),
        ]));
        let audit = TopicLayout::new(BTreeMap::from([(0, partition(1, &[1, 2, 3]))]));
        ClusterTopology {
            brokers,
            topics: BTreeMap::from([("orders".to_string(), orders), ("audit".to_string(), audit)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{CannedSource, partition, topology};
    use super::*;
    use chrono::TimeZone;

    fn report(topology: ClusterTopology) -> TopicsReport {
        TopicsReport::new(
            "orders-prod",
            vec!["b-1:9092,b-2:9092".to_string()],
            topology,
            Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_layout_counts_partitions_and_replication() {
        let layout = TopicLayout::new(BTreeMap::from([
            (0, partition(1, &[1, 2])),
            (1, partition(2, &[2, 3, 1])),
        ]));
        assert_eq!(layout.partitions, 2);
        assert_eq!(layout.replication_factor, 3);
        assert_eq!(TopicLayout::new(BTreeMap::new()).replication_factor, 0);
    }

    #[test]
    fn test_report_totals() {
        let report = report(topology());
        assert_eq!(report.total_topics, 2);
        assert_eq!(report.total_partitions, 4);
        assert_eq!(report.broker_info.len(), 3);
    }

    #[test]
    fn test_broker_load_counts_leaders_and_replicas() {
        let load = broker_load(&topology().topics);
        assert_eq!(load.get(&1), Some(&BrokerLoad { leader: 2, replicas: 3 }));
        assert_eq!(load.get(&2), Some(&BrokerLoad { leader: 1, replicas: 3 }));
        assert_eq!(load.get(&3), Some(&BrokerLoad { leader: 1, replicas: 3 }));
    }

    #[test]
    fn test_internal_topics() {
        assert!(is_internal_topic("__consumer_offsets"));
        assert!(is_internal_topic("__amazon_msk_canary"));
        assert!(!is_internal_topic("orders_v2"));
    }

    #[test]
    fn test_first_reachable_bootstrap_wins() {
        let mut source = CannedSource::new(topology());
        source.down = vec!["b-1:9092".to_string()];
        let servers = vec![
            "b-1:9092".to_string(),
            "b-1:9094".to_string(),
            "b-1:9096".to_string(),
        ];

        let found = fetch_topology(&source, "orders", &servers).unwrap();
        assert_eq!(found.topics.len(), 2);
        assert_eq!(*source.asked.borrow(), vec!["b-1:9092", "b-1:9094"]);
    }

    #[test]
    fn test_unreachable_cluster_yields_nothing() {
        let mut source = CannedSource::new(topology());
        source.down = vec!["b-1:9092".to_string()];
        assert!(fetch_topology(&source, "orders", &["b-1:9092".to_string()]).is_none());
        assert!(topic_configs(&source, &["b-1:9092".to_string()], "orders").is_empty());
    }

    #[test]
    fn test_summary_sections() {
        let rendered = render_summary(&report(topology()));
        assert!(rendered.contains("Cluster: orders-prod\n"));
        assert!(rendered.contains("Bootstrap Servers: b-1:9092,b-2:9092\n"));
        assert!(rendered.contains("Total Partitions: 4\n"));
        assert!(rendered.contains("Broker 2: b-2.orders.kafka.eu-west-1.amazonaws.com:9092\n"));
        assert!(rendered.contains("audit       1           3"));
        assert!(rendered.contains("orders      3           2"));
        assert!(rendered.contains("1       2                  3"));
    }

    #[test]
    fn test_summary_without_partitions() {
        let mut topology = topology();
        for topic in topology.topics.values_mut() {
            *topic = TopicLayout::new(BTreeMap::new());
        }
        let rendered = render_summary(&report(topology));
        let expected = format!(
            "PARTITION DISTRIBUTION BY BROKER\n{}\nNo partitions reported\n",
            table::rule(SECTION_WIDTH)
        );
        assert!(rendered.ends_with(&expected));
    }

    #[test]
    fn test_topic_config_lines() {
        let entries = vec![
            TopicConfigEntry {
                name: "cleanup.policy".to_string(),
                value: Some("compact".to_string()),
                is_default: false,
                source: "DynamicTopic".to_string(),
            },
            TopicConfigEntry {
                name: "sasl.jaas.config".to_string(),
                value: None,
                is_default: true,
                source: "Default".to_string(),
            },
        ];
        assert_eq!(
            render_topic_configs("orders", &entries),
            "\nTopic: orders\n  cleanup.policy: compact (default: false)\n  sasl.jaas.config: - (default: true)\n"
        );
    }
}
