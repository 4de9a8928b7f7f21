// src/constants.rs

/// The name of the cloudinv directory inside the system config directory.
pub const APP_DIR: &str = "cloudinv";

/// The name of the configuration file (inside the app config directory).
pub const CONFIG_FILENAME: &str = "config.toml";

/// Environment variable that points the config lookup at another directory.
pub const CONFIG_DIR_ENV: &str = "CLOUDINV_CONFIG_DIR";

/// Per-attempt timeout for data-bearing commands, in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

/// Per-attempt timeout for `--version` checks, in seconds.
pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 10;

/// How far back CloudWatch metrics are read by default, in hours.
pub const DEFAULT_LOOKBACK_HOURS: u32 = 24;

/// Upper bound for `--hours`: CloudWatch keeps metric data for 455 days.
pub const MAX_LOOKBACK_HOURS: u32 = 455 * 24;

/// CloudWatch aggregation period, in seconds.
pub const DEFAULT_METRIC_PERIOD_SECS: u32 = 300;

/// `security.protocol` used for Kafka connections unless configured.
pub const DEFAULT_KAFKA_SECURITY_PROTOCOL: &str = "plaintext";

/// Kafka metadata and admin request timeout, in seconds.
pub const DEFAULT_KAFKA_TIMEOUT_SECS: u64 = 30;

/// Timestamp layout used in generated file names.
pub const FILENAME_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// CloudWatch namespace of MSK metrics.
pub const MSK_NAMESPACE: &str = "AWS/Kafka";
