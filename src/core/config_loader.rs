//! # Config Loader
//!
//! Loads `config.toml` from the cloudinv config directory. When the file does
//! not exist, a copy holding the defaults is written so users have something to
//! edit. Every section and field is optional in the file.

use crate::{
    constants::{
        DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_KAFKA_SECURITY_PROTOCOL, DEFAULT_KAFKA_TIMEOUT_SECS,
        DEFAULT_LOOKBACK_HOURS, DEFAULT_METRIC_PERIOD_SECS, DEFAULT_CHECK_TIMEOUT_SECS,
    },
    core::paths::{self, PathError},
    system::{executor::ProcessRunner, invoker::Invoker, tool::Tool},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Why the configuration could not be loaded or written.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// The config directory could not be resolved.
    #[error(transparent)]
    Path(#[from] PathError),
    /// The file is not valid TOML or has unknown fields.
    #[error("Failed to parse '{path}': {source}")]
    TomlParse {
        /// The file that failed to parse.
        path: String,
        /// The parser's error.
        #[source]
        source: toml::de::Error,
    },
    /// The defaults could not be turned into TOML.
    #[error("Failed to serialize config to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// The contents of `config.toml`, one field per section.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// `[timeouts]`
    pub timeouts: Timeouts,
    /// `[output]`
    pub output: OutputSettings,
    /// `[azure]`
    pub azure: AzureSettings,
    /// `[aws]`
    pub aws: AwsSettings,
    /// `[metrics]`
    pub metrics: MetricsSettings,
    /// `[kafka]`
    pub kafka: KafkaSettings,
}

/// Per-attempt process timeouts, in seconds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    /// Per-attempt limit for data-bearing commands.
    pub command_secs: u64,
    /// Per-attempt limit for `--version` checks.
    pub check_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            check_secs: DEFAULT_CHECK_TIMEOUT_SECS,
        }
    }
}

/// Where reports are written.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    /// Where generated reports go when no file name is given. `~` and
    /// environment variables are expanded.
    pub directory: Option<String>,
}

/// Azure CLI overrides.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AzureSettings {
    /// Use this executable instead of `az`.
    pub binary: Option<String>,
}

/// AWS CLI overrides. `profile` and `region` are passed to every `aws` call.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AwsSettings {
    /// Use this executable instead of `aws`.
    pub binary: Option<String>,
    /// Value of `--profile`.
    pub profile: Option<String>,
    /// Value of `--region`.
    pub region: Option<String>,
}

/// CloudWatch query defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsSettings {
    /// How far back `msk-metrics` looks without `--hours`.
    pub lookback_hours: u32,
    /// Aggregation period of each datapoint.
    pub period_secs: u32,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
            period_secs: DEFAULT_METRIC_PERIOD_SECS,
        }
    }
}

/// How `msk-topics` talks to the brokers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct KafkaSettings {
    /// librdkafka `security.protocol`, e.g. `plaintext` or `sasl_plaintext`.
    pub security_protocol: String,
    /// Limit for each metadata or admin request.
    pub request_timeout_secs: u64,
}

impl Default for KafkaSettings {
    fn default() -> Self {
        Self {
            security_protocol: DEFAULT_KAFKA_SECURITY_PROTOCOL.to_string(),
            request_timeout_secs: DEFAULT_KAFKA_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Parses settings from TOML text.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParse {
            path: origin.display().to_string(),
            source,
        })
    }

    /// The expanded output directory, if one is configured.
    pub fn output_dir(&self) -> Result<Option<PathBuf>, PathError> {
        self.output
            .directory
            .as_deref()
            .map(paths::expand_path)
            .transpose()
    }

    /// Arguments appended to every `aws` call.
    pub fn aws_global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(profile) = &self.aws.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        if let Some(region) = &self.aws.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
        args
    }

    /// Applies timeouts, binary overrides and global arguments to an invoker.
    pub fn configure<R: ProcessRunner>(&self, invoker: Invoker<R>) -> Invoker<R> {
        let mut invoker = invoker
            .with_timeouts(
                Duration::from_secs(self.timeouts.command_secs),
                Duration::from_secs(self.timeouts.check_secs),
            )
            .with_global_args(Tool::Aws, self.aws_global_args());
        if let Some(binary) = &self.azure.binary {
            invoker = invoker.with_binary(Tool::Azure, binary.clone());
        }
        if let Some(binary) = &self.aws.binary {
            invoker = invoker.with_binary(Tool::Aws, binary.clone());
        }
        invoker
    }
}

/// Loads `config.toml` from `path`, writing the defaults there first if the
/// file is missing.
pub fn load_or_init(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        let defaults = Settings::default();
        let toml_string = toml::to_string_pretty(&defaults)?;
        fs::write(path, toml_string)?;
        log::debug!("Default configuration written to {}", path.display());
        return Ok(defaults);
    }
    let content = fs::read_to_string(path)?;
    Settings::from_toml(&content, path)
}

/// Loads the user's settings from the config directory.
///
/// A config directory that can't be found or created is not fatal: the run
/// continues with defaults. A file that exists but doesn't parse is an error.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let path = match paths::get_config_file_path() {
        Ok(path) => path,
        Err(e) => {
            log::warn!("{}; using default settings", e);
            return Ok(Settings::default());
        }
    };
    match load_or_init(&path) {
        Err(ConfigError::Io(e)) => {
            log::warn!("Could not access {}: {}; using default settings", path.display(), e);
            Ok(Settings::default())
        }
        other => other,
    }
}
