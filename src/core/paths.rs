// src/core/paths.rs

use crate::constants::{APP_DIR, CONFIG_DIR_ENV, CONFIG_FILENAME, FILENAME_TIMESTAMP_FORMAT};
use chrono::{DateTime, Local};
use lazy_static::lazy_static;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Why a path could not be resolved.
#[derive(Error, Debug)]
pub enum PathError {
    /// The OS reports no config directory.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// The config directory could not be created.
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        /// The directory that was being created.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// `~` or a variable in a user path could not be expanded.
    #[error("Failed to expand path '{template}': {reason}")]
    Expansion {
        /// The path as written.
        template: String,
        /// Usually the name of an unset variable.
        reason: String,
    },
}

/// Returns the path to the cloudinv configuration directory
/// (`~/.config/cloudinv`, or `$CLOUDINV_CONFIG_DIR`). Creates it if it doesn't exist.
///
/// The first call computes and caches the path; later calls return the cached value.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    // A poisoned lock only means another thread panicked mid-lookup; the cached
    // value is still either None or a complete path.
    let mut cached_path_guard = CONFIG_DIR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    let config_path = match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::config_dir()
            .ok_or(PathError::ConfigDirNotFound)?
            .join(APP_DIR),
    };

    if !config_path.exists() {
        fs::create_dir_all(&config_path).map_err(|e| PathError::ConfigDirCreation {
            path: config_path.display().to_string(),
            source: e,
        })?;
    }

    *cached_path_guard = Some(config_path.clone());
    Ok(config_path)
}

/// Returns the path to `config.toml`.
pub fn get_config_file_path() -> Result<PathBuf, PathError> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        reason: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Builds `<domain>_<entity>_<YYYYMMDD_HHMMSS>.<ext>`.
///
/// `entity` may carry a resource name (e.g. a cluster name); characters that
/// don't belong in file names are replaced with `_`.
pub fn default_filename(domain: &str, entity: &str, ext: &str, at: DateTime<Local>) -> String {
    format!(
        "{}_{}_{}.{}",
        domain,
        sanitize_component(entity),
        at.format(FILENAME_TIMESTAMP_FORMAT),
        ext
    )
}

fn sanitize_component(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Picks the output file: an explicit path is used as given; otherwise the
/// default name is placed in `output_dir` (or the current directory).
pub fn resolve_output_path(
    explicit: Option<&Path>,
    output_dir: Option<&Path>,
    default_name: &str,
) -> PathBuf {
    match (explicit, output_dir) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(dir)) => dir.join(default_name),
        (None, None) => PathBuf::from(default_name),
    }
}

/// Inserts `_<suffix>` before the extension of `path`, e.g. `out.json` →
/// `out_orders.json`. The suffix is sanitized like a default file name part.
pub fn with_file_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{}_{}", stem, sanitize_component(suffix));
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}
