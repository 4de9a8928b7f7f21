// src/core/mod.rs

pub mod azure;
pub mod config_loader;
pub mod metrics;
pub mod msk;
/// Config directory, path expansion and report file names.
pub mod paths;
pub mod report;
/// Plain-text tables and distributions.
pub mod table;
pub mod topics;
