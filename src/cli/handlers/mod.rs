// src/cli/handlers/mod.rs

// One module per command; `commons` holds what they share.

/// Banners, output paths and cluster selection.
pub mod commons;

/// `azure-vms`
pub mod azure_vms;
/// `doctor`
pub mod doctor;
/// `msk-brokers`
pub mod msk_brokers;
/// `msk-clusters`
pub mod msk_clusters;
/// `msk-metrics`
pub mod msk_metrics;
/// `msk-topics`
pub mod msk_topics;
