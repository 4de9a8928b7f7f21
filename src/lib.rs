//! cloudinv: inventory of Azure VMs and Amazon MSK clusters, gathered by
//! driving the `az` and `aws` command-line tools.

/// Command-line parsing and the command handlers.
pub mod cli;
/// Shared names, defaults and limits.
pub mod constants;
/// Domain logic: cloud payloads, records, reports and configuration.
pub mod core;
/// The error type handlers see.
pub mod error;
pub mod system;
