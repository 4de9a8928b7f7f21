//! # System Interaction Layer
//!
//! This module is the boundary between the cloud inventory logic and the
//! external command-line tools it drives.
//!
//! ## Modules
//!
//! - **`strategy`**: The closed set of ways a command can be launched (direct or
//!   through a shell, canonical binary or `.cmd` shim) and the fixed per-platform
//!   order in which they are tried.
//! - **`executor`**: The `ProcessRunner` seam and the real `SystemRunner`, which
//!   spawns one process with a timeout and classifies how it ended.
//! - **`invoker`**: Walks the strategy table for a logical command and returns
//!   the first valid JSON payload. Also hosts the availability and session checks.
//! - **`diagnostics`**: The `doctor` report: PATH, locator lookups and a matrix of
//!   candidate binaries tried in both execution modes.
//! - **`tool`**: The external tools (`az`, `aws`) and their remediation text.

pub mod diagnostics;
/// Process launching with timeouts.
pub mod executor;
pub mod invoker;
pub mod strategy;
/// The `az` and `aws` tools.
pub mod tool;

#[cfg(test)]
pub(crate) mod testing;
