// src/system/diagnostics.rs

//! Data gathering for the `doctor` command.
//!
//! Unlike the invoker, nothing here stops at the first success: every candidate
//! is tried in every mode so the user can see which combinations work.

use crate::system::{
    executor::{InvocationResult, ProcessRequest, ProcessRunner},
    invoker::{Invoker, LogicalCommand},
    strategy::{ExecMode, Platform},
    tool::Tool,
};
use std::{env, path::PathBuf, time::Duration};

/// Host facts printed at the top of the report.
#[derive(Debug, Clone)]
pub struct SystemInfo {
    /// Operating system, e.g. `linux`.
    pub os: &'static str,
    /// CPU architecture, e.g. `x86_64`.
    pub arch: &'static str,
    /// `unix` or `windows`.
    pub family: &'static str,
    /// Path of the running cloudinv binary.
    pub executable: Option<PathBuf>,
    /// Current directory.
    pub working_dir: Option<PathBuf>,
    /// Version of this crate.
    pub version: &'static str,
}

/// Collects [`SystemInfo`] for the running process.
pub fn system_info() -> SystemInfo {
    SystemInfo {
        os: env::consts::OS,
        arch: env::consts::ARCH,
        family: env::consts::FAMILY,
        executable: env::current_exe().ok(),
        working_dir: env::current_dir().ok(),
        version: env!("CARGO_PKG_VERSION"),
    }
}

/// The directories of `PATH`, in lookup order.
pub fn path_entries() -> Vec<PathBuf> {
    env::var_os("PATH")
        .map(|path| env::split_paths(&path).collect())
        .unwrap_or_default()
}

/// One launch tried by the doctor and how it ended.
#[derive(Debug, Clone)]
pub struct AttemptReport {
    /// The command line that was run.
    pub label: String,
    /// Direct or through a shell.
    pub mode: ExecMode,
    /// How it ended.
    pub result: InvocationResult,
}

/// Binaries worth trying for `tool`: bare names first, then the usual install
/// locations of the platform.
pub fn candidate_binaries(tool: Tool, platform: Platform) -> Vec<String> {
    let name = tool.binary();
    let mut candidates = Vec::new();

    match platform {
        Platform::Windows => {
            candidates.push(name.to_string());
            candidates.push(format!("{}.cmd", name));
            candidates.push(format!("{}.exe", name));
            match tool {
                Tool::Azure => {
                    candidates.push(
                        r"C:\Program Files (x86)\Microsoft SDKs\Azure\CLI2\wbin\az.cmd".to_string(),
                    );
                    candidates.push(
                        r"C:\Program Files\Microsoft SDKs\Azure\CLI2\wbin\az.cmd".to_string(),
                    );
                    if let Some(local) = dirs::data_local_dir() {
                        candidates.push(
                            local
                                .join("Programs")
                                .join("Microsoft Azure CLI")
                                .join("az.cmd")
                                .display()
                                .to_string(),
                        );
                    }
                }
                Tool::Aws => {
                    candidates.push(r"C:\Program Files\Amazon\AWSCLIV2\aws.exe".to_string());
                }
            }
        }
        Platform::Posix => {
            candidates.push(name.to_string());
            for dir in ["/usr/local/bin", "/usr/bin", "/opt/homebrew/bin"] {
                candidates.push(format!("{}/{}", dir, name));
            }
            if let Some(home) = dirs::home_dir() {
                candidates.push(home.join(".local").join("bin").join(name).display().to_string());
            }
        }
    }
    candidates
}

/// Asks the platform's locator (`where` / `which -a`) where `tool` lives.
pub fn locate<R: ProcessRunner>(
    runner: &R,
    tool: Tool,
    platform: Platform,
    timeout: Duration,
) -> AttemptReport {
    let (program, args) = match platform {
        Platform::Windows => ("where", vec![tool.binary().to_string()]),
        Platform::Posix => ("which", vec!["-a".to_string(), tool.binary().to_string()]),
    };
    let request = ProcessRequest::new(program, args, ExecMode::Shell);
    AttemptReport {
        label: format!("{} {}", program, tool.binary()),
        mode: ExecMode::Shell,
        result: runner.run(&request, timeout),
    }
}

/// Runs `<candidate> --version` for every candidate, directly and through the shell.
pub fn candidate_matrix<R: ProcessRunner>(
    runner: &R,
    tool: Tool,
    platform: Platform,
    timeout: Duration,
) -> Vec<AttemptReport> {
    let version_args: Vec<String> = tool.version_args().iter().map(|a| a.to_string()).collect();
    let mut reports = Vec::new();
    for candidate in candidate_binaries(tool, platform) {
        for mode in [ExecMode::Direct, ExecMode::Shell] {
            let request = ProcessRequest::new(candidate.clone(), version_args.clone(), mode);
            reports.push(AttemptReport {
                label: candidate.clone(),
                mode,
                result: runner.run(&request, timeout),
            });
        }
    }
    reports
}

/// Runs the session command through every strategy of the invoker's platform.
/// Only return codes are meant to be shown; the output may hold account data.
pub fn session_matrix<R: ProcessRunner>(invoker: &Invoker<R>, tool: Tool) -> Vec<AttemptReport> {
    let command = LogicalCommand::session(tool);
    invoker
        .strategies()
        .iter()
        .map(|strategy| {
            let request = invoker.request_for(strategy, &command);
            let label = request.display_line();
            AttemptReport {
                label,
                mode: strategy.mode,
                result: invoker.runner().run(&request, invoker.check_timeout()),
            }
        })
        .collect()
}

/// Numbered advice printed at the end of the doctor report.
pub fn recommendations(tool: Tool, platform: Platform) -> Vec<String> {
    let name = tool.binary();
    let mut lines = Vec::new();
    if platform == Platform::Windows {
        lines.push(format!(
            "If 'where {name}' found {name}.cmd, configure binary = \"{name}.cmd\" in config.toml"
        ));
        lines.push(
            "If the shell works but direct execution doesn't, the shell strategies will be used automatically"
                .to_string(),
        );
    }
    lines.push(format!("Make sure {} is properly installed and in PATH", tool.display_name()));
    match platform {
        Platform::Windows => {
            lines.push(format!(
                "Try restarting PowerShell after {} installation",
                tool.display_name()
            ));
            lines.push("Check if running as administrator helps".to_string());
        }
        Platform::Posix => {
            lines.push("Open a new shell so PATH changes from the installer take effect".to_string());
        }
    }
    match tool {
        Tool::Azure => lines.push("If the session check fails, run: az login".to_string()),
        Tool::Aws => lines.push("If the session check fails, run: aws configure".to_string()),
    }
    lines
}

/// The first non-empty line of a block of process output.
pub fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}
