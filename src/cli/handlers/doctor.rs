// src/cli/handlers/doctor.rs

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::{dispatcher::AppContext, handlers::commons},
    system::{
        diagnostics::{self, AttemptReport},
        executor::{Outcome, ProcessRunner},
        strategy::ExecMode,
        tool::Tool,
    },
};

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Shows how the cloud CLI can (or cannot) be launched on this machine."
)]
struct DoctorArgs {
    /// Which CLI to diagnose: `azure` or `aws`.
    #[arg(long, value_parser = parse_tool, default_value = "azure")]
    tool: Tool,
}

fn parse_tool(value: &str) -> Result<Tool, String> {
    [Tool::Azure, Tool::Aws]
        .into_iter()
        .find(|tool| tool.flag_name() == value.to_lowercase())
        .ok_or_else(|| format!("unknown tool '{}' (expected 'azure' or 'aws')", value))
}

fn section(title: &str) {
    println!("\n{}", title.bold());
    println!("{}", "-".repeat(title.len()));
}

fn mode_label(mode: ExecMode) -> &'static str {
    match mode {
        ExecMode::Direct => "direct",
        ExecMode::Shell => "shell",
    }
}

/// One line per attempt, e.g. `SUCCESS: azure-cli 2.61.0`.
fn describe_attempt(report: &AttemptReport, show_output: bool) -> String {
    let result = &report.result;
    match result.outcome {
        Outcome::Success if show_output => {
            format!("{}: {}", "SUCCESS".green(), diagnostics::first_line(&result.stdout))
        }
        Outcome::Success => format!("{} (return code 0)", "SUCCESS".green()),
        Outcome::NonZeroExit if show_output => format!(
            "{} (return code {}): {}",
            "FAILED".red(),
            result.exit_code.map_or_else(|| "?".to_string(), |c| c.to_string()),
            diagnostics::first_line(&result.stderr)
        ),
        Outcome::NonZeroExit => format!(
            "{} (return code {})",
            "FAILED".red(),
            result.exit_code.map_or_else(|| "?".to_string(), |c| c.to_string())
        ),
        Outcome::NotFound => "NOT FOUND".yellow().to_string(),
        Outcome::TimedOut => "TIMEOUT".yellow().to_string(),
        Outcome::OtherError => format!(
            "{}: {}",
            "ERROR".red(),
            diagnostics::first_line(&result.stderr)
        ),
    }
}

/// Runs `doctor`.
pub fn handle<R: ProcessRunner>(args: Vec<String>, ctx: &AppContext<R>) -> Result<()> {
    let args = DoctorArgs::try_parse_from(&args)?;
    let tool = args.tool;
    let invoker = &ctx.invoker;
    let platform = invoker.platform();
    let timeout = invoker.check_timeout();

    commons::banner(&format!("{} Doctor", tool.display_name()));

    section("SYSTEM INFORMATION");
    let info = diagnostics::system_info();
    println!("OS: {}", info.os);
    println!("Architecture: {}", info.arch);
    println!("OS family: {}", info.family);
    if let Some(exe) = &info.executable {
        println!("Executable: {}", exe.display());
    }
    if let Some(dir) = &info.working_dir {
        println!("Working directory: {}", dir.display());
    }
    println!("cloudinv version: {}", info.version);

    section("PATH");
    for (i, entry) in diagnostics::path_entries().iter().enumerate() {
        println!("  {}. {}", i + 1, entry.display());
    }

    section(&format!("LOCATING {}", tool.binary()));
    let located = diagnostics::locate(invoker.runner(), tool, platform, timeout);
    println!("{}: {}", located.label, describe_attempt(&located, false));
    for line in located.result.stdout.lines().filter(|l| !l.trim().is_empty()) {
        println!("  {}", line.trim());
    }

    section("CANDIDATE BINARIES");
    for report in diagnostics::candidate_matrix(invoker.runner(), tool, platform, timeout) {
        println!(
            "{} ({}): {}",
            report.label,
            mode_label(report.mode),
            describe_attempt(&report, true)
        );
    }

    section("SESSION CHECK");
    for (i, report) in diagnostics::session_matrix(invoker, tool).iter().enumerate() {
        // The session command's output may contain account data; only codes are shown.
        println!(
            "Method {} ({}): {}",
            i + 1,
            mode_label(report.mode),
            describe_attempt(report, false)
        );
    }

    section("RECOMMENDATIONS");
    for (i, line) in diagnostics::recommendations(tool, platform).iter().enumerate() {
        println!("{}. {}", i + 1, line);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::config_loader::Settings,
        system::{
            executor::InvocationResult,
            invoker::Invoker,
            strategy::Platform,
            testing::{ScriptedRunner, exit, ok},
        },
    };

    fn attempt(result: InvocationResult) -> AttemptReport {
        AttemptReport {
            label: "az".to_string(),
            mode: ExecMode::Direct,
            result,
        }
    }

    #[test]
    fn test_tool_flag() {
        assert_eq!(DoctorArgs::try_parse_from(Vec::<String>::new()).unwrap().tool, Tool::Azure);
        assert_eq!(DoctorArgs::try_parse_from(["--tool", "AWS"]).unwrap().tool, Tool::Aws);
        assert!(DoctorArgs::try_parse_from(["--tool", "gcp"]).is_err());
    }

    #[test]
    fn test_success_shows_first_output_line() {
        colored::control::set_override(false);
        let line = describe_attempt(&attempt(ok("\nazure-cli 2.61.0\ncore 2.61.0")), true);
        assert_eq!(line, "SUCCESS: azure-cli 2.61.0");
    }

    #[test]
    fn test_session_lines_hide_output() {
        colored::control::set_override(false);
        let line = describe_attempt(&attempt(exit(1, "Please run 'az login'")), false);
        assert_eq!(line, "FAILED (return code 1)");
    }

    #[test]
    fn test_every_candidate_is_tried_in_both_modes() {
        let ctx = AppContext::new(
            Invoker::new(ScriptedRunner::new()).with_platform(Platform::Posix),
            Settings::default(),
        );
        handle(vec!["--tool".to_string(), "aws".to_string()], &ctx).unwrap();

        let candidates = diagnostics::candidate_binaries(Tool::Aws, Platform::Posix).len();
        let version_calls = ctx.invoker.runner().count_matching(&["--version"]);
        assert!(version_calls >= candidates * 2);
    }
}
