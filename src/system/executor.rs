// src/system/executor.rs

use crate::system::strategy::{ExecMode, Platform, shell_line};
use std::io::{ErrorKind, Read};
use std::process::{Child, Command as StdCommand, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Interval between two `try_wait` polls while a child is running.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long the output readers get to finish after a timed-out child is killed.
const READER_GRACE: Duration = Duration::from_millis(500);

/// How a single process attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Exit code 0.
    Success,
    /// Exited with any other code.
    NonZeroExit,
    /// The binary could not be found, by the OS or by the shell.
    NotFound,
    /// Killed after the timeout.
    TimedOut,
    /// Spawning failed for another reason, e.g. permissions.
    OtherError,
}

/// Everything one attempt produced. Never retained past the attempt that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// `None` when the process never exited on its own.
    pub exit_code: Option<i32>,
    /// Everything written to stdout, decoded lossily.
    pub stdout: String,
    /// Everything written to stderr, or the spawn error when there was no process.
    pub stderr: String,
    /// How the attempt ended.
    pub outcome: Outcome,
}

impl InvocationResult {
    /// A completed process, classified by its exit code.
    pub fn exited(exit_code: Option<i32>, stdout: String, stderr: String) -> Self {
        let outcome = if exit_code == Some(0) {
            Outcome::Success
        } else {
            Outcome::NonZeroExit
        };
        Self {
            exit_code,
            stdout,
            stderr,
            outcome,
        }
    }

    /// An attempt that never produced an exit status.
    pub fn failed(outcome: Outcome, detail: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr: detail.into(),
            outcome,
        }
    }

    /// Whether the attempt ended with exit code 0.
    pub fn success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// A fully resolved process launch: the binary, its arguments and the mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    /// Binary name or path.
    pub program: String,
    /// Arguments, unquoted.
    pub args: Vec<String>,
    /// Direct or through a shell.
    pub mode: ExecMode,
}

impl ProcessRequest {
    /// A launch of `program` with `args` in `mode`.
    pub fn new(program: impl Into<String>, args: Vec<String>, mode: ExecMode) -> Self {
        Self {
            program: program.into(),
            args,
            mode,
        }
    }

    /// The command line as a user would type it, for logs and diagnostics.
    pub fn display_line(&self) -> String {
        shell_line(Platform::host(), &self.program, &self.args)
    }
}

/// Runs one process attempt. The seam that lets tests replace real processes.
pub trait ProcessRunner {
    /// Runs `request`, blocking until it exits or `timeout` elapses.
    ///
    /// Implementations never fail: every problem is reported through
    /// [`InvocationResult::outcome`].
    fn run(&self, request: &ProcessRequest, timeout: Duration) -> InvocationResult;
}

/// The real runner, backed by `std::process`.
#[derive(Debug, Clone, Copy)]
pub struct SystemRunner {
    platform: Platform,
}

impl SystemRunner {
    /// A runner for the host platform.
    pub fn new() -> Self {
        Self {
            platform: Platform::host(),
        }
    }

    fn build_command(&self, request: &ProcessRequest) -> StdCommand {
        let mut command = match request.mode {
            ExecMode::Direct => {
                let mut command = StdCommand::new(&request.program);
                command.args(&request.args);
                command
            }
            ExecMode::Shell => {
                let line = shell_line(self.platform, &request.program, &request.args);
                match self.platform {
                    Platform::Windows => {
                        let mut command = StdCommand::new("cmd");
                        command.arg("/C");
                        push_cmd_line(&mut command, line);
                        command
                    }
                    Platform::Posix => {
                        // `exec` makes the tool the direct child, so a timeout
                        // kill reaches it instead of only the shell.
                        let mut command = StdCommand::new("sh");
                        command.arg("-c").arg(format!("exec {}", line));
                        command
                    }
                }
            }
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    /// Kills a timed-out child. `cmd` has no `exec`, so on Windows the shell's
    /// whole process tree is taken down with `taskkill /T`.
    fn kill_tree(&self, mode: ExecMode, child: &mut Child) {
        if mode == ExecMode::Shell && self.platform == Platform::Windows {
            let pid = child.id().to_string();
            match StdCommand::new("taskkill")
                .args(["/F", "/T", "/PID", pid.as_str()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                Ok(status) if status.success() => {}
                Ok(status) => log::debug!("taskkill for PID {} returned {:?}", pid, status.code()),
                Err(e) => log::warn!("Failed to run taskkill for PID {}: {}", pid, e),
            }
        }
        kill_child(child);
    }

    /// Maps an exit code to an outcome. A shell reports a missing command
    /// through its own exit code rather than a spawn error.
    fn classify_exit(&self, mode: ExecMode, result: InvocationResult) -> InvocationResult {
        if mode == ExecMode::Shell && result.exit_code == Some(self.platform.shell_not_found_code())
        {
            return InvocationResult {
                outcome: Outcome::NotFound,
                ..result
            };
        }
        result
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, request: &ProcessRequest, timeout: Duration) -> InvocationResult {
        let mut child = match self.build_command(request).spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return InvocationResult::failed(Outcome::NotFound, e.to_string());
            }
            Err(e) => return InvocationResult::failed(Outcome::OtherError, e.to_string()),
        };

        // Pipes are drained on their own threads so a child that writes more
        // than the pipe buffer can't stall while we poll for its exit.
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());
        let deadline = Instant::now() + timeout;

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let stdout = join_reader(stdout_reader);
                    let stderr = join_reader(stderr_reader);
                    let result = InvocationResult::exited(status.code(), stdout, stderr);
                    return self.classify_exit(request.mode, result);
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        self.kill_tree(request.mode, &mut child);
                        if !reap_readers([stdout_reader, stderr_reader], READER_GRACE) {
                            log::debug!("Output readers still blocked after kill; detaching them");
                        }
                        return InvocationResult::failed(
                            Outcome::TimedOut,
                            format!("timed out after {}s", timeout.as_secs()),
                        );
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    kill_child(&mut child);
                    return InvocationResult::failed(Outcome::OtherError, e.to_string());
                }
            }
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Option<JoinHandle<String>> {
    source.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut buffer) {
                log::debug!("Failed to read child output: {}", e);
            }
            String::from_utf8_lossy(&buffer).into_owned()
        })
    })
}

fn join_reader(reader: Option<JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Waits up to `grace` for the readers to finish, joining those that did.
/// Returns `false` if any reader is still blocked on its pipe.
fn reap_readers<const N: usize>(readers: [Option<JoinHandle<String>>; N], grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    let mut pending: Vec<JoinHandle<String>> = readers.into_iter().flatten().collect();
    loop {
        let (finished, running): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(JoinHandle::is_finished);
        for handle in finished {
            handle.join().ok();
        }
        if running.is_empty() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        pending = running;
        thread::sleep(POLL_INTERVAL);
    }
}

/// `cmd /C` takes the rest of its command line as-is. Passing the line through
/// `Command::arg` would re-quote it with MSVC rules, which `cmd` doesn't undo.
#[cfg(windows)]
fn push_cmd_line(command: &mut StdCommand, line: String) {
    use std::os::windows::process::CommandExt;
    command.raw_arg(line);
}

#[cfg(not(windows))]
fn push_cmd_line(command: &mut StdCommand, line: String) {
    command.arg(line);
}

fn kill_child(child: &mut Child) {
    log::debug!("Killing child process (PID: {})...", child.id());
    if let Err(e) = child.kill() {
        log::warn!("Failed to kill child process {}: {}", child.id(), e);
    }
    child.wait().ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exited_classification() {
        let ok = InvocationResult::exited(Some(0), "{}".into(), String::new());
        assert_eq!(ok.outcome, Outcome::Success);
        assert!(ok.success());

        let failed = InvocationResult::exited(Some(2), String::new(), "boom".into());
        assert_eq!(failed.outcome, Outcome::NonZeroExit);

        let signalled = InvocationResult::exited(None, String::new(), String::new());
        assert_eq!(signalled.outcome, Outcome::NonZeroExit);
    }

    #[test]
    fn test_missing_binary_is_not_found() {
        let runner = SystemRunner::new();
        let request = ProcessRequest::new(
            "cloudinv-definitely-missing-binary",
            vec!["--version".to_string()],
            ExecMode::Direct,
        );
        let result = runner.run(&request, Duration::from_secs(5));
        assert_eq!(result.outcome, Outcome::NotFound);
        assert_eq!(result.exit_code, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout_and_exit_code() {
        let runner = SystemRunner::new();
        let request = ProcessRequest::new(
            "sh",
            vec!["-c".to_string(), "echo '{\"a\":1}'; exit 0".to_string()],
            ExecMode::Direct,
        );
        let result = runner.run(&request, Duration::from_secs(5));
        assert!(result.success());
        assert_eq!(result.stdout.trim(), "{\"a\":1}");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_reports_missing_command_as_not_found() {
        let runner = SystemRunner::new();
        let request = ProcessRequest::new(
            "cloudinv-definitely-missing-binary",
            vec!["--version".to_string()],
            ExecMode::Shell,
        );
        let result = runner.run(&request, Duration::from_secs(5));
        assert_eq!(result.exit_code, Some(127));
        assert_eq!(result.outcome, Outcome::NotFound);
    }

    fn args_of(command: &StdCommand) -> Vec<String> {
        command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_posix_shell_line_execs_the_tool() {
        let runner = SystemRunner {
            platform: Platform::Posix,
        };
        let request = ProcessRequest::new(
            "aws",
            vec!["kafka".to_string(), "list-clusters".to_string()],
            ExecMode::Shell,
        );
        let command = runner.build_command(&request);
        assert_eq!(command.get_program(), "sh");
        assert_eq!(args_of(&command), vec!["-c", "exec aws kafka list-clusters"]);
    }

    #[test]
    fn test_cmd_line_is_passed_verbatim() {
        let runner = SystemRunner {
            platform: Platform::Windows,
        };
        let request = ProcessRequest::new(
            "az.cmd",
            vec!["vm".to_string(), "show".to_string(), "--name".to_string(), "my vm".to_string()],
            ExecMode::Shell,
        );
        let command = runner.build_command(&request);
        assert_eq!(command.get_program(), "cmd");
        assert_eq!(args_of(&command), vec!["/C", r#"az.cmd vm show --name "my vm""#]);
    }

    #[test]
    fn test_reap_readers_joins_finished_threads() {
        let done = thread::spawn(|| "out".to_string());
        thread::sleep(Duration::from_millis(20));
        assert!(reap_readers([Some(done), None], Duration::from_millis(200)));

        let stuck = thread::spawn(|| {
            thread::sleep(Duration::from_secs(2));
            String::new()
        });
        assert!(!reap_readers([Some(stuck)], Duration::from_millis(100)));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_timeout_kills_the_tool_and_releases_pipes() {
        let runner = SystemRunner::new();
        let request = ProcessRequest::new("sleep", vec!["5".to_string()], ExecMode::Shell);
        let started = Instant::now();
        let result = runner.run(&request, Duration::from_millis(200));
        assert_eq!(result.outcome, Outcome::TimedOut);
        // Without `exec` the orphaned `sleep` would keep the pipes open and the
        // readers would only give up after the grace period.
        assert!(started.elapsed() < Duration::from_millis(200) + READER_GRACE);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_the_child() {
        let runner = SystemRunner::new();
        let request = ProcessRequest::new("sleep", vec!["5".to_string()], ExecMode::Direct);
        let started = Instant::now();
        let result = runner.run(&request, Duration::from_millis(200));
        assert_eq!(result.outcome, Outcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
