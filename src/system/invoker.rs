// src/system/invoker.rs

//! The resilient external command invoker.
//!
//! A [`LogicalCommand`] names what to do ("list accounts") without naming how
//! to launch the binary. The [`Invoker`] walks the platform's strategy table in
//! order and returns the JSON of the first attempt that exits 0 with parseable
//! output. Every failure along the way is logged and absorbed; callers only see
//! the payload or a single [`Unavailable`].

use crate::{
    constants::{DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_CHECK_TIMEOUT_SECS},
    error::CloudError,
    system::{
        executor::{Outcome, ProcessRequest, ProcessRunner, SystemRunner},
        strategy::{InvocationStrategy, Platform},
        tool::Tool,
    },
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{collections::HashMap, fmt, time::Duration};
use thiserror::Error;

/// A platform-independent request to an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalCommand {
    /// Which CLI runs the command.
    pub tool: Tool,
    /// Arguments after the binary name, before any global arguments.
    pub args: Vec<String>,
    /// Output of sensitive commands (credentials, tokens) never reaches the logs.
    pub sensitive: bool,
}

impl LogicalCommand {
    /// A non-sensitive command.
    pub fn new<I, S>(tool: Tool, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool,
            args: args.into_iter().map(Into::into).collect(),
            sensitive: false,
        }
    }

    /// Marks the command as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// `<tool> --version`, the availability check.
    pub fn version(tool: Tool) -> Self {
        Self::new(tool, tool.version_args().iter().copied())
    }

    /// The session check of `tool`. Sensitive, since it prints account data.
    pub fn session(tool: Tool) -> Self {
        Self::new(tool, tool.session_args().iter().copied()).sensitive()
    }
}

impl fmt::Display for LogicalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tool.binary())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Every strategy was tried and none produced a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{command}` is unavailable after {} attempt(s)", .outcomes.len())]
pub struct Unavailable {
    /// The command as it would be typed.
    pub command: String,
    /// The outcome of each attempt, in the order they were made.
    pub outcomes: Vec<Outcome>,
}

/// Runs logical commands through the ordered strategy list of one platform.
#[derive(Debug)]
pub struct Invoker<R: ProcessRunner = SystemRunner> {
    runner: R,
    platform: Platform,
    command_timeout: Duration,
    check_timeout: Duration,
    binaries: HashMap<Tool, String>,
    global_args: HashMap<Tool, Vec<String>>,
}

impl Invoker<SystemRunner> {
    /// An invoker that launches real processes on the host platform.
    pub fn system() -> Self {
        Self::new(SystemRunner::new())
    }
}

impl<R: ProcessRunner> Invoker<R> {
    /// An invoker for the host platform with the default timeouts.
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            platform: Platform::host(),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            check_timeout: Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS),
            binaries: HashMap::new(),
            global_args: HashMap::new(),
        }
    }

    /// Uses the strategy table of `platform` instead of the host's.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Sets the per-attempt timeouts for data commands and for `--version` checks.
    pub fn with_timeouts(mut self, command: Duration, check: Duration) -> Self {
        self.command_timeout = command;
        self.check_timeout = check;
        self
    }

    /// Replaces the canonical binary name of `tool` (e.g. with an absolute path).
    pub fn with_binary(mut self, tool: Tool, binary: impl Into<String>) -> Self {
        self.binaries.insert(tool, binary.into());
        self
    }

    /// Arguments appended to every command sent to `tool` (e.g. `--profile`).
    pub fn with_global_args(mut self, tool: Tool, args: Vec<String>) -> Self {
        self.global_args.insert(tool, args);
        self
    }

    /// The process runner, e.g. to inspect a test double.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// The platform whose strategy table is used.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The strategies tried, in order.
    pub fn strategies(&self) -> &'static [InvocationStrategy] {
        self.platform.strategies()
    }

    /// Per-attempt limit for `--version` checks.
    pub fn check_timeout(&self) -> Duration {
        self.check_timeout
    }

    /// The configured binary of `tool`, or its canonical name.
    pub fn binary_for(&self, tool: Tool) -> &str {
        self.binaries
            .get(&tool)
            .map(String::as_str)
            .unwrap_or_else(|| tool.binary())
    }

    /// Builds the concrete process launch of `command` under `strategy`.
    pub fn request_for(
        &self,
        strategy: &InvocationStrategy,
        command: &LogicalCommand,
    ) -> ProcessRequest {
        let mut args = command.args.clone();
        if let Some(extra) = self.global_args.get(&command.tool) {
            args.extend(extra.iter().cloned());
        }
        ProcessRequest::new(
            strategy.program(self.binary_for(command.tool)),
            args,
            strategy.mode,
        )
    }

    /// Runs `command` and returns the first valid JSON payload.
    pub fn invoke(&self, command: &LogicalCommand) -> Result<Value, Unavailable> {
        let mut outcomes = Vec::new();

        for (i, strategy) in self.strategies().iter().enumerate() {
            let method = i + 1;
            let request = self.request_for(strategy, command);
            log::debug!("Trying method {} ({}) with command: {}", method, strategy, command);

            let result = self.runner.run(&request, self.command_timeout);
            outcomes.push(result.outcome);

            match result.outcome {
                Outcome::Success if !result.stdout.trim().is_empty() => {
                    match serde_json::from_str::<Value>(&result.stdout) {
                        Ok(payload) => return Ok(payload),
                        Err(e) => {
                            log::error!("Failed to parse JSON output (method {}): {}", method, e);
                            if !command.sensitive {
                                log::error!("Raw output: {}", result.stdout.trim());
                            }
                        }
                    }
                }
                Outcome::Success | Outcome::NonZeroExit => {
                    log::debug!(
                        "Method {} failed - return code: {:?}",
                        method,
                        result.exit_code
                    );
                    if !command.sensitive && !result.stderr.trim().is_empty() {
                        log::debug!("Error output: {}", result.stderr.trim());
                    }
                }
                Outcome::NotFound => {
                    log::debug!("{} not found (method {}): {}", command.tool, method, command);
                }
                Outcome::TimedOut => {
                    log::error!("{} command timed out (method {}): {}", command.tool, method, command);
                }
                Outcome::OtherError => {
                    log::error!(
                        "Unexpected error running {} command (method {}): {}",
                        command.tool,
                        method,
                        result.stderr.trim()
                    );
                }
            }
        }

        Err(Unavailable {
            command: command.to_string(),
            outcomes,
        })
    }

    /// Runs `command` and decodes the payload into `T`.
    pub fn invoke_as<T: DeserializeOwned>(&self, command: &LogicalCommand) -> Result<T, CloudError> {
        let payload = self.invoke(command)?;
        serde_json::from_value(payload).map_err(|e| CloudError::malformed(command.to_string(), e))
    }

    /// Returns the 1-based method number of the first strategy that exits 0.
    /// Output is not inspected.
    pub fn first_success(&self, command: &LogicalCommand, timeout: Duration) -> Option<usize> {
        for (i, strategy) in self.strategies().iter().enumerate() {
            let method = i + 1;
            let request = self.request_for(strategy, command);
            let result = self.runner.run(&request, timeout);
            match result.outcome {
                Outcome::Success => return Some(method),
                Outcome::NotFound => log::debug!("Method {}: {} not found", method, command.tool),
                Outcome::TimedOut => {
                    log::warn!("Method {}: {} command timed out", method, command.tool);
                }
                Outcome::NonZeroExit | Outcome::OtherError => {
                    log::debug!(
                        "Method {}: {} returned {:?}",
                        method,
                        command.tool,
                        result.exit_code
                    );
                }
            }
        }
        None
    }

    /// Availability check: does any strategy run `<tool> --version` successfully?
    pub fn is_available(&self, tool: Tool) -> bool {
        match self.first_success(&LogicalCommand::version(tool), self.check_timeout) {
            Some(method) => {
                log::info!("Found {} using method {}", tool, method);
                true
            }
            None => false,
        }
    }

    /// Session check: is there an authenticated session for `tool`?
    pub fn has_session(&self, tool: Tool) -> bool {
        self.first_success(&LogicalCommand::session(tool), self.command_timeout)
            .is_some()
    }

    /// Gate run before any data-bearing call: the tool exists and is logged in.
    pub fn ensure_ready(&self, tool: Tool) -> Result<(), CloudError> {
        if !self.is_available(tool) {
            return Err(CloudError::ToolNotFound { tool });
        }
        if !self.has_session(tool) {
            return Err(CloudError::AuthenticationMissing { tool });
        }
        Ok(())
    }
}
