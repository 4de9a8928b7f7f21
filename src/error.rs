// src/error.rs

use crate::system::{executor::Outcome, invoker::Unavailable, tool::Tool};
use thiserror::Error;

/// Errors surfaced to the command handlers.
#[derive(Error, Debug)]
pub enum CloudError {
    /// No strategy could launch the tool.
    #[error("{tool} is not installed or not accessible.")]
    ToolNotFound {
        /// The missing tool.
        tool: Tool,
    },
    /// The tool runs but its session check fails.
    #[error("Not logged into {tool}.")]
    AuthenticationMissing {
        /// The tool without a session.
        tool: Tool,
    },
    /// The tool ran and reported a failure.
    #[error("{operation} failed: {detail}")]
    RemoteApi {
        /// The command, as typed.
        operation: String,
        /// The tool's error output.
        detail: String,
    },
    /// The tool printed something that is not the expected JSON.
    #[error("{operation} returned an unexpected response: {detail}")]
    MalformedResponse {
        /// The command, as typed.
        operation: String,
        /// What did not match.
        detail: String,
    },
    /// Every attempt ran out of time.
    #[error("{operation} timed out")]
    Timeout {
        /// The command, as typed.
        operation: String,
    },
}

impl CloudError {
    /// Lines telling the user how to fix the problem, if there is a known fix.
    pub fn remediation(&self) -> Vec<String> {
        match self {
            Self::ToolNotFound { tool } => tool.install_hints(),
            Self::AuthenticationMissing { tool } => tool.login_hints(),
            _ => Vec::new(),
        }
    }

    /// A [`CloudError::MalformedResponse`] for `operation`.
    pub fn malformed(operation: impl Into<String>, detail: impl ToString) -> Self {
        Self::MalformedResponse {
            operation: operation.into(),
            detail: detail.to_string(),
        }
    }
}

impl From<Unavailable> for CloudError {
    fn from(unavailable: Unavailable) -> Self {
        let outcomes = &unavailable.outcomes;
        let all = |wanted: Outcome| !outcomes.is_empty() && outcomes.iter().all(|o| *o == wanted);

        if all(Outcome::TimedOut) {
            Self::Timeout {
                operation: unavailable.command,
            }
        } else if all(Outcome::Success) {
            // Every attempt exited 0, so only the output could have been wrong.
            Self::MalformedResponse {
                operation: unavailable.command,
                detail: "output was not valid JSON".to_string(),
            }
        } else {
            let detail = unavailable.to_string();
            Self::RemoteApi {
                operation: unavailable.command,
                detail,
            }
        }
    }
}
