// src/system/testing.rs

//! A scripted [`ProcessRunner`] for unit tests.

use crate::system::executor::{InvocationResult, Outcome, ProcessRequest, ProcessRunner};
use std::{cell::RefCell, collections::VecDeque, time::Duration};

/// Replays canned results and records every request it receives.
///
/// Rules registered with [`ScriptedRunner::on`] answer any request whose
/// arguments contain the rule's tokens contiguously. Otherwise the next
/// queued result is returned, and once the queue is empty every request is
/// answered with `NotFound`.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRunner {
    rules: Vec<(Vec<String>, InvocationResult)>,
    queue: RefCell<VecDeque<InvocationResult>>,
    calls: RefCell<Vec<ProcessRequest>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sequence(results: Vec<InvocationResult>) -> Self {
        Self {
            queue: RefCell::new(results.into()),
            ..Self::default()
        }
    }

    pub(crate) fn on(mut self, tokens: &[&str], result: InvocationResult) -> Self {
        self.rules
            .push((tokens.iter().map(|t| t.to_string()).collect(), result));
        self
    }

    pub(crate) fn calls(&self) -> Vec<ProcessRequest> {
        self.calls.borrow().clone()
    }

    /// Number of recorded requests whose arguments contain `tokens`.
    pub(crate) fn count_matching(&self, tokens: &[&str]) -> usize {
        let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        self.calls
            .borrow()
            .iter()
            .filter(|r| contains_run(&r.args, &tokens))
            .count()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, request: &ProcessRequest, _timeout: Duration) -> InvocationResult {
        self.calls.borrow_mut().push(request.clone());
        if let Some((_, result)) = self
            .rules
            .iter()
            .find(|(tokens, _)| contains_run(&request.args, tokens))
        {
            return result.clone();
        }
        self.queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(not_found)
    }
}

fn contains_run(args: &[String], tokens: &[String]) -> bool {
    tokens.is_empty() || args.windows(tokens.len()).any(|w| w == tokens)
}

pub(crate) fn ok(stdout: &str) -> InvocationResult {
    InvocationResult::exited(Some(0), stdout.to_string(), String::new())
}

pub(crate) fn exit(code: i32, stderr: &str) -> InvocationResult {
    InvocationResult::exited(Some(code), String::new(), stderr.to_string())
}

pub(crate) fn not_found() -> InvocationResult {
    InvocationResult::failed(Outcome::NotFound, "No such file or directory")
}
