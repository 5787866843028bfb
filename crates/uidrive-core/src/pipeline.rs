//! Ordered action execution and run reporting.
//!
//! A [`Pipeline`] runs a list of actions strictly in order against one
//! acquired session. Assertion verdicts accumulate across the run; any
//! other failure aborts immediately, carrying the failing action's index
//! and target so the caller can report exactly where the run stopped.
//!
//! `end-session` is intercepted here rather than executed: it belongs to
//! the session lifecycle manager, which also deletes the persisted
//! descriptor. Actions after an `end-session` still execute and fail
//! naturally against the gone session.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::action::{Action, ActionOutcome, AssertionVerdict};
use crate::error::DriverError;
use crate::executor::ActionExecutor;
use crate::session::SessionManager;

/// One executed action and its outcome, in run order.
#[derive(Debug, Clone, Serialize)]
pub struct ActionRecord {
    /// Zero-based position in the supplied action list.
    pub index: usize,
    /// The action's short name.
    pub action: &'static str,
    /// The target identifier, if the action had one.
    pub target: Option<String>,
    /// What happened.
    pub outcome: ActionOutcome,
}

/// Why a run stopped before completing all actions.
#[derive(Debug)]
pub enum RunFailure {
    /// An action reported failure without a driver error.
    Action {
        index: usize,
        action: &'static str,
        message: String,
    },
    /// A driver error aborted the run.
    Driver {
        index: usize,
        action: &'static str,
        target: Option<String>,
        error: DriverError,
    },
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunFailure::Action { index, action, message } => {
                write!(f, "action {index} ({action}) failed: {message}")
            }
            RunFailure::Driver { index, action, target, error } => match target {
                Some(target) => {
                    write!(f, "action {index} ({action} '{target}') aborted: {error}")
                }
                None => write!(f, "action {index} ({action}) aborted: {error}"),
            },
        }
    }
}

/// The complete result of one run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Unique id of this run, for log correlation.
    pub run_id: Uuid,
    /// Outcomes of the actions that executed, in order.
    pub records: Vec<ActionRecord>,
    /// Every assertion verdict observed, in order.
    pub assertions: Vec<AssertionVerdict>,
    /// Set when the run stopped early.
    pub failure: Option<RunFailure>,
}

impl RunReport {
    /// Whether every action completed and every assertion passed.
    pub fn passed(&self) -> bool {
        self.failure.is_none() && self.assertions.iter().all(|a| a.passed)
    }

    /// Process exit code for this run: 0 on full success, 1 for action
    /// or assertion failures, 3 for environment failures (server
    /// unreachable, device unavailable, session creation failed).
    pub fn exit_code(&self) -> i32 {
        match &self.failure {
            Some(RunFailure::Driver { error, .. }) if error.is_environment() => 3,
            Some(_) => 1,
            None if self.assertions.iter().any(|a| !a.passed) => 1,
            None => 0,
        }
    }

    /// Count of failed assertions.
    pub fn failed_assertions(&self) -> usize {
        self.assertions.iter().filter(|a| !a.passed).count()
    }
}

/// Runs ordered action lists against one acquired session.
pub struct Pipeline {
    executor: ActionExecutor,
    sessions: Arc<SessionManager>,
    session_id: String,
}

impl Pipeline {
    pub fn new(
        executor: ActionExecutor,
        sessions: Arc<SessionManager>,
        session_id: impl Into<String>,
    ) -> Self {
        Self { executor, sessions, session_id: session_id.into() }
    }

    /// Execute the actions in order and return the full report.
    pub async fn run(&self, actions: &[Action]) -> RunReport {
        let mut report = RunReport { run_id: Uuid::new_v4(), ..Default::default() };
        info!(run_id = %report.run_id, actions = actions.len(), "run started");

        for (index, action) in actions.iter().enumerate() {
            let name = action.name();
            let target = action.target().map(str::to_string);

            let result = if matches!(action, Action::EndSession) {
                self.end_session().await
            } else {
                self.executor.execute(action).await
            };

            match result {
                Ok(outcome) => {
                    info!(index, action = name, message = %outcome.message, "action done");
                    if let Some(verdict) = &outcome.assertion {
                        if !verdict.passed {
                            warn!(index, %verdict, "assertion failed");
                        }
                        report.assertions.push(verdict.clone());
                    }
                    let success = outcome.success;
                    let message = outcome.message.clone();
                    report.records.push(ActionRecord { index, action: name, target, outcome });
                    if !success {
                        error!(index, action = name, %message, "aborting run");
                        report.failure =
                            Some(RunFailure::Action { index, action: name, message });
                        break;
                    }
                }
                Err(e) => {
                    error!(index, action = name, error = %e, "aborting run");
                    report.failure =
                        Some(RunFailure::Driver { index, action: name, target, error: e });
                    break;
                }
            }
        }

        report
    }

    async fn end_session(&self) -> Result<ActionOutcome, DriverError> {
        self.sessions.end(Some(&self.session_id)).await?;
        Ok(ActionOutcome::success("Session ended"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(passed: bool) -> AssertionVerdict {
        AssertionVerdict {
            id: "Total".into(),
            expected: "120".into(),
            passed,
            actual: if passed { "120".into() } else { "118".into() },
        }
    }

    #[test]
    fn exit_code_zero_on_clean_run() {
        let report = RunReport { assertions: vec![verdict(true)], ..Default::default() };
        assert!(report.passed());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn exit_code_one_on_failed_assertion() {
        let report =
            RunReport { assertions: vec![verdict(true), verdict(false)], ..Default::default() };
        assert!(!report.passed());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failed_assertions(), 1);
    }

    #[test]
    fn exit_code_three_on_environment_failure() {
        let report = RunReport {
            failure: Some(RunFailure::Driver {
                index: 0,
                action: "tap",
                target: Some("Go".into()),
                error: DriverError::ServerUnreachable("http://127.0.0.1:4723".into()),
            }),
            ..Default::default()
        };
        assert_eq!(report.exit_code(), 3);
    }

    #[test]
    fn exit_code_one_on_element_not_found() {
        let report = RunReport {
            failure: Some(RunFailure::Driver {
                index: 2,
                action: "tap",
                target: Some("Missing".into()),
                error: DriverError::ElementNotFound { locator: "Missing".into(), waited_ms: 5000 },
            }),
            ..Default::default()
        };
        assert_eq!(report.exit_code(), 1);
        let failure = report.failure.as_ref().unwrap();
        assert!(failure.to_string().contains("action 2"));
        assert!(failure.to_string().contains("'Missing'"));
    }
}
