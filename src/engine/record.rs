// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Execution records and their outcome classification.
// Author: Lukas Bower

//! Execution records.

use std::time::Duration;

use chrono::{DateTime, Local};

use crate::parser::Invocation;

/// Status text shown while an invocation runs.
pub const STATUS_PROCESSING: &str = "Processing command...";
/// Status text after a handler or engine error.
pub const STATUS_ERROR: &str = "Error occurred";
/// Status text after a cancelled invocation.
pub const STATUS_CANCELLED: &str = "Command cancelled";
/// Result text of a cancelled invocation.
pub const CANCELLED_TEXT: &str = "Command cancelled by user";

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The handler returned result text.
    Output(String),
    /// Routing or argument binding failed; the handler did not act.
    Refused(String),
    /// The handler returned an error.
    Failed(String),
    /// The handler panicked or the engine could not persist the record.
    Fault(String),
    /// Cancellation was requested before the invocation finished.
    Cancelled,
}

impl Outcome {
    /// Text delivered to the front end and written to the audit log.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Output(text) | Self::Refused(text) | Self::Failed(text) | Self::Fault(text) => {
                text
            }
            Self::Cancelled => CANCELLED_TEXT,
        }
    }

    /// Return `true` for outcomes that also go to the error log.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Fault(_))
    }
}

/// Everything known about one finished invocation.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    /// The invocation as submitted.
    pub invocation: Invocation,
    /// Execution start.
    pub started: DateTime<Local>,
    /// Execution end.
    pub finished: DateTime<Local>,
    /// Measured execution time.
    pub elapsed: Duration,
    /// Result classification and text.
    pub outcome: Outcome,
}

impl ExecutionRecord {
    /// Identifier of the invocation.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.invocation.id
    }

    /// Raw command line.
    #[must_use]
    pub fn line(&self) -> &str {
        &self.invocation.line
    }

    /// Result text.
    #[must_use]
    pub fn text(&self) -> &str {
        self.outcome.text()
    }

    /// Status line for the front end.
    #[must_use]
    pub fn status(&self) -> String {
        match self.outcome {
            Outcome::Output(_) | Outcome::Refused(_) => format!(
                "Ready - Command completed in {:.2}s",
                self.elapsed.as_secs_f64()
            ),
            Outcome::Failed(_) | Outcome::Fault(_) => STATUS_ERROR.to_owned(),
            Outcome::Cancelled => STATUS_CANCELLED.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn record(outcome: Outcome, millis: u64) -> ExecutionRecord {
        let now = Local::now();
        ExecutionRecord {
            invocation: parse_line(1, "pwd").unwrap(),
            started: now,
            finished: now,
            elapsed: Duration::from_millis(millis),
            outcome,
        }
    }

    #[test]
    fn status_follows_outcome() {
        assert_eq!(
            record(Outcome::Output("x".into()), 1234).status(),
            "Ready - Command completed in 1.23s"
        );
        assert_eq!(
            record(Outcome::Refused("Error: nope".into()), 0).status(),
            "Ready - Command completed in 0.00s"
        );
        assert_eq!(record(Outcome::Fault("boom".into()), 5).status(), "Error occurred");
        assert_eq!(record(Outcome::Cancelled, 5).status(), "Command cancelled");
    }

    #[test]
    fn only_failures_are_errors() {
        assert!(Outcome::Failed("x".into()).is_error());
        assert!(Outcome::Fault("x".into()).is_error());
        assert!(!Outcome::Refused("x".into()).is_error());
        assert!(!Outcome::Cancelled.is_error());
        assert_eq!(Outcome::Cancelled.text(), CANCELLED_TEXT);
    }
}
