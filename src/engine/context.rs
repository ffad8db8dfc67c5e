// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Engine context and single-invocation execution with fault containment.
// Author: Lukas Bower

//! Execution context.
//!
//! [`EngineContext`] bundles the state shared by the scheduler and its
//! workers. [`execute`] runs one invocation to an [`ExecutionRecord`] and never
//! panics: routing failures, handler errors and handler panics all become
//! [`Outcome`] variants.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use chrono::Local;
use log::{error, warn};

use super::active::CancelToken;
use super::audit::AuditLog;
use super::record::{ExecutionRecord, Outcome};
use crate::config::EngineConfig;
use crate::error::{EngineError, OpError};
use crate::history::HistoryBuffer;
use crate::parser::{Invocation, Resolution};
use crate::registry::CommandSpec;

/// State shared between the scheduler and its worker threads.
#[derive(Debug)]
pub struct EngineContext {
    config: EngineConfig,
    history: Mutex<HistoryBuffer>,
    audit: AuditLog,
}

impl EngineContext {
    /// Build the context, preparing the log directory.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let audit = AuditLog::open(&config.log_dir)?;
        Ok(Self {
            config,
            history: Mutex::new(HistoryBuffer::new()),
            audit,
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Audit log writer.
    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Lock the history buffer.
    pub fn history(&self) -> Result<MutexGuard<'_, HistoryBuffer>, EngineError> {
        self.history.lock().map_err(|_| EngineError::LockPoisoned)
    }

    /// Persist `record`: the error log for failures, then the audit log.
    ///
    /// A failed audit write turns the outcome into [`Outcome::Fault`].
    pub fn persist(&self, record: &mut ExecutionRecord) {
        if record.outcome.is_error() {
            if let Err(err) = self
                .audit
                .write_error(record.line(), record.text(), &record.finished)
            {
                error!("invocation {}: {err}", record.id());
            }
        }
        if let Err(err) = self.audit.write_record(record) {
            error!("invocation {}: {err}", record.id());
            let message = format!("Error: {err}");
            if let Err(err) = self
                .audit
                .write_error(record.line(), &message, &Local::now())
            {
                error!("invocation {}: {err}", record.id());
            }
            record.outcome = Outcome::Fault(message);
        }
    }
}

/// Run `invocation` to completion on the current thread.
#[must_use]
pub fn execute(invocation: Invocation, token: &CancelToken) -> ExecutionRecord {
    let started = Local::now();
    let clock = Instant::now();
    let outcome = match &invocation.resolution {
        Resolution::Unknown(word) => Outcome::Refused(format!(
            "Unknown command: {word}. Type 'help' for available commands."
        )),
        Resolution::Invalid(_, err) => Outcome::Refused(err.to_string()),
        Resolution::Ready(spec) => run_handler(spec, &invocation.args, token),
    };
    ExecutionRecord {
        invocation,
        started,
        finished: Local::now(),
        elapsed: clock.elapsed(),
        outcome,
    }
}

fn run_handler(spec: &CommandSpec, args: &[String], token: &CancelToken) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(|| (spec.handler)(args, token))) {
        Ok(Ok(text)) => Outcome::Output(text),
        Ok(Err(OpError::Args(err))) => Outcome::Refused(err.to_string()),
        Ok(Err(OpError::Cancelled)) => Outcome::Cancelled,
        Ok(Err(err)) => Outcome::Failed(err.to_string()),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("handler for {} panicked: {message}", spec.name);
            Outcome::Fault(format!("Error: {message}"))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "handler panicked".to_owned()
    }
}
