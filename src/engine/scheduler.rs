// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Accept submissions and run at most one invocation at a time off the caller thread.
// Author: Lukas Bower

//! Invocation scheduler.
//!
//! [`Scheduler::submit`] returns immediately. Accepted invocations run on a
//! named worker thread; their records are persisted and then delivered to the
//! [`CompletionSink`]. At most one invocation is active at any time. Under
//! [`BusyPolicy::Queue`] the worker drains the queue before exiting.

use std::sync::{Arc, MutexGuard};
use std::thread;
use std::time::Duration;

use log::{debug, info};

use super::active::{ActiveGuard, ActiveInvocation, CancelToken, SlotState};
use super::context::{execute, EngineContext};
use super::record::{ExecutionRecord, Outcome};
use crate::config::{BusyPolicy, EngineConfig};
use crate::error::EngineError;
use crate::history::HistoryBuffer;
use crate::ops::process::{terminate, KillOutcome};
use crate::parser::{parse_line, Invocation};

/// Receiver of invocation lifecycle events.
///
/// Methods are called from worker threads, never from the submitting thread.
pub trait CompletionSink: Send + Sync {
    /// An invocation started executing.
    fn on_started(&self, _id: u64, _line: &str) {}

    /// An invocation finished; its audit record has already been written.
    /// [`ExecutionRecord::status`] carries the status line to display.
    fn on_complete(&self, record: ExecutionRecord);
}

/// Result of [`Scheduler::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Blank input; nothing was recorded or run.
    Ignored,
    /// The invocation is executing.
    Started {
        /// Assigned invocation id.
        id: u64,
    },
    /// The invocation waits behind the active one.
    Queued {
        /// Assigned invocation id.
        id: u64,
        /// Queue position, starting at 1.
        position: usize,
    },
    /// Another invocation is active and the submission was refused.
    Busy {
        /// Id of the invocation holding the slot.
        active: u64,
    },
}

/// Outcome of [`Scheduler::terminate_active`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
    /// Invocation that was cancelled.
    pub id: u64,
    /// Result of signalling its child process, if it had one.
    pub child: Option<KillOutcome>,
}

/// Owner of the engine context and the active-invocation slot.
pub struct Scheduler {
    context: Arc<EngineContext>,
    state: Arc<SlotState>,
    sink: Arc<dyn CompletionSink>,
}

impl Scheduler {
    /// Create a scheduler delivering completions to `sink`.
    pub fn new(config: EngineConfig, sink: Arc<dyn CompletionSink>) -> Result<Self, EngineError> {
        let context = EngineContext::new(config)?;
        info!(
            "scheduler ready: policy={} logs={}",
            context.config().busy_policy,
            context.audit().dir().display()
        );
        Ok(Self {
            context: Arc::new(context),
            state: Arc::new(SlotState::default()),
            sink,
        })
    }

    /// Shared engine context.
    #[must_use]
    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// Submit a raw line without blocking on its execution.
    pub fn submit(&self, line: &str) -> Result<Submission, EngineError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Submission::Ignored);
        }
        self.context.history()?.record(line);

        let mut slot = self.state.lock()?;
        slot.next_id += 1;
        let id = slot.next_id;
        let Some(invocation) = parse_line(id, line) else {
            return Ok(Submission::Ignored);
        };

        if let Some(active) = slot.active.as_ref() {
            let active = active.id;
            let config = self.context.config();
            if config.busy_policy == BusyPolicy::Queue && slot.queue.len() < config.queue_capacity
            {
                slot.queue.push_back(invocation);
                let position = slot.queue.len();
                debug!("invocation {id} queued at {position} behind {active}");
                return Ok(Submission::Queued { id, position });
            }
            info!("invocation {id} refused: invocation {active} is still running");
            return Ok(Submission::Busy { active });
        }

        let (token, guard) = SlotState::install(&self.state, &mut slot, &invocation);
        drop(slot);
        self.spawn_worker(invocation, token, guard)?;
        Ok(Submission::Started { id })
    }

    fn spawn_worker(
        &self,
        invocation: Invocation,
        token: CancelToken,
        guard: ActiveGuard,
    ) -> Result<(), EngineError> {
        let context = Arc::clone(&self.context);
        let sink = Arc::clone(&self.sink);
        thread::Builder::new()
            .name(format!("opsh-worker-{}", invocation.id))
            .spawn(move || run_worker(&context, sink.as_ref(), invocation, token, guard))
            .map(drop)
            .map_err(EngineError::Spawn)
    }

    /// Request cooperative cancellation of the active invocation.
    ///
    /// Returns the cancelled invocation's id, or `None` when idle or when the
    /// active invocation's result is already settled.
    pub fn cancel(&self) -> Result<Option<u64>, EngineError> {
        Ok(self.state.cancel_active()?.map(|(id, _)| {
            info!("invocation {id} cancellation requested");
            id
        }))
    }

    /// Cancel the active invocation and terminate its tracked child process.
    ///
    /// Same `None` cases as [`Scheduler::cancel`].
    pub fn terminate_active(&self) -> Result<Option<Termination>, EngineError> {
        let Some((id, token)) = self.state.cancel_active()? else {
            return Ok(None);
        };
        let child = token.signal_child(terminate);
        info!("invocation {id} terminated (child: {child:?})");
        Ok(Some(Termination { id, child }))
    }

    /// Snapshot of the active invocation.
    pub fn active(&self) -> Result<Option<ActiveInvocation>, EngineError> {
        Ok(self.state.lock()?.active.clone())
    }

    /// Return `true` while an invocation is active.
    pub fn is_busy(&self) -> Result<bool, EngineError> {
        Ok(self.state.lock()?.active.is_some())
    }

    /// Number of queued invocations.
    pub fn queued(&self) -> Result<usize, EngineError> {
        Ok(self.state.lock()?.queue.len())
    }

    /// Block until nothing is active or queued. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> Result<bool, EngineError> {
        self.state.wait_idle(timeout)
    }

    /// Lock the command history.
    pub fn history(&self) -> Result<MutexGuard<'_, HistoryBuffer>, EngineError> {
        self.context.history()
    }
}

fn run_worker(
    context: &EngineContext,
    sink: &dyn CompletionSink,
    mut invocation: Invocation,
    mut token: CancelToken,
    mut guard: ActiveGuard,
) {
    let promote = context.config().busy_policy == BusyPolicy::Queue;
    loop {
        sink.on_started(invocation.id, &invocation.line);
        debug!("invocation {} running: {}", invocation.id, invocation.line);
        let mut record = execute(invocation, &token);
        if guard.settle() {
            record.outcome = Outcome::Cancelled;
        }
        context.persist(&mut record);
        info!(
            "invocation {} finished in {:?}: {}",
            record.id(),
            record.elapsed,
            record.status()
        );
        let (delivery, next) = guard.finish(promote);
        sink.on_complete(record);
        drop(delivery);
        match next {
            Some(promoted) => {
                invocation = promoted.invocation;
                token = promoted.token;
                guard = promoted.guard;
            }
            None => break,
        }
    }
}
