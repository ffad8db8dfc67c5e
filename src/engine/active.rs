// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Track the active invocation, its cancellation token and the pending queue.
// Author: Lukas Bower

//! Active invocation bookkeeping.
//!
//! The scheduler owns exactly one [`SlotState`]. Installing, cancelling,
//! checking and clearing the active invocation all happen under its mutex, and
//! every installed invocation is paired with an [`ActiveGuard`] whose release
//! clears the slot exactly once, including when the worker unwinds.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use log::{debug, warn};

use crate::error::EngineError;
use crate::parser::Invocation;

/// Cooperative cancellation signal handed to operation handlers.
///
/// Besides the cancellation flag the token can carry the pid of a child
/// process spawned by the handler, so the kill path can reach it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    child: Arc<Mutex<Option<u32>>>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Return `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Record the pid of a child process spawned on behalf of the invocation.
    pub fn track_child(&self, pid: u32) {
        *self.child.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(pid);
    }

    /// Forget the tracked child process once it has exited.
    pub fn release_child(&self) {
        *self.child.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Pid of the tracked child process, if one is running.
    #[must_use]
    pub fn child_pid(&self) -> Option<u32> {
        *self.child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `signal` to the tracked child while holding the tracking lock.
    ///
    /// The handler releases the pid before reaping the child, so a pid seen
    /// here still belongs to the unreaped child.
    pub fn signal_child<T>(&self, signal: impl FnOnce(u32) -> T) -> Option<T> {
        let child = self.child.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        (*child).map(signal)
    }
}

/// The currently executing invocation.
#[derive(Debug, Clone)]
pub struct ActiveInvocation {
    /// Invocation identifier assigned at submission.
    pub id: u64,
    /// Raw command line.
    pub line: String,
    /// Wall-clock start time.
    pub started_at: DateTime<Local>,
    started: Instant,
    token: CancelToken,
    settled: bool,
}

impl ActiveInvocation {
    fn start(invocation: &Invocation) -> Self {
        Self {
            id: invocation.id,
            line: invocation.line.clone(),
            started_at: Local::now(),
            started: Instant::now(),
            token: CancelToken::new(),
            settled: false,
        }
    }

    /// Time spent executing so far.
    #[must_use]
    pub fn running_for(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether cancellation has been requested for this invocation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the result is final; cancel requests are refused from here on.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Pid of the child process registered by the handler, if any.
    #[must_use]
    pub fn child_pid(&self) -> Option<u32> {
        self.token.child_pid()
    }

    /// The cancellation token shared with the handler.
    #[must_use]
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

#[derive(Debug, Default)]
pub(crate) struct Slot {
    pub(crate) active: Option<ActiveInvocation>,
    pub(crate) queue: VecDeque<Invocation>,
    pub(crate) next_id: u64,
    /// Finished invocations whose completion has not been delivered yet.
    pub(crate) delivering: usize,
}

impl Slot {
    fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty() && self.delivering == 0
    }
}

/// Mutex-guarded slot plus the condition variable signalled when it empties.
#[derive(Debug, Default)]
pub(crate) struct SlotState {
    slot: Mutex<Slot>,
    idle: Condvar,
}

impl SlotState {
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Slot>, EngineError> {
        self.slot.lock().map_err(|_| EngineError::LockPoisoned)
    }

    fn lock_recover(&self) -> MutexGuard<'_, Slot> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Install `invocation` as the active one. The caller must hold no other
    /// reference to the slot and must have checked that it is empty.
    pub(crate) fn install(
        state: &Arc<Self>,
        slot: &mut Slot,
        invocation: &Invocation,
    ) -> (CancelToken, ActiveGuard) {
        let active = ActiveInvocation::start(invocation);
        let token = active.token.clone();
        debug!("invocation {} active: {}", invocation.id, invocation.line);
        slot.active = Some(active);
        (token, ActiveGuard::new(state.clone(), invocation.id))
    }

    /// Cancel the active invocation unless its result is already settled.
    /// Returns its id and token.
    pub(crate) fn cancel_active(&self) -> Result<Option<(u64, CancelToken)>, EngineError> {
        let slot = self.lock()?;
        Ok(slot
            .active
            .as_ref()
            .filter(|active| !active.settled)
            .map(|active| {
                active.token.cancel();
                (active.id, active.token.clone())
            }))
    }

    /// Block until nothing is active, queued or awaiting delivery, or the
    /// timeout elapses. Returns `true` when idle.
    pub(crate) fn wait_idle(&self, timeout: Duration) -> Result<bool, EngineError> {
        let guard = self.lock()?;
        let (guard, _) = self
            .idle
            .wait_timeout_while(guard, timeout, |slot| !slot.is_idle())
            .map_err(|_| EngineError::LockPoisoned)?;
        Ok(guard.is_idle())
    }
}

/// A promoted queued invocation ready to run on the current worker.
pub(crate) struct Promoted {
    pub(crate) invocation: Invocation,
    pub(crate) token: CancelToken,
    pub(crate) guard: ActiveGuard,
}

/// Keeps the engine non-idle until a finished invocation's completion has
/// been delivered.
pub(crate) struct Delivery {
    state: Arc<SlotState>,
}

impl Drop for Delivery {
    fn drop(&mut self) {
        let mut slot = self.state.lock_recover();
        slot.delivering = slot.delivering.saturating_sub(1);
        if slot.is_idle() {
            self.state.idle.notify_all();
        }
    }
}

/// Releases the active slot exactly once.
///
/// [`ActiveGuard::finish`] is the normal exit; dropping an armed guard (for
/// example while unwinding) clears the slot and abandons queued work.
pub(crate) struct ActiveGuard {
    state: Arc<SlotState>,
    id: u64,
    armed: bool,
}

impl ActiveGuard {
    fn new(state: Arc<SlotState>, id: u64) -> Self {
        Self {
            state,
            id,
            armed: true,
        }
    }

    /// Settle this guard's invocation under the slot lock and report whether
    /// it was cancelled. Later cancel requests are refused.
    pub(crate) fn settle(&self) -> bool {
        let mut slot = self.state.lock_recover();
        match slot.active.as_mut().filter(|active| active.id == self.id) {
            Some(active) => {
                active.settled = true;
                active.is_cancelled()
            }
            None => false,
        }
    }

    /// Clear the slot. With `promote`, the next queued invocation (if any) is
    /// installed atomically and handed back for execution. The returned
    /// [`Delivery`] must be held until the completion has been delivered.
    pub(crate) fn finish(mut self, promote: bool) -> (Delivery, Option<Promoted>) {
        self.armed = false;
        let mut slot = self.state.lock_recover();
        Self::clear(&mut slot, self.id);
        slot.delivering += 1;
        let next = if promote { slot.queue.pop_front() } else { None };
        let promoted = next.map(|invocation| {
            let (token, guard) = SlotState::install(&self.state, &mut slot, &invocation);
            Promoted {
                invocation,
                token,
                guard,
            }
        });
        let delivery = Delivery {
            state: Arc::clone(&self.state),
        };
        (delivery, promoted)
    }

    fn clear(slot: &mut Slot, id: u64) {
        match slot.active.take() {
            Some(active) if active.id == id => {
                debug!(
                    "invocation {id} released after {:?}",
                    active.running_for()
                );
            }
            Some(other) => {
                warn!("invocation {id} released while {} held the slot", other.id);
                slot.active = Some(other);
            }
            None => warn!("invocation {id} released with an empty slot"),
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = self.state.lock_recover();
        Self::clear(&mut slot, self.id);
        if !slot.queue.is_empty() {
            warn!(
                "worker for invocation {} exited early; dropping {} queued invocation(s)",
                self.id,
                slot.queue.len()
            );
            slot.queue.clear();
        }
        if slot.is_idle() {
            self.state.idle.notify_all();
        }
    }
}
