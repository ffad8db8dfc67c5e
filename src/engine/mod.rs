// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Execution engine: scheduling, execution, cancellation and audit logging.
// Author: Lukas Bower

//! Execution engine.

pub mod active;
pub mod audit;
pub mod context;
pub mod record;
pub mod scheduler;

pub use active::{ActiveInvocation, CancelToken};
pub use audit::AuditLog;
pub use context::{execute, EngineContext};
pub use record::{ExecutionRecord, Outcome};
pub use scheduler::{CompletionSink, Scheduler, Submission, Termination};
