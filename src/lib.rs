// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Library root for the opsh command dispatch and execution engine.
// Author: Lukas Bower
#![warn(missing_docs)]

//! opsh: an interactive operations shell.
//!
//! Raw command lines are routed through a static [registry], split by the
//! [parser] and executed off the caller's thread by the engine's
//! [`Scheduler`], which allows one active invocation at a time, supports
//! cancellation and writes an audit record per invocation. The [console]
//! module provides the line-oriented front end used by the `opsh` binary.

pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod history;
pub mod ops;
pub mod parser;
pub mod registry;

pub use config::{BusyPolicy, ConfigOverrides, EngineConfig};
pub use console::{Console, ConsoleStatus};
pub use engine::{
    ActiveInvocation, CancelToken, CompletionSink, ExecutionRecord, Outcome, Scheduler,
    Submission, Termination,
};
pub use error::{ArgError, ConfigError, EngineError, OpError, OpResult};
pub use history::{Direction, HistoryBuffer, HistoryEntry, Recall};
pub use parser::{parse_line, Invocation, Resolution};
pub use registry::{lookup, CommandSpec};
