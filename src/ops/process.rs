// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Terminate processes by pid and report the outcome as text.
// Author: Lukas Bower

//! Kill path.
//!
//! Every termination attempt maps to a [`KillOutcome`]; a missing process or a
//! permission failure is a result, not an error.

use std::fmt;

use log::info;

use super::arg;
use crate::engine::CancelToken;
use crate::error::{ArgError, OpResult};

/// Outcome of a termination request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillOutcome {
    /// The process accepted the termination signal.
    Terminated(u32),
    /// No process with that pid exists.
    NoSuchProcess(u32),
    /// The caller may not signal that process.
    AccessDenied(u32),
    /// Any other failure.
    Failed {
        /// Target pid.
        pid: u32,
        /// Operating system error text.
        cause: String,
    },
}

impl fmt::Display for KillOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminated(pid) => write!(f, "Process {pid} terminated"),
            Self::NoSuchProcess(pid) => write!(f, "No such process: {pid}"),
            Self::AccessDenied(pid) => {
                write!(f, "Access denied: cannot terminate process {pid}")
            }
            Self::Failed { pid, cause } => {
                write!(f, "Error terminating process {pid}: {cause}")
            }
        }
    }
}

/// Parse a positive process id.
pub fn parse_pid(text: &str) -> Result<u32, ArgError> {
    match text.trim().parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(pid.unsigned_abs()),
        _ => Err(ArgError::invalid(format!(
            "Process ID must be a positive integer, got '{}'",
            text.trim()
        ))),
    }
}

/// Ask process `pid` to terminate.
#[must_use]
pub fn terminate(pid: u32) -> KillOutcome {
    let outcome = send_terminate(pid);
    info!("terminate pid {pid}: {outcome}");
    outcome
}

#[cfg(unix)]
fn send_terminate(pid: u32) -> KillOutcome {
    let Ok(raw) = libc::pid_t::try_from(pid) else {
        return KillOutcome::NoSuchProcess(pid);
    };
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(raw, libc::SIGTERM) };
    if rc == 0 {
        return KillOutcome::Terminated(pid);
    }
    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ESRCH) => KillOutcome::NoSuchProcess(pid),
        Some(libc::EPERM) => KillOutcome::AccessDenied(pid),
        _ => KillOutcome::Failed {
            pid,
            cause: err.to_string(),
        },
    }
}

#[cfg(not(unix))]
fn send_terminate(pid: u32) -> KillOutcome {
    let output = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .output();
    match output {
        Ok(output) if output.status.success() => KillOutcome::Terminated(pid),
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            let lowered = stderr.to_ascii_lowercase();
            if lowered.contains("not found") {
                KillOutcome::NoSuchProcess(pid)
            } else if lowered.contains("access is denied") {
                KillOutcome::AccessDenied(pid)
            } else {
                KillOutcome::Failed { pid, cause: stderr }
            }
        }
        Err(err) => KillOutcome::Failed {
            pid,
            cause: err.to_string(),
        },
    }
}

/// `kill pid`.
pub fn kill(args: &[String], _token: &CancelToken) -> OpResult {
    let pid = parse_pid(arg(args, 0).unwrap_or_default())?;
    Ok(terminate(pid).to_string())
}
