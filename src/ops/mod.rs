// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Operation handlers dispatched by the opsh registry.
// Author: Lukas Bower

//! Operation handlers.
//!
//! Every handler has the [`Handler`](crate::registry::Handler) signature: it
//! receives the parsed arguments and the invocation's [`CancelToken`] and
//! returns result text or a typed [`OpError`]. Handlers that spawn external
//! programs register the child pid on the token so the kill path can reach it.

pub mod fs;
pub mod http;
pub mod net;
pub mod process;
pub mod sys;

use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::thread;

use log::debug;

use crate::engine::CancelToken;
use crate::error::{OpError, OpResult};

/// Borrow argument `index`, if present.
pub(crate) fn arg(args: &[String], index: usize) -> Option<&str> {
    args.get(index).map(String::as_str)
}

fn drain<R: Read>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

/// Run `program` to completion, tracking its pid on `token` while it runs.
///
/// The pid is released after the output pipes close and before the child is
/// reaped, so the kill path never signals a recycled pid.
pub(crate) fn run_tracked(
    program: &str,
    args: &[&str],
    token: &CancelToken,
) -> Result<Output, OpError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| OpError::io(format!("running {program}"), err))?;
    debug!("spawned {program} as pid {}", child.id());
    token.track_child(child.id());
    let stderr = child.stderr.take();
    let stderr_reader = thread::spawn(move || drain(stderr));
    let stdout = drain(child.stdout.take());
    let stderr = stderr_reader.join().unwrap_or_else(|_| Ok(Vec::new()));
    token.release_child();
    let status = child
        .wait()
        .map_err(|err| OpError::io(format!("waiting for {program}"), err))?;
    let read_error = |err| OpError::io(format!("reading {program} output"), err);
    Ok(Output {
        status,
        stdout: stdout.map_err(read_error)?,
        stderr: stderr.map_err(read_error)?,
    })
}

/// Run `program` and return its standard output.
///
/// Output is returned whenever the program succeeded or printed something on
/// stdout; otherwise its stderr (or exit status) becomes the error.
pub(crate) fn capture(program: &str, args: &[&str], token: &CancelToken) -> OpResult {
    let output = run_tracked(program, args, token)?;
    if token.is_cancelled() {
        return Err(OpError::Cancelled);
    }
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() || !stdout.trim().is_empty() {
        return Ok(stdout);
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    let cause = if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    };
    Err(OpError::io(
        format!("running {program}"),
        io::Error::new(io::ErrorKind::Other, cause),
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn capture_returns_stdout_and_releases_child() {
        let token = CancelToken::new();
        let text = capture("sh", &["-c", "echo hello"], &token).unwrap();
        assert_eq!(text.trim(), "hello");
        assert_eq!(token.child_pid(), None);
    }

    #[test]
    fn capture_reports_stderr_on_failure() {
        let token = CancelToken::new();
        let err = capture("sh", &["-c", "echo broken >&2; exit 3"], &token).unwrap_err();
        assert_eq!(err.to_string(), "Error running sh: broken");
    }

    #[test]
    fn tracked_child_is_killed_through_token() {
        use crate::ops::process::{terminate, KillOutcome};
        use std::time::{Duration, Instant};

        let token = CancelToken::new();
        let worker = {
            let token = token.clone();
            thread::spawn(move || capture("sleep", &["30"], &token))
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        let pid = loop {
            if let Some(pid) = token.child_pid() {
                break pid;
            }
            assert!(Instant::now() < deadline, "child never tracked");
            thread::sleep(Duration::from_millis(10));
        };
        token.cancel();
        assert_eq!(token.signal_child(terminate), Some(KillOutcome::Terminated(pid)));
        let result = worker.join().unwrap();
        assert!(matches!(result, Err(OpError::Cancelled)));
        assert_eq!(token.child_pid(), None);
    }

    #[test]
    fn missing_program_is_a_typed_error() {
        let err = capture("opsh-no-such-program", &[], &CancelToken::new()).unwrap_err();
        assert!(matches!(err, OpError::Io { .. }));
    }
}
