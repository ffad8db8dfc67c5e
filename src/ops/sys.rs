// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Host and user information operations.
// Author: Lukas Bower

//! System information: disk usage, host description, current user and the
//! process table.

use std::env;
use std::path::Path;

use super::{arg, capture};
use crate::engine::CancelToken;
use crate::error::{OpError, OpResult};

fn host_name() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_owned())
}

fn user_name() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|key| env::var(key).ok().filter(|value| !value.is_empty()))
        .unwrap_or_else(|| "unknown".to_owned())
}

fn uname(flag: &str, token: &CancelToken) -> String {
    capture("uname", &[flag], token)
        .map(|text| text.trim().to_owned())
        .unwrap_or_else(|_| "unknown".to_owned())
}

/// `disk [path]`: filesystem usage for the volume holding `path`.
pub fn disk_usage(args: &[String], token: &CancelToken) -> OpResult {
    let path = arg(args, 0).unwrap_or(".");
    if !Path::new(path).exists() {
        return Err(OpError::NotFound {
            kind: "Path",
            path: path.to_owned(),
        });
    }
    if cfg!(windows) {
        capture("wmic", &["logicaldisk", "get", "caption,freespace,size"], token)
    } else {
        capture("df", &["-h", path], token)
    }
}

/// `sysinfo`: platform, host and architecture summary.
pub fn system_info(_args: &[String], token: &CancelToken) -> OpResult {
    let (release, version) = if cfg!(windows) {
        ("unknown".to_owned(), "unknown".to_owned())
    } else {
        (uname("-r", token), uname("-v", token))
    };
    let mut lines = vec![
        format!("System: {}", env::consts::OS),
        format!("Node: {}", host_name()),
        format!("Release: {release}"),
        format!("Version: {version}"),
        format!("Machine: {}", env::consts::ARCH),
        format!("Family: {}", env::consts::FAMILY),
    ];
    if cfg!(windows) {
        if let Ok(details) = capture("systeminfo", &[], token) {
            lines.push(String::new());
            lines.push(details);
        }
    }
    Ok(lines.join("\n"))
}

/// `whoami`: the current user and host.
pub fn user_info(_args: &[String], _token: &CancelToken) -> OpResult {
    Ok(format!(
        "Username: {}\nComputer name: {}",
        user_name(),
        host_name()
    ))
}

/// `ps`: the process table.
pub fn list_processes(_args: &[String], token: &CancelToken) -> OpResult {
    if cfg!(windows) {
        capture("tasklist", &[], token)
    } else {
        capture("ps", &["aux"], token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whoami_reports_user_and_host() {
        let text = user_info(&[], &CancelToken::new()).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Username: "));
        assert!(lines.next().unwrap().starts_with("Computer name: "));
    }

    #[test]
    fn sysinfo_names_platform() {
        let text = system_info(&[], &CancelToken::new()).unwrap();
        assert!(text.starts_with(&format!("System: {}", env::consts::OS)));
        assert!(text.contains(&format!("Machine: {}", env::consts::ARCH)));
    }

    #[test]
    fn disk_rejects_missing_path() {
        let err = disk_usage(&["/no/such/opsh/volume".to_owned()], &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "Error: Path '/no/such/opsh/volume' does not exist");
    }
}
