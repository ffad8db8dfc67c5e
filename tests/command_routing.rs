// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Validate routing and argument binding of raw command lines.
// Author: Lukas Bower

use opsh::engine::{execute, CancelToken, Outcome};
use opsh::ops::fs::FindRequest;
use opsh::ops::net::ScanRequest;
use opsh::registry::{self, COMMAND_SPEC_COUNT};
use opsh::{parse_line, ArgError, Resolution};

fn ready_args(line: &str) -> (&'static str, Vec<String>) {
    let invocation = parse_line(1, line).expect("non-blank line");
    match invocation.resolution {
        Resolution::Ready(spec) => (spec.name, invocation.args),
        other => panic!("{line:?} did not route cleanly: {other:?}"),
    }
}

#[test]
fn find_binds_directory_pattern_and_flag() {
    let (name, args) = ready_args("find . *.py");
    assert_eq!(name, "find");
    assert_eq!(args, [".", "*.py", "false"]);
    let request = FindRequest::from_args(&args).unwrap();
    assert_eq!(request.directory, ".");
    assert_eq!(request.pattern, "*.py");
    assert!(!request.recursive);
}

#[test]
fn find_alias_with_modifiers_only() {
    let (name, args) = ready_args("SEARCH pattern=*.toml recursive=yes");
    assert_eq!(name, "find");
    assert_eq!(args, [".", "*.toml", "true"]);
}

#[test]
fn scan_binds_typed_request() {
    let (name, args) = ready_args("scan 10.0.0.1 20 25 2");
    assert_eq!(name, "scan");
    let request = ScanRequest::from_args(&args).unwrap();
    assert_eq!(request.host, "10.0.0.1");
    assert_eq!((request.start_port, request.end_port), (20, 25));
    assert!((request.timeout - 2.0).abs() < f64::EPSILON);
}

#[test]
fn scan_with_start_port_runs_to_default_end() {
    let (_, args) = ready_args("scan 10.0.0.1 20");
    let request = ScanRequest::from_args(&args).unwrap();
    assert_eq!((request.start_port, request.end_port), (20, 1024));
}

#[test]
fn scan_with_bad_port_is_argument_error_not_fault() {
    let invocation = parse_line(4, "scan 10.0.0.1 abc").unwrap();
    let record = execute(invocation, &CancelToken::new());
    assert_eq!(
        record.outcome,
        Outcome::Refused("Error: Port must be an integer".into())
    );
    assert!(!record.outcome.is_error());
}

#[test]
fn last_field_keeps_embedded_whitespace() {
    let (name, args) = ready_args("create a.txt hello world");
    assert_eq!(name, "create");
    assert_eq!(args, ["a.txt", "hello world"]);

    let (_, args) = ready_args("get http://h {\"a\":1} {\"X-Y\":\"z\"} 5");
    assert_eq!(args.len(), 4);
}

#[test]
fn every_alias_routes_to_its_command() {
    let mut words = 0;
    for spec in registry::all() {
        for word in std::iter::once(spec.name).chain(spec.aliases.iter().copied()) {
            let upper = word.to_ascii_uppercase();
            assert_eq!(registry::lookup(&upper).map(|found| found.name), Some(spec.name));
            words += 1;
        }
    }
    assert!(words > COMMAND_SPEC_COUNT);
}

#[test]
fn missing_required_argument_names_parameter() {
    let invocation = parse_line(2, "telnet").unwrap();
    match invocation.resolution {
        Resolution::Invalid(spec, ArgError::Missing { argument, .. }) => {
            assert_eq!(spec.name, "telnet");
            assert_eq!(argument, "host");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unknown_command_is_reported_as_result() {
    let record = execute(parse_line(9, "frobnicate").unwrap(), &CancelToken::new());
    assert_eq!(
        record.text(),
        "Unknown command: frobnicate. Type 'help' for available commands."
    );
    assert!(record.status().starts_with("Ready - Command completed in"));
}
