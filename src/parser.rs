// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Turn raw command lines into routed invocations.
// Author: Lukas Bower

//! Line parser.
//!
//! A line is split into a command word and a remainder. The word is routed
//! through the [registry](crate::registry); the remainder is split according
//! to the resolved spec's [`ArgStrategy`]. Unknown words and missing
//! arguments are not parse failures: they produce an [`Invocation`] whose
//! [`Resolution`] carries the error so the engine can report it like any
//! other result.

use chrono::{DateTime, Local};

use crate::error::ArgError;
use crate::registry::{self, ArgStrategy, CommandSpec, NamedScan};

/// Outcome of routing a command word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The command was found and its arguments satisfy the spec.
    Ready(&'static CommandSpec),
    /// No command or alias matched; carries the word as typed.
    Unknown(String),
    /// The command was found but its arguments are unusable.
    Invalid(&'static CommandSpec, ArgError),
}

/// One submitted command line, routed and split.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Identifier assigned by the scheduler.
    pub id: u64,
    /// The line as submitted (trimmed).
    pub line: String,
    /// Routing result.
    pub resolution: Resolution,
    /// Arguments in parameter order.
    pub args: Vec<String>,
    /// Submission time.
    pub submitted_at: DateTime<Local>,
}

impl Invocation {
    /// The resolved command spec, if routing succeeded.
    #[must_use]
    pub fn spec(&self) -> Option<&'static CommandSpec> {
        match &self.resolution {
            Resolution::Ready(spec) | Resolution::Invalid(spec, _) => Some(*spec),
            Resolution::Unknown(_) => None,
        }
    }

    /// Return `true` when the invocation can be handed to its handler.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.resolution, Resolution::Ready(_))
    }
}

/// Split a trimmed line into its command word and the remainder.
///
/// Returns `None` for blank input. The remainder starts after the first run
/// of whitespace and keeps everything else verbatim.
#[must_use]
pub fn split_command(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.find(char::is_whitespace) {
        Some(at) => Some((&line[..at], line[at..].trim_start())),
        None => Some((line, "")),
    }
}

/// Split `remainder` into at most `max` whitespace-delimited fields. Splitting
/// stops after `max - 1` delimiters so the last field keeps its inner whitespace.
#[must_use]
pub fn split_fields(remainder: &str, max: usize) -> Vec<String> {
    let mut fields = Vec::new();
    if max == 0 {
        return fields;
    }
    let mut rest = remainder.trim();
    while !rest.is_empty() {
        if fields.len() + 1 == max {
            fields.push(rest.to_owned());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(at) => {
                fields.push(rest[..at].to_owned());
                rest = rest[at..].trim_start();
            }
            None => {
                fields.push(rest.to_owned());
                break;
            }
        }
    }
    fields
}

/// Permissive truth value: `true`, `yes` and `1` (any case) are true.
#[must_use]
pub fn parse_truth(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") || value == "1"
}

/// Result of a named-parameter scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedArgs {
    /// Directory slot (last assignment wins).
    pub directory: Option<String>,
    /// Pattern slot (first wildcard token, or an explicit modifier).
    pub pattern: Option<String>,
    /// Boolean modifiers in the scan's declared order.
    pub flags: Vec<bool>,
    /// Number of whitespace tokens seen.
    pub tokens: usize,
}

impl NamedArgs {
    /// Flatten into positional slots `[directory, pattern, flags...]`, filling defaults.
    #[must_use]
    pub fn into_args(self, scan: &NamedScan) -> Vec<String> {
        let mut args = vec![
            self.directory
                .unwrap_or_else(|| scan.default_directory.to_owned()),
            self.pattern
                .unwrap_or_else(|| scan.default_pattern.to_owned()),
        ];
        args.extend(self.flags.iter().map(bool::to_string));
        args
    }
}

/// Classify whitespace tokens into modifiers, pattern and directory.
///
/// Rules, applied per token in order:
/// 1. `key=value` with a known key sets that modifier;
/// 2. a token containing `*` or `?` becomes the pattern if none is set yet;
/// 3. anything else is taken as the directory, whether or not it exists.
///    Later directory tokens replace earlier ones.
#[must_use]
pub fn scan_named(remainder: &str, scan: &NamedScan) -> NamedArgs {
    let mut named = NamedArgs {
        directory: None,
        pattern: None,
        flags: vec![false; scan.flags.len()],
        tokens: 0,
    };
    for token in remainder.split_whitespace() {
        named.tokens += 1;
        if let Some((key, value)) = token.split_once('=') {
            if let Some(index) = position_of(scan.flags, key) {
                named.flags[index] = parse_truth(value);
                continue;
            }
            if position_of(scan.pattern_keys, key).is_some() {
                named.pattern = Some(value.to_owned());
                continue;
            }
            if position_of(scan.directory_keys, key).is_some() {
                named.directory = Some(value.to_owned());
                continue;
            }
        }
        if named.pattern.is_none() && token.contains(&['*', '?'][..]) {
            named.pattern = Some(token.to_owned());
        } else {
            named.directory = Some(token.to_owned());
        }
    }
    named
}

fn position_of(keys: &[&str], key: &str) -> Option<usize> {
    keys.iter().position(|known| known.eq_ignore_ascii_case(key))
}

/// Parse a raw line into an [`Invocation`] with the given identifier.
///
/// Returns `None` for blank lines.
#[must_use]
pub fn parse_line(id: u64, line: &str) -> Option<Invocation> {
    let line = line.trim();
    let (word, remainder) = split_command(line)?;
    let (resolution, args) = match registry::lookup(word) {
        None => (Resolution::Unknown(word.to_owned()), Vec::new()),
        Some(spec) => bind(spec, remainder),
    };
    Some(Invocation {
        id,
        line: line.to_owned(),
        resolution,
        args,
        submitted_at: Local::now(),
    })
}

fn bind(spec: &'static CommandSpec, remainder: &str) -> (Resolution, Vec<String>) {
    match spec.strategy {
        ArgStrategy::Fields => {
            let args = split_fields(remainder, spec.max_args());
            if args.len() < spec.min_args {
                let err = spec.missing_error(args.len());
                return (Resolution::Invalid(spec, err), args);
            }
            (Resolution::Ready(spec), args)
        }
        ArgStrategy::Named(scan) => {
            let named = scan_named(remainder, scan);
            if named.tokens < spec.min_args {
                let err = ArgError::Missing {
                    argument: scan.required,
                    hint: spec.missing,
                };
                return (Resolution::Invalid(spec, err), named.into_args(scan));
            }
            (Resolution::Ready(spec), named.into_args(scan))
        }
    }
}
