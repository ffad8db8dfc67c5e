// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Canonical command inventory and alias routing for opsh.
// Author: Lukas Bower

//! Canonical command inventory for opsh.
//!
//! Every command the shell understands is described by one [`CommandSpec`] in
//! [`COMMAND_SPECS`]. Routing is a table lookup over names and aliases; the
//! parser reads the arity and splitting strategy from the same entry.

use std::fmt;

use crate::engine::CancelToken;
use crate::error::{ArgError, OpResult};
use crate::ops;

/// Signature shared by every operation handler.
pub type Handler = fn(&[String], &CancelToken) -> OpResult;

/// How the remainder of a command line is split into arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgStrategy {
    /// Whitespace split into at most `params.len()` fields, last field greedy.
    Fields,
    /// Token scan with `key=value` modifiers, wildcard pattern and directory detection.
    Named(&'static NamedScan),
}

/// Modifier keys recognised by a named-parameter scan.
#[derive(Debug, PartialEq, Eq)]
pub struct NamedScan {
    /// Parameter reported when the line carries no tokens at all.
    pub required: &'static str,
    /// Keys that assign the directory slot.
    pub directory_keys: &'static [&'static str],
    /// Keys that assign the pattern slot.
    pub pattern_keys: &'static [&'static str],
    /// Boolean modifiers, emitted in this order after directory and pattern.
    pub flags: &'static [&'static str],
    /// Directory used when no token assigns one.
    pub default_directory: &'static str,
    /// Pattern used when no token assigns one.
    pub default_pattern: &'static str,
}

/// Modifier set used by `find`.
pub static FIND_SCAN: NamedScan = NamedScan {
    required: "pattern",
    directory_keys: &["dir", "directory"],
    pattern_keys: &["pattern"],
    flags: &["recursive"],
    default_directory: ".",
    default_pattern: "*",
};

/// Grammar and dispatch metadata for one command.
#[derive(Clone, Copy)]
pub struct CommandSpec {
    /// Canonical command name.
    pub name: &'static str,
    /// Alternative names accepted by the router.
    pub aliases: &'static [&'static str],
    /// Positional parameter names, in order.
    pub params: &'static [&'static str],
    /// Number of arguments that must be present.
    pub min_args: usize,
    /// Argument splitting strategy.
    pub strategy: ArgStrategy,
    /// Completion of "Please specify ..." when a required argument is missing.
    pub missing: &'static str,
    /// Argument synopsis shown by `help`.
    pub usage: &'static str,
    /// One-line description shown by `help`.
    pub summary: &'static str,
    /// Operation implementing the command.
    pub handler: Handler,
}

impl CommandSpec {
    /// Maximum number of argument slots produced by the parser.
    #[must_use]
    pub fn max_args(&self) -> usize {
        self.params.len()
    }

    /// Return `true` when `word` names this command or one of its aliases.
    #[must_use]
    pub fn matches(&self, word: &str) -> bool {
        self.name.eq_ignore_ascii_case(word)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(word))
    }

    /// Build the error reported when only `supplied` arguments were given.
    #[must_use]
    pub fn missing_error(&self, supplied: usize) -> ArgError {
        ArgError::Missing {
            argument: self.params.get(supplied).copied().unwrap_or(self.name),
            hint: self.missing,
        }
    }

    /// Render the `help` line for this command.
    #[must_use]
    pub fn help_line(&self) -> String {
        let mut names = vec![self.name];
        names.extend_from_slice(self.aliases);
        let names = names.join("/");
        if self.usage.is_empty() {
            format!("{names} - {}", self.summary)
        } else {
            format!("{names} {} - {}", self.usage, self.summary)
        }
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("params", &self.params)
            .field("min_args", &self.min_args)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CommandSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CommandSpec {}

/// Number of registered commands.
pub const COMMAND_SPEC_COUNT: usize = 22;

/// The command table, in `help` order.
pub static COMMAND_SPECS: [CommandSpec; COMMAND_SPEC_COUNT] = [
    CommandSpec {
        name: "list",
        aliases: &["ls", "dir", "directory", "show"],
        params: &["directory"],
        min_args: 0,
        strategy: ArgStrategy::Fields,
        missing: "a directory",
        usage: "[directory]",
        summary: "List files in directory",
        handler: ops::fs::list_directory,
    },
    CommandSpec {
        name: "find",
        aliases: &["search"],
        params: &["directory", "pattern", "recursive"],
        min_args: 1,
        strategy: ArgStrategy::Named(&FIND_SCAN),
        missing: "a pattern to search for",
        usage: "[directory] pattern [recursive=yes]",
        summary: "Find files matching pattern",
        handler: ops::fs::find_files,
    },
    CommandSpec {
        name: "read",
        aliases: &[],
        params: &["file"],
        min_args: 1,
        strategy: ArgStrategy::Fields,
        missing: "a file to read",
        usage: "filename",
        summary: "Read file contents",
        handler: ops::fs::read_file,
    },
    CommandSpec {
        name: "tree",
        aliases: &["structure"],
        params: &["directory"],
        min_args: 0,
        strategy: ArgStrategy::Fields,
        missing: "a directory",
        usage: "[directory]",
        summary: "Show directory structure recursively",
        handler: ops::fs::list_tree,
    },
    CommandSpec {
        name: "disk",
        aliases: &["storage"],
        params: &["path"],
        min_args: 0,
        strategy: ArgStrategy::Fields,
        missing: "a path",
        usage: "[path]",
        summary: "Show disk usage information",
        handler: ops::sys::disk_usage,
    },
    CommandSpec {
        name: "sysinfo",
        aliases: &["system"],
        params: &[],
        min_args: 0,
        strategy: ArgStrategy::Fields,
        missing: "",
        usage: "",
        summary: "Show system information",
        handler: ops::sys::system_info,
    },
    CommandSpec {
        name: "network",
        aliases: &[],
        params: &[],
        min_args: 0,
        strategy: ArgStrategy::Fields,
        missing: "",
        usage: "",
        summary: "Show network interfaces",
        handler: ops::net::interfaces,
    },
    CommandSpec {
        name: "ping",
        aliases: &[],
        params: &["host"],
        min_args: 1,
        strategy: ArgStrategy::Fields,
        missing: "a host to ping",
        usage: "host",
        summary: "Ping a host",
        handler: ops::net::ping,
    },
    CommandSpec {
        name: "copy",
        aliases: &[],
        params: &["source", "destination"],
        min_args: 2,
        strategy: ArgStrategy::Fields,
        missing: "source and destination",
        usage: "source destination",
        summary: "Copy a file from source to destination",
        handler: ops::fs::copy_file,
    },
    CommandSpec {
        name: "open",
        aliases: &[],
        params: &["file", "application"],
        min_args: 1,
        strategy: ArgStrategy::Fields,
        missing: "a file to open",
        usage: "filename [application]",
        summary: "Open file with default or specified application",
        handler: ops::fs::open_file,
    },
    CommandSpec {
        name: "cd",
        aliases: &["chdir", "changedir"],
        params: &["directory"],
        min_args: 0,
        strategy: ArgStrategy::Fields,
        missing: "a directory",
        usage: "[directory]",
        summary: "Change current directory",
        handler: ops::fs::change_directory,
    },
    CommandSpec {
        name: "pwd",
        aliases: &["cwd"],
        params: &[],
        min_args: 0,
        strategy: ArgStrategy::Fields,
        missing: "",
        usage: "",
        summary: "Show current working directory",
        handler: ops::fs::current_directory,
    },
    CommandSpec {
        name: "whoami",
        aliases: &["user", "userinfo"],
        params: &[],
        min_args: 0,
        strategy: ArgStrategy::Fields,
        missing: "",
        usage: "",
        summary: "Show username and computer name",
        handler: ops::sys::user_info,
    },
    CommandSpec {
        name: "create",
        aliases: &[],
        params: &["file", "content"],
        min_args: 1,
        strategy: ArgStrategy::Fields,
        missing: "a file path to create",
        usage: "filename [content]",
        summary: "Create a new file with optional content",
        handler: ops::fs::create_file,
    },
    CommandSpec {
        name: "telnet",
        aliases: &[],
        params: &["host", "port", "timeout"],
        min_args: 1,
        strategy: ArgStrategy::Fields,
        missing: "a host to connect to",
        usage: "host [port] [timeout]",
        summary: "Connect to host via telnet",
        handler: ops::net::telnet,
    },
    CommandSpec {
        name: "traceroute",
        aliases: &["trace"],
        params: &["host"],
        min_args: 1,
        strategy: ArgStrategy::Fields,
        missing: "a host to trace",
        usage: "host",
        summary: "Trace route to host",
        handler: ops::net::traceroute,
    },
    CommandSpec {
        name: "scan",
        aliases: &["ports", "scanports"],
        params: &["host", "start_port", "end_port", "timeout"],
        min_args: 1,
        strategy: ArgStrategy::Fields,
        missing: "a host to scan",
        usage: "host [start_port] [end_port] [timeout]",
        summary: "Scan ports on a host",
        handler: ops::net::scan_ports,
    },
    CommandSpec {
        name: "processes",
        aliases: &["ps", "tasklist"],
        params: &[],
        min_args: 0,
        strategy: ArgStrategy::Fields,
        missing: "",
        usage: "",
        summary: "List running processes",
        handler: ops::sys::list_processes,
    },
    CommandSpec {
        name: "get",
        aliases: &["http_get"],
        params: &["url", "params", "headers", "timeout"],
        min_args: 1,
        strategy: ArgStrategy::Fields,
        missing: "a URL for the GET request",
        usage: "url [params] [headers] [timeout]",
        summary: "Send HTTP GET request",
        handler: ops::http::get,
    },
    CommandSpec {
        name: "post",
        aliases: &["http_post"],
        params: &["url", "data", "headers", "json", "timeout"],
        min_args: 1,
        strategy: ArgStrategy::Fields,
        missing: "a URL for the POST request",
        usage: "url [data] [headers] [timeout] | url data headers json timeout",
        summary: "Send HTTP POST request",
        handler: ops::http::post,
    },
    CommandSpec {
        name: "kill",
        aliases: &[],
        params: &["pid"],
        min_args: 1,
        strategy: ArgStrategy::Fields,
        missing: "a process id to terminate",
        usage: "pid",
        summary: "Terminate a running process",
        handler: ops::process::kill,
    },
    CommandSpec {
        name: "help",
        aliases: &[],
        params: &["command"],
        min_args: 0,
        strategy: ArgStrategy::Fields,
        missing: "a command",
        usage: "[command]",
        summary: "Show this help message",
        handler: help,
    },
];

/// Resolve a command word to its spec, matching names and aliases case-insensitively.
#[must_use]
pub fn lookup(word: &str) -> Option<&'static CommandSpec> {
    COMMAND_SPECS.iter().find(|spec| spec.matches(word))
}

/// Iterate the registered commands in `help` order.
pub fn all() -> impl Iterator<Item = &'static CommandSpec> {
    COMMAND_SPECS.iter()
}

fn help(args: &[String], _token: &CancelToken) -> OpResult {
    if let Some(word) = args.first() {
        let spec = lookup(word)
            .ok_or_else(|| ArgError::invalid(format!("Unknown command: {word}")))?;
        let mut text = format!("Usage: {} {}", spec.name, spec.usage)
            .trim_end()
            .to_owned();
        if !spec.aliases.is_empty() {
            text.push_str(&format!("\nAliases: {}", spec.aliases.join(", ")));
        }
        text.push('\n');
        text.push_str(spec.summary);
        return Ok(text);
    }
    let mut lines = vec!["Available commands:".to_owned()];
    lines.extend(all().map(CommandSpec::help_line));
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_aliases_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for spec in all() {
            for word in std::iter::once(&spec.name).chain(spec.aliases.iter()) {
                assert!(seen.insert(word.to_ascii_lowercase()), "duplicate word {word}");
            }
        }
    }

    #[test]
    fn minimums_fit_parameter_lists() {
        for spec in all() {
            assert!(spec.min_args <= spec.max_args(), "{}", spec.name);
            if spec.min_args > 0 {
                assert!(!spec.missing.is_empty(), "{}", spec.name);
            }
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("LS").map(|s| s.name), Some("list"));
        assert_eq!(lookup("Show").map(|s| s.name), Some("list"));
        assert_eq!(lookup("ScanPorts").map(|s| s.name), Some("scan"));
        assert!(lookup("rm").is_none());
    }

    #[test]
    fn help_lists_every_command() {
        let text = help(&[], &CancelToken::new()).unwrap();
        assert!(text.starts_with("Available commands:"));
        assert!(text.contains("scan/ports/scanports host [start_port] [end_port] [timeout]"));
        assert_eq!(text.lines().count(), COMMAND_SPEC_COUNT + 1);
    }

    #[test]
    fn help_for_single_command() {
        let text = help(&["trace".into()], &CancelToken::new()).unwrap();
        assert!(text.starts_with("Usage: traceroute host"));
        assert!(text.contains("Aliases: trace"));
        let err = help(&["bogus".into()], &CancelToken::new()).unwrap_err();
        assert_eq!(err.to_string(), "Error: Unknown command: bogus");
    }
}
