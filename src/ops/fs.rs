// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Filesystem operations exposed through the opsh registry.
// Author: Lukas Bower

//! Filesystem operations: listing, searching, reading, creating, copying,
//! opening files and moving the working directory.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use chrono::{DateTime, Local};
use walkdir::WalkDir;

use super::arg;
use crate::engine::CancelToken;
use crate::error::{ArgError, OpError, OpResult};
use crate::parser::parse_truth;

const SPREADSHEET_EXTENSIONS: [&str; 7] = ["xlsx", "xls", "xlsm", "xlsb", "xltx", "xltm", "xlt"];

fn require_dir(path: &str) -> Result<&Path, OpError> {
    let dir = Path::new(path);
    if dir.exists() {
        Ok(dir)
    } else {
        Err(OpError::NotFound {
            kind: "Directory",
            path: path.to_owned(),
        })
    }
}

fn require_file<'a>(path: &'a str, kind: &'static str) -> Result<&'a Path, OpError> {
    let file = Path::new(path);
    if file.exists() {
        Ok(file)
    } else {
        Err(OpError::NotFound {
            kind,
            path: path.to_owned(),
        })
    }
}

/// `list [directory]`: one line per entry with type, size and modification time.
pub fn list_directory(args: &[String], _token: &CancelToken) -> OpResult {
    let dir = require_dir(arg(args, 0).unwrap_or("."))?;
    let mut entries = fs::read_dir(dir)
        .map_err(|err| OpError::io("listing directory", err))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| OpError::io("listing directory", err))?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut lines = Vec::with_capacity(entries.len());
    for entry in entries {
        let meta = entry
            .metadata()
            .map_err(|err| OpError::io("listing directory", err))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let kind = if meta.is_dir() { "Directory" } else { "File" };
        let size = if meta.is_file() {
            meta.len().to_string()
        } else {
            "<DIR>".to_owned()
        };
        let modified = meta
            .modified()
            .map(|time| {
                DateTime::<Local>::from(time)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_default();
        lines.push(format!("{name:<30} {kind:<10} {size:<10} {modified}"));
    }
    Ok(lines.join("\n"))
}

/// `tree [directory]`: every subdirectory below `directory`, depth first.
pub fn list_tree(args: &[String], token: &CancelToken) -> OpResult {
    let root = require_dir(arg(args, 0).unwrap_or("."))?;
    let mut subdirs = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        if token.is_cancelled() {
            return Err(OpError::Cancelled);
        }
        let entry = entry.map_err(|err| OpError::io("walking directory", err.into()))?;
        if entry.file_type().is_dir() {
            subdirs.push(entry.path().display().to_string());
        }
    }
    if subdirs.is_empty() {
        return Ok("No subdirectories found".to_owned());
    }
    Ok(subdirs.join("\n"))
}

/// Typed arguments of `find`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindRequest {
    /// Directory to search.
    pub directory: String,
    /// Glob pattern matched against file names.
    pub pattern: String,
    /// Descend into subdirectories.
    pub recursive: bool,
}

impl FindRequest {
    /// Bind the `[directory, pattern, recursive]` slots produced by the named scan.
    pub fn from_args(args: &[String]) -> Result<Self, ArgError> {
        let directory = arg(args, 0).unwrap_or(".").to_owned();
        let pattern = arg(args, 1)
            .filter(|pattern| !pattern.is_empty())
            .ok_or(ArgError::Missing {
                argument: "pattern",
                hint: "a pattern to search for",
            })?
            .to_owned();
        let recursive = arg(args, 2).is_some_and(parse_truth);
        Ok(Self {
            directory,
            pattern,
            recursive,
        })
    }

    fn glob_pattern(&self) -> String {
        let mut path = PathBuf::from(&self.directory);
        if self.recursive {
            path.push("**");
        }
        path.push(&self.pattern);
        path.to_string_lossy().into_owned()
    }
}

/// `find [directory] pattern [recursive=yes]`.
pub fn find_files(args: &[String], token: &CancelToken) -> OpResult {
    let request = FindRequest::from_args(args)?;
    require_dir(&request.directory)?;
    let pattern = request.glob_pattern();
    let paths = glob::glob(&pattern).map_err(|err| {
        ArgError::invalid(format!("Invalid pattern '{}': {err}", request.pattern))
    })?;
    let mut matches = Vec::new();
    for path in paths {
        if token.is_cancelled() {
            return Err(OpError::Cancelled);
        }
        match path {
            Ok(path) => matches.push(path.display().to_string()),
            Err(err) => log::debug!("skipping unreadable path during find: {err}"),
        }
    }
    if matches.is_empty() {
        return Ok(format!("No files matching '{}' found", request.pattern));
    }
    Ok(matches.join("\n"))
}

/// `read filename`: file contents as UTF-8, falling back to Latin-1.
pub fn read_file(args: &[String], _token: &CancelToken) -> OpResult {
    let path = arg(args, 0).unwrap_or_default();
    let file = require_file(path, "File")?;
    let bytes = fs::read(file).map_err(|err| OpError::io("reading file", err))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => Ok(err.into_bytes().iter().map(|&b| char::from(b)).collect()),
    }
}

/// `create filename [content]`: write a file, creating parent directories.
pub fn create_file(args: &[String], _token: &CancelToken) -> OpResult {
    let path = arg(args, 0).unwrap_or_default();
    let content = arg(args, 1).unwrap_or_default();
    let file = Path::new(path);
    if let Some(parent) = file.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| OpError::io("creating file", err))?;
    }
    fs::write(file, content).map_err(|err| OpError::io("creating file", err))?;
    Ok(format!("File created successfully: {path}"))
}

/// `copy source destination`: copy a file; a directory destination keeps the file name.
pub fn copy_file(args: &[String], _token: &CancelToken) -> OpResult {
    let source = arg(args, 0).unwrap_or_default();
    let destination = arg(args, 1).unwrap_or_default();
    let src = require_file(source, "Source file")?;
    let mut dst = PathBuf::from(destination);
    if dst.is_dir() {
        if let Some(name) = src.file_name() {
            dst.push(name);
        }
    }
    fs::copy(src, &dst).map_err(|err| OpError::io("copying file", err))?;
    Ok(format!(
        "File copied successfully from {source} to {destination}"
    ))
}

/// `open filename [application]`: hand the file to an application without waiting.
pub fn open_file(args: &[String], _token: &CancelToken) -> OpResult {
    let path = arg(args, 0).unwrap_or_default();
    let file = require_file(path, "File")?;
    let is_spreadsheet = file
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        });
    if is_spreadsheet && args.len() < 2 {
        return Ok(format!(
            "Warning: Excel files cannot be opened directly. \
             Please use a specific Excel application.\nTry: open {path} excel.exe"
        ));
    }

    let (mut command, label) = match arg(args, 1) {
        Some(application) => {
            let mut command = Command::new(application);
            command.arg(path);
            (command, application.to_owned())
        }
        None => (default_opener(path), "default application".to_owned()),
    };
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| OpError::io("opening file", err))?;
    thread::spawn(move || child.wait());
    Ok(format!("Opened '{path}' with {label}"))
}

fn default_opener(path: &str) -> Command {
    if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", "", path]);
        command
    } else if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(path);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(path);
        command
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// `cd [directory]`: change the process working directory (`~` and no argument mean home).
pub fn change_directory(args: &[String], _token: &CancelToken) -> OpResult {
    let cwd = env::current_dir().map_err(|err| OpError::io("changing directory", err))?;
    let target = match arg(args, 0) {
        None | Some("~") => home_dir().ok_or_else(|| {
            ArgError::invalid("home directory is not set; specify a directory")
        })?,
        Some("..") => cwd.parent().map_or_else(|| cwd.clone(), Path::to_path_buf),
        Some(path) => cwd.join(path),
    };
    if !target.exists() {
        return Err(OpError::NotFound {
            kind: "Directory",
            path: target.display().to_string(),
        });
    }
    if !target.is_dir() {
        let message = format!("'{}' is not a directory", target.display());
        return Err(ArgError::invalid(message).into());
    }
    env::set_current_dir(&target).map_err(|err| OpError::io("changing directory", err))?;
    let now = env::current_dir().map_err(|err| OpError::io("changing directory", err))?;
    Ok(format!("Changed directory to: {}", now.display()))
}

/// `pwd`: the current working directory.
pub fn current_directory(_args: &[String], _token: &CancelToken) -> OpResult {
    let cwd = env::current_dir().map_err(|err| OpError::io("reading current directory", err))?;
    Ok(format!("Current directory: {}", cwd.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn find_request_binds_named_slots() {
        let request = FindRequest::from_args(&args(&[".", "*.py", "false"])).unwrap();
        assert_eq!(
            request,
            FindRequest {
                directory: ".".into(),
                pattern: "*.py".into(),
                recursive: false,
            }
        );
        assert!(FindRequest::from_args(&args(&["src", "*.rs", "yes"])).unwrap().recursive);
    }

    #[test]
    fn create_read_and_copy_round_trip() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("nested/a.txt");
        let file = file.to_str().unwrap();
        let token = CancelToken::new();

        let created = create_file(&args(&[file, "hello  world"]), &token).unwrap();
        assert_eq!(created, format!("File created successfully: {file}"));
        assert_eq!(read_file(&args(&[file]), &token).unwrap(), "hello  world");

        let target = dir.path().to_str().unwrap();
        copy_file(&args(&[file, target]), &token).unwrap();
        assert!(dir.path().join("a.txt").exists());
    }

    #[test]
    fn read_falls_back_to_latin1() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("latin.txt");
        fs::write(&file, [b'c', b'a', b'f', 0xE9]).unwrap();
        let text = read_file(&args(&[file.to_str().unwrap()]), &CancelToken::new()).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn missing_paths_are_typed_errors() {
        let token = CancelToken::new();
        let err = list_directory(&args(&["/no/such/opsh/dir"]), &token).unwrap_err();
        assert_eq!(err.to_string(), "Error: Directory '/no/such/opsh/dir' does not exist");
        let err = read_file(&args(&["/no/such/opsh/file"]), &token).unwrap_err();
        assert_eq!(err.to_string(), "Error: File '/no/such/opsh/file' does not exist");
        let err = copy_file(&args(&["/no/such/opsh/file", "x"]), &token).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Source file '/no/such/opsh/file' does not exist"
        );
    }

    #[test]
    fn find_honours_recursion() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("top.py"), "").unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/inner.py"), "").unwrap();
        let root = dir.path().to_str().unwrap();
        let token = CancelToken::new();

        let flat = find_files(&args(&[root, "*.py", "false"]), &token).unwrap();
        assert!(flat.contains("top.py"));
        assert!(!flat.contains("inner.py"));

        let deep = find_files(&args(&[root, "*.py", "true"]), &token).unwrap();
        assert!(deep.contains("top.py"));
        assert!(deep.contains("inner.py"));

        let none = find_files(&args(&[root, "*.rs", "false"]), &token).unwrap();
        assert_eq!(none, "No files matching '*.rs' found");
    }

    #[test]
    fn list_and_tree_describe_entries() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("file.txt"), "12345").unwrap();
        let root = dir.path().to_str().unwrap();
        let token = CancelToken::new();

        let listing = list_directory(&args(&[root]), &token).unwrap();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("a "));
        assert!(lines[0].contains("Directory") && lines[0].contains("<DIR>"));
        assert!(lines[1].starts_with("file.txt"));
        assert!(lines[1].contains("File") && lines[1].contains(" 5 "));

        let tree = list_tree(&args(&[root]), &token).unwrap();
        assert_eq!(tree.lines().count(), 2);
        let empty = list_tree(&args(&[dir.path().join("a/b").to_str().unwrap()]), &token).unwrap();
        assert_eq!(empty, "No subdirectories found");
    }

    #[test]
    fn spreadsheets_are_not_opened_without_application() {
        let dir = tempdir().unwrap();
        let sheet = dir.path().join("book.XLSX");
        fs::write(&sheet, "").unwrap();
        let text = open_file(&args(&[sheet.to_str().unwrap()]), &CancelToken::new()).unwrap();
        assert!(text.starts_with("Warning: Excel files cannot be opened directly."));
    }
}
