// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Persist per-invocation audit records and error records.
// Author: Lukas Bower

//! Audit and error logs.
//!
//! Files are named by local time to the minute and are truncated on write, so
//! the last invocation in a given minute owns that minute's file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::debug;

use super::record::ExecutionRecord;
use crate::error::EngineError;

const AUDIT_PREFIX: &str = "query_output";
const ERROR_PREFIX: &str = "error_";
const FILE_STAMP: &str = "%Y%m%d_%H%M";
const RECORD_STAMP: &str = "%Y-%m-%d %H:%M:%S";

/// Writer for `query_output*.log` and `error_*.log` files.
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    /// Create the log directory if needed and pin it to an absolute path, so a
    /// later `cd` does not move the logs.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        let dir = dir.as_ref();
        let absolute = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            env::current_dir()
                .map_err(|source| EngineError::LogDir {
                    path: dir.to_path_buf(),
                    source,
                })?
                .join(dir)
        };
        fs::create_dir_all(&absolute).map_err(|source| EngineError::LogDir {
            path: absolute.clone(),
            source,
        })?;
        debug!("audit log directory {}", absolute.display());
        Ok(Self { dir: absolute })
    }

    /// Absolute log directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Audit file for invocations started at `at`.
    #[must_use]
    pub fn audit_path(&self, at: &DateTime<Local>) -> PathBuf {
        self.dir
            .join(format!("{AUDIT_PREFIX}{}.log", at.format(FILE_STAMP)))
    }

    /// Error file for failures observed at `at`.
    #[must_use]
    pub fn error_path(&self, at: &DateTime<Local>) -> PathBuf {
        self.dir
            .join(format!("{ERROR_PREFIX}{}.log", at.format(FILE_STAMP)))
    }

    /// Write the audit record for `record`, replacing the minute's file.
    pub fn write_record(&self, record: &ExecutionRecord) -> Result<PathBuf, EngineError> {
        let path = self.audit_path(&record.started);
        self.write(&path, &format_record(record))?;
        Ok(path)
    }

    /// Write an error record for `line`, replacing the minute's file.
    pub fn write_error(
        &self,
        line: &str,
        error: &str,
        at: &DateTime<Local>,
    ) -> Result<PathBuf, EngineError> {
        let path = self.error_path(at);
        self.write(&path, &format_error(line, error))?;
        Ok(path)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), EngineError> {
        let to_engine = |source| EngineError::LogWrite {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(to_engine)?;
        fs::write(path, contents).map_err(to_engine)
    }
}

/// Render the audit record text.
#[must_use]
pub fn format_record(record: &ExecutionRecord) -> String {
    format!(
        "Command: {}\nTimestamp: {}\nResult:\n{}\n",
        record.line(),
        record.started.format(RECORD_STAMP),
        record.text()
    )
}

/// Render the error record text.
#[must_use]
pub fn format_error(line: &str, error: &str) -> String {
    format!("Command: {line}\nError: {error}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::record::Outcome;
    use crate::parser::parse_line;
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::tempdir;

    fn record_at(line: &str, text: &str, at: DateTime<Local>) -> ExecutionRecord {
        ExecutionRecord {
            invocation: parse_line(1, line).unwrap(),
            started: at,
            finished: at,
            elapsed: Duration::ZERO,
            outcome: Outcome::Output(text.to_owned()),
        }
    }

    #[test]
    fn file_names_use_minute_buckets() {
        let dir = tempdir().unwrap();
        let log = AuditLog::open(dir.path()).unwrap();
        let at = Local.with_ymd_and_hms(2025, 3, 9, 7, 5, 42).unwrap();
        assert!(log.audit_path(&at).ends_with("query_output20250309_0705.log"));
        assert!(log.error_path(&at).ends_with("error_20250309_0705.log"));
    }

    #[test]
    fn record_format_and_overwrite() {
        let dir = tempdir().unwrap();
        let log = AuditLog::open(dir.path().join("nested")).unwrap();
        let at = Local.with_ymd_and_hms(2025, 3, 9, 7, 5, 42).unwrap();

        let path = log.write_record(&record_at("pwd", "first", at)).unwrap();
        log.write_record(&record_at("whoami", "second\nline", at)).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(
            text,
            "Command: whoami\nTimestamp: 2025-03-09 07:05:42\nResult:\nsecond\nline\n"
        );
    }

    #[test]
    fn error_format() {
        let dir = tempdir().unwrap();
        let log = AuditLog::open(dir.path()).unwrap();
        let path = log
            .write_error("read x", "Error: File 'x' does not exist", &Local::now())
            .unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "Command: read x\nError: Error: File 'x' does not exist\n"
        );
    }

    #[test]
    fn unwritable_directory_is_an_engine_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        let err = AuditLog::open(blocker.join("logs")).unwrap_err();
        assert!(matches!(err, EngineError::LogDir { .. }));
    }
}
