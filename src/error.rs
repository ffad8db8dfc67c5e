// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Error taxonomy for argument binding, operation handlers and the engine.
// Author: Lukas Bower

//! Error taxonomy shared by the parser, the operation handlers and the engine.
//!
//! Argument and handler errors render as the user-facing text that ends up in
//! the result pane and the audit log, so their `Display` output is part of the
//! observable behaviour.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while binding a command's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    /// A required argument was not supplied.
    #[error("Error: Please specify {hint}")]
    Missing {
        /// Parameter name as shown in the usage string.
        argument: &'static str,
        /// Human readable description of what is missing.
        hint: &'static str,
    },
    /// An argument was supplied but could not be interpreted.
    #[error("Error: {0}")]
    Invalid(String),
}

impl ArgError {
    /// Shorthand for [`ArgError::Invalid`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Name of the missing parameter, if this is a missing-argument error.
    #[must_use]
    pub fn missing_argument(&self) -> Option<&'static str> {
        match self {
            Self::Missing { argument, .. } => Some(argument),
            Self::Invalid(_) => None,
        }
    }
}

/// Errors returned by operation handlers.
#[derive(Debug, Error)]
pub enum OpError {
    /// Argument binding failed inside the handler.
    #[error(transparent)]
    Args(#[from] ArgError),
    /// A path the operation depends on does not exist.
    #[error("Error: {kind} '{path}' does not exist")]
    NotFound {
        /// What was expected at the path (`File`, `Directory`, ...).
        kind: &'static str,
        /// The path as supplied by the user.
        path: String,
    },
    /// Filesystem or process I/O failed.
    #[error("Error {context}: {source}")]
    Io {
        /// Operation being performed, e.g. `reading file`.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A host name could not be resolved.
    #[error("Hostname could not be resolved: {0}")]
    Resolve(String),
    /// An HTTP request could not be completed.
    #[error("{0}")]
    Http(String),
    /// The operation noticed a cancellation request and stopped early.
    #[error("Operation cancelled")]
    Cancelled,
}

impl OpError {
    /// Wrap an I/O error with a short description of the failed step.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type returned by operation handlers.
pub type OpResult = Result<String, OpError>;

/// Errors raised by the engine itself.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The shared invocation slot was poisoned by a panicking thread.
    #[error("engine state lock poisoned")]
    LockPoisoned,
    /// The log directory could not be prepared.
    #[error("failed to prepare log directory {path}: {source}")]
    LogDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Writing an audit or error record failed.
    #[error("failed to write log file {path}: {source}")]
    LogWrite {
        /// Target log file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A worker thread could not be started.
    #[error("failed to start worker thread: {0}")]
    Spawn(#[source] io::Error),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The configuration file is not valid TOML for [`crate::config::EngineConfig`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
    /// An override value could not be interpreted.
    #[error("invalid {key} value '{value}'")]
    InvalidValue {
        /// Name of the setting or environment variable.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}
