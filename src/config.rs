// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Load and layer opsh engine configuration.
// Author: Lukas Bower

//! Engine configuration.
//!
//! Sources are layered, later wins: built-in defaults, an optional TOML file,
//! `OPSH_*` environment variables, then [`ConfigOverrides`] from the command line.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "OPSH_CONFIG";
/// Environment variable overriding [`EngineConfig::log_dir`].
pub const LOG_DIR_ENV: &str = "OPSH_LOG_DIR";
/// Environment variable overriding [`EngineConfig::busy_policy`].
pub const BUSY_POLICY_ENV: &str = "OPSH_BUSY_POLICY";
/// Environment variable overriding [`EngineConfig::queue_capacity`].
pub const QUEUE_CAPACITY_ENV: &str = "OPSH_QUEUE_CAPACITY";
/// Configuration file looked up in the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "opsh.toml";

/// What to do with a submission while another invocation is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Refuse the submission.
    #[default]
    Reject,
    /// Hold the submission in a bounded FIFO and run it next.
    Queue,
}

impl FromStr for BusyPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "queue" => Ok(Self::Queue),
            _ => Err(ConfigError::InvalidValue {
                key: "busy_policy",
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for BusyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reject => "reject",
            Self::Queue => "queue",
        })
    }
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Directory receiving audit and error logs. Relative paths are resolved
    /// against the working directory at engine start.
    pub log_dir: PathBuf,
    /// Busy policy.
    pub busy_policy: BusyPolicy,
    /// Maximum number of waiting invocations under [`BusyPolicy::Queue`].
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("log"),
            busy_policy: BusyPolicy::Reject,
            queue_capacity: 8,
        }
    }
}

/// Command-line overrides applied last.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replace the log directory.
    pub log_dir: Option<PathBuf>,
    /// Replace the busy policy.
    pub busy_policy: Option<BusyPolicy>,
}

impl EngineConfig {
    /// Parse a TOML document; `origin` is only used in error messages.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()
    }

    /// Read and parse the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Layer `OPSH_*` environment variables over this configuration.
    pub fn with_env(mut self) -> Result<Self, ConfigError> {
        if let Some(value) = env_value(LOG_DIR_ENV) {
            self.log_dir = PathBuf::from(value);
        }
        if let Some(value) = env_value(BUSY_POLICY_ENV) {
            self.busy_policy = value.parse()?;
        }
        if let Some(value) = env_value(QUEUE_CAPACITY_ENV) {
            self.queue_capacity = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: QUEUE_CAPACITY_ENV,
                value,
            })?;
        }
        self.validate()
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(dir) = &overrides.log_dir {
            self.log_dir = dir.clone();
        }
        if let Some(policy) = overrides.busy_policy {
            self.busy_policy = policy;
        }
        self.validate()
    }

    /// Resolve the full configuration: file (if any), environment, overrides.
    pub fn resolve(
        cli_path: Option<PathBuf>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let base = match resolve_config_path(cli_path) {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        base.with_env()?.with_overrides(overrides)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.busy_policy == BusyPolicy::Queue && self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "queue_capacity",
                value: "0".to_owned(),
            });
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "log_dir",
                value: String::new(),
            });
        }
        Ok(self)
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Pick the configuration file: explicit path, then `OPSH_CONFIG`, then
/// `opsh.toml` in the working directory when it exists.
#[must_use]
pub fn resolve_config_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path);
    }
    if let Some(value) = env_value(CONFIG_ENV) {
        return Some(PathBuf::from(value));
    }
    let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [CONFIG_ENV, LOG_DIR_ENV, BUSY_POLICY_ENV, QUEUE_CAPACITY_ENV] {
            env::remove_var(key);
        }
    }

    #[test]
    fn toml_fills_missing_keys_with_defaults() {
        let config =
            EngineConfig::from_toml_str("busy_policy = \"queue\"\n", Path::new("t.toml")).unwrap();
        assert_eq!(config.busy_policy, BusyPolicy::Queue);
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.log_dir, PathBuf::from("log"));
    }

    #[test]
    fn unknown_keys_and_zero_queue_are_rejected() {
        let err = EngineConfig::from_toml_str("colour = 1\n", Path::new("t.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let err = EngineConfig::from_toml_str(
            "busy_policy = \"queue\"\nqueue_capacity = 0\n",
            Path::new("t.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "queue_capacity", .. }));
    }

    #[test]
    #[serial]
    fn environment_then_overrides_win() {
        clear_env();
        env::set_var(LOG_DIR_ENV, "/tmp/opsh-env-logs");
        env::set_var(BUSY_POLICY_ENV, "Queue");
        let config = EngineConfig::default().with_env().unwrap();
        assert_eq!(config.log_dir, PathBuf::from("/tmp/opsh-env-logs"));
        assert_eq!(config.busy_policy, BusyPolicy::Queue);

        let overrides = ConfigOverrides {
            log_dir: Some(PathBuf::from("cli-logs")),
            busy_policy: Some(BusyPolicy::Reject),
        };
        let config = config.with_overrides(&overrides).unwrap();
        assert_eq!(config.log_dir, PathBuf::from("cli-logs"));
        assert_eq!(config.busy_policy, BusyPolicy::Reject);
        clear_env();
    }

    #[test]
    #[serial]
    fn bad_environment_value_is_reported() {
        clear_env();
        env::set_var(BUSY_POLICY_ENV, "sometimes");
        let err = EngineConfig::default().with_env().unwrap_err();
        assert_eq!(err.to_string(), "invalid busy_policy value 'sometimes'");
        clear_env();
    }

    #[test]
    #[serial]
    fn config_path_prefers_cli_then_env() {
        clear_env();
        assert_eq!(
            resolve_config_path(Some(PathBuf::from("a.toml"))),
            Some(PathBuf::from("a.toml"))
        );
        env::set_var(CONFIG_ENV, " b.toml ");
        assert_eq!(resolve_config_path(None), Some(PathBuf::from("b.toml")));
        clear_env();
    }
}
