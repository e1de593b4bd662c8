//! Executor configuration.
//!
//! ```yaml
//! backend: fork_exec      # spawn | fork_exec
//! wait_timeout: 5s        # optional deadline; "ms", "s" or "m" suffix
//! kill_grace_period: 2s   # SIGTERM -> SIGKILL delay once the deadline passes
//! diagnostics: stderr     # stderr | tracing
//! ```
//!
//! The defaults reproduce the plain primitive: spawn backend, unbounded wait,
//! diagnostics on standard error.

use crate::diagnostics::{DiagnosticSink, StderrSink, TracingSink};
use crate::launch::LaunchBackend;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub mod validation;

/// Where an executor built from config sends diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticsTarget {
    #[default]
    Stderr,
    Tracing,
}

impl DiagnosticsTarget {
    pub fn sink(&self) -> Arc<dyn DiagnosticSink> {
        match self {
            DiagnosticsTarget::Stderr => Arc::new(StderrSink),
            DiagnosticsTarget::Tracing => Arc::new(TracingSink),
        }
    }
}

/// Executor options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub backend: LaunchBackend,

    /// Deadline for the child; `None` waits forever.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_duration_serde"
    )]
    pub wait_timeout: Option<Duration>,

    #[serde(default = "default_kill_grace_period", with = "duration_serde")]
    pub kill_grace_period: Duration,

    #[serde(default)]
    pub diagnostics: DiagnosticsTarget,
}

fn default_kill_grace_period() -> Duration {
    Duration::from_secs(2)
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            backend: LaunchBackend::default(),
            wait_timeout: None,
            kill_grace_period: default_kill_grace_period(),
            diagnostics: DiagnosticsTarget::default(),
        }
    }
}

impl ExecutorConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: ExecutorConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    pub fn with_backend(mut self, backend: LaunchBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub fn with_kill_grace_period(mut self, grace: Duration) -> Self {
        self.kill_grace_period = grace;
        self
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn format_duration(duration: &Duration) -> String {
        if duration.subsec_millis() == 0 {
            format!("{}s", duration.as_secs())
        } else {
            format!("{}ms", duration.as_millis())
        }
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        // "ms" before "s" since "ms" ends with 's'
        if let Some(num) = s.strip_suffix("ms") {
            let millis: u64 = num.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_millis(millis))
        } else if let Some(num) = s.strip_suffix('s') {
            let secs: u64 = num.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else if let Some(num) = s.strip_suffix('m') {
            let mins: u64 = num.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            let secs = mins
                .checked_mul(60)
                .ok_or_else(|| format!("Duration out of range: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else {
            Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
        }
    }
}

mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&super::duration_serde::format_duration(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| super::duration_serde::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
