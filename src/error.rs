//! Error kinds for recording and comparing.
//!
//! Everything here is fatal to the operation that raised it, apart from the
//! missing-metric case during comparison, which is skipped before an error
//! is ever constructed.

use std::path::PathBuf;
use thiserror::Error;

/// Which hook of a probe was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookPhase::Before => write!(f, "before"),
            HookPhase::After => write!(f, "after"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FresnelError {
    /// A configuration, scenario, probe or report did not match its shape.
    #[error("Validation of {subject}: {message}")]
    Validation { subject: String, message: String },

    /// A probe or report name is not registered.
    #[error("Unknown {kind} name: {name}")]
    Lookup { kind: &'static str, name: String },

    #[error("Probe \"{probe}\" failed in {phase} hook")]
    Probe {
        probe: String,
        phase: HookPhase,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to load {url}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Browser session failed")]
    Browser {
        #[source]
        source: anyhow::Error,
    },

    #[error("No numeric series for {probe}.{key}")]
    MissingSeries { probe: String, key: String },

    #[error("Analysis of {report}.{metric} failed")]
    Analysis {
        report: String,
        metric: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl FresnelError {
    pub fn validation(subject: impl Into<String>, message: impl Into<String>) -> Self {
        FresnelError::Validation {
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FresnelError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FresnelError>;
