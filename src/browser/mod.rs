//! Browser session provider.
//!
//! The recorder only talks to these traits. [`chrome::ChromeLauncher`] is the
//! production implementation; tests substitute an in-memory browser.

pub mod chrome;

use crate::models::Viewport;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

pub use chrome::ChromeLauncher;

/// Options for starting the browser process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchOptions {
    /// Extra command-line flags for the browser binary.
    pub args: Vec<String>,
}

impl LaunchOptions {
    /// Build options from a whitespace-separated flag string,
    /// e.g. the value of `CHROMIUM_FLAGS`.
    pub fn from_flags(flags: Option<&str>) -> Self {
        Self {
            args: flags
                .map(|f| f.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
        }
    }
}

/// Starts a browser.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> anyhow::Result<Box<dyn Browser>>;
}

/// A running browser process.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a browsing context that shares no cookies, storage or cache
    /// with any other session.
    async fn new_session(&self) -> anyhow::Result<Box<dyn Session>>;

    /// Shut the browser down. Called once per recording.
    async fn close(&mut self) -> anyhow::Result<()>;
}

/// An isolated browsing context.
#[async_trait]
pub trait Session: Send + Sync {
    async fn new_page(&self) -> anyhow::Result<Box<dyn Page>>;

    async fn close(&self) -> anyhow::Result<()>;
}

/// A browser tab.
#[async_trait]
pub trait Page: Send + Sync {
    async fn set_viewport(&self, viewport: Viewport) -> anyhow::Result<()>;

    /// Load a URL and wait for the navigation to finish.
    async fn goto(&self, url: &str) -> anyhow::Result<()>;

    /// Evaluate a script expression in the page and return its JSON result.
    async fn evaluate(&self, script: &str) -> anyhow::Result<Value>;

    /// Save a PNG of the current viewport.
    async fn screenshot(&self, path: &Path) -> anyhow::Result<()>;

    /// Start recording a performance trace.
    async fn start_tracing(&self) -> anyhow::Result<()>;

    /// Stop the trace and write it to `path` in the DevTools trace format.
    async fn stop_tracing(&self, path: &Path) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_from_flags() {
        let options = LaunchOptions::from_flags(Some("--no-sandbox  --disable-gpu"));
        assert_eq!(options.args, vec!["--no-sandbox", "--disable-gpu"]);
        assert!(LaunchOptions::from_flags(None).args.is_empty());
        assert!(LaunchOptions::from_flags(Some("   ")).args.is_empty());
    }
}
