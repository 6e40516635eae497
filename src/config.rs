//! Runner configuration
//!
//! Read once at start-up from the environment (a `.env` file is honoured via
//! dotenvy in `main`).

use std::path::PathBuf;

use anyhow::Context;

use crate::common::Timeout;

pub const LANGUAGES_VAR: &str = "CODE_RUNNER_LANGUAGES";
pub const WORKSPACE_DIR_VAR: &str = "CODE_RUNNER_WORKSPACE_DIR";
pub const KEEP_WORKSPACE_VAR: &str = "CODE_RUNNER_KEEP_WORKSPACE";
pub const COMPILE_TIMEOUT_VAR: &str = "CODE_RUNNER_COMPILE_TIMEOUT";

#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Replacement language table; the built-in one is used when unset
    pub languages_path: Option<PathBuf>,
    /// Parent directory for workspaces (default: system temp dir)
    pub workspace_root: Option<PathBuf>,
    /// Leave workspaces on disk after the request (debugging)
    pub keep_workspace: bool,
    /// Deadline for compiler invocations (default: unlimited)
    pub compile_timeout: Timeout,
}

impl RunnerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let compile_timeout = match non_empty(COMPILE_TIMEOUT_VAR) {
            Some(raw) => raw
                .parse::<Timeout>()
                .with_context(|| format!("Invalid {}", COMPILE_TIMEOUT_VAR))?,
            None => Timeout::UNLIMITED,
        };

        Ok(Self {
            languages_path: non_empty(LANGUAGES_VAR).map(PathBuf::from),
            workspace_root: non_empty(WORKSPACE_DIR_VAR).map(PathBuf::from),
            keep_workspace: non_empty(KEEP_WORKSPACE_VAR)
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            compile_timeout,
        })
    }
}
