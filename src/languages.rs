//! Language table and registry
//!
//! The registry maps a case-sensitive language identifier to its runner. It is
//! built once at start-up from a TOML table (the embedded
//! `files/languages.toml` unless a replacement path is configured) and then
//! only read.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::common::Timeout;
use crate::error::JobError;
use crate::runner::{BytecodeRunner, InterpretedRunner, LanguageRunner, NativeRunner, RunReport};

const BUILTIN_LANGUAGES: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));

/// Raw TOML entry for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    #[serde(flatten)]
    kind: RawLanguageKind,
    #[serde(default)]
    aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawLanguageKind {
    Native {
        compiler: String,
        extension: String,
        #[serde(default)]
        flags: Vec<String>,
        #[serde(default)]
        libs: Vec<String>,
    },
    Bytecode {
        compiler: String,
        launcher: String,
        #[serde(default)]
        compiler_flags: Vec<String>,
    },
    Interpreted {
        interpreter: String,
    },
}

impl RawLanguageKind {
    fn into_runner(self, compile_timeout: Timeout) -> Arc<dyn LanguageRunner> {
        match self {
            RawLanguageKind::Native {
                compiler,
                extension,
                flags,
                libs,
            } => Arc::new(
                NativeRunner::new(compiler, extension)
                    .with_flags(flags)
                    .with_libs(libs)
                    .with_compile_timeout(compile_timeout),
            ),
            RawLanguageKind::Bytecode {
                compiler,
                launcher,
                compiler_flags,
            } => Arc::new(
                BytecodeRunner::new(compiler, launcher)
                    .with_compiler_flags(compiler_flags)
                    .with_compile_timeout(compile_timeout),
            ),
            RawLanguageKind::Interpreted { interpreter } => {
                Arc::new(InterpretedRunner::new(interpreter))
            }
        }
    }
}

/// Immutable mapping from language identifier to runner
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    runners: BTreeMap<String, Arc<dyn LanguageRunner>>,
}

impl LanguageRegistry {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `runner` under `id`, replacing any previous entry
    #[allow(dead_code)]
    pub fn with_runner(mut self, id: impl Into<String>, runner: Arc<dyn LanguageRunner>) -> Self {
        self.runners.insert(id.into(), runner);
        self
    }

    /// Registry for the built-in language table
    pub fn builtin(compile_timeout: Timeout) -> anyhow::Result<Self> {
        Self::from_toml(BUILTIN_LANGUAGES, compile_timeout)
    }

    /// Load from `path`, or fall back to the built-in table
    pub fn load(path: Option<&Path>, compile_timeout: Timeout) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read language table {}", path.display()))?;
                Self::from_toml(&content, compile_timeout)
                    .with_context(|| format!("Invalid language table {}", path.display()))
            }
            None => Self::builtin(compile_timeout),
        }
    }

    pub fn from_toml(content: &str, compile_timeout: Timeout) -> anyhow::Result<Self> {
        let raw_configs: HashMap<String, RawLanguageConfig> = toml::from_str(content)?;
        let mut runners: BTreeMap<String, Arc<dyn LanguageRunner>> = BTreeMap::new();

        for (name, raw) in raw_configs {
            let runner = raw.kind.into_runner(compile_timeout);

            for id in std::iter::once(name.clone()).chain(raw.aliases) {
                if runners.insert(id.clone(), runner.clone()).is_some() {
                    anyhow::bail!("Language identifier '{}' is defined more than once", id);
                }
                debug!("Registered language '{}' ({})", id, name);
            }
        }

        Ok(Self { runners })
    }

    pub fn is_supported(&self, language: &str) -> bool {
        self.runners.contains_key(language)
    }

    pub fn get(&self, language: &str) -> Option<&Arc<dyn LanguageRunner>> {
        self.runners.get(language)
    }

    /// All registered identifiers, sorted
    pub fn languages(&self) -> Vec<&str> {
        self.runners.keys().map(String::as_str).collect()
    }

    /// Build and run with the runner registered for `language`
    pub async fn run(
        &self,
        language: &str,
        files: &[PathBuf],
        test_cases: &[String],
        timeout: Timeout,
    ) -> Result<RunReport, JobError> {
        let runner = self
            .get(language)
            .ok_or_else(|| JobError::UnsupportedLanguage(language.to_string()))?;
        Ok(runner.run(files, test_cases, timeout).await)
    }
}
