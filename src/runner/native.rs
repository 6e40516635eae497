//! Native-compiled languages
//!
//! Every staged file with the language's source extension is compiled into a
//! single `a.out` next to the entry file, which is then executed directly.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{work_dir_of, CommandSpec, LanguageRunner};
use crate::common::utils::filter_by_extension;
use crate::common::Timeout;
use crate::executer::{self, RunOutcome};

/// Name of the executable produced in the working directory
pub const BINARY_NAME: &str = "a.out";

#[derive(Debug, Clone)]
pub struct NativeRunner {
    /// Compiler executable (e.g. "gcc")
    compiler: String,
    /// Source extension without the dot (e.g. "c")
    extension: String,
    /// Placed before `-o`
    flags: Vec<String>,
    /// Placed after the sources, where the linker expects libraries
    libs: Vec<String>,
    compile_timeout: Timeout,
}

impl NativeRunner {
    pub fn new(compiler: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
            extension: extension.into(),
            flags: Vec::new(),
            libs: Vec::new(),
            compile_timeout: Timeout::UNLIMITED,
        }
    }

    pub fn with_flags(mut self, flags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_libs(mut self, libs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.libs = libs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_compile_timeout(mut self, timeout: Timeout) -> Self {
        self.compile_timeout = timeout;
        self
    }

    fn compile_command(&self, sources: &[PathBuf]) -> Vec<String> {
        let mut command = vec![self.compiler.clone()];
        command.extend(self.flags.iter().cloned());
        command.push("-o".to_string());
        command.push(BINARY_NAME.to_string());
        command.extend(sources.iter().map(|s| s.to_string_lossy().into_owned()));
        command.extend(self.libs.iter().cloned());
        command
    }
}

#[async_trait]
impl LanguageRunner for NativeRunner {
    async fn build(&self, files: &[PathBuf]) -> Result<CommandSpec, RunOutcome> {
        let work_dir = work_dir_of(files);
        let sources = filter_by_extension(files, &self.extension);
        let command = self.compile_command(&sources);

        debug!("Compiling {} source(s) with {:?}", sources.len(), command);

        let outcome = executer::run(&work_dir, command, self.compile_timeout).await;
        if !outcome.is_success() {
            return Err(outcome);
        }

        let binary = work_dir.join(BINARY_NAME);
        Ok(CommandSpec::new(binary.to_string_lossy(), &work_dir))
    }
}
