//! Bytecode-compiled languages
//!
//! Only the entry file is handed to the compiler, by base name, from its own
//! directory. The launcher then runs the unit named after that file with its
//! extension stripped (`Main.java` -> `java Main`).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{work_dir_of, CommandSpec, LanguageRunner};
use crate::common::Timeout;
use crate::executer::{self, ExecError, RunOutcome};

#[derive(Debug, Clone)]
pub struct BytecodeRunner {
    /// Bytecode compiler (e.g. "javac")
    compiler: String,
    compiler_flags: Vec<String>,
    /// Launcher that runs the compiled unit (e.g. "java")
    launcher: String,
    compile_timeout: Timeout,
}

impl BytecodeRunner {
    pub fn new(compiler: impl Into<String>, launcher: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
            compiler_flags: Vec::new(),
            launcher: launcher.into(),
            compile_timeout: Timeout::UNLIMITED,
        }
    }

    pub fn with_compiler_flags(
        mut self,
        flags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.compiler_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_compile_timeout(mut self, timeout: Timeout) -> Self {
        self.compile_timeout = timeout;
        self
    }
}

/// Unit name of a source file: its base name without extension
pub fn unit_name(file: &Path) -> String {
    file.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl LanguageRunner for BytecodeRunner {
    async fn build(&self, files: &[PathBuf]) -> Result<CommandSpec, RunOutcome> {
        let work_dir = work_dir_of(files);
        let Some(entry) = files.first().and_then(|f| f.file_name()) else {
            return Err(RunOutcome {
                error: Some(ExecError::Spawn {
                    program: self.compiler.clone(),
                    reason: "no entry file".to_string(),
                }),
                ..Default::default()
            });
        };
        let entry = entry.to_string_lossy().into_owned();

        let mut command = vec![self.compiler.clone()];
        command.extend(self.compiler_flags.iter().cloned());
        command.push(entry.clone());

        debug!("Compiling {} with {:?}", entry, command);

        let outcome = executer::run(&work_dir, command, self.compile_timeout).await;
        if !outcome.is_success() {
            return Err(outcome);
        }

        Ok(CommandSpec::new(self.launcher.clone(), &work_dir)
            .with_args([unit_name(Path::new(&entry))]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stand-in compiler: copies `Name.ext` to `Name`
    const FAKE_JAVAC: &str = r#"cp "$1" "${1%.*}""#;

    #[test]
    fn test_unit_name() {
        assert_eq!(unit_name(Path::new("/ws/Main.java")), "Main");
        assert_eq!(unit_name(Path::new("Solution.java")), "Solution");
        assert_eq!(unit_name(Path::new("/ws/Program")), "Program");
    }

    #[tokio::test]
    async fn test_compiles_entry_and_launches_unit() {
        let dir = tempfile::tempdir().unwrap();
        let fake_javac = dir.path().join("fake_javac.sh");
        std::fs::write(&fake_javac, FAKE_JAVAC).unwrap();
        let entry = dir.path().join("Main.sh");
        std::fs::write(&entry, "read value\necho \"value=$value\"\n").unwrap();

        let runner =
            BytecodeRunner::new("sh", "sh").with_compiler_flags([fake_javac.to_string_lossy()]);
        let runnable = runner.build(&[entry.clone()]).await.unwrap();
        assert_eq!(runnable.to_vec(), vec!["sh", "Main"]);
        assert_eq!(runnable.work_dir, dir.path());

        let report = runner
            .run(&[entry], &["1\n".to_string(), "2\n".to_string()], Timeout::UNLIMITED)
            .await;
        assert_eq!(report.stdout(), vec!["value=1\n", "value=2\n"]);
        assert_eq!(report.error(), None);
    }

    #[tokio::test]
    async fn test_failing_case_truncates_report() {
        let dir = tempfile::tempdir().unwrap();
        let fake_javac = dir.path().join("fake_javac.sh");
        std::fs::write(&fake_javac, FAKE_JAVAC).unwrap();
        let entry = dir.path().join("Main.sh");
        std::fs::write(&entry, "read value\necho \"$value\"\nexit \"$value\"\n").unwrap();

        let runner =
            BytecodeRunner::new("sh", "sh").with_compiler_flags([fake_javac.to_string_lossy()]);
        let report = runner
            .run(
                &[entry],
                &["0\n".to_string(), "7\n".to_string(), "0\n".to_string()],
                Timeout::UNLIMITED,
            )
            .await;

        assert_eq!(report.stdout(), vec!["0\n", "7\n"]);
        assert_eq!(report.error(), Some(&ExecError::ExitStatus(7)));
    }

    #[tokio::test]
    async fn test_compile_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("Main.java");
        std::fs::write(&entry, "class Main {").unwrap();

        let runner = BytecodeRunner::new("sh", "java")
            .with_compiler_flags(["-c", "echo 'Main.java:1: error' >&2; exit 1"]);
        let report = runner
            .run(&[entry], &["".to_string()], Timeout::UNLIMITED)
            .await;

        assert_eq!(report.attempts(), 1);
        assert_eq!(report.stderr(), vec!["Main.java:1: error\n"]);
        assert_eq!(report.error(), Some(&ExecError::ExitStatus(1)));
    }
}
