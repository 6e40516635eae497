//! Runner module - per-language build and test-case execution
//!
//! Every language implements [`LanguageRunner`]:
//! - `NativeRunner`: compiles sources into a native executable (C, C++)
//! - `BytecodeRunner`: compiles the entry file to bytecode run by a launcher (Java)
//! - `InterpretedRunner`: hands the entry file to an interpreter (Python)
//!
//! The build step differs per variant; running the test cases does not, and
//! lives in [`execute_all`].
//!
//! The runner module does NOT:
//! - Decode requests or stage files
//! - Compare outputs against expectations

pub mod bytecode;
pub mod interpreted;
pub mod native;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::common::Timeout;
use crate::executer::{self, ExecError, RunOutcome};

/// A program invocation in a fixed working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
    /// Working directory
    pub work_dir: PathBuf,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, work_dir: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    /// Convert to a vector of strings (program + args)
    pub fn to_vec(&self) -> Vec<String> {
        let mut v = vec![self.program.clone()];
        v.extend(self.args.clone());
        v
    }
}

/// Outcomes of one runner call, one per attempted test case
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<RunOutcome>,
}

impl RunReport {
    /// A build failure is reported as a single outcome carrying the
    /// compiler's output
    pub fn build_failed(outcome: RunOutcome) -> Self {
        Self {
            outcomes: vec![outcome],
        }
    }

    /// Error of the last attempted run; only the last one can have failed
    pub fn error(&self) -> Option<&ExecError> {
        self.outcomes.last().and_then(|outcome| outcome.error.as_ref())
    }

    pub fn attempts(&self) -> usize {
        self.outcomes.len()
    }

    pub fn stdout(&self) -> Vec<String> {
        self.outcomes.iter().map(|o| o.stdout.clone()).collect()
    }

    pub fn stderr(&self) -> Vec<String> {
        self.outcomes.iter().map(|o| o.stderr.clone()).collect()
    }
}

/// Directory the build and every run happen in: the first file's directory
pub fn work_dir_of(files: &[PathBuf]) -> PathBuf {
    files
        .first()
        .and_then(|file| file.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Build-and-run contract shared by every language
#[async_trait]
pub trait LanguageRunner: Send + Sync + std::fmt::Debug {
    /// Prepare the program. On failure, the compiler's captured output and
    /// error come back as the single outcome of the report.
    async fn build(&self, files: &[PathBuf]) -> Result<CommandSpec, RunOutcome>;

    async fn run(&self, files: &[PathBuf], test_cases: &[String], timeout: Timeout) -> RunReport {
        match self.build(files).await {
            Ok(runnable) => execute_all(&runnable, test_cases, timeout).await,
            Err(outcome) => {
                info!(
                    error = ?outcome.error,
                    "Build failed, skipping {} test case(s)",
                    test_cases.len()
                );
                RunReport::build_failed(outcome)
            }
        }
    }
}

/// Run `runnable` once per test case, in order, stopping after the first
/// failing case. Only attempted cases are reported.
pub async fn execute_all(
    runnable: &CommandSpec,
    test_cases: &[String],
    timeout: Timeout,
) -> RunReport {
    let command = runnable.to_vec();
    let mut outcomes = Vec::with_capacity(test_cases.len());

    for (idx, input) in test_cases.iter().enumerate() {
        let outcome =
            executer::run_stdin(&runnable.work_dir, input, command.clone(), timeout).await;
        let failed = !outcome.is_success();
        outcomes.push(outcome);

        if failed {
            debug!(
                "Test case {} failed, skipping {} remaining",
                idx,
                test_cases.len() - idx - 1
            );
            break;
        }
    }

    RunReport { outcomes }
}

pub use bytecode::BytecodeRunner;
pub use interpreted::InterpretedRunner;
pub use native::NativeRunner;

#[cfg(test)]
mod tests {
    use super::*;

    fn cases(inputs: &[&str]) -> Vec<String> {
        inputs.iter().map(|s| s.to_string()).collect()
    }

    /// Echoes its input and fails on the line "fail"
    fn picky_echo(work_dir: &Path) -> CommandSpec {
        CommandSpec::new("sh", work_dir).with_args([
            "-c",
            "read line; echo \"$line\"; echo \"seen $line\" >&2; [ \"$line\" != fail ]",
        ])
    }

    #[tokio::test]
    async fn test_all_cases_pass() {
        let dir = tempfile::tempdir().unwrap();
        let report = execute_all(
            &picky_echo(dir.path()),
            &cases(&["a\n", "b\n", "c\n"]),
            Timeout::UNLIMITED,
        )
        .await;

        assert_eq!(report.attempts(), 3);
        assert_eq!(report.stdout(), vec!["a\n", "b\n", "c\n"]);
        assert_eq!(report.stderr(), vec!["seen a\n", "seen b\n", "seen c\n"]);
        assert_eq!(report.error(), None);
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let report = execute_all(
            &picky_echo(dir.path()),
            &cases(&["a\n", "fail\n", "c\n", "d\n"]),
            Timeout::UNLIMITED,
        )
        .await;

        assert_eq!(report.attempts(), 2);
        assert_eq!(report.stdout(), vec!["a\n", "fail\n"]);
        assert_eq!(report.stderr(), vec!["seen a\n", "seen fail\n"]);
        assert_eq!(report.error(), Some(&ExecError::ExitStatus(1)));
    }

    #[tokio::test]
    async fn test_first_case_failure() {
        let dir = tempfile::tempdir().unwrap();
        let report = execute_all(
            &picky_echo(dir.path()),
            &cases(&["fail\n", "b\n"]),
            Timeout::UNLIMITED,
        )
        .await;

        assert_eq!(report.attempts(), 1);
        assert!(report.error().is_some());
    }

    #[tokio::test]
    async fn test_timeout_stops_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let runnable = CommandSpec::new("sh", dir.path()).with_args(["-c", "read n; sleep $n"]);
        let timeout: Timeout = "0.3".parse().unwrap();

        let report = execute_all(&runnable, &cases(&["0\n", "5\n", "0\n"]), timeout).await;

        assert_eq!(report.attempts(), 2);
        assert_eq!(report.error(), Some(&ExecError::ExitStatus(124)));
    }

    #[derive(Debug)]
    struct BrokenCompiler;

    #[async_trait]
    impl LanguageRunner for BrokenCompiler {
        async fn build(&self, _files: &[PathBuf]) -> Result<CommandSpec, RunOutcome> {
            Err(RunOutcome {
                stdout: String::new(),
                stderr: "main.c:1: error: expected ';'\n".to_string(),
                error: Some(ExecError::ExitStatus(1)),
            })
        }
    }

    #[tokio::test]
    async fn test_build_failure_is_single_outcome() {
        let report = BrokenCompiler
            .run(
                &[PathBuf::from("/ws/main.c")],
                &cases(&["1", "2", "3"]),
                Timeout::UNLIMITED,
            )
            .await;

        assert_eq!(report.attempts(), 1);
        assert_eq!(report.stderr(), vec!["main.c:1: error: expected ';'\n"]);
        assert_eq!(report.error(), Some(&ExecError::ExitStatus(1)));
    }

    #[test]
    fn test_work_dir_of_first_file() {
        let files = vec![
            PathBuf::from("/ws/src/Main.java"),
            PathBuf::from("/ws/lib/Util.java"),
        ];
        assert_eq!(work_dir_of(&files), PathBuf::from("/ws/src"));
    }

    #[test]
    fn test_command_spec_to_vec() {
        let spec = CommandSpec::new("java", "/ws").with_args(["Main"]);
        assert_eq!(spec.to_vec(), vec!["java", "Main"]);
        assert_eq!(spec.work_dir, PathBuf::from("/ws"));
    }
}
