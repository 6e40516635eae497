//! Interpreted languages: no build step, the entry file goes to the interpreter

use std::path::PathBuf;

use async_trait::async_trait;

use super::{work_dir_of, CommandSpec, LanguageRunner};
use crate::executer::{ExecError, RunOutcome};

#[derive(Debug, Clone)]
pub struct InterpretedRunner {
    /// Interpreter executable (e.g. "python3")
    interpreter: String,
}

impl InterpretedRunner {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

#[async_trait]
impl LanguageRunner for InterpretedRunner {
    async fn build(&self, files: &[PathBuf]) -> Result<CommandSpec, RunOutcome> {
        let Some(entry) = files.first() else {
            return Err(RunOutcome {
                error: Some(ExecError::Spawn {
                    program: self.interpreter.clone(),
                    reason: "no entry file".to_string(),
                }),
                ..Default::default()
            });
        };

        Ok(CommandSpec::new(self.interpreter.clone(), work_dir_of(files))
            .with_args([entry.to_string_lossy()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Timeout;

    #[tokio::test]
    async fn test_entry_file_goes_to_interpreter() {
        let files = vec![
            PathBuf::from("/ws/app/main.py"),
            PathBuf::from("/ws/app/helpers.py"),
        ];
        let runnable = InterpretedRunner::new("python3").build(&files).await.unwrap();

        assert_eq!(runnable.to_vec(), vec!["python3", "/ws/app/main.py"]);
        assert_eq!(runnable.work_dir, PathBuf::from("/ws/app"));
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("echo.sh");
        std::fs::write(&script, "cat\n").unwrap();

        let report = InterpretedRunner::new("sh")
            .run(
                &[script],
                &["round trip\n".to_string(), String::new()],
                Timeout::UNLIMITED,
            )
            .await;

        assert_eq!(report.stdout(), vec!["round trip\n", ""]);
        assert_eq!(report.error(), None);
    }

    #[tokio::test]
    async fn test_missing_interpreter_fails_first_case() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("main.py");
        std::fs::write(&script, "print(input())\n").unwrap();

        let report = InterpretedRunner::new("no-such-interpreter-xyz")
            .run(
                &[script],
                &["a".to_string(), "b".to_string()],
                Timeout::UNLIMITED,
            )
            .await;

        assert_eq!(report.attempts(), 1);
        assert!(matches!(report.error(), Some(ExecError::Spawn { .. })));
    }
}
