//! Process execution primitive
//!
//! Runs one child process to completion in a working directory, optionally
//! feeding it a stdin string, and captures stdout/stderr. When a deadline is
//! set, the child's whole process group is killed on expiry and the run is
//! reported the way the GNU `timeout` wrapper reports it (`exit status 124`).
//!
//! This module does NOT:
//! - Know about languages or compilation
//! - Decide whether later test cases run

use std::future::Future;
use std::io;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::common::timeout::{Timeout, TIMEOUT_EXIT_CODE};

/// How long pipes may stay open after the group was killed
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Why a process run did not succeed
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Non-zero exit, including a deadline kill (124)
    #[error("exit status {0}")]
    ExitStatus(i32),
    /// Terminated by a signal it did not handle
    #[error("signal: {0}")]
    Signal(String),
    #[error("failed to start \"{program}\": {reason}")]
    Spawn { program: String, reason: String },
    #[error("i/o error while running \"{program}\": {reason}")]
    Io { program: String, reason: String },
}

impl ExecError {
    fn from_status(status: ExitStatus) -> Option<Self> {
        if status.success() {
            return None;
        }
        if let Some(code) = status.code() {
            return Some(ExecError::ExitStatus(code));
        }

        let name = match status.signal() {
            Some(raw) => Signal::try_from(raw)
                .map(|signal| signal.to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => "unknown".to_string(),
        };
        Some(ExecError::Signal(name))
    }

    fn io(program: &str, err: &io::Error) -> Self {
        ExecError::Io {
            program: program.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Captured result of one process run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process exited with status 0
    pub error: Option<ExecError>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    fn failed(error: ExecError) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionSpec {
    pub work_dir: PathBuf,
    /// Program followed by its arguments
    pub command: Vec<String>,
    /// Piped to the child when set; stdin is `/dev/null` otherwise
    pub stdin: Option<String>,
    pub timeout: Timeout,
}

impl ExecutionSpec {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            command: vec![],
            stdin: None,
            timeout: Timeout::UNLIMITED,
        }
    }

    pub fn with_command(mut self, command: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Run a command with stdin closed
pub async fn run(
    work_dir: &Path,
    command: impl IntoIterator<Item = impl Into<String>>,
    timeout: Timeout,
) -> RunOutcome {
    let spec = ExecutionSpec::new(work_dir)
        .with_command(command)
        .with_timeout(timeout);
    execute(&spec).await
}

/// Run a command, writing `input` to its stdin
pub async fn run_stdin(
    work_dir: &Path,
    input: &str,
    command: impl IntoIterator<Item = impl Into<String>>,
    timeout: Timeout,
) -> RunOutcome {
    let spec = ExecutionSpec::new(work_dir)
        .with_command(command)
        .with_stdin(input)
        .with_timeout(timeout);
    execute(&spec).await
}

/// Run a command line through `bash -c`, writing `input` to its stdin
pub async fn run_bash_stdin(
    work_dir: &Path,
    command_line: &str,
    input: &str,
    timeout: Timeout,
) -> RunOutcome {
    run_stdin(work_dir, input, ["bash", "-c", command_line], timeout).await
}

pub async fn execute(spec: &ExecutionSpec) -> RunOutcome {
    let Some((program, args)) = spec.command.split_first() else {
        return RunOutcome::failed(ExecError::Spawn {
            program: String::new(),
            reason: "no command specified".to_string(),
        });
    };

    debug!(
        work_dir = ?spec.work_dir,
        command = ?spec.command,
        timeout = %spec.timeout,
        "Executing"
    );

    let mut std_cmd = std::process::Command::new(program);
    std_cmd
        .args(args)
        .current_dir(&spec.work_dir)
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // own process group, so a deadline kill reaches grandchildren too
        .process_group(0);

    let mut cmd = Command::from(std_cmd);
    cmd.kill_on_drop(true);

    // Measured from spawn; covers the wait and the pipe drains alike
    let deadline = spec.timeout.limit().map(|limit| Instant::now() + limit);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            debug!("Failed to spawn {:?}: {}", program, e);
            return RunOutcome::failed(ExecError::Spawn {
                program: program.clone(),
                reason: e.to_string(),
            });
        }
    };

    let group = child.id().map(|id| Pid::from_raw(id as i32));

    // Stdin is written and the pipes are drained on their own tasks so a
    // child that ignores its input or floods its output cannot stall the wait.
    let mut stdin_task = match (child.stdin.take(), spec.stdin.clone()) {
        (Some(mut pipe), Some(input)) => Some(tokio::spawn(async move {
            match pipe.write_all(input.as_bytes()).await {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        })),
        _ => None,
    };
    let mut stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let mut stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let mut timed_out = false;
    let waited = match until(deadline, child.wait()).await {
        Some(status) => status,
        None => {
            timed_out = true;
            warn!("Deadline of {} exceeded, killing process group", spec.timeout);
            if !kill_process_group(group) {
                let _ = child.start_kill();
            }
            child.wait().await
        }
    };

    // Whatever is left of the group would keep the pipes open
    kill_process_group(group);

    // The group is dead after a deadline kill, so its pipes get only a short grace
    let drain_deadline = if timed_out {
        Some(Instant::now() + DRAIN_GRACE)
    } else {
        deadline
    };

    let (stdout, stdout_err) = match join_before(&mut stdout_task, drain_deadline).await {
        Some(output) => split(output),
        None => {
            timed_out = true;
            (String::new(), None)
        }
    };
    let (stderr, stderr_err) = match join_before(&mut stderr_task, drain_deadline).await {
        Some(output) => split(output),
        None => {
            timed_out = true;
            (String::new(), None)
        }
    };
    let stdin_err = match stdin_task.as_mut() {
        Some(task) => match join_before(task, drain_deadline).await {
            Some(written) => written.err(),
            None => {
                timed_out = true;
                None
            }
        },
        None => None,
    };

    let error = match waited {
        Err(e) => Some(ExecError::io(program, &e)),
        Ok(_) if timed_out => Some(ExecError::ExitStatus(TIMEOUT_EXIT_CODE)),
        Ok(status) => ExecError::from_status(status),
    }
    .or_else(|| {
        stdout_err
            .or(stderr_err)
            .or(stdin_err)
            .map(|e| ExecError::io(program, &e))
    });

    debug!(program = %program, error = ?error, "Execution finished");

    RunOutcome {
        stdout,
        stderr,
        error,
    }
}

/// Await `future` until `deadline`; `None` once the deadline has passed
async fn until<F: Future>(deadline: Option<Instant>, future: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future).await.ok(),
        None => Some(future.await),
    }
}

/// Join a pipe task before `deadline`, aborting it once the deadline has passed
async fn join_before<T>(
    task: &mut JoinHandle<io::Result<T>>,
    deadline: Option<Instant>,
) -> Option<io::Result<T>> {
    let joined = until(deadline, &mut *task).await;
    if joined.is_none() {
        task.abort();
    }
    joined.map(flatten)
}

fn kill_process_group(group: Option<Pid>) -> bool {
    let Some(pid) = group else {
        return false;
    };
    match killpg(pid, Signal::SIGKILL) {
        Ok(()) => true,
        // group already empty
        Err(Errno::ESRCH) => false,
        Err(errno) => {
            debug!("killpg({}) failed: {}", pid, errno);
            false
        }
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn split(output: io::Result<String>) -> (String, Option<io::Error>) {
    match output {
        Ok(output) => (output, None),
        Err(e) => (String::new(), Some(e)),
    }
}

fn flatten<T>(joined: Result<io::Result<T>, tokio::task::JoinError>) -> io::Result<T> {
    joined.map_err(io::Error::other)?
}
