//! Request and response framing
//!
//! A request arrives as one JSON object on stdin; exactly one JSON object is
//! written to stdout in response.

pub mod run;

use serde::{Deserialize, Serialize};

use crate::common::{Timeout, TimeoutParseError};
use crate::executer::RunOutcome;
use crate::runner::RunReport;

/// Decoded request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunJob {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub files: Vec<JobFile>,
    /// Raw stdin; when non-empty it replaces `test_cases`
    #[serde(default)]
    pub stdin: String,
    /// Shell command run instead of the language runner
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub test_cases: Option<Vec<String>>,
    /// Duration string, "0" or empty for no limit
    #[serde(default)]
    pub timeout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFile {
    /// Path relative to the workspace root
    pub name: String,
    pub content: String,
}

impl RunJob {
    /// Decode the first JSON value of `input`; anything after it is ignored
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        let mut de = serde_json::Deserializer::from_str(input);
        Self::deserialize(&mut de)
    }

    /// Inputs to run, one execution each. Never empty.
    pub fn effective_test_cases(&self) -> Vec<String> {
        if !self.stdin.is_empty() {
            return vec![self.stdin.clone()];
        }
        match &self.test_cases {
            Some(cases) if !cases.is_empty() => cases.clone(),
            _ => vec![String::new()],
        }
    }

    pub fn effective_timeout(&self) -> Result<Timeout, TimeoutParseError> {
        if self.timeout.is_empty() {
            return Ok(Timeout::UNLIMITED);
        }
        self.timeout.parse()
    }

    pub fn has_command(&self) -> bool {
        !self.command.is_empty()
    }
}

/// Response of the raw-command path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub stdout: String,
    pub stderr: String,
    pub error: String,
}

impl From<RunOutcome> for JobResult {
    fn from(outcome: RunOutcome) -> Self {
        Self {
            error: outcome.error.map(|e| e.to_string()).unwrap_or_default(),
            stdout: outcome.stdout,
            stderr: outcome.stderr,
        }
    }
}

/// Response of the language path; `stdout` and `stderr` are parallel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResultList {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub error: String,
}

impl From<RunReport> for JobResultList {
    fn from(report: RunReport) -> Self {
        Self {
            stdout: report.stdout(),
            stderr: report.stderr(),
            error: report.error().map(|e| e.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum JobOutput {
    Single(JobResult),
    List(JobResultList),
}

impl JobOutput {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
