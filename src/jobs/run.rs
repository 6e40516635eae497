//! Request pipeline: validate, stage, normalize, dispatch, encode.
//!
//! Only request-shape and staging problems surface as [`JobError`]. Anything
//! that goes wrong while building or running the program is carried in the
//! returned [`JobOutput`].

use tracing::{info, warn};

use super::{JobOutput, RunJob};
use crate::config::RunnerConfig;
use crate::error::JobError;
use crate::executer;
use crate::languages::LanguageRegistry;
use crate::workspace::Workspace;

/// Decode a JSON request and process it
pub async fn handle_request(
    input: &str,
    registry: &LanguageRegistry,
    config: &RunnerConfig,
) -> Result<JobOutput, JobError> {
    let job = RunJob::from_json(input)?;
    process_run_job(&job, registry, config).await
}

pub async fn process_run_job(
    job: &RunJob,
    registry: &LanguageRegistry,
    config: &RunnerConfig,
) -> Result<JobOutput, JobError> {
    if job.files.is_empty() {
        return Err(JobError::NoFiles);
    }

    // A raw command never reaches the registry, so the language is irrelevant
    if !job.has_command() && !registry.is_supported(&job.language) {
        return Err(JobError::UnsupportedLanguage(job.language.clone()));
    }

    let timeout = job.effective_timeout()?;

    let workspace = Workspace::stage(
        &job.files,
        config.workspace_root.as_deref(),
        config.keep_workspace,
    )?;

    if job.has_command() {
        info!(
            files = job.files.len(),
            timeout = %timeout,
            "Running raw command"
        );

        let outcome =
            executer::run_bash_stdin(&workspace.work_dir(), &job.command, &job.stdin, timeout)
                .await;
        if let Some(error) = &outcome.error {
            warn!("Raw command failed: {}", error);
        }
        return Ok(JobOutput::Single(outcome.into()));
    }

    let test_cases = job.effective_test_cases();

    info!(
        language = %job.language,
        files = job.files.len(),
        test_cases = test_cases.len(),
        timeout = %timeout,
        "Running submission"
    );

    let report = registry
        .run(&job.language, workspace.files(), &test_cases, timeout)
        .await?;

    match report.error() {
        Some(error) => warn!(
            "Stopped after {} of {} test case(s): {}",
            report.attempts(),
            test_cases.len(),
            error
        ),
        None => info!("All {} test case(s) passed", report.attempts()),
    }

    Ok(JobOutput::List(report.into()))
}
