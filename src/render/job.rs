/*!
 * Rendering job records and their state machine.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::RenderError;

/// Identifier of a rendering job; also the stem of its workspace files
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a caller-supplied identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Identifier derived from the source content, so resubmitting identical
    /// source maps onto the same workspace files
    pub fn for_source(source: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        Self(digest[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is usable as a file stem and tool argument
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !self.0.starts_with('.')
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle state of a job.
///
/// Transitions only move forward:
/// `Queued -> SourceWritten -> Typesetting -> Completed | Failed`,
/// plus `Queued -> Failed` when the source cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    SourceWritten,
    Typesetting,
    Completed,
    Failed,
}

impl JobState {
    /// Completed or Failed
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::SourceWritten)
                | (Self::Queued, Self::Failed)
                | (Self::SourceWritten, Self::Typesetting)
                | (Self::Typesetting, Self::Completed)
                | (Self::Typesetting, Self::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Queued => "queued",
            Self::SourceWritten => "source_written",
            Self::Typesetting => "typesetting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// One recorded state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub state: JobState,
    pub at: DateTime<Utc>,
}

/// Output of a completed job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub job_id: JobId,
    pub path: PathBuf,
}

impl Artifact {
    /// Artifact location for a job inside a workspace
    pub fn for_job(workspace_root: &Path, job_id: &JobId) -> Self {
        Self {
            job_id: job_id.clone(),
            path: workspace_root.join(format!("{}.pdf", job_id)),
        }
    }

    /// Whether the file has been produced
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Failure summary kept on the job record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    /// Stage that failed (`source_write`, `typesetting`, ...)
    pub stage: String,
    /// Error message
    pub message: String,
    /// Captured tool output, when the tool ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl From<&RenderError> for FailureDetail {
    fn from(error: &RenderError) -> Self {
        Self {
            stage: error.stage().to_string(),
            message: error.to_string(),
            output: error.output().map(str::to_string),
        }
    }
}

/// Final outcome of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Artifact(Artifact),
    Failure(FailureDetail),
}

/// A rendering job as tracked by the runner
#[derive(Debug, Clone, Serialize)]
pub struct RenderJob {
    id: JobId,
    #[serde(skip)]
    source: String,
    source_path: PathBuf,
    state: JobState,
    history: Vec<Transition>,
    outcome: Option<JobOutcome>,
}

impl RenderJob {
    /// New job in `Queued` state
    pub fn new(id: JobId, source: String, source_path: PathBuf) -> Self {
        Self {
            id,
            source,
            source_path,
            state: JobState::Queued,
            history: vec![Transition {
                state: JobState::Queued,
                at: Utc::now(),
            }],
            outcome: None,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Typesetting source owned by the job
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Where the source is written
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Ordered list of states the job has been in
    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Result, once terminal
    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.outcome.as_ref()
    }

    /// Artifact of a completed job
    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.outcome {
            Some(JobOutcome::Artifact(artifact)) => Some(artifact),
            _ => None,
        }
    }

    /// Failure detail of a failed job
    pub fn failure(&self) -> Option<&FailureDetail> {
        match &self.outcome {
            Some(JobOutcome::Failure(detail)) => Some(detail),
            _ => None,
        }
    }

    /// Move to the next state; illegal moves are rejected
    pub(crate) fn transition(&mut self, next: JobState) -> Result<(), RenderError> {
        if !self.state.can_transition_to(next) {
            return Err(RenderError::InvalidState {
                job_id: self.id.to_string(),
                state: self.state.to_string(),
                expected: format!("a state preceding {}", next),
            });
        }
        self.state = next;
        self.history.push(Transition {
            state: next,
            at: Utc::now(),
        });
        Ok(())
    }

    pub(crate) fn complete(&mut self, artifact: Artifact) -> Result<(), RenderError> {
        self.transition(JobState::Completed)?;
        self.outcome = Some(JobOutcome::Artifact(artifact));
        Ok(())
    }

    pub(crate) fn fail(&mut self, error: &RenderError) -> Result<(), RenderError> {
        self.transition(JobState::Failed)?;
        self.outcome = Some(JobOutcome::Failure(FailureDetail::from(error)));
        Ok(())
    }
}
