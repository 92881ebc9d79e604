/*!
 * Error types for the ldom-render library.
 *
 * This module contains custom error types for the different layers of the
 * rendering subsystem, using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building or querying a document model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Neither the requested language nor the default language is present
    #[error("Element '{element}' has no text for language '{language}' and no default variant")]
    MissingVariant {
        /// Identifier of the queried element
        element: String,
        /// Language that was requested
        language: String,
    },

    /// Two elements share the same identifier
    #[error("Duplicate element identifier: {0}")]
    DuplicateId(String),

    /// An identifier does not resolve to an element of the document
    #[error("Unknown element: {0}")]
    UnknownElement(String),

    /// The structured JSON form could not be read
    #[error("Invalid document JSON: {0}")]
    InvalidJson(String),
}

/// Errors that can occur while running a transformation adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Source markup was absent, unparseable, or had no content blocks
    #[error("Empty source: {0}")]
    EmptySource(String),

    /// Error from the document model
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Error reading a batch input
    #[error("Input error: {0}")]
    Input(String),
}

/// Errors that can occur while running a rendering job
#[derive(Error, Debug)]
pub enum RenderError {
    /// The source file or build script could not be written
    #[error("Workspace I/O error for job {job_id} at {path:?}: {source}")]
    WorkspaceIo {
        /// Job being written
        job_id: String,
        /// File that failed
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The typesetting tool could not be started or its output read
    #[error("Failed to launch typesetting tool {tool:?} for job {job_id}: {message}")]
    ProcessLaunch {
        /// Job being typeset
        job_id: String,
        /// Tool that was invoked
        tool: PathBuf,
        /// Launch failure description
        message: String,
        /// Output captured before the failure, empty when the tool never started
        output: String,
    },

    /// The typesetting tool exited unsuccessfully
    #[error("Typesetting failed for job {job_id} (exit {exit_code:?}): {output}")]
    NonZeroExit {
        /// Job being typeset
        job_id: String,
        /// Exit code, absent when the process was killed by a signal
        exit_code: Option<i32>,
        /// Combined standard output and standard error
        output: String,
    },

    /// The typesetting tool did not exit within the configured bound
    #[error("Typesetting timed out for job {job_id} after {timeout:?}")]
    Timeout {
        /// Job being typeset
        job_id: String,
        /// Configured upper bound
        timeout: Duration,
        /// Output the tool produced before it was stopped
        output: String,
    },

    /// A live job already uses this identifier
    #[error("Job {0} is already registered")]
    DuplicateJob(String),

    /// The identifier cannot be used as a workspace file stem
    #[error("Invalid job identifier: {0:?}")]
    InvalidJobId(String),

    /// No job with this identifier is registered
    #[error("Unknown job: {0}")]
    UnknownJob(String),

    /// The job is not in a state that allows the requested operation
    #[error("Job {job_id} is {state}, expected {expected}")]
    InvalidState {
        /// Job being operated on
        job_id: String,
        /// Current state
        state: String,
        /// State the operation requires
        expected: String,
    },

    /// The worker running the job panicked or was aborted
    #[error("Job worker failed: {0}")]
    Worker(String),
}

impl RenderError {
    /// Captured tool output attached to this failure, if any
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { output, .. } | Self::Timeout { output, .. } | Self::ProcessLaunch { output, .. } => {
                Some(output.as_str()).filter(|output| !output.is_empty())
            }
            _ => None,
        }
    }

    /// Short stage label used in failure reports
    pub fn stage(&self) -> &'static str {
        match self {
            Self::WorkspaceIo { .. } => "source_write",
            Self::ProcessLaunch { .. } | Self::NonZeroExit { .. } | Self::Timeout { .. } => "typesetting",
            Self::DuplicateJob(_) | Self::InvalidJobId(_) | Self::UnknownJob(_) | Self::InvalidState { .. } => {
                "submission"
            }
            Self::Worker(_) => "worker",
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the document model
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Error from a transformation adapter
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// Error from a rendering job
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
