/*!
 * Tests for error types and conversions
 */

use std::path::PathBuf;
use std::time::Duration;
use ldom_render::errors::{AdapterError, AppError, DocumentError, RenderError};

#[test]
fn test_documentError_missingVariant_shouldDisplayElementAndLanguage() {
    let error = DocumentError::MissingVariant {
        element: "r1".to_string(),
        language: "gr".to_string(),
    };
    let display = error.to_string();
    assert!(display.contains("r1"));
    assert!(display.contains("gr"));
}

#[test]
fn test_adapterError_fromDocumentError_shouldWrap() {
    let error: AdapterError = DocumentError::DuplicateId("a".to_string()).into();
    assert!(matches!(error, AdapterError::Document(DocumentError::DuplicateId(_))));
}

#[test]
fn test_renderError_nonZeroExit_shouldExposeOutput() {
    let error = RenderError::NonZeroExit {
        job_id: "job1".to_string(),
        exit_code: Some(1),
        output: "! Undefined control sequence.".to_string(),
    };
    assert_eq!(error.output(), Some("! Undefined control sequence."));
    assert_eq!(error.stage(), "typesetting");
}

#[test]
fn test_renderError_timeout_shouldKeepSubSecondBoundAndOutput() {
    let error = RenderError::Timeout {
        job_id: "job1".to_string(),
        timeout: Duration::from_millis(200),
        output: "This is XeTeX, Version 3.141592653".to_string(),
    };
    assert!(error.to_string().contains("200ms"));
    assert_eq!(error.output(), Some("This is XeTeX, Version 3.141592653"));

    let launch = RenderError::ProcessLaunch {
        job_id: "job1".to_string(),
        tool: PathBuf::from("/missing/build.sh"),
        message: "not found".to_string(),
        output: String::new(),
    };
    assert!(launch.output().is_none());
}

#[test]
fn test_renderError_worker_shouldReportWorkerStage() {
    assert_eq!(RenderError::Worker("panicked".to_string()).stage(), "worker");
}

#[test]
fn test_renderError_workspaceIo_shouldReportSourceWriteStage() {
    let error = RenderError::WorkspaceIo {
        job_id: "job1".to_string(),
        path: PathBuf::from("/ro/job1.tex"),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
    };
    assert_eq!(error.stage(), "source_write");
    assert!(error.output().is_none());
    assert!(std::error::Error::source(&error).is_some());
}

#[test]
fn test_appError_fromRenderError_shouldConvert() {
    let error: AppError = RenderError::Timeout {
        job_id: "job1".to_string(),
        timeout: Duration::from_secs(5),
        output: String::new(),
    }
    .into();
    assert!(matches!(error, AppError::Render(RenderError::Timeout { .. })));
    assert!(error.to_string().contains("timed out"));
}

#[test]
fn test_appError_fromIoError_shouldConvertToFileError() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let error: AppError = io_error.into();
    assert!(matches!(error, AppError::File(_)));
}
