/*!
 * Integration tests for the markup -> document -> output pipeline
 */

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use ldom_render::adapters::{Adapter, InterlinearAdapter, TypesettingAdapter};
use ldom_render::app_config::Config;
use ldom_render::document::{self, Document};
use ldom_render::errors::AdapterError;
use ldom_render::render::{JobId, JobRunner, JobState, RunnerConfig};
use crate::common;
use crate::common::mock_gateway::InstrumentedGateway;

/// Markup is typeset and submitted as a job under a content-derived id
#[tokio::test]
async fn test_pipeline_fromMarkupToArtifact_shouldComplete() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let doc = Document::from_markup(common::VESPERS_MARKUP, "en")?;
    let source = TypesettingAdapter::default().transform(&doc)?;

    let gateway = Arc::new(InstrumentedGateway::succeeding(Duration::from_millis(5)));
    let runner = JobRunner::with_gateway(RunnerConfig::new(temp_dir.path()), gateway.clone());
    let id = JobId::for_source(&source);
    let artifact = runner.spawn(source.clone(), id.clone()).await??;

    assert_eq!(artifact.path, temp_dir.path().join(format!("{}.pdf", id)));
    assert_eq!(gateway.calls(), vec![id.to_string()]);
    assert_eq!(std::fs::read_to_string(temp_dir.path().join(format!("{}.tex", id)))?, source);
    assert_eq!(runner.state(&id), Some(JobState::Completed));
    Ok(())
}

/// The JSON form and markup form of a document typeset identically
#[test]
fn test_pipeline_jsonAndMarkup_shouldTypesetIdentically() -> Result<()> {
    let from_markup = Document::from_markup(common::VESPERS_MARKUP, "en")?;
    let from_json = document::parse_source(&from_markup.to_json()?, "en")?;

    let adapter = TypesettingAdapter::default();
    assert_eq!(adapter.transform(&from_markup)?, adapter.transform(&from_json)?);
    Ok(())
}

/// A directory is aligned file by file, keyed by stem, with failures isolated
#[test]
fn test_alignDirectory_withMixedInputs_shouldReportPerFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "vespers.html", common::VESPERS_MARKUP)?;
    common::create_test_file(
        temp_dir.path(),
        "lamb.json",
        r#"{"root": {"id": "lamb", "kind": "p", "variants": {"en": "Lamb", "gr": "Ἀρνίον"}}}"#,
    )?;
    common::create_test_file(temp_dir.path(), "blank.xml", "   ")?;
    common::create_test_file(temp_dir.path(), "notes.txt", "ignored")?;

    let config = Config::default();
    let batch = InterlinearAdapter::new(config.interlinear_options()).align_directory(temp_dir.path())?;

    assert_eq!(batch.len(), 3);
    assert_eq!(batch.outputs["lamb"].map.len(), 1);
    assert_eq!(batch.outputs["vespers"].map.len(), 8);
    assert!(matches!(batch.failures.get("blank"), Some(AdapterError::EmptySource(_))));
    Ok(())
}

/// A missing directory is an input error
#[test]
fn test_alignDirectory_withMissingDirectory_shouldFail() {
    let result = InterlinearAdapter::default().align_directory("/definitely/not/here");
    assert!(matches!(result, Err(AdapterError::Input(_))));
}
