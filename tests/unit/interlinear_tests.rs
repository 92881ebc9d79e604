/*!
 * Tests for the interlinear adapter
 */

use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use ldom_render::adapters::{
    Adapter, AlignmentLevel, InterlinearAdapter, InterlinearOptions, render_alignment,
};
use ldom_render::document::Document;
use ldom_render::errors::AdapterError;
use ldom_render::phrase::WhitespaceTokenizer;
use crate::common;

/// Test the Lamb scenario end to end
#[test]
fn test_alignSource_withLamb_shouldProduceOnePair() -> Result<()> {
    let output = InterlinearAdapter::default()
        .align_source(r#"<a><b lang="en">Lamb</b><b lang="gr">Ἀρνίον</b></a>"#)?;

    assert_eq!(output.map.len(), 1);
    let pair = &output.map.pairs()[0];
    assert_eq!((pair.source.text(), pair.target.text()), ("Lamb", "Ἀρνίον"));
    assert_eq!(pair.level, AlignmentLevel::Token);
    Ok(())
}

/// Test coverage: token pairs for equal counts, phrase pairs otherwise
#[test]
fn test_alignDocument_withVespers_shouldCoverEveryMultilingualElement() -> Result<()> {
    let doc = Document::from_markup(common::VESPERS_MARKUP, "en")?;
    let map = InterlinearAdapter::default().align_document(&doc);

    assert_eq!(map.pairs_for("title").count(), 2);
    assert_eq!(map.pairs_for("p1").count(), 4);
    assert_eq!(map.pairs_for("v1").count(), 2);
    assert_eq!(map.pairs_for("r1").count(), 0);
    assert!(map.phrase_only_elements().is_empty());

    let order: Vec<&str> = map.pairs().iter().map(|p| p.element_id.as_str()).collect();
    let first_v1 = order.iter().position(|id| *id == "v1").unwrap();
    let last_p1 = order.iter().rposition(|id| *id == "p1").unwrap();
    assert!(last_p1 < first_v1);
    Ok(())
}

/// Test that unequal token counts fall back to one phrase pair
#[test]
fn test_alignSource_withUnequalCounts_shouldFlagPhraseOnly() -> Result<()> {
    let output = InterlinearAdapter::default().align_source(
        r#"<p id="k"><span lang="en">Lord, have mercy</span><span lang="gr">Κύριε ἐλέησον</span></p>"#,
    )?;
    assert_eq!(output.map.len(), 1);
    assert_eq!(output.map.phrase_only_elements(), vec!["k"]);
    assert!(output.source.contains("\\lphrase{Lord, have mercy}{Κύριε ἐλέησον}"));
    Ok(())
}

/// Test that a trilingual element with unequal counts yields one phrase pair
#[test]
fn test_alignSource_withThreeUnequalVariants_shouldProduceOnePhrasePair() -> Result<()> {
    let output = InterlinearAdapter::default().align_source(
        r#"<rubric id="r"><span lang="en">Then the deacon says</span><span lang="fr">Puis le diacre</span><span lang="gr">Ὁ διάκονος</span></rubric>"#,
    )?;
    assert_eq!(output.map.len(), 1);
    assert_eq!(output.map.phrase_only_elements(), vec!["r"]);
    assert_eq!(output.map.pairs()[0].target_language, "fr");

    let options = InterlinearOptions {
        target_language: Some("gr".to_string()),
        ..InterlinearOptions::default()
    };
    let output = InterlinearAdapter::new(options).align_source(
        r#"<rubric id="r"><span lang="en">Then the deacon says</span><span lang="fr">Puis le diacre</span><span lang="gr">Ὁ διάκονος</span></rubric>"#,
    )?;
    assert_eq!(output.map.len(), 1);
    assert_eq!(output.map.pairs()[0].target_language, "gr");
    Ok(())
}

/// Test that a monolingual document yields an empty map
#[test]
fn test_alignSource_withMonolingualDocument_shouldReturnEmptyMap() -> Result<()> {
    let output = InterlinearAdapter::default().align_source("<p>Amen</p>")?;
    assert!(output.map.is_empty());
    assert!(!output.source.contains("linterlinear}{"));
    Ok(())
}

/// Test that a custom tokenizer changes alignment granularity
#[test]
fn test_withTokenizer_shouldUseIt() -> Result<()> {
    let adapter = InterlinearAdapter::with_tokenizer(InterlinearOptions::default(), Arc::new(WhitespaceTokenizer));
    let output = adapter.align_source(
        r#"<p id="k"><span lang="en">Lord, mercy</span><span lang="gr">Κύριε ἐλέησον</span></p>"#,
    )?;
    assert_eq!(output.map.len(), 2);
    assert_eq!(output.map.pairs()[0].source.text(), "Lord,");
    Ok(())
}

/// Test that consecutive pairs of one element share a block
#[test]
fn test_renderAlignment_shouldGroupPairsByElement() -> Result<()> {
    let doc = Document::from_markup(common::VESPERS_MARKUP, "en")?;
    let map = InterlinearAdapter::default().align_document(&doc);
    let source = render_alignment(&map);
    assert_eq!(source.matches("\\begin{linterlinear}").count(), 3);
    assert!(source.contains("\\begin{linterlinear}{p1}{en}{gr}"));
    Ok(())
}

/// Test batch isolation through the adapter interface
#[test]
fn test_transform_withMixedBatch_shouldKeepGoodOutputs() {
    let inputs = BTreeMap::from([
        ("lamb".to_string(), r#"<a><b lang="en">Lamb</b><b lang="gr">Ἀρνίον</b></a>"#.to_string()),
        ("empty".to_string(), String::new()),
    ]);
    let batch = InterlinearAdapter::default().transform(&inputs).unwrap();
    assert_eq!(batch.len(), 2);
    assert!(batch.outputs.contains_key("lamb"));
    assert!(matches!(batch.failures.get("empty"), Some(AdapterError::EmptySource(_))));
}
