/*!
 * Tests for the document model and markup intake
 */

use anyhow::Result;
use ldom_render::document::{self, Document, DocumentBuilder, Element, ElementKind};
use ldom_render::errors::{AdapterError, DocumentError};
use crate::common;

/// Test that markup intake keeps document order and variants
#[test]
fn test_fromMarkup_withVespers_shouldBuildTree() -> Result<()> {
    let doc = Document::from_markup(common::VESPERS_MARKUP, "en")?;

    let ids: Vec<&str> = doc.iter().map(Element::id).collect();
    assert_eq!(ids, vec!["vespers", "title", "r1", "p1", "v1"]);
    assert_eq!(doc.root().kind(), &ElementKind::Section);
    assert_eq!(doc.get("title").map(Element::kind), Some(&ElementKind::Heading));
    assert_eq!(doc.text_for_id("title", "gr")?, "Μέγας Ἑσπερινός");
    assert_eq!(doc.text_for_id("r1", "en")?, "The priest censes the altar");

    Ok(())
}

/// Test that a missing variant falls back to the default language
#[test]
fn test_textFor_withMissingVariant_shouldFallBackToDefault() -> Result<()> {
    let doc = Document::from_markup(common::VESPERS_MARKUP, "en")?;
    assert_eq!(doc.text_for_id("r1", "gr")?, "The priest censes the altar");
    Ok(())
}

/// Test that lookup without a default variant fails with MissingVariant
#[test]
fn test_textFor_withoutDefaultVariant_shouldReturnMissingVariant() {
    let mut builder = DocumentBuilder::new("root", ElementKind::Document).with_default_language("en");
    builder.set_text("root", "gr", "Ἀμήν").unwrap();
    let doc = builder.build();

    let result = doc.text_for_id("root", "fr");
    assert_eq!(
        result,
        Err(DocumentError::MissingVariant {
            element: "root".to_string(),
            language: "fr".to_string(),
        })
    );
}

/// Test that ISO-equivalent keys are matched
#[test]
fn test_textFor_withLibraryTag_shouldMatchIsoLanguage() -> Result<()> {
    let mut builder = DocumentBuilder::new("root", ElementKind::Document);
    builder.set_text("root", "en_US_dedes", "Lord, have mercy")?;
    let doc = builder.build();

    assert_eq!(doc.text_for_id("root", "eng")?, "Lord, have mercy");
    assert_eq!(doc.text_for_id("root", "en")?, "Lord, have mercy");
    Ok(())
}

/// Test that the builder rejects duplicate identifiers
#[test]
fn test_addChild_withDuplicateId_shouldFail() {
    let mut builder = DocumentBuilder::new("root", ElementKind::Document);
    builder.add_child("root", "a", ElementKind::Paragraph).unwrap();
    let result = builder.add_child("root", "a", ElementKind::Paragraph);
    assert!(matches!(result, Err(DocumentError::DuplicateId(id)) if id == "a"));
}

/// Test that the JSON form reproduces the same tree
#[test]
fn test_toJson_thenFromJson_shouldPreserveTree() -> Result<()> {
    let doc = Document::from_markup(common::VESPERS_MARKUP, "en")?;
    let restored = Document::from_json(&doc.to_json()?)?;

    let original: Vec<(usize, &str)> = doc.iter_with_depth().map(|(d, e)| (d, e.id())).collect();
    let copy: Vec<(usize, &str)> = restored.iter_with_depth().map(|(d, e)| (d, e.id())).collect();
    assert_eq!(original, copy);
    assert_eq!(restored.languages(), doc.languages());
    Ok(())
}

/// Test that blank markup is rejected
#[test]
fn test_fromMarkup_withBlankInput_shouldReturnEmptySource() {
    let result = Document::from_markup("   \n\t ", "en");
    assert!(matches!(result, Err(AdapterError::EmptySource(_))));
}

/// Test that several top-level blocks share a synthetic root
#[test]
fn test_fromMarkup_withSeveralBlocks_shouldSynthesizeRoot() -> Result<()> {
    let doc = Document::from_markup("<p>Amen</p><p>Alleluia</p>", "en")?;
    assert_eq!(doc.root().id(), "root");
    assert_eq!(doc.root().child_count(), 2);
    let texts: Vec<&str> = doc
        .children(doc.root())
        .map(|child| child.text("en").unwrap_or_default())
        .collect();
    assert_eq!(texts, vec!["Amen", "Alleluia"]);
    Ok(())
}

/// Test that parse_source detects the JSON form
#[test]
fn test_parseSource_withJson_shouldUseJsonForm() -> Result<()> {
    let json = r#"{"root": {"id": "d", "kind": "document", "variants": {"en": "Amen", "gr": "Ἀμήν"}}}"#;
    let doc = document::parse_source(json, "en")?;
    assert_eq!(doc.len(), 1);
    assert!(doc.root().is_multilingual());
    Ok(())
}

/// Test that invalid JSON is reported as such
#[test]
fn test_parseSource_withBrokenJson_shouldReturnInvalidJson() {
    let result = document::parse_source("{\"root\": ", "en");
    assert!(matches!(
        result,
        Err(AdapterError::Document(DocumentError::InvalidJson(_)))
    ));
}

/// Test that traversal can be restarted
#[test]
fn test_iter_shouldBeRestartable() -> Result<()> {
    let doc = Document::from_markup(common::VESPERS_MARKUP, "en")?;
    assert_eq!(doc.iter().count(), doc.len());
    assert_eq!(doc.iter().count(), doc.len());
    Ok(())
}
