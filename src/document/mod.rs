/*!
 * Liturgical document object model (LDOM).
 *
 * This module provides the in-memory tree that every adapter consumes:
 * - `model`: elements, documents, the builder and the JSON form
 * - `markup`: parsing raw template markup into a document
 */

pub mod markup;
pub mod model;

pub use markup::{MarkupChild, MarkupNode, parse_markup};
pub use model::{DepthFirst, Document, DocumentBuilder, DocumentRecord, Element, ElementKind, ElementRecord};

/// Build a document from raw input, detecting the JSON form by its leading brace
pub fn parse_source(source: &str, default_language: &str) -> Result<Document, crate::errors::AdapterError> {
    if source.trim_start().starts_with('{') {
        Ok(Document::from_json(source)?)
    } else {
        Document::from_markup(source, default_language)
    }
}
