/*!
 * Core types of the liturgical document object model (LDOM).
 *
 * Elements live in an arena owned by the `Document`; each element records
 * its parent and its ordered children by arena slot, so the tree can be
 * walked in either direction while identifier lookup stays a single hash
 * lookup. Documents are only mutable through `DocumentBuilder`; once built
 * they are read-only and can be shared freely between threads.
 */

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::errors::DocumentError;
use crate::language_utils;

/// Semantic role of an element, derived from its markup tag.
///
/// The typesetting adapter dispatches on this tag rather than on element
/// types, so adding a kind means adding a variant and a table row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// The document root
    Document,
    /// A structural grouping (service, part, division)
    Section,
    /// A title or heading line
    Heading,
    /// A block of running text
    Paragraph,
    /// An instruction to the celebrant, typeset in red
    Rubric,
    /// A hymn verse or poetic line
    Verse,
    /// Any tag without a dedicated rendering
    Other(String),
}

impl ElementKind {
    /// Map a markup tag to an element kind
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "document" | "template" => Self::Document,
            "section" | "div" | "part" | "service" => Self::Section,
            "title" | "heading" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Self::Heading,
            "p" | "para" | "paragraph" => Self::Paragraph,
            "rubric" => Self::Rubric,
            "verse" | "hymn" | "line" => Self::Verse,
            other => Self::Other(other.to_string()),
        }
    }

    /// Canonical tag for this kind
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Document => "document",
            Self::Section => "section",
            Self::Heading => "heading",
            Self::Paragraph => "paragraph",
            Self::Rubric => "rubric",
            Self::Verse => "verse",
            Self::Other(tag) => tag,
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

/// A single node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    id: String,
    kind: ElementKind,
    variants: BTreeMap<String, String>,
    children: Vec<usize>,
    parent: Option<usize>,
}

impl Element {
    fn new(id: String, kind: ElementKind, parent: Option<usize>) -> Self {
        Self {
            id,
            kind,
            variants: BTreeMap::new(),
            children: Vec::new(),
            parent,
        }
    }

    /// Identifier, unique within the document
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Semantic role of this element
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Language variants keyed by language code, in key order
    pub fn variants(&self) -> &BTreeMap<String, String> {
        &self.variants
    }

    /// Text stored under exactly this language key
    pub fn text(&self, language: &str) -> Option<&str> {
        self.variants.get(language).map(String::as_str)
    }

    /// Text for a language key or any key naming the same ISO language.
    ///
    /// Unlike `Document::text_for` this never falls back to the default
    /// language.
    pub fn matching_text(&self, language: &str) -> Option<&str> {
        if let Some(text) = self.text(language) {
            return Some(text);
        }

        self.variants
            .iter()
            .find(|(key, _)| language_utils::language_codes_match(key, language))
            .map(|(_, text)| text.as_str())
    }

    /// Whether this element carries any text
    pub fn has_text(&self) -> bool {
        !self.variants.is_empty()
    }

    /// Whether this element carries two or more language variants
    pub fn is_multilingual(&self) -> bool {
        self.variants.len() >= 2
    }

    /// Number of direct children
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether this element is the document root
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Read-only liturgical document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    elements: Vec<Element>,
    index: HashMap<String, usize>,
    default_language: Option<String>,
}

impl Document {
    /// The root element
    pub fn root(&self) -> &Element {
        &self.elements[0]
    }

    /// Look up an element by identifier
    pub fn get(&self, id: &str) -> Option<&Element> {
        self.index.get(id).map(|&slot| &self.elements[slot])
    }

    /// Whether an element with this identifier exists
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of elements in the tree, root included
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always false: a document has at least its root
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Configured fallback language, if any
    pub fn default_language(&self) -> Option<&str> {
        self.default_language.as_deref()
    }

    /// Ordered children of an element
    pub fn children<'a>(&'a self, element: &'a Element) -> impl Iterator<Item = &'a Element> + 'a {
        element.children.iter().map(move |&slot| &self.elements[slot])
    }

    /// Parent of an element, `None` for the root
    pub fn parent(&self, element: &Element) -> Option<&Element> {
        element.parent.map(|slot| &self.elements[slot])
    }

    /// Depth-first, pre-order traversal in document order.
    ///
    /// Each call starts a fresh traversal from the root.
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst {
            document: self,
            stack: vec![(0, 0)],
        }
    }

    /// Depth-first traversal yielding each element with its depth (root = 0)
    pub fn iter_with_depth(&self) -> impl Iterator<Item = (usize, &Element)> + '_ {
        DepthFirst {
            document: self,
            stack: vec![(0, 0)],
        }
        .with_depth()
    }

    /// Sorted union of all language keys used in the document
    pub fn languages(&self) -> BTreeSet<String> {
        self.elements
            .iter()
            .flat_map(|e| e.variants.keys().cloned())
            .collect()
    }

    /// Text of an element for a language, with fallback.
    ///
    /// Lookup order: the exact key, a key naming the same ISO language,
    /// then the default language (exact, then equivalent).
    pub fn text_for<'a>(&'a self, element: &'a Element, language: &str) -> Result<&'a str, DocumentError> {
        if let Some(text) = element.matching_text(language) {
            return Ok(text);
        }

        if let Some(text) = self
            .default_language
            .as_deref()
            .and_then(|default| element.matching_text(default))
        {
            return Ok(text);
        }

        Err(DocumentError::MissingVariant {
            element: element.id.clone(),
            language: language.to_string(),
        })
    }

    /// Text of the element with the given identifier, with fallback
    pub fn text_for_id(&self, id: &str, language: &str) -> Result<&str, DocumentError> {
        let element = self
            .get(id)
            .ok_or_else(|| DocumentError::UnknownElement(id.to_string()))?;
        self.text_for(element, language)
    }

    /// Parse the structured JSON form
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let record: DocumentRecord =
            serde_json::from_str(json).map_err(|e| DocumentError::InvalidJson(e.to_string()))?;
        record.into_document()
    }

    /// Serialize to the structured JSON form
    pub fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(&self.to_record())
            .map_err(|e| DocumentError::InvalidJson(e.to_string()))
    }

    /// Convert to the serializable nested form
    pub fn to_record(&self) -> DocumentRecord {
        DocumentRecord {
            default_language: self.default_language.clone(),
            root: self.element_record(self.root()),
        }
    }

    fn element_record(&self, element: &Element) -> ElementRecord {
        ElementRecord {
            id: element.id.clone(),
            kind: element.kind.as_tag().to_string(),
            variants: element.variants.clone(),
            children: self
                .children(element)
                .map(|child| self.element_record(child))
                .collect(),
        }
    }
}

/// Lazy depth-first iterator over a document.
pub struct DepthFirst<'a> {
    document: &'a Document,
    stack: Vec<(usize, usize)>,
}

impl<'a> DepthFirst<'a> {
    fn with_depth(self) -> DepthFirstWithDepth<'a> {
        DepthFirstWithDepth { inner: self }
    }

    fn advance(&mut self) -> Option<(usize, &'a Element)> {
        let (slot, depth) = self.stack.pop()?;
        let element = &self.document.elements[slot];
        // Reverse so the first child is popped next
        self.stack
            .extend(element.children.iter().rev().map(|&child| (child, depth + 1)));
        Some((depth, element))
    }
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().map(|(_, element)| element)
    }
}

struct DepthFirstWithDepth<'a> {
    inner: DepthFirst<'a>,
}

impl<'a> Iterator for DepthFirstWithDepth<'a> {
    type Item = (usize, &'a Element);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.advance()
    }
}

/// Builder for `Document`; the only way to mutate a tree.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    elements: Vec<Element>,
    index: HashMap<String, usize>,
    default_language: Option<String>,
}

impl DocumentBuilder {
    /// Start a document with the given root
    pub fn new(root_id: impl Into<String>, kind: ElementKind) -> Self {
        let root_id = root_id.into();
        let mut index = HashMap::new();
        index.insert(root_id.clone(), 0);

        Self {
            elements: vec![Element::new(root_id, kind, None)],
            index,
            default_language: None,
        }
    }

    /// Set the fallback language used by `Document::text_for`
    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = Some(language.into());
        self
    }

    /// Identifier of the root element
    pub fn root_id(&self) -> &str {
        &self.elements[0].id
    }

    /// Whether an identifier is already used
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Append a child element to `parent_id`
    pub fn add_child(
        &mut self,
        parent_id: &str,
        id: impl Into<String>,
        kind: ElementKind,
    ) -> Result<&mut Self, DocumentError> {
        let id = id.into();
        let parent = self.slot(parent_id)?;
        if self.index.contains_key(&id) {
            return Err(DocumentError::DuplicateId(id));
        }

        let slot = self.elements.len();
        self.elements.push(Element::new(id.clone(), kind, Some(parent)));
        self.elements[parent].children.push(slot);
        self.index.insert(id, slot);
        Ok(self)
    }

    /// Set the text of an element for one language, replacing any previous text
    pub fn set_text(
        &mut self,
        id: &str,
        language: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<&mut Self, DocumentError> {
        let slot = self.slot(id)?;
        self.elements[slot].variants.insert(language.into(), text.into());
        Ok(self)
    }

    /// Append text to an element's variant, separated by a space
    pub fn append_text(&mut self, id: &str, language: &str, text: &str) -> Result<&mut Self, DocumentError> {
        let slot = self.slot(id)?;
        let entry = self.elements[slot]
            .variants
            .entry(language.to_string())
            .or_default();
        if !entry.is_empty() {
            entry.push(' ');
        }
        entry.push_str(text);
        Ok(self)
    }

    /// Remove an element's text for one language
    pub fn remove_text(&mut self, id: &str, language: &str) -> Result<&mut Self, DocumentError> {
        let slot = self.slot(id)?;
        self.elements[slot].variants.remove(language);
        Ok(self)
    }

    /// Finish construction
    pub fn build(self) -> Document {
        Document {
            elements: self.elements,
            index: self.index,
            default_language: self.default_language,
        }
    }

    fn slot(&self, id: &str) -> Result<usize, DocumentError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| DocumentError::UnknownElement(id.to_string()))
    }
}

/// Serializable nested form of a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Fallback language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,

    /// Root element
    pub root: ElementRecord,
}

/// Serializable nested form of an element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementRecord {
    /// Element identifier
    pub id: String,

    /// Markup tag of the element
    pub kind: String,

    /// Text per language
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, String>,

    /// Ordered children
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementRecord>,
}

impl DocumentRecord {
    /// Build a document from the nested form
    pub fn into_document(self) -> Result<Document, DocumentError> {
        let mut builder = DocumentBuilder::new(self.root.id.clone(), ElementKind::from_tag(&self.root.kind));
        if let Some(language) = self.default_language {
            builder = builder.with_default_language(language);
        }

        for (language, text) in self.root.variants {
            builder.set_text(&self.root.id, language, text)?;
        }
        for child in self.root.children {
            add_record(&mut builder, &self.root.id, child)?;
        }

        Ok(builder.build())
    }
}

fn add_record(builder: &mut DocumentBuilder, parent_id: &str, record: ElementRecord) -> Result<(), DocumentError> {
    builder.add_child(parent_id, record.id.clone(), ElementKind::from_tag(&record.kind))?;
    for (language, text) in record.variants {
        builder.set_text(&record.id, language, text)?;
    }
    for child in record.children {
        add_record(builder, &record.id, child)?;
    }
    Ok(())
}
