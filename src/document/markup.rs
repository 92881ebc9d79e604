/*!
 * Markup intake.
 *
 * Raw template markup is parsed into a small owned tree (`MarkupNode`) that
 * both the LDOM builder and the UI template adapter consume. Template
 * fragments are read as XML with xml5ever, so `<rubric/>` closes itself;
 * complete HTML documents go through html5ever. Either way the parse ends in
 * an `RcDom`, and wrapper elements are removed so the returned nodes are the
 * author's top-level blocks in source order.
 */

use html5ever::tendril::TendrilSink;
use log::debug;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use xml5ever::driver::XmlParseOpts;
use std::collections::BTreeMap;

use crate::document::model::{Document, DocumentBuilder, ElementKind};
use crate::errors::{AdapterError, DocumentError};

/// Attribute naming the language of a variant element
pub const LANG_ATTRIBUTE: &str = "lang";

/// Attribute carrying an explicit element identifier
pub const ID_ATTRIBUTE: &str = "id";

/// Identifier given to the synthesized root when markup has several top-level blocks
pub const SYNTHETIC_ROOT_ID: &str = "root";

// Element wrapping template fragments so several top-level blocks parse as one XML tree
const FRAGMENT_TAG: &str = "ldom-fragment";

static AMPERSAND_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+;|#x[0-9A-Fa-f]+;|[A-Za-z][A-Za-z0-9]*;)?").expect("ampersand pattern is valid")
});

/// Child of a markup element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupChild {
    /// Nested element
    Element(MarkupNode),
    /// Non-blank text run
    Text(String),
}

/// Owned markup element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupNode {
    /// Lowercased tag name
    pub tag: String,
    /// Attributes in name order
    pub attributes: BTreeMap<String, String>,
    /// Children in source order
    pub children: Vec<MarkupChild>,
}

impl MarkupNode {
    /// Create an element with no attributes
    pub fn new(tag: impl Into<String>, children: Vec<MarkupChild>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children,
        }
    }

    /// Value of an attribute
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Language of this element, if tagged
    pub fn lang(&self) -> Option<&str> {
        self.attribute(LANG_ATTRIBUTE).map(str::trim).filter(|l| !l.is_empty())
    }

    /// Element children only
    pub fn element_children(&self) -> impl Iterator<Item = &MarkupNode> {
        self.children.iter().filter_map(|child| match child {
            MarkupChild::Element(node) => Some(node),
            MarkupChild::Text(_) => None,
        })
    }

    /// Text directly inside this element, whitespace-collapsed
    pub fn own_text(&self) -> String {
        let runs: Vec<&str> = self
            .children
            .iter()
            .filter_map(|child| match child {
                MarkupChild::Text(text) => Some(text.as_str()),
                MarkupChild::Element(_) => None,
            })
            .collect();
        collapse_whitespace(&runs.join(" "))
    }

    /// All descendant text, whitespace-collapsed
    pub fn text_content(&self) -> String {
        let mut buffer = String::new();
        self.collect_text(&mut buffer);
        collapse_whitespace(&buffer)
    }

    fn collect_text(&self, buffer: &mut String) {
        for child in &self.children {
            match child {
                MarkupChild::Text(text) => {
                    buffer.push(' ');
                    buffer.push_str(text);
                }
                MarkupChild::Element(node) => node.collect_text(buffer),
            }
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse markup into its top-level element nodes.
///
/// Fails with `EmptySource` when the input is blank or yields no element.
pub fn parse_markup(source: &str) -> Result<Vec<MarkupNode>, AdapterError> {
    if source.trim().is_empty() {
        return Err(AdapterError::EmptySource("markup is empty".to_string()));
    }

    let dom = if is_html_document(source) {
        html5ever::parse_document(RcDom::default(), Default::default()).one(source)
    } else {
        let body = escape_bare_ampersands(strip_xml_declaration(source));
        let fragment = format!("<{tag}>{}</{tag}>", body, tag = FRAGMENT_TAG);
        xml5ever::driver::parse_document(RcDom::default(), XmlParseOpts::default()).one(fragment)
    };

    let mut blocks = Vec::new();
    for child in dom.document.children.borrow().iter() {
        collect_blocks(child, &mut blocks);
    }

    if blocks.is_empty() {
        return Err(AdapterError::EmptySource(
            "markup contains no recognizable content block".to_string(),
        ));
    }

    debug!("Parsed {} top-level markup block(s)", blocks.len());
    Ok(blocks)
}

// Only a full document with an html doctype or root element is read as HTML
fn is_html_document(source: &str) -> bool {
    let head = source.trim_start().chars().take(14).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

fn strip_xml_declaration(source: &str) -> &str {
    let trimmed = source.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return &trimmed[end + 2..];
        }
    }
    trimmed
}

// `&` that does not start a reference is text, as in HTML
fn escape_bare_ampersands(source: &str) -> Cow<'_, str> {
    AMPERSAND_REGEX.replace_all(source, |caps: &Captures| match caps.get(1) {
        Some(reference) => format!("&{}", reference.as_str()),
        None => "&amp;".to_string(),
    })
}

// Descend through the fragment wrapper and html/head/body.
fn collect_blocks(handle: &Handle, blocks: &mut Vec<MarkupNode>) {
    if let NodeData::Element { ref name, .. } = handle.data {
        let tag = name.local.to_string().to_ascii_lowercase();
        if matches!(tag.as_str(), FRAGMENT_TAG | "html" | "head" | "body") {
            for child in handle.children.borrow().iter() {
                collect_blocks(child, blocks);
            }
        } else if let Some(node) = convert_element(handle) {
            blocks.push(node);
        }
    }
}

fn convert_element(handle: &Handle) -> Option<MarkupNode> {
    let NodeData::Element { ref name, ref attrs, .. } = handle.data else {
        return None;
    };

    let attributes = attrs
        .borrow()
        .iter()
        .map(|attr| (attr.name.local.to_string().to_ascii_lowercase(), attr.value.to_string()))
        .collect();

    let children = handle
        .children
        .borrow()
        .iter()
        .filter_map(|child| match child.data {
            NodeData::Element { .. } => convert_element(child).map(MarkupChild::Element),
            NodeData::Text { ref contents } => {
                let text = contents.borrow().to_string();
                (!text.trim().is_empty()).then_some(MarkupChild::Text(text))
            }
            _ => None,
        })
        .collect();

    Some(MarkupNode {
        tag: name.local.to_string().to_ascii_lowercase(),
        attributes,
        children,
    })
}

impl Document {
    /// Build a document from raw markup.
    ///
    /// A child element carrying a `lang` attribute becomes a language variant
    /// of its parent; other child elements become child elements. Text that
    /// sits directly in an element is stored under the element's own `lang`
    /// or, failing that, under `default_language`.
    pub fn from_markup(source: &str, default_language: &str) -> Result<Document, AdapterError> {
        let blocks = parse_markup(source)?;

        let root = match <[MarkupNode; 1]>::try_from(blocks) {
            Ok([single]) => single,
            Err(blocks) => {
                let mut synthetic = MarkupNode::new(
                    "document",
                    blocks.into_iter().map(MarkupChild::Element).collect(),
                );
                synthetic
                    .attributes
                    .insert(ID_ATTRIBUTE.to_string(), SYNTHETIC_ROOT_ID.to_string());
                synthetic
            }
        };

        let root_id = element_id(&root, "e0");
        let kind = ElementKind::from_tag(&root.tag);
        let mut builder = DocumentBuilder::new(root_id.clone(), kind).with_default_language(default_language);
        fill_element(&mut builder, &root, &root_id, default_language)?;

        Ok(builder.build())
    }
}

fn element_id(node: &MarkupNode, generated: &str) -> String {
    node.attribute(ID_ATTRIBUTE)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| generated.to_string())
}

fn fill_element(
    builder: &mut DocumentBuilder,
    node: &MarkupNode,
    id: &str,
    default_language: &str,
) -> Result<(), DocumentError> {
    let own_language = node.lang().unwrap_or(default_language).to_string();
    let mut child_index = 0;

    for child in &node.children {
        match child {
            MarkupChild::Text(text) => {
                let text = collapse_whitespace(text);
                builder.append_text(id, &own_language, &text)?;
            }
            MarkupChild::Element(variant) if variant.lang().is_some() => {
                let language = variant.lang().unwrap_or(default_language);
                builder.append_text(id, language, &variant.text_content())?;
            }
            MarkupChild::Element(element) => {
                let child_id = element_id(element, &format!("{}.{}", id, child_index));
                child_index += 1;
                builder.add_child(id, child_id.clone(), ElementKind::from_tag(&element.tag))?;
                fill_element(builder, element, &child_id, default_language)?;
            }
        }
    }

    Ok(())
}
