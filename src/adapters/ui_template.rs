/*!
 * UI template adapter.
 *
 * Produces a serializable tree mirroring the element hierarchy of a markup
 * template, annotated with titles and language tags so a front end can
 * present the template structure without parsing markup itself.
 */

use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::Adapter;
use crate::document::{ElementKind, MarkupChild, MarkupNode, parse_markup};
use crate::document::markup::{ID_ATTRIBUTE, LANG_ATTRIBUTE};
use crate::errors::AdapterError;

/// Tag of the node wrapping the template's top-level blocks
pub const TEMPLATE_ROOT_TAG: &str = "template";

const TITLE_ATTRIBUTE: &str = "title";

/// How much of the template is carried into the tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// Structure, titles and language tags only
    #[default]
    MetadataOnly,
    /// Also text and attributes
    Full,
}

/// Adapter input: raw markup with an extraction mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    /// Raw template markup
    pub markup: String,
    /// Extraction depth
    pub mode: ExtractMode,
}

impl TemplateSource {
    /// Pair markup with an extraction mode
    pub fn new(markup: impl Into<String>, mode: ExtractMode) -> Self {
        Self {
            markup: markup.into(),
            mode,
        }
    }
}

/// Node of the template tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateNode {
    /// Markup tag
    pub tag: String,

    /// Semantic kind derived from the tag
    pub kind: String,

    /// Identifier from the `id` attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Title from the `title` attribute or a heading child
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Language tags found in this subtree, sorted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,

    /// Own text, `Full` mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Remaining attributes, `Full` mode only
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    /// Child nodes in markup order
    pub children: Vec<TemplateNode>,
}

impl TemplateNode {
    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TemplateNode::node_count).sum::<usize>()
    }

    /// Find a node by identifier, depth-first
    pub fn find(&self, id: &str) -> Option<&TemplateNode> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Serialize the tree as pretty JSON
    pub fn to_json(&self) -> Result<String, AdapterError> {
        serde_json::to_string_pretty(self).map_err(|e| AdapterError::Input(e.to_string()))
    }
}

/// Extracts template trees from markup
#[derive(Debug, Clone, Copy, Default)]
pub struct UiTemplateAdapter;

impl UiTemplateAdapter {
    /// Create the adapter
    pub fn new() -> Self {
        Self
    }

    /// Extract the tree for a markup string
    pub fn extract(&self, markup: &str, mode: ExtractMode) -> Result<TemplateNode, AdapterError> {
        let blocks = parse_markup(markup)?;

        let children: Vec<TemplateNode> = blocks.iter().map(|block| convert(block, mode)).collect();
        let languages = children
            .iter()
            .flat_map(|child| child.languages.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let root = TemplateNode {
            tag: TEMPLATE_ROOT_TAG.to_string(),
            kind: ElementKind::Document.to_string(),
            id: None,
            title: children.iter().find_map(|child| child.title.clone()),
            languages,
            text: None,
            attributes: BTreeMap::new(),
            children,
        };

        debug!("Extracted template with {} node(s)", root.node_count());
        Ok(root)
    }
}

fn convert(node: &MarkupNode, mode: ExtractMode) -> TemplateNode {
    let children: Vec<TemplateNode> = node.element_children().map(|child| convert(child, mode)).collect();

    let mut languages: BTreeSet<String> = children.iter().flat_map(|c| c.languages.iter().cloned()).collect();
    if let Some(lang) = node.lang() {
        languages.insert(lang.to_string());
    }

    let (text, attributes) = match mode {
        ExtractMode::MetadataOnly => (None, BTreeMap::new()),
        ExtractMode::Full => {
            let own = node.own_text();
            let attributes = node
                .attributes
                .iter()
                .filter(|(name, _)| !matches!(name.as_str(), ID_ATTRIBUTE | LANG_ATTRIBUTE | TITLE_ATTRIBUTE))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            ((!own.is_empty()).then_some(own), attributes)
        }
    };

    TemplateNode {
        tag: node.tag.clone(),
        kind: ElementKind::from_tag(&node.tag).to_string(),
        id: node.attribute(ID_ATTRIBUTE).map(str::to_string),
        title: title_of(node),
        languages: languages.into_iter().collect(),
        text,
        attributes,
        children,
    }
}

fn is_title_tag(tag: &str) -> bool {
    matches!(tag, "title" | "heading" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn title_of(node: &MarkupNode) -> Option<String> {
    if let Some(title) = node.attribute(TITLE_ATTRIBUTE).map(str::trim).filter(|t| !t.is_empty()) {
        return Some(title.to_string());
    }

    node.children.iter().find_map(|child| match child {
        MarkupChild::Element(element) if is_title_tag(&element.tag) => {
            let text = element.text_content();
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    })
}

impl Adapter for UiTemplateAdapter {
    type Input = TemplateSource;
    type Output = TemplateNode;

    fn name(&self) -> &str {
        "ui-template"
    }

    fn transform(&self, input: &TemplateSource) -> Result<TemplateNode, AdapterError> {
        self.extract(&input.markup, input.mode)
    }
}
