/*!
 * Typesetting adapter: LDOM to LaTeX source.
 *
 * The walk is depth-first in document order. Every element that carries
 * text becomes an `lrow` with one line per output language; a language
 * the element lacks is still emitted, with an empty argument, so that
 * parallel columns stay aligned. Sections open an environment around
 * their children. Output depends only on the document and the configured
 * language list, so identical input always yields identical bytes.
 */

use log::debug;
use std::fmt::Write;

use super::Adapter;
use super::latex::{escape, indent, kind_markup, wrap_document};
use crate::document::{Document, Element};
use crate::errors::AdapterError;

/// Options for the typesetting adapter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypesettingOptions {
    /// Output languages, in column order. Empty means every language found
    /// in the document, sorted by key.
    pub languages: Vec<String>,
}

/// Renders a document into typesetting source
#[derive(Debug, Clone, Default)]
pub struct TypesettingAdapter {
    options: TypesettingOptions,
}

impl TypesettingAdapter {
    /// Create an adapter with explicit options
    pub fn new(options: TypesettingOptions) -> Self {
        Self { options }
    }

    /// Create an adapter rendering the given languages in order
    pub fn with_languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(TypesettingOptions {
            languages: languages.into_iter().map(Into::into).collect(),
        })
    }

    /// Languages that will be rendered for a document
    pub fn languages_for(&self, document: &Document) -> Vec<String> {
        if self.options.languages.is_empty() {
            document.languages().into_iter().collect()
        } else {
            self.options.languages.clone()
        }
    }

    /// Render the body (without preamble) of a document
    pub fn render_body(&self, document: &Document) -> String {
        let languages = self.languages_for(document);
        let mut body = String::new();
        self.render_element(document, document.root(), 0, &languages, &mut body);
        body
    }

    fn render_element(
        &self,
        document: &Document,
        element: &Element,
        depth: usize,
        languages: &[String],
        out: &mut String,
    ) {
        let markup = kind_markup(element.kind());
        let pad = indent(depth);

        if let Some(environment) = markup.environment {
            let _ = writeln!(out, "{}\\begin{{{}}}{{{}}}", pad, environment, escape(element.id()));
        }

        if element.has_text() {
            let _ = writeln!(out, "{}\\begin{{lrow}}{{{}}}", pad, escape(element.id()));
            for language in languages {
                // Placeholder keeps the column even when the variant is absent
                let text = element.matching_text(language).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "{}  \\{}{{{}}}{{{}}}",
                    pad,
                    markup.text_command,
                    escape(language),
                    escape(text)
                );
            }
            let _ = writeln!(out, "{}\\end{{lrow}}", pad);
        }

        for child in document.children(element) {
            self.render_element(document, child, depth + 1, languages, out);
        }

        if let Some(environment) = markup.environment {
            let _ = writeln!(out, "{}\\end{{{}}}", pad, environment);
        }
    }
}

impl Adapter for TypesettingAdapter {
    type Input = Document;
    type Output = String;

    fn name(&self) -> &str {
        "typesetting"
    }

    fn transform(&self, document: &Document) -> Result<String, AdapterError> {
        let body = self.render_body(document);
        debug!(
            "Typeset {} element(s) into {} bytes of source",
            document.len(),
            body.len()
        );
        Ok(wrap_document(&body))
    }
}
