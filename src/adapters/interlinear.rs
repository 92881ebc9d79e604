/*!
 * Interlinear adapter: word alignment between language variants.
 *
 * Every multilingual element contributes pairs between exactly two of its
 * variants: the source and one target language. When the two variants
 * tokenize to the same length the tokens are paired by index; otherwise the
 * element is aligned once, phrase to phrase, and flagged `PhraseOnly`.
 */

use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

use super::Adapter;
use super::latex::{escape, wrap_document};
use crate::document::{self, Document, Element};
use crate::errors::AdapterError;
use crate::file_utils::FileManager;
use crate::phrase::{Phrase, Tokenizer, WordTokenizer};

/// File extensions accepted by directory batches
pub const BATCH_EXTENSIONS: &[&str] = &["json", "xml", "html"];

/// Granularity of an aligned pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentLevel {
    /// One token paired with one token
    Token,
    /// Whole variant paired with whole variant
    PhraseOnly,
}

/// One source/target correspondence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignedPair {
    /// Element both phrases come from
    pub element_id: String,
    /// Language of the source phrase
    pub source_language: String,
    /// Language of the target phrase
    pub target_language: String,
    /// Token index for token-level pairs, 0 for phrase-level pairs
    pub index: usize,
    /// Alignment granularity
    pub level: AlignmentLevel,
    /// Source side
    pub source: Phrase,
    /// Target side
    pub target: Phrase,
}

/// Ordered alignment pairs, in document order of their elements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlignmentMap {
    pairs: Vec<AlignedPair>,
}

impl AlignmentMap {
    /// All pairs in order
    pub fn pairs(&self) -> &[AlignedPair] {
        &self.pairs
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no element was aligned
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs originating from one element
    pub fn pairs_for<'a>(&'a self, element_id: &'a str) -> impl Iterator<Item = &'a AlignedPair> + 'a {
        self.pairs.iter().filter(move |p| p.element_id == element_id)
    }

    /// Identifiers of elements that could only be aligned phrase to phrase
    pub fn phrase_only_elements(&self) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|p| p.level == AlignmentLevel::PhraseOnly)
            .map(|p| p.element_id.as_str())
            .collect()
    }
}

/// Alignment result for one input document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterlinearOutput {
    /// The alignment map
    pub map: AlignmentMap,
    /// Typesetting source reconstructing the alignment
    pub source: String,
}

/// Results of a batch run, keyed by input identifier
#[derive(Debug, Default)]
pub struct InterlinearBatch {
    /// Inputs that aligned successfully
    pub outputs: BTreeMap<String, InterlinearOutput>,
    /// Inputs that failed, with their error
    pub failures: BTreeMap<String, AdapterError>,
}

impl InterlinearBatch {
    /// Total number of inputs processed
    pub fn len(&self) -> usize {
        self.outputs.len() + self.failures.len()
    }

    /// Whether the batch processed nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Options for the interlinear adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterlinearOptions {
    /// Source language; defaults to the lowest-sorted key of each element
    pub source_language: Option<String>,
    /// Target language; defaults to the lowest-sorted key other than the source
    pub target_language: Option<String>,
    /// Language for untagged markup text
    pub default_language: String,
}

impl Default for InterlinearOptions {
    fn default() -> Self {
        Self {
            source_language: None,
            target_language: None,
            default_language: "en".to_string(),
        }
    }
}

/// Aligns language variants of documents
#[derive(Clone)]
pub struct InterlinearAdapter {
    options: InterlinearOptions,
    tokenizer: Arc<dyn Tokenizer>,
}

impl std::fmt::Debug for InterlinearAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterlinearAdapter")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for InterlinearAdapter {
    fn default() -> Self {
        Self::new(InterlinearOptions::default())
    }
}

impl InterlinearAdapter {
    /// Create an adapter using the default word tokenizer
    pub fn new(options: InterlinearOptions) -> Self {
        Self::with_tokenizer(options, Arc::new(WordTokenizer))
    }

    /// Create an adapter with an external tokenizer
    pub fn with_tokenizer(options: InterlinearOptions, tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { options, tokenizer }
    }

    /// Align every multilingual element of a document
    pub fn align_document(&self, document: &Document) -> AlignmentMap {
        let mut map = AlignmentMap::default();

        for element in document.iter().filter(|e| e.is_multilingual()) {
            let Some((source_language, source_text)) = self.source_variant(element) else {
                continue;
            };

            let Some((target_language, target_text)) = self.target_variant(element, source_language) else {
                continue;
            };

            let source = Phrase::new(source_text, self.tokenizer.as_ref());
            let target = Phrase::new(target_text, self.tokenizer.as_ref());
            self.pair_phrases(&mut map, element, source_language, target_language, source, target);
        }

        debug!("Aligned {} pair(s)", map.len());
        map
    }

    /// Align one raw document (JSON form or markup)
    pub fn align_source(&self, raw: &str) -> Result<InterlinearOutput, AdapterError> {
        let document = document::parse_source(raw, &self.options.default_language)?;
        let map = self.align_document(&document);
        let source = render_alignment(&map);
        Ok(InterlinearOutput { map, source })
    }

    /// Align every supported file below a directory, keyed by file stem
    pub fn align_directory<P: AsRef<Path>>(&self, dir: P) -> Result<InterlinearBatch, AdapterError> {
        let dir = dir.as_ref();
        if !FileManager::dir_exists(dir) {
            return Err(AdapterError::Input(format!("Not a directory: {:?}", dir)));
        }

        let mut inputs = BTreeMap::new();
        let mut batch = InterlinearBatch::default();

        for extension in BATCH_EXTENSIONS {
            let files = FileManager::find_files(dir, extension)
                .map_err(|e| AdapterError::Input(e.to_string()))?;
            for path in files {
                let key = batch_key(dir, &path);
                match FileManager::read_to_string(&path) {
                    Ok(content) => {
                        inputs.insert(key, content);
                    }
                    Err(e) => {
                        warn!("Skipping unreadable input {:?}: {}", path, e);
                        batch.failures.insert(key, AdapterError::Input(e.to_string()));
                    }
                }
            }
        }

        let aligned = self.align_batch(&inputs);
        batch.outputs.extend(aligned.outputs);
        batch.failures.extend(aligned.failures);
        Ok(batch)
    }

    /// Align a batch of raw documents; each entry is processed independently
    pub fn align_batch(&self, inputs: &BTreeMap<String, String>) -> InterlinearBatch {
        let mut batch = InterlinearBatch::default();

        for (key, raw) in inputs {
            match self.align_source(raw) {
                Ok(output) => {
                    batch.outputs.insert(key.clone(), output);
                }
                Err(e) => {
                    warn!("Alignment failed for {}: {}", key, e);
                    batch.failures.insert(key.clone(), e);
                }
            }
        }

        batch
    }

    fn source_variant<'a>(&self, element: &'a Element) -> Option<(&'a str, &'a str)> {
        match self.options.source_language.as_deref() {
            Some(language) => element
                .variants()
                .iter()
                .find(|(key, _)| key.as_str() == language)
                .or_else(|| {
                    element
                        .variants()
                        .iter()
                        .find(|(key, _)| crate::language_utils::language_codes_match(key, language))
                })
                .map(|(key, text)| (key.as_str(), text.as_str())),
            None => element
                .variants()
                .iter()
                .next()
                .map(|(key, text)| (key.as_str(), text.as_str())),
        }
    }

    // Configured target, else the lowest-sorted key other than the source
    fn target_variant<'a>(&self, element: &'a Element, source_language: &str) -> Option<(&'a str, &'a str)> {
        let mut candidates = element
            .variants()
            .iter()
            .filter(|(key, _)| key.as_str() != source_language);

        let target = match self.options.target_language.as_deref() {
            Some(target) => candidates
                .find(|(key, _)| key.as_str() == target || crate::language_utils::language_codes_match(key, target)),
            None => candidates.next(),
        };
        target.map(|(key, text)| (key.as_str(), text.as_str()))
    }

    fn pair_phrases(
        &self,
        map: &mut AlignmentMap,
        element: &Element,
        source_language: &str,
        target_language: &str,
        source: Phrase,
        target: Phrase,
    ) {
        if source.len() == target.len() && !source.is_empty() {
            for (index, (s, t)) in source.tokens().iter().zip(target.tokens()).enumerate() {
                map.pairs.push(AlignedPair {
                    element_id: element.id().to_string(),
                    source_language: source_language.to_string(),
                    target_language: target_language.to_string(),
                    index,
                    level: AlignmentLevel::Token,
                    source: Phrase::from_token(s),
                    target: Phrase::from_token(t),
                });
            }
        } else {
            debug!(
                "Element {} aligned phrase-level only ({} vs {} tokens)",
                element.id(),
                source.len(),
                target.len()
            );
            map.pairs.push(AlignedPair {
                element_id: element.id().to_string(),
                source_language: source_language.to_string(),
                target_language: target_language.to_string(),
                index: 0,
                level: AlignmentLevel::PhraseOnly,
                source,
                target,
            });
        }
    }
}

fn batch_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.with_extension("").to_string_lossy().replace('\\', "/")
}

/// Render an alignment map as typesetting source.
///
/// Consecutive pairs of the same element and language pair share one
/// `linterlinear` block.
pub fn render_alignment(map: &AlignmentMap) -> String {
    let mut body = String::new();
    let mut open: Option<(&str, &str, &str)> = None;

    for pair in map.pairs() {
        let key = (
            pair.element_id.as_str(),
            pair.source_language.as_str(),
            pair.target_language.as_str(),
        );
        if open != Some(key) {
            if open.is_some() {
                body.push_str("\\end{linterlinear}\n");
            }
            let _ = writeln!(
                body,
                "\\begin{{linterlinear}}{{{}}}{{{}}}{{{}}}",
                escape(key.0),
                escape(key.1),
                escape(key.2)
            );
            open = Some(key);
        }

        let command = match pair.level {
            AlignmentLevel::Token => "lgloss",
            AlignmentLevel::PhraseOnly => "lphrase",
        };
        let _ = writeln!(
            body,
            "  \\{}{{{}}}{{{}}}",
            command,
            escape(pair.source.text()),
            escape(pair.target.text())
        );
    }

    if open.is_some() {
        body.push_str("\\end{linterlinear}\n");
    }

    wrap_document(&body)
}

impl Adapter for InterlinearAdapter {
    type Input = BTreeMap<String, String>;
    type Output = InterlinearBatch;

    fn name(&self) -> &str {
        "interlinear"
    }

    fn transform(&self, inputs: &BTreeMap<String, String>) -> Result<InterlinearBatch, AdapterError> {
        Ok(self.align_batch(inputs))
    }
}
