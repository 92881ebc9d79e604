/*!
 * Token and phrase model.
 *
 * A `Phrase` is a span of text together with the ordered tokens that
 * reconstruct it. Tokenization is supplied through the `Tokenizer` trait so
 * callers can plug in an external analyzer; `WordTokenizer` is the default.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// Word runs (with inner apostrophes) or single punctuation marks
static WORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\w+(?:['’]\w+)*|[^\w\s]").expect("word pattern is valid")
});

/// Linguistic annotations produced by an external analyzer
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    /// Part of speech tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,

    /// Dictionary form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
}

/// Atomic lexical unit of a phrase.
///
/// Tokens compare by position first, so sorting a token list restores
/// phrase order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    position: usize,
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotation: Option<Annotation>,
}

impl Token {
    /// Create an unannotated token
    pub fn new(position: usize, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
            annotation: None,
        }
    }

    /// Surface text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Zero-based position within the owning phrase
    pub fn position(&self) -> usize {
        self.position
    }

    /// Annotations, if an analyzer supplied them
    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }

    /// Return a copy of this token carrying the given annotation
    pub fn with_annotation(&self, annotation: Annotation) -> Self {
        Self {
            position: self.position,
            text: self.text.clone(),
            annotation: Some(annotation),
        }
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then_with(|| self.text.cmp(&other.text))
            .then_with(|| self.annotation.cmp(&other.annotation))
    }
}

impl PartialOrd for Annotation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Annotation {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.part_of_speech, &self.lemma).cmp(&(&other.part_of_speech, &other.lemma))
    }
}

/// Splits text into tokens; must be deterministic for identical input
pub trait Tokenizer: Send + Sync {
    /// Tokenize text into surface strings in reading order
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Default tokenizer: Unicode word runs, punctuation as separate tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        WORD_REGEX
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Tokenizer that keeps punctuation attached to words
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }
}

/// Supplies annotations for tokens (external analyzer)
pub trait Annotator: Send + Sync {
    /// Annotate one token, given the whole phrase for context
    fn annotate(&self, token: &Token, phrase: &Phrase) -> Option<Annotation>;
}

/// Source text together with its ordered tokens
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phrase {
    text: String,
    tokens: Vec<Token>,
}

impl Phrase {
    /// Tokenize text into a phrase
    pub fn new(text: impl Into<String>, tokenizer: &dyn Tokenizer) -> Self {
        let text = text.into();
        let tokens = tokenizer
            .tokenize(&text)
            .into_iter()
            .enumerate()
            .map(|(position, surface)| Token::new(position, surface))
            .collect();

        Self { text, tokens }
    }

    /// Phrase holding a single token, used for token-level alignment pairs
    pub fn from_token(token: &Token) -> Self {
        Self {
            text: token.text.clone(),
            tokens: vec![Token {
                position: 0,
                text: token.text.clone(),
                annotation: token.annotation.clone(),
            }],
        }
    }

    /// Source text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Ordered tokens
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the phrase has no tokens
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Return a new phrase whose tokens carry the annotator's output
    pub fn annotate(&self, annotator: &dyn Annotator) -> Self {
        let tokens = self
            .tokens
            .iter()
            .map(|token| match annotator.annotate(token, self) {
                Some(annotation) => token.with_annotation(annotation),
                None => token.clone(),
            })
            .collect();

        Self {
            text: self.text.clone(),
            tokens,
        }
    }
}
