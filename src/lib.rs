/*!
 * # ldom-render - Liturgical document rendering
 *
 * A Rust library that turns multilingual liturgical templates into
 * typesetting source, interlinear alignments and UI template trees, and
 * drives the external typesetting tool that produces the final PDF.
 *
 * ## Features
 *
 * - Liturgical document object model (LDOM) with per-language text variants
 * - Markup and JSON intake
 * - Transformation adapters:
 *   - Typesetting (LaTeX source with parallel language columns)
 *   - Interlinear word alignment
 *   - UI template extraction
 * - Rendering jobs executed one at a time under a hard timeout
 * - ISO 639-1 and ISO 639-2 language code matching for variant lookup
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `document`: the LDOM tree, its builder and markup intake
 * - `phrase`: tokens, phrases and the tokenizer seam
 * - `adapters`: transformations from documents to output formats:
 *   - `adapters::typesetting`: LaTeX source generation
 *   - `adapters::interlinear`: word alignment between languages
 *   - `adapters::ui_template`: template trees for user interfaces
 * - `render`: rendering jobs, the workspace and the job runner
 * - `app_config`: Configuration management
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod adapters;
pub mod app_config;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod phrase;
pub mod render;

// Re-export main types for easier usage
pub use adapters::{Adapter, InterlinearAdapter, TypesettingAdapter, UiTemplateAdapter};
pub use app_config::Config;
pub use document::{Document, DocumentBuilder, Element, ElementKind};
pub use errors::{AdapterError, AppError, DocumentError, RenderError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use phrase::{Phrase, Token, Tokenizer, WordTokenizer};
pub use render::{Artifact, JobId, JobRunner, JobState, RunnerConfig};
