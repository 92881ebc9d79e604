/*!
 * Transformation adapters.
 *
 * Each adapter consumes an LDOM document (or raw markup) and produces one
 * output format. Adapters are pure: they never mutate their input and hold
 * no state between calls, so one instance can serve concurrent callers.
 */

use crate::errors::AdapterError;

pub mod interlinear;
pub mod latex;
pub mod typesetting;
pub mod ui_template;

pub use interlinear::{
    AlignedPair, AlignmentLevel, AlignmentMap, InterlinearAdapter, InterlinearBatch, InterlinearOptions,
    InterlinearOutput, render_alignment,
};
pub use typesetting::{TypesettingAdapter, TypesettingOptions};
pub use ui_template::{ExtractMode, TemplateNode, TemplateSource, UiTemplateAdapter};

/// Common interface for document transformations
pub trait Adapter: Send + Sync {
    /// What the adapter consumes
    type Input: ?Sized;
    /// What the adapter produces
    type Output;

    /// Short name used in logs
    fn name(&self) -> &str;

    /// Run the transformation
    fn transform(&self, input: &Self::Input) -> Result<Self::Output, AdapterError>;
}
