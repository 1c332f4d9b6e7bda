//! Validation pipeline for chart requests.
//!
//! Stages run in a fixed order: schema, dataset (with normalization), then
//! runtime heuristics. Every stage reports rejections as a
//! [`ValidationError`] built through the shared [`ErrorBuilder`].

mod builder;
mod dataset;
mod error;
mod fuzzy;
mod pipeline;
mod runtime;
mod schema;
pub mod sanitize;
mod templates;

pub use builder::{ErrorBuilder, MAX_CUSTOM_SUGGESTIONS, MAX_SUGGESTIONS, TemplateVars};
pub use dataset::{DatasetCheckError, DatasetValidator, normalize_config};
pub use error::{ErrorType, ValidationError};
pub use fuzzy::{FuzzyMatch, closest_matches, suggest_similar};
pub use pipeline::{PipelineStage, ValidatedRequest, ValidationPipeline};
pub use runtime::{FilterHeuristics, PerformanceHeuristics, RuntimeValidator};
pub use schema::SchemaValidator;
pub use templates::{ErrorTemplate, TemplateKey, registry};
