//! Validation of chart references against a dataset, and canonicalization
//! of reference names to the dataset's stored spelling.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::chart::{Aggregate, ChartConfig, DatasetId};
use crate::dataset::{DatasetContext, DatasetRepository, RepositoryError, ResolvedRef};
use crate::settings::ValidatorConfig;

use super::builder::{ErrorBuilder, TemplateVars};
use super::error::{ErrorType, ValidationError};
use super::fuzzy::suggest_similar;
use super::sanitize::sanitize_user_input;
use super::templates::TemplateKey;

/// How many column names to list when no close match exists.
const FALLBACK_COLUMN_LISTING: usize = 5;

/// Why a dataset check did not pass.
#[derive(Debug)]
pub enum DatasetCheckError {
    /// The request is invalid for this dataset.
    Rejected(ValidationError),
    /// The dataset could not be looked up.
    Lookup(RepositoryError),
}

impl From<ValidationError> for DatasetCheckError {
    fn from(err: ValidationError) -> Self {
        DatasetCheckError::Rejected(err)
    }
}

impl From<RepositoryError> for DatasetCheckError {
    fn from(err: RepositoryError) -> Self {
        DatasetCheckError::Lookup(err)
    }
}

/// A name used by the config, with where it was used.
struct Reference<'a> {
    path: String,
    name: &'a str,
    aggregate: Option<Aggregate>,
}

fn references(config: &ChartConfig) -> Vec<Reference<'_>> {
    let mut refs: Vec<Reference<'_>> = config
        .column_refs()
        .into_iter()
        .map(|(path, column)| Reference {
            path,
            name: &column.name,
            aggregate: column.aggregate,
        })
        .collect();
    refs.extend(config.filters().iter().enumerate().map(|(i, f)| Reference {
        path: format!("filters[{}].column", i),
        name: &f.column,
        aggregate: None,
    }));
    refs
}

/// Checks chart references against a dataset from a repository.
#[derive(Clone)]
pub struct DatasetValidator {
    repository: Arc<dyn DatasetRepository>,
    fuzzy_cutoff: f64,
    max_suggestions: usize,
    max_listed: usize,
}

impl DatasetValidator {
    pub fn new(repository: Arc<dyn DatasetRepository>) -> Self {
        Self::with_config(repository, &ValidatorConfig::default())
    }

    pub fn with_config(repository: Arc<dyn DatasetRepository>, config: &ValidatorConfig) -> Self {
        Self {
            repository,
            fuzzy_cutoff: config.fuzzy_cutoff,
            max_suggestions: config.max_fuzzy_suggestions,
            max_listed: config.max_listed_columns.max(1),
        }
    }

    /// Name of the underlying repository.
    pub fn repository_name(&self) -> &str {
        self.repository.name()
    }

    /// Look the dataset up. A missing dataset is a rejection.
    pub fn load_context(&self, id: &DatasetId) -> Result<DatasetContext, DatasetCheckError> {
        match self.repository.resolve(id)? {
            Some(context) => Ok(context),
            None => {
                debug!(dataset_id = %id, "dataset not found");
                Err(DatasetCheckError::Rejected(dataset_not_found(id)))
            }
        }
    }

    /// Check every reference of `config` against the dataset `id`.
    pub fn validate_against_dataset(
        &self,
        config: &ChartConfig,
        id: &DatasetId,
    ) -> Result<(), DatasetCheckError> {
        let context = self.load_context(id)?;
        self.validate_with_context(config, &context)?;
        Ok(())
    }

    /// Check every reference of `config` against an already loaded dataset.
    ///
    /// Unknown names are reported first; aggregate compatibility is only
    /// checked once every name resolves.
    pub fn validate_with_context(
        &self,
        config: &ChartConfig,
        context: &DatasetContext,
    ) -> Result<(), ValidationError> {
        let refs = references(config);

        let mut seen = HashSet::new();
        let unknown: Vec<&Reference<'_>> = refs
            .iter()
            .filter(|r| context.resolve(r.name).is_none())
            .filter(|r| seen.insert(r.name.to_lowercase()))
            .collect();

        match unknown.as_slice() {
            [] => {}
            [single] => return Err(self.column_not_found(single, context)),
            many => return Err(self.columns_not_found(many, context)),
        }

        let incompatible: Vec<ValidationError> = refs
            .iter()
            .filter_map(|r| {
                let aggregate = r.aggregate?;
                match context.resolve(r.name)? {
                    ResolvedRef::Column(column)
                        if aggregate.requires_numeric() && !column.accepts_numeric_aggregate() =>
                    {
                        Some(invalid_aggregation(r, aggregate, &column.name, &column.data_type))
                    }
                    _ => None,
                }
            })
            .collect();

        let Some(first) = incompatible.first().cloned() else {
            return Ok(());
        };
        if incompatible.len() == 1 {
            Err(first)
        } else {
            Err(first.with_validation_errors(incompatible))
        }
    }

    /// Rewrite reference names to the dataset's stored spelling. Never
    /// fails: when the dataset cannot be loaded the config is returned
    /// unchanged.
    pub fn normalize(&self, config: &ChartConfig, id: &DatasetId) -> ChartConfig {
        match self.repository.resolve(id) {
            Ok(Some(context)) => normalize_config(config, &context),
            Ok(None) => config.clone(),
            Err(err) => {
                warn!(dataset_id = %id, error = %err, "normalization skipped");
                config.clone()
            }
        }
    }

    fn column_not_found(&self, reference: &Reference<'_>, context: &DatasetContext) -> ValidationError {
        let matches = suggest_similar(reference.name, context, self.max_suggestions, self.fuzzy_cutoff);
        let mut suggestions: Vec<String> = matches.iter().map(|m| m.suggestion()).collect();
        if suggestions.is_empty() {
            suggestions.push(available_columns(context));
        }

        ErrorBuilder::build(
            ErrorType::ColumnNotFound,
            TemplateKey::ColumnNotFound,
            &TemplateVars::new().with("column", reference.name).with_trusted(
                "details",
                format!(
                    "'{}' (used in {}) is not a column or saved metric of {}.",
                    sanitize_user_input(reference.name),
                    reference.path,
                    sanitize_user_input(context.qualified_name())
                ),
            ),
            &suggestions,
            Some("COLUMN_NOT_FOUND"),
        )
    }

    fn columns_not_found(&self, unknown: &[&Reference<'_>], context: &DatasetContext) -> ValidationError {
        let listed: Vec<String> = unknown
            .iter()
            .take(self.max_listed)
            .map(|r| sanitize_user_input(r.name))
            .collect();
        let mut column = listed.join(", ");
        if unknown.len() > listed.len() {
            column.push_str(&format!(" and {} more", unknown.len() - listed.len()));
        }

        let per_column: Vec<ValidationError> = unknown
            .iter()
            .map(|r| self.column_not_found(r, context))
            .collect();

        // Best suggestion of each unknown name.
        let mut suggestions: Vec<String> = per_column
            .iter()
            .filter_map(|e| e.suggestions.first().cloned())
            .collect();
        suggestions.dedup();

        let paths: Vec<&str> = unknown.iter().map(|r| r.path.as_str()).collect();
        ErrorBuilder::build(
            ErrorType::ColumnNotFound,
            TemplateKey::ColumnNotFound,
            &TemplateVars::new().with_trusted("column", column).with_trusted(
                "details",
                format!(
                    "{} references ({}) do not match any column or saved metric of {}.",
                    unknown.len(),
                    paths.join(", "),
                    sanitize_user_input(context.qualified_name())
                ),
            ),
            &suggestions,
            Some("MULTIPLE_COLUMNS_NOT_FOUND"),
        )
        .with_validation_errors(per_column)
    }
}

/// Canonical spelling of `name` in `context`, or `name` itself.
fn canonical(name: &str, context: &DatasetContext) -> String {
    context
        .resolve(name)
        .map(|r| r.name().to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Rewrite every reference in `config` to the dataset's stored spelling.
///
/// Names with no match are left as they are. Applying this twice gives
/// the same result as applying it once.
pub fn normalize_config(config: &ChartConfig, context: &DatasetContext) -> ChartConfig {
    let mut normalized = config.clone();
    match &mut normalized {
        ChartConfig::Xy(xy) => {
            xy.x.name = canonical(&xy.x.name, context);
            for column in xy.y.iter_mut() {
                column.name = canonical(&column.name, context);
            }
            if let Some(group_by) = xy.group_by.as_mut() {
                group_by.name = canonical(&group_by.name, context);
            }
            for filter in xy.filters.iter_mut().flatten() {
                filter.column = canonical(&filter.column, context);
            }
        }
        ChartConfig::Table(table) => {
            for column in table.columns.iter_mut() {
                column.name = canonical(&column.name, context);
            }
            for filter in table.filters.iter_mut().flatten() {
                filter.column = canonical(&filter.column, context);
            }
            for entry in table.sort_by.iter_mut().flatten() {
                *entry = canonical(entry, context);
            }
        }
    }
    normalized
}

fn dataset_not_found(id: &DatasetId) -> ValidationError {
    ErrorBuilder::build(
        ErrorType::DatasetNotFound,
        TemplateKey::DatasetNotFound,
        &TemplateVars::new().with("dataset_id", id),
        &[],
        Some("DATASET_NOT_FOUND"),
    )
}

fn invalid_aggregation(
    reference: &Reference<'_>,
    aggregate: Aggregate,
    column: &str,
    data_type: &str,
) -> ValidationError {
    let data_type = if data_type.is_empty() {
        "unknown".to_string()
    } else {
        sanitize_user_input(data_type)
    };
    let column = sanitize_user_input(column);
    ErrorBuilder::build(
        ErrorType::InvalidAggregation,
        TemplateKey::IncompatibleConfiguration,
        &TemplateVars::new()
            .with_trusted(
                "reason",
                format!("{} cannot be applied to non-numeric column '{}'", aggregate, column),
            )
            .with_trusted(
                "details",
                format!(
                    "{} has type {}; {} needs a numeric column.",
                    reference.path, data_type, aggregate
                ),
            ),
        &[
            format!("Use COUNT or COUNT_DISTINCT on '{}' instead", column),
            format!("Pick a numeric column for {}", aggregate),
        ],
        Some("INVALID_AGGREGATION"),
    )
}

fn available_columns(context: &DatasetContext) -> String {
    let names: Vec<String> = context
        .available_columns
        .iter()
        .take(FALLBACK_COLUMN_LISTING)
        .map(|c| sanitize_user_input(&c.name))
        .collect();
    if names.is_empty() {
        return "The dataset exposes no columns; check the dataset id".to_string();
    }
    let more = context.available_columns.len().saturating_sub(names.len());
    if more > 0 {
        format!("Available columns include: {} (and {} more)", names.join(", "), more)
    } else {
        format!("Available columns: {}", names.join(", "))
    }
}
