//! Heuristic checks on a request that is structurally valid.
//!
//! These catch requests that would run but almost certainly produce
//! nothing useful: filters that contradict each other, filters on values
//! that usually match no rows, and charts asking for too many series.

use std::cmp::Ordering;

use chrono::Datelike;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::chart::{ChartConfig, DatasetId, FilterConfig, FilterOp};
use crate::settings::ValidatorConfig;

use super::builder::{ErrorBuilder, TemplateVars};
use super::error::{ErrorType, ValidationError};
use super::sanitize::sanitize_user_input;
use super::templates::TemplateKey;

/// ISO-like date literal: `2031-01-01`, `2031-01`, `2031-01-01T00:00:00`.
static DATE_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{4})-\d{1,2}(-\d{1,2})?([T ].*)?\s*$").unwrap());

/// A heuristic check run after the dataset layer.
///
/// Implementations must be thread-safe (Send + Sync) so one pipeline can
/// serve concurrent validations.
pub trait RuntimeValidator: Send + Sync {
    /// Name of this check (for logging).
    fn name(&self) -> &str;

    /// Check a normalized config. An error rejects the request unless the
    /// pipeline is configured to treat heuristics as advisory.
    fn validate(&self, config: &ChartConfig, dataset_id: &DatasetId) -> Result<(), ValidationError>;
}

/// Contradiction and likely-empty-result checks on filters.
#[derive(Debug, Clone)]
pub struct FilterHeuristics {
    lifecycle_keywords: Vec<String>,
    future_year_margin: i32,
    reference_year: Option<i32>,
}

impl Default for FilterHeuristics {
    fn default() -> Self {
        Self::from_config(&ValidatorConfig::default())
    }
}

impl FilterHeuristics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self {
            lifecycle_keywords: config
                .lifecycle_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            future_year_margin: config.future_year_margin,
            reference_year: None,
        }
    }

    /// Pin "this year" instead of reading the clock.
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    fn current_year(&self) -> i32 {
        self.reference_year
            .unwrap_or_else(|| chrono::Utc::now().year())
    }

    /// Run both filter checks. Contradictions are reported before
    /// likely-empty results.
    pub fn validate_filters(&self, filters: &[FilterConfig]) -> Result<(), ValidationError> {
        self.check_contradictions(filters)?;
        self.check_empty_results(filters)
    }

    fn check_contradictions(&self, filters: &[FilterConfig]) -> Result<(), ValidationError> {
        let mut by_column: IndexMap<String, Vec<&FilterConfig>> = IndexMap::new();
        for filter in filters {
            by_column
                .entry(filter.column.to_lowercase())
                .or_default()
                .push(filter);
        }

        for group in by_column.values() {
            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    if contradicts(a, b) || contradicts(b, a) {
                        return Err(contradiction_error(a, b));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_empty_results(&self, filters: &[FilterConfig]) -> Result<(), ValidationError> {
        for filter in filters {
            match filter.op {
                FilterOp::Eq => {
                    let Some(text) = filter.value.as_text() else {
                        continue;
                    };
                    let lowered = text.to_lowercase();
                    if let Some(keyword) = self
                        .lifecycle_keywords
                        .iter()
                        .find(|k| lowered.contains(k.as_str()))
                    {
                        return Err(empty_result_error(
                            filter,
                            format!(
                                "The value contains '{}', a lifecycle state that usually matches few or no rows.",
                                sanitize_user_input(keyword)
                            ),
                            vec![format!(
                                "Confirm that rows with {} = '{}' exist before charting them",
                                sanitize_user_input(&filter.column),
                                sanitize_user_input(text)
                            )],
                        ));
                    }
                }
                FilterOp::Gt | FilterOp::Gte => {
                    let Some(year) = filter.value.as_text().and_then(literal_year) else {
                        continue;
                    };
                    let threshold = self.current_year() + self.future_year_margin;
                    if year > threshold {
                        return Err(empty_result_error(
                            filter,
                            format!(
                                "The filter only keeps dates after the year {}, which lies in the future.",
                                year
                            ),
                            vec![format!(
                                "Use a date in the past or the current year for '{}'",
                                sanitize_user_input(&filter.column)
                            )],
                        ));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl RuntimeValidator for FilterHeuristics {
    fn name(&self) -> &str {
        "filter heuristics"
    }

    fn validate(&self, config: &ChartConfig, _dataset_id: &DatasetId) -> Result<(), ValidationError> {
        self.validate_filters(config.filters())
    }
}

/// Limits on how many series a single chart may request.
#[derive(Debug, Clone)]
pub struct PerformanceHeuristics {
    max_y_metrics: usize,
    max_table_columns: usize,
}

impl Default for PerformanceHeuristics {
    fn default() -> Self {
        Self::from_config(&ValidatorConfig::default())
    }
}

impl PerformanceHeuristics {
    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self {
            max_y_metrics: config.max_y_metrics,
            max_table_columns: config.max_table_columns,
        }
    }
}

impl RuntimeValidator for PerformanceHeuristics {
    fn name(&self) -> &str {
        "performance heuristics"
    }

    fn validate(&self, config: &ChartConfig, _dataset_id: &DatasetId) -> Result<(), ValidationError> {
        let (count, limit, what, code) = match config {
            ChartConfig::Xy(xy) => (xy.y.len(), self.max_y_metrics, "Y-axis metrics", "TOO_MANY_METRICS"),
            ChartConfig::Table(table) => (
                table.columns.len(),
                self.max_table_columns,
                "table columns",
                "TOO_MANY_COLUMNS",
            ),
        };
        if count <= limit {
            return Ok(());
        }

        Err(ErrorBuilder::build(
            ErrorType::PerformanceWarning,
            TemplateKey::PerformanceWarning,
            &TemplateVars::new().with_trusted(
                "reason",
                format!("The chart requests {} {}; at most {} are supported.", count, what, limit),
            ),
            &[format!("Keep at most {} {}", limit, what)],
            Some(code),
        ))
    }
}

/// Year of an ISO-like date literal.
fn literal_year(text: &str) -> Option<i32> {
    DATE_LITERAL
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Whether `a` and `b`, on the same column, can never both hold. Checked
/// in one direction; callers try both orders.
fn contradicts(a: &FilterConfig, b: &FilterConfig) -> bool {
    match (a.op, b.op) {
        (FilterOp::Eq, FilterOp::Eq) => !a.value.same_literal(&b.value),
        (FilterOp::Eq, FilterOp::Ne) => a.value.same_literal(&b.value),
        (FilterOp::Eq, op) if op.is_lower_bound() => {
            below(a.value.compare(&b.value), op.is_strict())
        }
        (FilterOp::Eq, op) if op.is_upper_bound() => {
            below(b.value.compare(&a.value), op.is_strict())
        }
        (lo, hi) if lo.is_lower_bound() && hi.is_upper_bound() => {
            below(b.value.compare(&a.value), lo.is_strict() || hi.is_strict())
        }
        _ => false,
    }
}

/// `Less`, or `Equal` when the bound excludes equality.
fn below(ordering: Option<Ordering>, strict: bool) -> bool {
    matches!(ordering, Some(Ordering::Less)) || (strict && ordering == Some(Ordering::Equal))
}

/// `column op value`, with the column and value sanitized.
fn describe(filter: &FilterConfig) -> String {
    format!(
        "{} {} {}",
        sanitize_user_input(&filter.column),
        filter.op,
        sanitize_user_input(&filter.value)
    )
}

fn contradiction_error(a: &FilterConfig, b: &FilterConfig) -> ValidationError {
    let column = sanitize_user_input(&a.column);
    ErrorBuilder::build(
        ErrorType::FilterContradiction,
        TemplateKey::IncompatibleConfiguration,
        &TemplateVars::new()
            .with_trusted("reason", format!("Contradictory filters on column '{}'", column))
            .with_trusted(
                "details",
                format!(
                    "'{}' and '{}' can never both be true, so the query would return no rows.",
                    describe(a),
                    describe(b)
                ),
            ),
        &[
            format!("Remove one of the conflicting filters on '{}'", column),
            format!("To select a range on '{}', make the lower bound smaller than the upper bound", column),
        ],
        Some("FILTER_CONTRADICTION"),
    )
}

fn empty_result_error(filter: &FilterConfig, reason: String, suggestions: Vec<String>) -> ValidationError {
    ErrorBuilder::build(
        ErrorType::EmptyResult,
        TemplateKey::EmptyResult,
        &TemplateVars::new().with_trusted("reason", format!("Filter '{}': {}", describe(filter), reason)),
        &suggestions,
        Some("LIKELY_EMPTY_RESULT"),
    )
}
