//! Constructor-time constraint checks for chart configurations.
//!
//! Construction is strict: a raw JSON value either becomes a fully
//! constrained [`ChartConfig`] or yields the list of violations found.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::column::ColumnRef;
use super::types::ChartConfig;

static COLUMN_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_\s\-.]*$").unwrap());

static MISSING_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"missing field `([^`]+)`").unwrap());

static UNKNOWN_VARIANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"unknown variant `([^`]*)`, expected (.*)").unwrap());

static BACKTICKED: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").unwrap());

/// Returns true if `name` is an acceptable column or metric name.
pub fn is_valid_column_name(name: &str) -> bool {
    COLUMN_NAME_PATTERN.is_match(name)
}

/// What kind of constraint was broken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A required field is absent.
    MissingField { field: String },
    /// An enumerated field holds a value outside its set.
    UnknownVariant { value: String, expected: Vec<String> },
    /// A field holds a value of the wrong JSON type.
    InvalidType,
    /// A list that must be non-empty is empty.
    EmptyList { field: String },
    /// A column name does not match the allowed pattern.
    InvalidName { value: String },
    /// Two column references share a label.
    DuplicateLabel { label: String },
    /// Anything the classifier could not place.
    Other,
}

/// A single constraint failure found while constructing a config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// Dotted path of the offending field (`y[0].aggregate`), or the best
    /// guess available.
    pub path: String,
    #[serde(flatten)]
    pub kind: ViolationKind,
    pub message: String,
}

impl ConstraintViolation {
    fn new(path: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    /// Classify a deserializer failure into a violation.
    ///
    /// serde reports one error at a time and without a field path, so the
    /// field is inferred from the message and, for enumerations, from the
    /// set of expected values.
    pub fn from_serde(err: &serde_json::Error) -> Self {
        let message = err.to_string();

        if let Some(caps) = MISSING_FIELD.captures(&message) {
            let field = caps[1].to_string();
            return Self::new(
                field.clone(),
                ViolationKind::MissingField { field },
                message,
            );
        }

        if let Some(caps) = UNKNOWN_VARIANT.captures(&message) {
            let value = caps[1].to_string();
            let expected: Vec<String> = BACKTICKED
                .captures_iter(&caps[2])
                .map(|c| c[1].to_string())
                .collect();
            let path = infer_enum_field(&expected);
            return Self::new(path, ViolationKind::UnknownVariant { value, expected }, message);
        }

        if message.starts_with("invalid type") || message.contains("did not match any variant") {
            return Self::new("", ViolationKind::InvalidType, message);
        }

        Self::new("", ViolationKind::Other, message)
    }
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

fn infer_enum_field(expected: &[String]) -> &'static str {
    let has = |v: &str| expected.iter().any(|e| e == v);
    if has("SUM") || has("COUNT_DISTINCT") {
        "aggregate"
    } else if has(">=") || has("!=") {
        "op"
    } else if has("scatter") || has("area") {
        "kind"
    } else if has("linear") {
        "scale"
    } else if has("bottom") {
        "position"
    } else if has("xy") || has("table") {
        "chart_type"
    } else {
        ""
    }
}

impl ChartConfig {
    /// Build a config from an untyped value, applying every data-model
    /// constraint.
    pub fn from_value(value: &Value) -> Result<Self, Vec<ConstraintViolation>> {
        let config: ChartConfig = serde_json::from_value(value.clone())
            .map_err(|e| vec![ConstraintViolation::from_serde(&e)])?;

        let violations = config.check_constraints();
        if violations.is_empty() {
            Ok(config)
        } else {
            Err(violations)
        }
    }

    /// Check the constraints serde cannot express: non-empty series, name
    /// pattern, and label uniqueness.
    pub fn check_constraints(&self) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        match self {
            ChartConfig::Xy(xy) if xy.y.is_empty() => violations.push(ConstraintViolation::new(
                "y",
                ViolationKind::EmptyList {
                    field: "y".to_string(),
                },
                "XY charts need at least one Y-axis metric",
            )),
            ChartConfig::Table(table) if table.columns.is_empty() => {
                violations.push(ConstraintViolation::new(
                    "columns",
                    ViolationKind::EmptyList {
                        field: "columns".to_string(),
                    },
                    "Table charts need at least one column",
                ))
            }
            _ => {}
        }

        let refs = self.column_refs();
        for (path, column) in &refs {
            check_name(&mut violations, &format!("{}.name", path), &column.name);
        }
        for (i, filter) in self.filters().iter().enumerate() {
            check_name(
                &mut violations,
                &format!("filters[{}].column", i),
                &filter.column,
            );
        }

        check_unique_labels(&mut violations, &refs);

        violations
    }
}

fn check_name(violations: &mut Vec<ConstraintViolation>, path: &str, name: &str) {
    if !is_valid_column_name(name) {
        violations.push(ConstraintViolation::new(
            path,
            ViolationKind::InvalidName {
                value: name.to_string(),
            },
            "Column names may contain only letters, digits, underscores, spaces, \
             hyphens and dots, and must start with a letter, digit or underscore",
        ));
    }
}

fn check_unique_labels(violations: &mut Vec<ConstraintViolation>, refs: &[(String, &ColumnRef)]) {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for (path, column) in refs {
        let Some(label) = column.label.as_deref() else {
            continue;
        };
        if let Some(first) = seen.get(label) {
            violations.push(ConstraintViolation::new(
                format!("{}.label", path),
                ViolationKind::DuplicateLabel {
                    label: label.to_string(),
                },
                format!("Label is already used by {}", first),
            ));
        } else {
            seen.insert(label, path.as_str());
        }
    }
}
