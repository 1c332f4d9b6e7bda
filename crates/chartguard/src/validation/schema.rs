//! Structural validation of raw chart requests.
//!
//! Runs cheap shape checks on the untyped payload first, so the common
//! mistakes get dedicated errors, then builds the typed request and
//! rewrites any constraint violations into chart-specific guidance.

use serde_json::{Map, Value};
use tracing::debug;

use crate::chart::{
    Aggregate, ChartConfig, ChartKind, ChartRequest, ConstraintViolation, DatasetId, FilterOp,
    ViolationKind,
};

use super::builder::{ErrorBuilder, TemplateVars};
use super::error::{ErrorType, ValidationError};
use super::fuzzy::closest_matches;
use super::sanitize::sanitize_user_input;
use super::templates::TemplateKey;

const XY_EXAMPLE: &str = r#"Example: {"chart_type": "xy", "x": {"name": "order_date"}, "y": [{"name": "sales", "aggregate": "SUM"}], "kind": "line"}"#;
const TABLE_EXAMPLE: &str = r#"Example: {"chart_type": "table", "columns": [{"name": "region"}, {"name": "sales", "aggregate": "SUM"}]}"#;
const REQUEST_EXAMPLE: &str = r#"Example: {"dataset_id": 18, "config": {"chart_type": "table", "columns": [{"name": "region"}]}}"#;

/// Validates request structure and builds the typed request.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a raw request and build the typed [`ChartRequest`].
    pub fn validate(&self, raw: &Value) -> Result<ChartRequest, ValidationError> {
        let (dataset_id, config) = Self::pre_validate(raw)?;

        let dataset_id = DatasetId::from_value(dataset_id).ok_or_else(|| {
            ErrorBuilder::build(
                ErrorType::InvalidType,
                TemplateKey::InvalidType,
                &TemplateVars::new()
                    .with("field", "dataset_id")
                    .with("expected", "an integer id or a UUID string")
                    .with("actual", compact(dataset_id)),
                &["Use the numeric dataset id (e.g. 18) or the dataset UUID".to_string()],
                Some("INVALID_DATASET_ID"),
            )
        })?;

        let config = ChartConfig::from_value(&Value::Object(config.clone())).map_err(|violations| {
            debug!(count = violations.len(), "config failed typed construction");
            Self::violations_to_error(&violations)
        })?;

        Ok(ChartRequest { dataset_id, config })
    }

    /// Shape checks on the untyped payload. Returns the raw dataset id and
    /// config map on success.
    fn pre_validate(raw: &Value) -> Result<(&Value, &Map<String, Value>), ValidationError> {
        let Some(request) = raw.as_object() else {
            return Err(invalid_type(
                "request",
                "a JSON object",
                json_type(raw),
                vec![REQUEST_EXAMPLE.to_string()],
                "INVALID_REQUEST_FORMAT",
            ));
        };

        let Some(dataset_id) = present(request, "dataset_id") else {
            return Err(missing_field(
                "dataset_id",
                "Every chart request must name the dataset to chart.",
                vec![REQUEST_EXAMPLE.to_string()],
                "MISSING_DATASET_ID",
            ));
        };

        let Some(config) = present(request, "config") else {
            return Err(missing_field(
                "config",
                "Every chart request needs a chart configuration.",
                vec![REQUEST_EXAMPLE.to_string()],
                "MISSING_CONFIG",
            ));
        };

        let Some(config) = config.as_object() else {
            return Err(invalid_type(
                "config",
                "a JSON object",
                json_type(config),
                vec![XY_EXAMPLE.to_string(), TABLE_EXAMPLE.to_string()],
                "INVALID_CONFIG_FORMAT",
            ));
        };

        let Some(chart_type) = present(config, "chart_type") else {
            let mut suggestions = Vec::new();
            if let Some(inferred) = infer_chart_type(config) {
                suggestions.push(format!(
                    "The fields present suggest chart_type '{}'",
                    inferred
                ));
            }
            suggestions.push("Set chart_type to 'xy' or 'table'".to_string());
            return Err(missing_field(
                "chart_type",
                "The config must say which kind of chart to build.",
                suggestions,
                "MISSING_CHART_TYPE",
            ));
        };

        match chart_type.as_str() {
            Some("xy") => Self::pre_validate_xy(config)?,
            Some("table") => Self::pre_validate_table(config)?,
            _ => return Err(invalid_chart_type(chart_type)),
        }

        Ok((dataset_id, config))
    }

    fn pre_validate_xy(config: &Map<String, Value>) -> Result<(), ValidationError> {
        let x = present(config, "x");
        let y = present(config, "y");

        match (x, y) {
            (None, None) => Err(xy_missing_fields()),
            (None, Some(_)) => Err(missing_field(
                "x",
                "XY charts need an X-axis column.",
                vec![
                    r#"Add an X-axis column such as {"name": "order_date"}"#.to_string(),
                    XY_EXAMPLE.to_string(),
                ],
                "XY_MISSING_X",
            )),
            (Some(_), None) => Err(missing_field(
                "y",
                "XY charts need at least one Y-axis metric.",
                vec![
                    r#"Add a list of metrics such as [{"name": "sales", "aggregate": "SUM"}]"#
                        .to_string(),
                    XY_EXAMPLE.to_string(),
                ],
                "XY_MISSING_Y",
            )),
            (Some(_), Some(y)) if !y.is_array() => Err(invalid_type(
                "y",
                "a list of column objects",
                json_type(y),
                vec![
                    r#"Wrap a single metric in a list: "y": [{"name": "sales"}]"#.to_string(),
                    XY_EXAMPLE.to_string(),
                ],
                "INVALID_Y_FORMAT",
            )),
            _ => Ok(()),
        }
    }

    fn pre_validate_table(config: &Map<String, Value>) -> Result<(), ValidationError> {
        match present(config, "columns") {
            None => Err(missing_field(
                "columns",
                "Table charts need a list of columns to display.",
                vec![TABLE_EXAMPLE.to_string()],
                "TABLE_MISSING_COLUMNS",
            )),
            Some(columns) if !columns.is_array() => Err(invalid_type(
                "columns",
                "a list of column objects",
                json_type(columns),
                vec![
                    r#"Wrap columns in a list: "columns": [{"name": "region"}]"#.to_string(),
                    TABLE_EXAMPLE.to_string(),
                ],
                "INVALID_COLUMNS_FORMAT",
            )),
            Some(_) => Ok(()),
        }
    }

    /// First violation becomes the error; all of them are listed when
    /// there is more than one.
    fn violations_to_error(violations: &[ConstraintViolation]) -> ValidationError {
        let errors: Vec<ValidationError> =
            violations.iter().map(Self::violation_to_error).collect();
        let Some(first) = errors.first().cloned() else {
            return ErrorBuilder::system_error("constraint check failed without violations");
        };
        if errors.len() == 1 {
            first
        } else {
            first.with_validation_errors(errors)
        }
    }

    fn violation_to_error(violation: &ConstraintViolation) -> ValidationError {
        match &violation.kind {
            ViolationKind::MissingField { field } if field == "x" || field == "y" => {
                xy_missing_fields()
            }
            ViolationKind::MissingField { field } if field == "columns" => missing_field(
                "columns",
                "Table charts need a list of columns to display.",
                vec![TABLE_EXAMPLE.to_string()],
                "TABLE_MISSING_COLUMNS",
            ),
            ViolationKind::MissingField { field } => missing_field(
                field,
                "A column reference or filter is incomplete.",
                vec![
                    r#"Column references need a name: {"name": "sales"}"#.to_string(),
                    r#"Filters need column, op and value: {"column": "region", "op": "=", "value": "West"}"#
                        .to_string(),
                ],
                "SCHEMA_VALIDATION_FAILED",
            ),
            ViolationKind::UnknownVariant { value, .. } => {
                unknown_variant(&violation.path, value)
            }
            ViolationKind::EmptyList { field } if field == "y" => ErrorBuilder::build(
                ErrorType::ValidationError,
                TemplateKey::InvalidValue,
                &TemplateVars::new()
                    .with("field", "y")
                    .with("reason", "XY charts need at least one Y-axis metric."),
                &[XY_EXAMPLE.to_string()],
                Some("EMPTY_Y_AXIS"),
            ),
            ViolationKind::EmptyList { field } => ErrorBuilder::build(
                ErrorType::ValidationError,
                TemplateKey::InvalidValue,
                &TemplateVars::new()
                    .with("field", field)
                    .with("reason", "Table charts need at least one column."),
                &[TABLE_EXAMPLE.to_string()],
                Some("EMPTY_COLUMNS"),
            ),
            ViolationKind::InvalidName { value } => ErrorBuilder::build(
                ErrorType::InvalidValue,
                TemplateKey::InvalidValue,
                &TemplateVars::new()
                    .with("field", &violation.path)
                    .with_trusted(
                        "reason",
                        format!(
                            "'{}' is not a valid column name. {}",
                            sanitize_user_input(value),
                            violation.message
                        ),
                    ),
                &["Use the column name exactly as it appears in the dataset".to_string()],
                Some("INVALID_COLUMN_NAME"),
            ),
            ViolationKind::DuplicateLabel { label } => ErrorBuilder::build(
                ErrorType::InvalidValue,
                TemplateKey::InvalidValue,
                &TemplateVars::new()
                    .with("field", &violation.path)
                    .with_trusted(
                        "reason",
                        format!(
                            "Label '{}' is used more than once. {}",
                            sanitize_user_input(label),
                            violation.message
                        ),
                    ),
                &["Give every column a distinct label, or omit labels".to_string()],
                Some("DUPLICATE_LABELS"),
            ),
            ViolationKind::InvalidType => wrong_shape(&violation.message),
            ViolationKind::Other => ErrorBuilder::build(
                ErrorType::ValidationError,
                TemplateKey::InvalidValue,
                &TemplateVars::new()
                    .with("field", "config")
                    .with("reason", &violation.message),
                &[XY_EXAMPLE.to_string(), TABLE_EXAMPLE.to_string()],
                Some("SCHEMA_VALIDATION_FAILED"),
            ),
        }
    }
}

/// A key that exists and is not `null`.
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn compact(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Guess the intended chart type from the fields present.
fn infer_chart_type(config: &Map<String, Value>) -> Option<&'static str> {
    if config.contains_key("x") || config.contains_key("y") {
        Some("xy")
    } else if config.contains_key("columns") {
        Some("table")
    } else {
        None
    }
}

fn missing_field(
    field: &str,
    details: &str,
    suggestions: Vec<String>,
    code: &str,
) -> ValidationError {
    ErrorBuilder::build(
        ErrorType::MissingField,
        TemplateKey::MissingField,
        &TemplateVars::new()
            .with("field", field)
            .with_trusted("details", details),
        &suggestions,
        Some(code),
    )
}

fn invalid_type(
    field: &str,
    expected: &str,
    actual: &str,
    suggestions: Vec<String>,
    code: &str,
) -> ValidationError {
    ErrorBuilder::build(
        ErrorType::InvalidType,
        TemplateKey::InvalidType,
        &TemplateVars::new()
            .with("field", field)
            .with_trusted("expected", expected)
            .with_trusted("actual", actual),
        &suggestions,
        Some(code),
    )
}

fn xy_missing_fields() -> ValidationError {
    ErrorBuilder::build(
        ErrorType::MissingField,
        TemplateKey::MissingField,
        &TemplateVars::new().with("field", "x and y").with_trusted(
            "details",
            "XY chart missing required fields: both an X-axis column and a list of Y-axis metrics are needed.",
        ),
        &[
            XY_EXAMPLE.to_string(),
            "Use chart_type 'table' if you only want to list columns".to_string(),
        ],
        Some("XY_MISSING_FIELDS"),
    )
}

fn invalid_chart_type(chart_type: &Value) -> ValidationError {
    let given = compact(chart_type);
    let mut suggestions = Vec::new();
    if let Some(kind) = ChartKind::ALL.iter().find(|k| k.as_str() == given.to_lowercase()) {
        suggestions.push(format!(
            "'{}' is a chart kind: use chart_type 'xy' with kind '{}'",
            sanitize_user_input(&given),
            kind.as_str()
        ));
    }
    ErrorBuilder::build(
        ErrorType::InvalidChartType,
        TemplateKey::InvalidChartType,
        &TemplateVars::new()
            .with("chart_type", &given)
            .with_trusted("allowed", ChartConfig::CHART_TYPES.join(", ")),
        &suggestions,
        Some("INVALID_CHART_TYPE"),
    )
}

/// Error for an enumerated field holding an unknown value.
fn unknown_variant(field: &str, value: &str) -> ValidationError {
    let (allowed, code, candidates): (String, &str, Vec<&str>) = match field {
        "aggregate" => (
            Aggregate::allowed_list(),
            "INVALID_AGGREGATE",
            Aggregate::ALL.iter().map(|a| a.as_str()).collect(),
        ),
        "op" => (
            FilterOp::allowed_list(),
            "INVALID_FILTER_OPERATOR",
            FilterOp::ALL.iter().map(|o| o.as_str()).collect(),
        ),
        "kind" => {
            let names: Vec<&str> = ChartKind::ALL.iter().map(|k| k.as_str()).collect();
            (names.join(", "), "INVALID_CHART_KIND", names)
        }
        "chart_type" => return invalid_chart_type(&Value::String(value.to_string())),
        "scale" => ("linear, log".to_string(), "INVALID_VALUE", vec!["linear", "log"]),
        "position" => (
            "top, bottom, left, right".to_string(),
            "INVALID_VALUE",
            vec!["top", "bottom", "left", "right"],
        ),
        _ => (String::new(), "SCHEMA_VALIDATION_FAILED", Vec::new()),
    };

    let mut suggestions: Vec<String> = closest_matches(value, candidates, 2, 0.5)
        .into_iter()
        .map(|(name, _)| format!("Did you mean '{}'?", name))
        .collect();
    if !allowed.is_empty() {
        suggestions.push(format!("Allowed values for '{}': {}", field, allowed));
    }

    let value = sanitize_user_input(value);
    let reason = if allowed.is_empty() {
        format!("'{}' is not an accepted value.", value)
    } else {
        format!("'{}' is not one of: {}.", value, allowed)
    };
    let field = if field.is_empty() { "config" } else { field };

    ErrorBuilder::build(
        ErrorType::InvalidValue,
        TemplateKey::InvalidValue,
        &TemplateVars::new()
            .with("field", field)
            .with_trusted("reason", reason),
        &suggestions,
        Some(code),
    )
}

/// Rewrite a wrong-type failure into guidance about the expected shapes.
fn wrong_shape(message: &str) -> ValidationError {
    let mut suggestions = Vec::new();
    if message.contains("ColumnRef") {
        suggestions.push(
            r#"Column references must be objects, e.g. {"name": "sales"} rather than "sales""#
                .to_string(),
        );
    }
    if message.contains("FilterConfig") || message.contains("sequence") {
        suggestions.push(
            r#"Filters must be a list of objects: [{"column": "region", "op": "=", "value": "West"}]"#
                .to_string(),
        );
    }
    suggestions.push(XY_EXAMPLE.to_string());
    suggestions.push(TABLE_EXAMPLE.to_string());

    ErrorBuilder::build(
        ErrorType::InvalidType,
        TemplateKey::InvalidValue,
        &TemplateVars::new()
            .with("field", "config")
            .with("reason", format!("A field has the wrong type: {}", message)),
        &suggestions,
        Some("SCHEMA_VALIDATION_FAILED"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reject(raw: Value) -> ValidationError {
        SchemaValidator::new().validate(&raw).unwrap_err()
    }

    #[test]
    fn test_request_shape_errors() {
        assert_eq!(reject(json!([1, 2])).error_code, "INVALID_REQUEST_FORMAT");
        assert_eq!(reject(json!({"config": {}})).error_code, "MISSING_DATASET_ID");
        assert_eq!(reject(json!({"dataset_id": 1})).error_code, "MISSING_CONFIG");
        assert_eq!(
            reject(json!({"dataset_id": 1, "config": "xy"})).error_code,
            "INVALID_CONFIG_FORMAT"
        );
    }

    #[test]
    fn test_missing_chart_type_infers_hint() {
        let err = reject(json!({"dataset_id": 1, "config": {"columns": [{"name": "a"}]}}));
        assert_eq!(err.error_code, "MISSING_CHART_TYPE");
        assert!(err.suggestions[0].contains("table"));
    }

    #[test]
    fn test_chart_kind_used_as_chart_type() {
        let err = reject(json!({"dataset_id": 1, "config": {"chart_type": "bar"}}));
        assert_eq!(err.error_code, "INVALID_CHART_TYPE");
        assert!(err.suggestions[0].contains("kind"));
    }

    #[test]
    fn test_xy_missing_fields() {
        let err = reject(json!({"dataset_id": 1, "config": {"chart_type": "xy"}}));
        assert_eq!(err.error_code, "XY_MISSING_FIELDS");
        assert!(err.suggestions.iter().any(|s| s.contains("chart_type")));

        let err = reject(json!({"dataset_id": 1, "config": {"chart_type": "xy", "x": {"name": "d"}}}));
        assert_eq!(err.error_code, "XY_MISSING_Y");

        let err = reject(json!({
            "dataset_id": 1,
            "config": {"chart_type": "xy", "x": {"name": "d"}, "y": {"name": "s"}}
        }));
        assert_eq!(err.error_code, "INVALID_Y_FORMAT");
    }

    #[test]
    fn test_table_shape_errors() {
        let err = reject(json!({"dataset_id": 1, "config": {"chart_type": "table"}}));
        assert_eq!(err.error_code, "TABLE_MISSING_COLUMNS");

        let err = reject(json!({"dataset_id": 1, "config": {"chart_type": "table", "columns": "a"}}));
        assert_eq!(err.error_code, "INVALID_COLUMNS_FORMAT");
    }

    #[test]
    fn test_invalid_dataset_id() {
        let err = reject(json!({
            "dataset_id": "sales",
            "config": {"chart_type": "table", "columns": [{"name": "a"}]}
        }));
        assert_eq!(err.error_code, "INVALID_DATASET_ID");
    }

    #[test]
    fn test_invalid_aggregate_suggests_case_fix() {
        let err = reject(json!({
            "dataset_id": 1,
            "config": {"chart_type": "table", "columns": [{"name": "a", "aggregate": "sum"}]}
        }));
        assert_eq!(err.error_code, "INVALID_AGGREGATE");
        assert_eq!(err.suggestions[0], "Did you mean 'SUM'?");
        assert!(err.suggestions.iter().any(|s| s.contains("COUNT_DISTINCT")));
    }

    #[test]
    fn test_invalid_operator_lists_operators_verbatim() {
        let err = reject(json!({
            "dataset_id": 1,
            "config": {
                "chart_type": "table",
                "columns": [{"name": "a"}],
                "filters": [{"column": "a", "op": "LIKE", "value": "x"}]
            }
        }));
        assert_eq!(err.error_code, "INVALID_FILTER_OPERATOR");
        assert!(err.suggestions.contains(&"Allowed values for 'op': =, >, <, >=, <=, !=".to_string()));
        assert_eq!(err.details, "'LIKE' is not one of: =, >, <, >=, <=, !=.");
        assert!(!err.details.contains("&gt;"));
    }

    #[test]
    fn test_invalid_operator_escapes_user_value() {
        let err = reject(json!({
            "dataset_id": 1,
            "config": {
                "chart_type": "table",
                "columns": [{"name": "a"}],
                "filters": [{"column": "a", "op": "<script>alert(1)</script>", "value": "x"}]
            }
        }));
        assert_eq!(err.error_code, "INVALID_FILTER_OPERATOR");
        assert!(!err.details.to_lowercase().contains("<script"));
        assert!(err.details.contains("=, >, <, >=, <=, !="));
        assert!(err.suggestions.iter().all(|s| !s.to_lowercase().contains("<script")));
    }

    #[test]
    fn test_column_ref_as_string_gets_shape_hint() {
        let err = reject(json!({
            "dataset_id": 1,
            "config": {"chart_type": "xy", "x": "date", "y": [{"name": "s"}]}
        }));
        assert_eq!(err.error_code, "SCHEMA_VALIDATION_FAILED");
    }

    #[test]
    fn test_multiple_violations_listed() {
        let err = reject(json!({
            "dataset_id": 1,
            "config": {
                "chart_type": "table",
                "columns": [{"name": "bad;name"}, {"name": "a", "label": "L"}, {"name": "b", "label": "L"}]
            }
        }));
        assert_eq!(err.error_code, "INVALID_COLUMN_NAME");
        let all = err.validation_errors.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].error_code, "DUPLICATE_LABELS");
    }

    #[test]
    fn test_valid_request() {
        let request = SchemaValidator::new()
            .validate(&json!({
                "dataset_id": "18",
                "config": {
                    "chart_type": "xy",
                    "x": {"name": "OrderDate"},
                    "y": [{"name": "Sales", "aggregate": "SUM"}],
                    "kind": "bar"
                }
            }))
            .unwrap();
        assert_eq!(request.dataset_id, DatasetId::Numeric(18));
        assert_eq!(request.config.chart_type(), "xy");
    }
}
