//! Registry of named error templates.
//!
//! Templates use `{name}` placeholders. Values are supplied through
//! [`TemplateVars`](super::TemplateVars), which sanitizes them on insertion.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

/// Names of the registered templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    MissingField,
    InvalidType,
    InvalidValue,
    DatasetNotFound,
    ColumnNotFound,
    EmptyResult,
    PerformanceWarning,
    InvalidChartType,
    IncompatibleConfiguration,
    GenerationFailed,
}

impl TemplateKey {
    pub const ALL: [TemplateKey; 10] = [
        TemplateKey::MissingField,
        TemplateKey::InvalidType,
        TemplateKey::InvalidValue,
        TemplateKey::DatasetNotFound,
        TemplateKey::ColumnNotFound,
        TemplateKey::EmptyResult,
        TemplateKey::PerformanceWarning,
        TemplateKey::InvalidChartType,
        TemplateKey::IncompatibleConfiguration,
        TemplateKey::GenerationFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKey::MissingField => "missing_field",
            TemplateKey::InvalidType => "invalid_type",
            TemplateKey::InvalidValue => "invalid_value",
            TemplateKey::DatasetNotFound => "dataset_not_found",
            TemplateKey::ColumnNotFound => "column_not_found",
            TemplateKey::EmptyResult => "empty_result",
            TemplateKey::PerformanceWarning => "performance_warning",
            TemplateKey::InvalidChartType => "invalid_chart_type",
            TemplateKey::IncompatibleConfiguration => "incompatible_configuration",
            TemplateKey::GenerationFailed => "generation_failed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl std::fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message, details and default suggestions for one kind of error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTemplate {
    pub message: &'static str,
    pub details: &'static str,
    pub suggestions: &'static [&'static str],
}

static REGISTRY: Lazy<IndexMap<TemplateKey, ErrorTemplate>> = Lazy::new(|| {
    let mut map = IndexMap::new();
    map.insert(
        TemplateKey::MissingField,
        ErrorTemplate {
            message: "Missing required field '{field}'",
            details: "{details}",
            suggestions: &[
                "Add the '{field}' field to the request",
                "Check the spelling of '{field}'",
            ],
        },
    );
    map.insert(
        TemplateKey::InvalidType,
        ErrorTemplate {
            message: "Invalid type for '{field}'",
            details: "Expected {expected}, got {actual}.",
            suggestions: &["Provide '{field}' as {expected}"],
        },
    );
    map.insert(
        TemplateKey::InvalidValue,
        ErrorTemplate {
            message: "Invalid value for '{field}'",
            details: "{reason}",
            suggestions: &["Check the allowed values for '{field}'"],
        },
    );
    map.insert(
        TemplateKey::DatasetNotFound,
        ErrorTemplate {
            message: "Dataset not found: {dataset_id}",
            details: "No dataset with identifier '{dataset_id}' exists or it is not accessible.",
            suggestions: &[
                "Verify the dataset ID or UUID is correct",
                "List the available datasets to find a valid identifier",
                "Check that you have access to the dataset",
            ],
        },
    );
    map.insert(
        TemplateKey::ColumnNotFound,
        ErrorTemplate {
            message: "Unknown column reference: {column}",
            details: "{details}",
            suggestions: &[
                "Check the spelling and casing of column names",
                "Use one of the dataset's columns or saved metrics",
            ],
        },
    );
    map.insert(
        TemplateKey::EmptyResult,
        ErrorTemplate {
            message: "The query is likely to return no data",
            details: "{reason}",
            suggestions: &[
                "Check the filter values against the data",
                "Remove or relax restrictive filters",
            ],
        },
    );
    map.insert(
        TemplateKey::PerformanceWarning,
        ErrorTemplate {
            message: "The chart request may perform poorly",
            details: "{reason}",
            suggestions: &[
                "Reduce the number of requested series or columns",
                "Add filters to limit the data volume",
            ],
        },
    );
    map.insert(
        TemplateKey::InvalidChartType,
        ErrorTemplate {
            message: "Invalid chart type '{chart_type}'",
            details: "Supported chart types are: {allowed}.",
            suggestions: &[
                "Use 'xy' for line, bar, area or scatter charts",
                "Use 'table' for tabular data",
            ],
        },
    );
    map.insert(
        TemplateKey::IncompatibleConfiguration,
        ErrorTemplate {
            message: "{reason}",
            details: "{details}",
            suggestions: &["Adjust the configuration so that its parts agree"],
        },
    );
    map.insert(
        TemplateKey::GenerationFailed,
        ErrorTemplate {
            message: "Chart validation failed",
            details: "{reason}",
            suggestions: &[
                "Try again with a simpler chart configuration",
                "Report the problem if it persists",
            ],
        },
    );
    map
});

/// All registered templates, in a stable order.
pub fn registry() -> &'static IndexMap<TemplateKey, ErrorTemplate> {
    &REGISTRY
}

/// Look up the template for `key`.
pub fn template(key: TemplateKey) -> Option<&'static ErrorTemplate> {
    REGISTRY.get(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_registered() {
        for key in TemplateKey::ALL {
            assert!(template(key).is_some(), "missing template {}", key);
        }
        assert_eq!(registry().len(), TemplateKey::ALL.len());
    }

    #[test]
    fn test_key_names_round_trip() {
        assert_eq!(
            TemplateKey::from_name("column_not_found"),
            Some(TemplateKey::ColumnNotFound)
        );
        assert_eq!(TemplateKey::from_name("nope"), None);
    }

    #[test]
    fn test_templates_have_suggestions() {
        for (key, tpl) in registry() {
            assert!(!tpl.suggestions.is_empty(), "{} has no suggestions", key);
        }
    }
}
