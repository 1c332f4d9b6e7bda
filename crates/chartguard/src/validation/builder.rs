//! Builds [`ValidationError`]s from named templates.

use std::fmt::Display;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{ErrorType, ValidationError};
use super::sanitize::{sanitize_exception_text, sanitize_user_input, strip_dangerous};
use super::templates::{TemplateKey, template};

/// Maximum number of caller-supplied suggestions kept.
pub const MAX_CUSTOM_SUGGESTIONS: usize = 5;
/// Maximum number of suggestions on one error.
pub const MAX_SUGGESTIONS: usize = 10;

const FALLBACK_MESSAGE: &str = "Chart configuration is invalid";
const FALLBACK_DETAILS: &str = "No further details are available for this error.";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

/// Values substituted into a template.
///
/// Values from the request go through [`TemplateVars::with`], which
/// sanitizes them on insert. Text the validator composes itself goes
/// through [`TemplateVars::with_trusted`]; any user value embedded in it
/// must already have been passed through [`sanitize_user_input`].
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: IndexMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user-supplied value (sanitized).
    pub fn with(mut self, key: &str, value: impl Display) -> Self {
        self.values.insert(key.to_string(), sanitize_user_input(value));
        self
    }

    /// Add validator-authored text. It is not escaped, only stripped of
    /// script fragments.
    pub fn with_trusted(mut self, key: &str, text: impl AsRef<str>) -> Self {
        self.values.insert(key.to_string(), strip_dangerous(text.as_ref()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Renders templates into errors.
pub struct ErrorBuilder;

impl ErrorBuilder {
    /// Build an error from the template named by `key`.
    ///
    /// Custom suggestions come first (at most [`MAX_CUSTOM_SUGGESTIONS`]),
    /// followed by the template's own, up to [`MAX_SUGGESTIONS`] in total.
    /// Custom suggestions are validator-authored text: user values inside
    /// them must already be sanitized.
    /// The error code defaults to the upper-cased template name.
    pub fn build(
        error_type: ErrorType,
        key: TemplateKey,
        vars: &TemplateVars,
        custom_suggestions: &[String],
        error_code: Option<&str>,
    ) -> ValidationError {
        let (message, details, template_suggestions) = match template(key) {
            Some(tpl) => (
                Self::render(tpl.message, vars).unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
                Self::render(tpl.details, vars).unwrap_or_else(|| FALLBACK_DETAILS.to_string()),
                tpl.suggestions
                    .iter()
                    .filter_map(|s| Self::render(s, vars))
                    .collect::<Vec<_>>(),
            ),
            None => (
                FALLBACK_MESSAGE.to_string(),
                FALLBACK_DETAILS.to_string(),
                Vec::new(),
            ),
        };

        let mut suggestions: Vec<String> = Vec::new();
        let custom = custom_suggestions
            .iter()
            .take(MAX_CUSTOM_SUGGESTIONS)
            .map(|s| strip_dangerous(s));
        for suggestion in custom.chain(template_suggestions) {
            if suggestions.len() == MAX_SUGGESTIONS {
                break;
            }
            if !suggestion.is_empty() && !suggestions.contains(&suggestion) {
                suggestions.push(suggestion);
            }
        }

        ValidationError {
            error_type,
            message,
            details,
            suggestions,
            error_code: error_code
                .map(str::to_string)
                .unwrap_or_else(|| key.as_str().to_uppercase()),
            validation_errors: None,
        }
    }

    /// Error for an unexpected failure inside validation. The raw text is
    /// never returned as-is.
    pub fn system_error(raw: &str) -> ValidationError {
        let reason = sanitize_exception_text(raw);
        let mut err = Self::build(
            ErrorType::ValidationSystemError,
            TemplateKey::GenerationFailed,
            &TemplateVars::new().with("reason", "An internal validation error occurred"),
            &[],
            Some("VALIDATION_SYSTEM_ERROR"),
        );
        // Already sanitized; inserting through TemplateVars would escape it twice.
        err.details = format!("An internal validation error occurred: {}", reason);
        err
    }

    /// Substitute placeholders. Returns `None` when a placeholder has no
    /// value.
    fn render(template: &str, vars: &TemplateVars) -> Option<String> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(template) {
            let whole = caps.get(0)?;
            out.push_str(&template[last..whole.start()]);
            out.push_str(vars.get(&caps[1])?);
            last = whole.end();
        }
        out.push_str(&template[last..]);
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_substitutes_vars() {
        let vars = TemplateVars::new().with("dataset_id", 99);
        let err = ErrorBuilder::build(
            ErrorType::DatasetNotFound,
            TemplateKey::DatasetNotFound,
            &vars,
            &[],
            None,
        );

        assert_eq!(err.message, "Dataset not found: 99");
        assert_eq!(err.error_code, "DATASET_NOT_FOUND");
        assert_eq!(err.suggestions.len(), 3);
    }

    #[test]
    fn test_missing_placeholder_falls_back() {
        let err = ErrorBuilder::build(
            ErrorType::InvalidType,
            TemplateKey::InvalidType,
            &TemplateVars::new().with("field", "y"),
            &[],
            Some("INVALID_Y_FORMAT"),
        );

        assert_eq!(err.message, "Invalid type for 'y'");
        assert_eq!(err.details, FALLBACK_DETAILS);
        // The only template suggestion needs {expected}, so it is dropped.
        assert!(err.suggestions.is_empty());
    }

    #[test]
    fn test_custom_suggestions_first_and_capped() {
        let custom: Vec<String> = (0..8).map(|i| format!("custom {}", i)).collect();
        let err = ErrorBuilder::build(
            ErrorType::DatasetNotFound,
            TemplateKey::DatasetNotFound,
            &TemplateVars::new().with("dataset_id", 1),
            &custom,
            None,
        );

        assert_eq!(err.suggestions[0], "custom 0");
        assert_eq!(
            err.suggestions.iter().filter(|s| s.starts_with("custom")).count(),
            MAX_CUSTOM_SUGGESTIONS
        );
        assert_eq!(err.suggestions.len(), MAX_CUSTOM_SUGGESTIONS + 3);
        assert!(err.suggestions.len() <= MAX_SUGGESTIONS);
    }

    #[test]
    fn test_values_are_sanitized() {
        let vars = TemplateVars::new().with("column", "<script>alert(1)</script>");
        assert!(!vars.get("column").unwrap().contains('<'));

        let err = ErrorBuilder::build(
            ErrorType::ColumnNotFound,
            TemplateKey::ColumnNotFound,
            &vars.with("details", "x"),
            &["Try <script>x</script>this".to_string()],
            None,
        );
        assert!(!err.message.to_lowercase().contains("<script"));
        assert_eq!(err.suggestions[0], "Try this");
    }

    #[test]
    fn test_trusted_text_keeps_operators() {
        let value = sanitize_user_input("<b>LIKE</b>");
        let vars = TemplateVars::new()
            .with("field", "op")
            .with_trusted("reason", format!("'{}' is not one of: =, >, <, >=, <=, !=.", value));

        let err = ErrorBuilder::build(
            ErrorType::InvalidValue,
            TemplateKey::InvalidValue,
            &vars,
            &["Allowed values for 'op': =, >, <, >=, <=, !=".to_string()],
            None,
        );
        assert!(err.details.contains("=, >, <, >=, <=, !="));
        assert!(err.details.contains("'&lt;b&gt;LIKE&lt;/b&gt;'"));
        assert_eq!(err.suggestions[0], "Allowed values for 'op': =, >, <, >=, <=, !=");
    }

    #[test]
    fn test_trusted_text_still_loses_script_fragments() {
        let vars = TemplateVars::new().with_trusted("reason", "a <script>b</script> javascript:c");
        let reason = vars.get("reason").unwrap();
        assert!(!reason.to_lowercase().contains("<script"));
        assert!(!reason.to_lowercase().contains("javascript:"));
    }

    #[test]
    fn test_system_error_hides_raw_text() {
        let err = ErrorBuilder::system_error("permission denied for table salaries");
        assert_eq!(err.error_type, ErrorType::ValidationSystemError);
        assert_eq!(err.error_code, "VALIDATION_SYSTEM_ERROR");
        assert!(!err.details.contains("salaries"));
    }
}
