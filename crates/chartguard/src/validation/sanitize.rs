//! Sanitization of values that end up inside error messages.
//!
//! Error text flows back to LLM agents and is sometimes rendered in a
//! browser, so user-supplied values are truncated, HTML-escaped and stripped
//! of script fragments before substitution. Raw exception text is reduced
//! to a generic phrase or has identifiers redacted.

use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum number of characters kept from any substituted value.
pub const MAX_VALUE_LENGTH: usize = 200;

/// Fragments that must never survive sanitization, matched against text
/// that has already been HTML-escaped.
static DANGEROUS_FRAGMENTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)&lt;\s*script\b.*?&lt;\s*/\s*script\s*&gt;",
        r"(?is)&lt;\s*/?\s*script\b.*?(&gt;|$)",
        r"(?i)<\s*/?\s*script\b[^>]*>?",
        r"(?i)javascript\s*:",
        r"(?i)vbscript\s*:",
        r"(?i)data\s*:\s*text/html",
        r"(?i)\bon[a-z]+\s*=",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static IDENTIFIER_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(table|column|schema|database|relation|view)\s+["'`]?[\w.\-]+["'`]?"#)
        .unwrap()
});

static SQL_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\b(select|insert|update|delete|drop|alter|create|truncate)\b\s.*").unwrap()
});

const PERMISSION_MARKERS: &[&str] = &[
    "permission",
    "access denied",
    "not authorized",
    "unauthorized",
    "forbidden",
];
const CONNECTION_MARKERS: &[&str] = &["connection", "connect", "network", "unreachable", "refused"];
const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out", "deadline"];

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Keep at most `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Sanitize a user-supplied value for inclusion in an error message.
///
/// Stringifies, truncates to [`MAX_VALUE_LENGTH`] characters, escapes HTML,
/// then removes script fragments, script URL schemes and inline event
/// handlers.
pub fn sanitize_user_input(value: impl Display) -> String {
    let text = truncate_chars(&value.to_string(), MAX_VALUE_LENGTH);
    strip_dangerous(&escape_html(&text))
}

/// Neutralize markup in text that was composed by the validator itself and
/// may embed already-sanitized values. Angle brackets are escaped but
/// ampersands are left alone so embedded escapes are not doubled.
pub fn neutralize_markup(text: &str) -> String {
    strip_dangerous(&text.replace('<', "&lt;").replace('>', "&gt;"))
}

/// Turn raw exception text into something safe to return to a caller.
///
/// Permission, connectivity and timeout failures collapse to fixed phrases.
/// Anything else is truncated, and SQL statements and object identifiers
/// are redacted.
pub fn sanitize_exception_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mentions = |markers: &[&str]| markers.iter().any(|m| lowered.contains(m));

    if mentions(PERMISSION_MARKERS) {
        return "Permission denied while accessing dataset resources".to_string();
    }
    if mentions(TIMEOUT_MARKERS) {
        return "The operation timed out".to_string();
    }
    if mentions(CONNECTION_MARKERS) {
        return "Unable to connect to the data source".to_string();
    }

    let truncated = truncate_chars(text, MAX_VALUE_LENGTH);
    let redacted = SQL_STATEMENT.replace_all(&truncated, "[SQL redacted]");
    let redacted = IDENTIFIER_MENTION.replace_all(&redacted, "$1 [redacted]");
    neutralize_markup(&redacted)
}

/// Remove dangerous fragments until none remain. Removing one fragment can
/// join its neighbours into another, so this repeats to a fixed point.
///
/// Nothing is escaped, so operators and quotes in validator-authored text
/// are kept as written.
pub fn strip_dangerous(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let mut next = current.clone();
        for pattern in DANGEROUS_FRAGMENTS.iter() {
            next = pattern.replace_all(&next, "").into_owned();
        }
        if next == current {
            return next;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#x27;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(sanitize_user_input("x".repeat(500)).len(), MAX_VALUE_LENGTH);
    }

    #[test]
    fn test_script_removed() {
        let out = sanitize_user_input("<script>alert('x')</script>");
        assert!(!out.to_lowercase().contains("script"));
        assert!(!out.contains('<'));
    }

    #[test]
    fn test_schemes_and_handlers_removed() {
        let out = sanitize_user_input("javascript:alert(1) <img onerror=alert(1)>");
        assert!(!out.to_lowercase().contains("javascript:"));
        assert!(!out.to_lowercase().contains("onerror="));

        let nested = sanitize_user_input("javajavascript:script:void(0)");
        assert!(!nested.to_lowercase().contains("javascript:"));
    }

    #[test]
    fn test_plain_values_kept() {
        assert_eq!(sanitize_user_input("order_date"), "order_date");
        assert_eq!(sanitize_user_input(42), "42");
    }

    #[test]
    fn test_exception_text_generic_phrases() {
        assert_eq!(
            sanitize_exception_text("FATAL: permission denied for relation secret_salaries"),
            "Permission denied while accessing dataset resources"
        );
        assert_eq!(
            sanitize_exception_text("could not connect to server at 10.0.0.3"),
            "Unable to connect to the data source"
        );
        assert_eq!(
            sanitize_exception_text("statement timeout after 30s"),
            "The operation timed out"
        );
    }

    #[test]
    fn test_exception_text_redacts_identifiers() {
        let out = sanitize_exception_text("column \"ssn\" does not exist in table payroll");
        assert!(!out.contains("ssn"));
        assert!(!out.contains("payroll"));

        let out = sanitize_exception_text("syntax error near SELECT * FROM users WHERE 1=1");
        assert!(!out.contains("users"));
        assert!(out.contains("[SQL redacted]"));
    }
}
