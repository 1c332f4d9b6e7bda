//! Filter definitions.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "!=")]
    Ne,
}

impl FilterOp {
    pub const ALL: [FilterOp; 6] = [
        FilterOp::Eq,
        FilterOp::Gt,
        FilterOp::Lt,
        FilterOp::Gte,
        FilterOp::Lte,
        FilterOp::Ne,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
            FilterOp::Ne => "!=",
        }
    }

    /// `>` or `>=`.
    pub fn is_lower_bound(&self) -> bool {
        matches!(self, FilterOp::Gt | FilterOp::Gte)
    }

    /// `<` or `<=`.
    pub fn is_upper_bound(&self) -> bool {
        matches!(self, FilterOp::Lt | FilterOp::Lte)
    }

    /// Whether the bound excludes its own value.
    pub fn is_strict(&self) -> bool {
        matches!(self, FilterOp::Gt | FilterOp::Lt)
    }

    pub fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(|op| op.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal a filter compares against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FilterValue {
    /// Numeric view of the value. Text is parsed if it looks like a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Integer(i) => Some(*i as f64),
            FilterValue::Float(f) => Some(*f),
            FilterValue::Text(s) => s.trim().parse::<f64>().ok(),
            FilterValue::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FilterValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Order two literals: numerically when both are numbers, otherwise by
    /// their textual form.
    pub fn compare(&self, other: &FilterValue) -> Option<Ordering> {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => match (self, other) {
                (FilterValue::Bool(_), _) | (_, FilterValue::Bool(_)) => None,
                _ => Some(self.to_string().cmp(&other.to_string())),
            },
        }
    }

    /// Equality used for contradiction checks (`5` and `"5"` are equal).
    pub fn same_literal(&self, other: &FilterValue) -> bool {
        match self.compare(other) {
            Some(Ordering::Equal) => true,
            Some(_) => false,
            None => self == other,
        }
    }
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Integer(i) => write!(f, "{}", i),
            FilterValue::Float(v) => write!(f, "{}", v),
            FilterValue::Text(s) => f.write_str(s),
        }
    }
}

/// A single `column op value` filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub column: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl FilterConfig {
    pub fn new(column: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        let filter: FilterConfig =
            serde_json::from_str(r#"{"column": "age", "op": ">=", "value": 18}"#).unwrap();
        assert_eq!(filter.op, FilterOp::Gte);
        assert_eq!(filter.value, FilterValue::Integer(18));
    }

    #[test]
    fn test_value_variants() {
        let v: FilterValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, FilterValue::Bool(true));
        let v: FilterValue = serde_json::from_str("2.5").unwrap();
        assert_eq!(v, FilterValue::Float(2.5));
        let v: FilterValue = serde_json::from_str("\"2023-01-01\"").unwrap();
        assert_eq!(v.as_text(), Some("2023-01-01"));
        assert!(serde_json::from_str::<FilterValue>("null").is_err());
    }

    #[test]
    fn test_invalid_operator_rejected() {
        let result =
            serde_json::from_str::<FilterConfig>(r#"{"column": "a", "op": "LIKE", "value": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_compare_mixed_literals() {
        let ten = FilterValue::Integer(10);
        let five_text = FilterValue::Text("5".to_string());
        assert_eq!(ten.compare(&five_text), Some(Ordering::Greater));

        let d1 = FilterValue::Text("2023-01-01".to_string());
        let d2 = FilterValue::Text("2024-06-30".to_string());
        assert_eq!(d1.compare(&d2), Some(Ordering::Less));

        assert!(FilterValue::Integer(5).same_literal(&FilterValue::Text("5".to_string())));
        assert_eq!(FilterValue::Bool(true).compare(&ten), None);
    }
}
