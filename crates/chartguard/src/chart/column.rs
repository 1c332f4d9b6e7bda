//! Column references and aggregate functions.

use serde::{Deserialize, Serialize, Serializer};

use crate::validation::sanitize::escape_html;

/// SQL aggregate applied to a referenced column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregate {
    Sum,
    Count,
    Avg,
    Min,
    Max,
    CountDistinct,
    Stddev,
    Var,
    Median,
    Percentile,
}

impl Aggregate {
    /// Every supported aggregate, in the order they are documented to callers.
    pub const ALL: [Aggregate; 10] = [
        Aggregate::Sum,
        Aggregate::Count,
        Aggregate::Avg,
        Aggregate::Min,
        Aggregate::Max,
        Aggregate::CountDistinct,
        Aggregate::Stddev,
        Aggregate::Var,
        Aggregate::Median,
        Aggregate::Percentile,
    ];

    /// Wire name of the aggregate.
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Count => "COUNT",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::CountDistinct => "COUNT_DISTINCT",
            Aggregate::Stddev => "STDDEV",
            Aggregate::Var => "VAR",
            Aggregate::Median => "MEDIAN",
            Aggregate::Percentile => "PERCENTILE",
        }
    }

    /// Returns true if the aggregate only makes sense over numeric input.
    pub fn requires_numeric(&self) -> bool {
        matches!(
            self,
            Aggregate::Sum
                | Aggregate::Avg
                | Aggregate::Min
                | Aggregate::Max
                | Aggregate::Stddev
                | Aggregate::Var
                | Aggregate::Median
        )
    }

    /// Comma-separated list of all wire names, for error messages.
    pub fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(|a| a.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Aggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to a dataset column or saved metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Column or metric name as supplied by the caller.
    pub name: String,
    /// Display label. Escaped for HTML whenever the config is serialized.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_escaped_label"
    )]
    pub label: Option<String>,
    /// Data type hint from the caller. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
    /// Aggregate to apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
}

impl ColumnRef {
    /// Create a bare reference to a column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            dtype: None,
            aggregate: None,
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the aggregate.
    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    /// Label to show for this reference, HTML-escaped.
    pub fn display_label(&self) -> String {
        escape_html(self.label.as_deref().unwrap_or(&self.name))
    }
}

fn serialize_escaped_label<S>(label: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match label {
        Some(l) => serializer.serialize_some(&escape_html(l)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_wire_names() {
        let agg: Aggregate = serde_json::from_str("\"COUNT_DISTINCT\"").unwrap();
        assert_eq!(agg, Aggregate::CountDistinct);
        assert_eq!(serde_json::to_string(&Aggregate::Stddev).unwrap(), "\"STDDEV\"");
        assert!(serde_json::from_str::<Aggregate>("\"sum\"").is_err());
    }

    #[test]
    fn test_numeric_aggregates() {
        assert!(Aggregate::Sum.requires_numeric());
        assert!(Aggregate::Median.requires_numeric());
        assert!(!Aggregate::Count.requires_numeric());
        assert!(!Aggregate::CountDistinct.requires_numeric());
        assert!(!Aggregate::Percentile.requires_numeric());
    }

    #[test]
    fn test_label_escaped_on_output() {
        let col = ColumnRef::new("sales").with_label("<b>Sales</b>");
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["label"], "&lt;b&gt;Sales&lt;/b&gt;");
        assert_eq!(col.label.as_deref(), Some("<b>Sales</b>"));
    }

    #[test]
    fn test_display_label_falls_back_to_name() {
        assert_eq!(ColumnRef::new("order_date").display_label(), "order_date");
    }
}
