//! Read-only snapshot of a dataset's columns and metrics.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chart::DatasetId;

static NUMERIC_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*((tiny|small|medium|big|u)?int(eger)?\d*|float\d*|double|decimal|numeric|real|number|money)\b",
    )
    .unwrap()
});

/// A physical column of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetColumn {
    pub name: String,
    /// Declared database type, e.g. `VARCHAR(255)` or `BIGINT`.
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default)]
    pub is_temporal: bool,
    #[serde(default)]
    pub is_numeric: bool,
}

impl DatasetColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let data_type = data_type.into();
        let is_numeric = NUMERIC_TYPE.is_match(&data_type);
        Self {
            name: name.into(),
            data_type,
            is_temporal: false,
            is_numeric,
        }
    }

    pub fn temporal(mut self) -> Self {
        self.is_temporal = true;
        self
    }

    /// Numeric according to either the flag or the declared type name.
    pub fn accepts_numeric_aggregate(&self) -> bool {
        self.is_numeric || NUMERIC_TYPE.is_match(&self.data_type)
    }
}

/// A saved metric (named SQL expression) of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetric {
    pub name: String,
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DatasetMetric {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            description: None,
        }
    }
}

/// Whether a name resolved to a column or a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Column,
    Metric,
}

impl RefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefKind::Column => "column",
            RefKind::Metric => "metric",
        }
    }
}

/// Result of resolving a reference against a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedRef<'a> {
    Column(&'a DatasetColumn),
    Metric(&'a DatasetMetric),
}

impl<'a> ResolvedRef<'a> {
    /// Canonical (stored) spelling of the name.
    pub fn name(&self) -> &'a str {
        match *self {
            ResolvedRef::Column(c) => &c.name,
            ResolvedRef::Metric(m) => &m.name,
        }
    }

    pub fn kind(&self) -> RefKind {
        match self {
            ResolvedRef::Column(_) => RefKind::Column,
            ResolvedRef::Metric(_) => RefKind::Metric,
        }
    }

    /// Declared type for columns, `metric` for metrics.
    pub fn type_label(&self) -> &'a str {
        match *self {
            ResolvedRef::Column(c) if c.data_type.is_empty() => "unknown",
            ResolvedRef::Column(c) => &c.data_type,
            ResolvedRef::Metric(_) => "metric",
        }
    }
}

/// Snapshot of a dataset used purely for validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetContext {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub available_columns: Vec<DatasetColumn>,
    #[serde(default)]
    pub available_metrics: Vec<DatasetMetric>,
}

impl DatasetContext {
    pub fn new(id: i64, table_name: impl Into<String>) -> Self {
        Self {
            id,
            uuid: None,
            table_name: table_name.into(),
            schema: None,
            database_name: String::new(),
            available_columns: Vec::new(),
            available_metrics: Vec::new(),
        }
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn with_database(mut self, database_name: impl Into<String>) -> Self {
        self.database_name = database_name.into();
        self
    }

    pub fn with_column(mut self, column: DatasetColumn) -> Self {
        self.available_columns.push(column);
        self
    }

    pub fn with_metric(mut self, metric: DatasetMetric) -> Self {
        self.available_metrics.push(metric);
        self
    }

    /// Whether this dataset is the one `id` refers to.
    pub fn matches(&self, id: &DatasetId) -> bool {
        match id {
            DatasetId::Numeric(n) => self.id == *n,
            DatasetId::Uuid(u) => self.uuid.as_ref() == Some(u),
        }
    }

    /// Resolve a reference. An exact match wins; otherwise the first
    /// case-insensitive match. Columns take precedence over metrics at each
    /// step.
    pub fn resolve(&self, name: &str) -> Option<ResolvedRef<'_>> {
        self.find(|candidate| candidate == name).or_else(|| {
            let lowered = name.to_lowercase();
            self.find(|candidate| candidate.to_lowercase() == lowered)
        })
    }

    fn find(&self, matches: impl Fn(&str) -> bool) -> Option<ResolvedRef<'_>> {
        self.available_columns
            .iter()
            .find(|c| matches(&c.name))
            .map(ResolvedRef::Column)
            .or_else(|| {
                self.available_metrics
                    .iter()
                    .find(|m| matches(&m.name))
                    .map(ResolvedRef::Metric)
            })
    }

    /// All names a reference may resolve to, columns first.
    pub fn candidates(&self) -> impl Iterator<Item = ResolvedRef<'_>> {
        self.available_columns
            .iter()
            .map(ResolvedRef::Column)
            .chain(self.available_metrics.iter().map(ResolvedRef::Metric))
    }

    /// Qualified table name for display (`schema.table`).
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) if !schema.is_empty() => format!("{}.{}", schema, self.table_name),
            _ => self.table_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> DatasetContext {
        DatasetContext::new(18, "orders")
            .with_column(DatasetColumn::new("OrderDate", "TIMESTAMP").temporal())
            .with_column(DatasetColumn::new("Sales", "DECIMAL(10,2)"))
            .with_column(DatasetColumn::new("Region", "VARCHAR(32)"))
            .with_metric(DatasetMetric::new("count", "COUNT(*)"))
    }

    #[test]
    fn test_resolve_case_insensitive() {
        let ctx = orders();
        let resolved = ctx.resolve("orderdate").unwrap();
        assert_eq!(resolved.name(), "OrderDate");
        assert_eq!(resolved.kind(), RefKind::Column);

        let metric = ctx.resolve("COUNT").unwrap();
        assert_eq!(metric.kind(), RefKind::Metric);
        assert_eq!(metric.type_label(), "metric");

        assert!(ctx.resolve("customer").is_none());
    }

    #[test]
    fn test_resolve_prefers_exact_spelling() {
        let ctx = DatasetContext::new(1, "t")
            .with_column(DatasetColumn::new("sales", "VARCHAR"))
            .with_column(DatasetColumn::new("Sales", "DECIMAL"))
            .with_metric(DatasetMetric::new("Region", "COUNT(*)"))
            .with_column(DatasetColumn::new("region", "VARCHAR"));

        assert_eq!(ctx.resolve("Sales").unwrap().type_label(), "DECIMAL");
        assert_eq!(ctx.resolve("sales").unwrap().type_label(), "VARCHAR");
        assert_eq!(ctx.resolve("SALES").unwrap().name(), "sales");
        assert_eq!(ctx.resolve("Region").unwrap().kind(), RefKind::Metric);
        assert_eq!(ctx.resolve("REGION").unwrap().kind(), RefKind::Column);
    }

    #[test]
    fn test_numeric_detection() {
        assert!(DatasetColumn::new("a", "BIGINT").accepts_numeric_aggregate());
        assert!(DatasetColumn::new("a", "double precision").accepts_numeric_aggregate());
        assert!(DatasetColumn::new("a", "INT64").accepts_numeric_aggregate());
        assert!(!DatasetColumn::new("a", "VARCHAR").accepts_numeric_aggregate());
        assert!(!DatasetColumn::new("a", "").accepts_numeric_aggregate());
        assert!(!DatasetColumn::new("a", "INTERVAL").accepts_numeric_aggregate());

        let mut flagged = DatasetColumn::new("a", "");
        flagged.is_numeric = true;
        assert!(flagged.accepts_numeric_aggregate());
    }

    #[test]
    fn test_matches_by_uuid() {
        let uuid = Uuid::parse_str("6f1c2a4e-8a9b-4c1d-9e2f-0a1b2c3d4e5f").unwrap();
        let ctx = orders().with_uuid(uuid);
        assert!(ctx.matches(&DatasetId::Uuid(uuid)));
        assert!(ctx.matches(&DatasetId::Numeric(18)));
        assert!(!ctx.matches(&DatasetId::Numeric(19)));
    }

    #[test]
    fn test_deserialize_catalog_entry() {
        let ctx: DatasetContext = serde_json::from_str(
            r#"{
                "id": 3,
                "table_name": "events",
                "schema": "public",
                "database_name": "analytics",
                "available_columns": [{"name": "ts", "type": "TIMESTAMP", "is_temporal": true}],
                "available_metrics": [{"name": "events", "expression": "COUNT(*)"}]
            }"#,
        )
        .unwrap();

        assert_eq!(ctx.qualified_name(), "public.events");
        assert!(ctx.available_columns[0].is_temporal);
        assert!(!ctx.available_columns[0].is_numeric);
    }
}
