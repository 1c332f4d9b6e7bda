//! Chart configuration variants.

use serde::{Deserialize, Serialize};

use super::column::ColumnRef;
use super::filter::FilterConfig;

/// Visual mark used by an XY chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Area,
    Scatter,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::Area,
        ChartKind::Scatter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Area => "area",
            ChartKind::Scatter => "scatter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisScale {
    #[default]
    Linear,
    Log,
}

/// Axis presentation options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub scale: AxisScale,
    /// Format string, e.g. `$,.2f`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendPosition {
    Top,
    Bottom,
    Left,
    #[default]
    Right,
}

/// Legend presentation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendConfig {
    #[serde(default = "default_show_legend")]
    pub show: bool,
    #[serde(default)]
    pub position: LegendPosition,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            show: true,
            position: LegendPosition::Right,
        }
    }
}

fn default_show_legend() -> bool {
    true
}

/// Line, bar, area and scatter charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XYChartConfig {
    pub x: ColumnRef,
    pub y: Vec<ColumnRef>,
    #[serde(default)]
    pub kind: ChartKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<AxisConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<AxisConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend: Option<LegendConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<FilterConfig>>,
}

impl XYChartConfig {
    pub fn new(x: ColumnRef, y: Vec<ColumnRef>) -> Self {
        Self {
            x,
            y,
            kind: ChartKind::default(),
            group_by: None,
            x_axis: None,
            y_axis: None,
            legend: None,
            filters: None,
        }
    }

    pub fn with_kind(mut self, kind: ChartKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_group_by(mut self, group_by: ColumnRef) -> Self {
        self.group_by = Some(group_by);
        self
    }

    pub fn with_filters(mut self, filters: Vec<FilterConfig>) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// Tabular display of columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableChartConfig {
    pub columns: Vec<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<FilterConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<Vec<String>>,
}

impl TableChartConfig {
    pub fn new(columns: Vec<ColumnRef>) -> Self {
        Self {
            columns,
            filters: None,
            sort_by: None,
        }
    }

    pub fn with_filters(mut self, filters: Vec<FilterConfig>) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_sort_by(mut self, sort_by: Vec<String>) -> Self {
        self.sort_by = Some(sort_by);
        self
    }
}

/// A chart configuration. The `chart_type` field selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "chart_type")]
pub enum ChartConfig {
    #[serde(rename = "xy")]
    Xy(XYChartConfig),
    #[serde(rename = "table")]
    Table(TableChartConfig),
}

impl ChartConfig {
    /// Discriminator values accepted on the wire.
    pub const CHART_TYPES: [&'static str; 2] = ["xy", "table"];

    pub fn chart_type(&self) -> &'static str {
        match self {
            ChartConfig::Xy(_) => "xy",
            ChartConfig::Table(_) => "table",
        }
    }

    /// Filters of either variant, empty when none were given.
    pub fn filters(&self) -> &[FilterConfig] {
        let filters = match self {
            ChartConfig::Xy(xy) => &xy.filters,
            ChartConfig::Table(table) => &table.filters,
        };
        filters.as_deref().unwrap_or(&[])
    }

    /// Every column reference paired with its field path, in document order.
    pub fn column_refs(&self) -> Vec<(String, &ColumnRef)> {
        match self {
            ChartConfig::Xy(xy) => {
                let mut refs = vec![("x".to_string(), &xy.x)];
                refs.extend(xy.y.iter().enumerate().map(|(i, c)| (format!("y[{}]", i), c)));
                if let Some(ref group_by) = xy.group_by {
                    refs.push(("group_by".to_string(), group_by));
                }
                refs
            }
            ChartConfig::Table(table) => table
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| (format!("columns[{}]", i), c))
                .collect(),
        }
    }

    /// Number of metric/column series the chart would request.
    pub fn series_count(&self) -> usize {
        match self {
            ChartConfig::Xy(xy) => xy.y.len(),
            ChartConfig::Table(table) => table.columns.len(),
        }
    }
}

impl From<XYChartConfig> for ChartConfig {
    fn from(config: XYChartConfig) -> Self {
        ChartConfig::Xy(config)
    }
}

impl From<TableChartConfig> for ChartConfig {
    fn from(config: TableChartConfig) -> Self {
        ChartConfig::Table(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{Aggregate, FilterOp};
    use serde_json::json;

    #[test]
    fn test_deserialize_xy() {
        let config: ChartConfig = serde_json::from_value(json!({
            "chart_type": "xy",
            "x": {"name": "date"},
            "y": [{"name": "sales", "aggregate": "SUM"}],
            "filters": [{"column": "region", "op": "=", "value": "EU"}]
        }))
        .unwrap();

        let ChartConfig::Xy(xy) = &config else {
            panic!("expected xy variant");
        };
        assert_eq!(xy.kind, ChartKind::Line);
        assert_eq!(xy.y[0].aggregate, Some(Aggregate::Sum));
        assert_eq!(config.filters()[0].op, FilterOp::Eq);
    }

    #[test]
    fn test_deserialize_table() {
        let config: ChartConfig = serde_json::from_value(json!({
            "chart_type": "table",
            "columns": [{"name": "product"}],
            "sort_by": ["product"]
        }))
        .unwrap();

        assert_eq!(config.chart_type(), "table");
        assert!(config.filters().is_empty());
    }

    #[test]
    fn test_serialize_keeps_discriminator() {
        let config = ChartConfig::from(TableChartConfig::new(vec![ColumnRef::new("a")]));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["chart_type"], "table");
        assert!(value.get("filters").is_none());
    }

    #[test]
    fn test_column_refs_paths() {
        let config = ChartConfig::from(
            XYChartConfig::new(
                ColumnRef::new("date"),
                vec![ColumnRef::new("sales"), ColumnRef::new("cost")],
            )
            .with_group_by(ColumnRef::new("region")),
        );
        let paths: Vec<String> = config.column_refs().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["x", "y[0]", "y[1]", "group_by"]);
    }

    #[test]
    fn test_legend_defaults() {
        let legend: LegendConfig = serde_json::from_value(json!({})).unwrap();
        assert!(legend.show);
        assert_eq!(legend.position, LegendPosition::Right);
    }
}
