//! Chart request envelope and dataset identifiers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::types::ChartConfig;

/// Identifier of a dataset: its numeric primary key or its UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetId {
    Numeric(i64),
    Uuid(Uuid),
}

impl DatasetId {
    /// Interpret a raw JSON value as a dataset identifier.
    ///
    /// Accepts integers, numeric strings and UUID strings.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(DatasetId::Numeric),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl FromStr for DatasetId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(id) = trimmed.parse::<i64>() {
            return Ok(DatasetId::Numeric(id));
        }
        Uuid::parse_str(trimmed)
            .map(DatasetId::Uuid)
            .map_err(|_| format!("'{}' is neither a numeric id nor a UUID", s))
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetId::Numeric(id) => write!(f, "{}", id),
            DatasetId::Uuid(uuid) => write!(f, "{}", uuid),
        }
    }
}

impl From<i64> for DatasetId {
    fn from(id: i64) -> Self {
        DatasetId::Numeric(id)
    }
}

/// A chart request: which dataset to chart and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub dataset_id: DatasetId,
    pub config: ChartConfig,
}

impl ChartRequest {
    pub fn new(dataset_id: impl Into<DatasetId>, config: impl Into<ChartConfig>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            config: config.into(),
        }
    }
}
