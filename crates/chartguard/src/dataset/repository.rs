//! Dataset repository trait and a file-backed in-memory implementation.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::chart::DatasetId;
use crate::error::{ChartguardError, Result};

use super::context::DatasetContext;

/// Failure to look a dataset up. A dataset that simply does not exist is
/// not an error; repositories return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backing store could not be reached right now.
    #[error("Dataset lookup unavailable: {0}")]
    Unavailable(String),

    /// The backing store answered with an error.
    #[error("Dataset backend error: {0}")]
    Backend(String),
}

/// Source of dataset snapshots.
///
/// Implementations must be thread-safe (Send + Sync) so one repository can
/// serve concurrent validations.
pub trait DatasetRepository: Send + Sync {
    /// Resolve a numeric id or UUID to a snapshot of the dataset.
    fn resolve(&self, id: &DatasetId) -> std::result::Result<Option<DatasetContext>, RepositoryError>;

    /// Name of this repository (for logging).
    fn name(&self) -> &str {
        "dataset repository"
    }
}

/// Repository holding a fixed set of dataset snapshots.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    datasets: Vec<DatasetContext>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<DatasetContext>),
    Wrapped { datasets: Vec<DatasetContext> },
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dataset snapshot.
    pub fn with_dataset(mut self, dataset: DatasetContext) -> Self {
        self.datasets.push(dataset);
        self
    }

    /// Build from a list of snapshots, rejecting duplicate ids or UUIDs.
    pub fn from_datasets(datasets: Vec<DatasetContext>) -> Result<Self> {
        let mut ids = HashSet::new();
        let mut uuids = HashSet::new();
        for dataset in &datasets {
            if !ids.insert(dataset.id) {
                return Err(ChartguardError::Catalog(format!(
                    "duplicate dataset id {}",
                    dataset.id
                )));
            }
            if let Some(uuid) = dataset.uuid {
                if !uuids.insert(uuid) {
                    return Err(ChartguardError::Catalog(format!(
                        "duplicate dataset uuid {}",
                        uuid
                    )));
                }
            }
        }
        Ok(Self { datasets })
    }

    /// Parse a catalog: either a JSON array of datasets or an object with a
    /// `datasets` array.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let catalog: CatalogFile = serde_json::from_str(content)?;
        let datasets = match catalog {
            CatalogFile::List(datasets) => datasets,
            CatalogFile::Wrapped { datasets } => datasets,
        };
        Self::from_datasets(datasets)
    }

    /// Load a catalog file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ChartguardError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&content)
    }

    pub fn datasets(&self) -> &[DatasetContext] {
        &self.datasets
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl DatasetRepository for InMemoryRepository {
    fn resolve(&self, id: &DatasetId) -> std::result::Result<Option<DatasetContext>, RepositoryError> {
        Ok(self.datasets.iter().find(|d| d.matches(id)).cloned())
    }

    fn name(&self) -> &str {
        "in-memory catalog"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CATALOG: &str = r#"[
        {"id": 1, "table_name": "orders", "available_columns": [{"name": "id", "type": "INT"}]},
        {"id": 2, "uuid": "6f1c2a4e-8a9b-4c1d-9e2f-0a1b2c3d4e5f", "table_name": "events"}
    ]"#;

    #[test]
    fn test_resolve_numeric_and_uuid() {
        let repo = InMemoryRepository::from_json_str(CATALOG).unwrap();
        assert_eq!(repo.len(), 2);

        let found = repo.resolve(&DatasetId::Numeric(1)).unwrap().unwrap();
        assert_eq!(found.table_name, "orders");

        let id: DatasetId = "6f1c2a4e-8a9b-4c1d-9e2f-0a1b2c3d4e5f".parse().unwrap();
        let found = repo.resolve(&id).unwrap().unwrap();
        assert_eq!(found.table_name, "events");

        assert!(repo.resolve(&DatasetId::Numeric(99)).unwrap().is_none());
    }

    #[test]
    fn test_wrapped_catalog() {
        let repo = InMemoryRepository::from_json_str(
            r#"{"datasets": [{"id": 5, "table_name": "t"}]}"#,
        )
        .unwrap();
        assert_eq!(repo.datasets()[0].id, 5);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = InMemoryRepository::from_json_str(
            r#"[{"id": 1, "table_name": "a"}, {"id": 1, "table_name": "b"}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, ChartguardError::Catalog(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();

        let repo = InMemoryRepository::from_json_file(file.path()).unwrap();
        assert!(!repo.is_empty());

        let missing = InMemoryRepository::from_json_file("/nonexistent/catalog.json");
        assert!(matches!(missing, Err(ChartguardError::Io { .. })));
    }
}
