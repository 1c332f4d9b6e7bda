//! Dataset metadata snapshots and the repository they are resolved from.

mod context;
mod repository;

pub use context::{DatasetColumn, DatasetContext, DatasetMetric, RefKind, ResolvedRef};
pub use repository::{DatasetRepository, InMemoryRepository, RepositoryError};
