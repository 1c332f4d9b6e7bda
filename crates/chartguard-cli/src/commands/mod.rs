//! CLI command implementations.

pub mod suggest;
pub mod templates;
pub mod validate;

use std::path::Path;

use chartguard::{InMemoryRepository, ValidatorConfig};

/// Load settings from `path`, or the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> chartguard::Result<ValidatorConfig> {
    match path {
        Some(path) => ValidatorConfig::from_json_file(path),
        None => Ok(ValidatorConfig::default()),
    }
}

/// Load a dataset catalog.
pub(crate) fn load_catalog(path: &Path) -> chartguard::Result<InMemoryRepository> {
    let catalog = InMemoryRepository::from_json_file(path)?;
    tracing::debug!(path = %path.display(), datasets = catalog.len(), "catalog loaded");
    Ok(catalog)
}
