//! Validator configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ChartguardError, Result};

/// What the pipeline does when a layer cannot run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerPolicy {
    /// Log and continue as if the layer passed.
    #[default]
    Skip,
    /// Reject the request with a system error.
    Reject,
}

/// Configuration for the validation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Minimum similarity (0..=1) for a "did you mean" suggestion.
    pub fuzzy_cutoff: f64,
    /// Maximum "did you mean" suggestions per unknown reference.
    pub max_fuzzy_suggestions: usize,
    /// Maximum unknown names listed in a batched column error.
    pub max_listed_columns: usize,
    /// Behaviour when no dataset repository is wired or a lookup fails.
    pub dataset_layer: LayerPolicy,
    /// Behaviour when no runtime validator is registered.
    pub runtime_layer: LayerPolicy,
    /// Filter values that usually match few or no rows.
    pub lifecycle_keywords: Vec<String>,
    /// Years past the current one before a lower-bound date is suspicious.
    pub future_year_margin: i32,
    pub max_y_metrics: usize,
    pub max_table_columns: usize,
    /// When false, runtime heuristic matches are logged and the request
    /// is accepted.
    pub blocking_heuristics: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            fuzzy_cutoff: 0.6,
            max_fuzzy_suggestions: 3,
            max_listed_columns: 3,
            dataset_layer: LayerPolicy::Skip,
            runtime_layer: LayerPolicy::Skip,
            lifecycle_keywords: ["deleted", "archived", "inactive", "disabled"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            future_year_margin: 1,
            max_y_metrics: 10,
            max_table_columns: 50,
            blocking_heuristics: true,
        }
    }
}

impl ValidatorConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ChartguardError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    /// Reject values that make no sense.
    pub fn check(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fuzzy_cutoff) {
            return Err(ChartguardError::Config(format!(
                "fuzzy_cutoff must be between 0 and 1, got {}",
                self.fuzzy_cutoff
            )));
        }
        if self.future_year_margin < 0 {
            return Err(ChartguardError::Config(
                "future_year_margin must not be negative".to_string(),
            ));
        }
        if self.lifecycle_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ChartguardError::Config(
                "lifecycle_keywords must not contain empty entries".to_string(),
            ));
        }
        Ok(())
    }
}
