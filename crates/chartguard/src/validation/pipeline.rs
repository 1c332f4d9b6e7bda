//! The validation pipeline: schema, dataset, then runtime checks.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::chart::{ChartConfig, DatasetId};
use crate::dataset::DatasetRepository;
use crate::settings::{LayerPolicy, ValidatorConfig};

use super::builder::{ErrorBuilder, TemplateVars};
use super::dataset::{DatasetCheckError, DatasetValidator, normalize_config};
use super::error::{ErrorType, ValidationError};
use super::runtime::{FilterHeuristics, PerformanceHeuristics, RuntimeValidator};
use super::sanitize::sanitize_exception_text;
use super::schema::SchemaValidator;
use super::templates::TemplateKey;

thread_local! {
    static IN_PIPELINE: Cell<bool> = const { Cell::new(false) };
}

static PANIC_HOOK: Once = Once::new();

/// Wrap the process panic hook so panics raised while this thread is inside
/// [`ValidationPipeline::validate`] are not printed. Their text is logged
/// sanitized by `validate` instead. Panics anywhere else still reach the
/// previous hook. A hook installed later by the host replaces this one.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !IN_PIPELINE.with(Cell::get) {
                previous(info);
            }
        }));
    });
}

/// Marks the current thread as inside the pipeline until dropped.
struct PipelineScope {
    outer: bool,
}

impl PipelineScope {
    fn enter() -> Self {
        Self {
            outer: IN_PIPELINE.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for PipelineScope {
    fn drop(&mut self) {
        IN_PIPELINE.with(|flag| flag.set(self.outer));
    }
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Progress of one request through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Pending,
    SchemaValid,
    DatasetValid,
    RuntimeValid,
    Accepted,
    Rejected,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Pending => "pending",
            PipelineStage::SchemaValid => "schema_valid",
            PipelineStage::DatasetValid => "dataset_valid",
            PipelineStage::RuntimeValid => "runtime_valid",
            PipelineStage::Accepted => "accepted",
            PipelineStage::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// An accepted request, with names canonicalized to the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRequest {
    pub dataset_id: DatasetId,
    pub config: ChartConfig,
    /// Layers that could not run and were skipped.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_layers: Vec<String>,
    /// Heuristic matches that did not block the request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ValidationError>,
}

/// Runs every validation layer over a raw request.
///
/// The pipeline holds no per-request state, so one instance can validate
/// any number of requests concurrently.
pub struct ValidationPipeline {
    config: ValidatorConfig,
    schema: SchemaValidator,
    dataset: Option<DatasetValidator>,
    runtime: Vec<Arc<dyn RuntimeValidator>>,
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationPipeline {
    /// Pipeline with default configuration, filter heuristics and no
    /// dataset repository.
    pub fn new() -> Self {
        Self::with_config(ValidatorConfig::default())
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        let filters = FilterHeuristics::from_config(&config);
        Self {
            config,
            schema: SchemaValidator::new(),
            dataset: None,
            runtime: vec![Arc::new(filters)],
        }
    }

    /// Check references against datasets from `repository`.
    pub fn with_repository(self, repository: impl DatasetRepository + 'static) -> Self {
        self.with_shared_repository(Arc::new(repository))
    }

    pub fn with_shared_repository(mut self, repository: Arc<dyn DatasetRepository>) -> Self {
        self.dataset = Some(DatasetValidator::with_config(repository, &self.config));
        self
    }

    /// Register an additional runtime check. Checks run in registration
    /// order.
    pub fn with_runtime_validator(mut self, validator: impl RuntimeValidator + 'static) -> Self {
        self.runtime.push(Arc::new(validator));
        self
    }

    /// Register the series-count limits from the configuration.
    pub fn with_performance_heuristics(self) -> Self {
        let perf = PerformanceHeuristics::from_config(&self.config);
        self.with_runtime_validator(perf)
    }

    /// Remove every runtime check, including the default filter checks.
    pub fn without_runtime_layer(mut self) -> Self {
        self.runtime.clear();
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a request given as JSON text.
    pub fn validate_json(&self, input: &str) -> Result<ValidatedRequest, ValidationError> {
        match serde_json::from_str::<Value>(input) {
            Ok(raw) => self.validate(&raw),
            Err(err) => Err(ErrorBuilder::build(
                ErrorType::InvalidType,
                TemplateKey::InvalidType,
                &TemplateVars::new()
                    .with("field", "request")
                    .with("expected", "a JSON object")
                    .with("actual", format!("text that is not valid JSON ({})", err)),
                &["Send the request as a single JSON object".to_string()],
                Some("INVALID_REQUEST_FORMAT"),
            )),
        }
    }

    /// Validate a raw request.
    ///
    /// Returns the normalized request, or the first error found. A panic
    /// inside any layer is reported as a `validation_system_error`; its raw
    /// text is neither returned nor printed.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedRequest, ValidationError> {
        install_panic_hook();
        let outcome = {
            let _scope = PipelineScope::enter();
            panic::catch_unwind(AssertUnwindSafe(|| self.run(raw)))
        };
        match outcome {
            Ok(result) => result,
            Err(payload) => {
                let text = panic_text(&*payload);
                warn!(error = %sanitize_exception_text(&text), "validation panicked");
                Err(ErrorBuilder::system_error(&text))
            }
        }
    }

    fn run(&self, raw: &Value) -> Result<ValidatedRequest, ValidationError> {
        let mut stage = PipelineStage::Pending;
        let mut skipped_layers = Vec::new();
        let mut warnings = Vec::new();

        let request = self.schema.validate(raw).map_err(|e| reject(stage, e))?;
        stage = PipelineStage::SchemaValid;
        debug!(%stage, dataset_id = %request.dataset_id, chart_type = request.config.chart_type());

        let dataset_id = request.dataset_id;
        let mut config = request.config;

        match &self.dataset {
            Some(validator) => match validator.load_context(&dataset_id) {
                Ok(context) => {
                    validator
                        .validate_with_context(&config, &context)
                        .map_err(|e| reject(stage, e))?;
                    config = normalize_config(&config, &context);
                }
                Err(DatasetCheckError::Rejected(e)) => return Err(reject(stage, e)),
                Err(DatasetCheckError::Lookup(err)) => {
                    self.layer_unavailable("dataset", self.config.dataset_layer, &err.to_string(), stage)?;
                    skipped_layers.push("dataset".to_string());
                }
            },
            None => {
                self.layer_unavailable(
                    "dataset",
                    self.config.dataset_layer,
                    "no dataset repository is registered",
                    stage,
                )?;
                skipped_layers.push("dataset".to_string());
            }
        }
        stage = PipelineStage::DatasetValid;
        debug!(%stage, dataset_id = %dataset_id);

        if self.runtime.is_empty() {
            self.layer_unavailable(
                "runtime",
                self.config.runtime_layer,
                "no runtime validators are registered",
                stage,
            )?;
            skipped_layers.push("runtime".to_string());
        }
        for validator in &self.runtime {
            if let Err(err) = validator.validate(&config, &dataset_id) {
                if self.config.blocking_heuristics {
                    return Err(reject(stage, err));
                }
                warn!(
                    check = validator.name(),
                    error_code = %err.error_code,
                    "heuristic matched, continuing"
                );
                warnings.push(err);
            }
        }
        stage = PipelineStage::RuntimeValid;
        debug!(%stage);

        info!(stage = %PipelineStage::Accepted, dataset_id = %dataset_id, "chart request accepted");
        Ok(ValidatedRequest {
            dataset_id,
            config,
            skipped_layers,
            warnings,
        })
    }

    /// Apply the layer policy for a layer that cannot run.
    fn layer_unavailable(
        &self,
        layer: &str,
        policy: LayerPolicy,
        reason: &str,
        stage: PipelineStage,
    ) -> Result<(), ValidationError> {
        match policy {
            LayerPolicy::Skip => {
                warn!(layer, reason = %sanitize_exception_text(reason), "validation layer skipped");
                Ok(())
            }
            LayerPolicy::Reject => Err(reject(
                stage,
                ErrorBuilder::system_error(&format!("{} validation unavailable: {}", layer, reason)),
            )),
        }
    }
}

fn reject(stage: PipelineStage, err: ValidationError) -> ValidationError {
    info!(
        after = %stage,
        stage = %PipelineStage::Rejected,
        error_code = %err.error_code,
        "chart request rejected"
    );
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetColumn, DatasetContext, InMemoryRepository, RepositoryError};
    use serde_json::json;

    struct FailingRepository;

    impl DatasetRepository for FailingRepository {
        fn resolve(&self, _id: &DatasetId) -> Result<Option<DatasetContext>, RepositoryError> {
            Err(RepositoryError::Unavailable("connection refused".to_string()))
        }
    }

    struct PanickingCheck;

    impl RuntimeValidator for PanickingCheck {
        fn name(&self) -> &str {
            "panics"
        }

        fn validate(&self, _config: &ChartConfig, _id: &DatasetId) -> Result<(), ValidationError> {
            panic!("secret table payroll exploded");
        }
    }

    fn repository() -> InMemoryRepository {
        InMemoryRepository::new().with_dataset(
            DatasetContext::new(18, "orders")
                .with_column(DatasetColumn::new("OrderDate", "TIMESTAMP").temporal())
                .with_column(DatasetColumn::new("Sales", "DECIMAL")),
        )
    }

    fn request() -> Value {
        json!({
            "dataset_id": 18,
            "config": {
                "chart_type": "xy",
                "x": {"name": "orderdate"},
                "y": [{"name": "sales", "aggregate": "SUM"}]
            }
        })
    }

    #[test]
    fn test_accepts_and_normalizes() {
        let pipeline = ValidationPipeline::new().with_repository(repository());
        let validated = pipeline.validate(&request()).unwrap();
        let ChartConfig::Xy(xy) = &validated.config else {
            panic!("variant changed");
        };
        assert_eq!(xy.x.name, "OrderDate");
        assert!(validated.skipped_layers.is_empty());
    }

    #[test]
    fn test_missing_dataset_layer_skipped_by_default() {
        let validated = ValidationPipeline::new().validate(&request()).unwrap();
        assert_eq!(validated.skipped_layers, vec!["dataset".to_string()]);
    }

    #[test]
    fn test_reject_policy_blocks_missing_layer() {
        let config = ValidatorConfig {
            dataset_layer: LayerPolicy::Reject,
            ..ValidatorConfig::default()
        };
        let err = ValidationPipeline::with_config(config)
            .with_repository(FailingRepository)
            .validate(&request())
            .unwrap_err();
        assert_eq!(err.error_type, ErrorType::ValidationSystemError);
        assert!(!err.details.contains("refused"));
    }

    #[test]
    fn test_lookup_failure_skipped() {
        let validated = ValidationPipeline::new()
            .with_repository(FailingRepository)
            .validate(&request())
            .unwrap();
        assert_eq!(validated.skipped_layers, vec!["dataset".to_string()]);
    }

    #[test]
    fn test_panic_becomes_system_error() {
        let err = ValidationPipeline::new()
            .with_runtime_validator(PanickingCheck)
            .validate(&request())
            .unwrap_err();
        assert_eq!(err.error_code, "VALIDATION_SYSTEM_ERROR");
        assert!(!err.details.contains("payroll"));
        assert!(!IN_PIPELINE.with(Cell::get));
    }

    #[test]
    fn test_scope_restores_outer_flag() {
        {
            let _outer = PipelineScope::enter();
            {
                let _inner = PipelineScope::enter();
                assert!(IN_PIPELINE.with(Cell::get));
            }
            assert!(IN_PIPELINE.with(Cell::get));
        }
        assert!(!IN_PIPELINE.with(Cell::get));
    }

    #[test]
    fn test_panic_text_from_payload() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_text(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_text(&*payload), "unknown panic");
    }

    #[test]
    fn test_advisory_heuristics() {
        let config = ValidatorConfig {
            blocking_heuristics: false,
            ..ValidatorConfig::default()
        };
        let mut raw = request();
        raw["config"]["filters"] = json!([{"column": "Sales", "op": ">", "value": 10}, {"column": "Sales", "op": "<", "value": 5}]);

        let validated = ValidationPipeline::with_config(config).validate(&raw).unwrap();
        assert_eq!(validated.warnings[0].error_code, "FILTER_CONTRADICTION");

        let err = ValidationPipeline::new().validate(&raw).unwrap_err();
        assert_eq!(err.error_code, "FILTER_CONTRADICTION");
    }

    #[test]
    fn test_invalid_json_text() {
        let err = ValidationPipeline::new().validate_json("{not json").unwrap_err();
        assert_eq!(err.error_code, "INVALID_REQUEST_FORMAT");
    }

    #[test]
    fn test_runtime_layer_removed() {
        let validated = ValidationPipeline::new()
            .without_runtime_layer()
            .validate(&request())
            .unwrap();
        assert!(validated.skipped_layers.contains(&"runtime".to_string()));
    }
}
