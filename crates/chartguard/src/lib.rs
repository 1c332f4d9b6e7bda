//! Chartguard: validation and normalization of chart requests.
//!
//! Chartguard takes an untrusted, loosely-typed chart request (often
//! produced by an LLM agent) and turns it into either a validated
//! configuration whose column names match the dataset exactly, or a
//! structured error that says what is wrong and how to fix it.
//!
//! # Core Principles
//!
//! - **Actionable errors**: Every rejection names the field and suggests a fix
//! - **Canonical output**: References are rewritten to the dataset's spelling
//! - **Injection-safe**: User input is sanitized before it reaches a message
//!
//! # Example
//!
//! ```
//! use chartguard::{DatasetColumn, DatasetContext, InMemoryRepository, ValidationPipeline};
//! use serde_json::json;
//!
//! let orders = DatasetContext::new(18, "orders")
//!     .with_column(DatasetColumn::new("OrderDate", "TIMESTAMP").temporal())
//!     .with_column(DatasetColumn::new("Sales", "DECIMAL(10,2)"));
//!
//! let pipeline = ValidationPipeline::new()
//!     .with_repository(InMemoryRepository::new().with_dataset(orders));
//!
//! let validated = pipeline
//!     .validate(&json!({
//!         "dataset_id": 18,
//!         "config": {
//!             "chart_type": "xy",
//!             "x": {"name": "orderdate"},
//!             "y": [{"name": "sales", "aggregate": "SUM"}]
//!         }
//!     }))
//!     .unwrap();
//!
//! println!("{}", serde_json::to_string_pretty(&validated.config).unwrap());
//! ```

pub mod chart;
pub mod dataset;
pub mod error;
pub mod settings;
pub mod validation;

pub use chart::{
    Aggregate, ChartConfig, ChartKind, ChartRequest, ColumnRef, DatasetId, FilterConfig, FilterOp,
    FilterValue, TableChartConfig, XYChartConfig,
};
pub use dataset::{DatasetColumn, DatasetContext, DatasetMetric, DatasetRepository, InMemoryRepository};
pub use error::{ChartguardError, Result};
pub use settings::{LayerPolicy, ValidatorConfig};
pub use validation::{ErrorType, ValidatedRequest, ValidationError, ValidationPipeline};
