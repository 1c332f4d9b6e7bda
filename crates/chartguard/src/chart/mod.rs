//! Chart configuration data model.
//!
//! A [`ChartConfig`] is a tagged union over the supported chart shapes. The
//! types here carry no validation logic beyond constructor-time constraint
//! checks (see [`ChartConfig::from_value`]).

mod column;
mod constraint;
mod filter;
mod request;
mod types;

pub use column::{Aggregate, ColumnRef};
pub use constraint::{ConstraintViolation, ViolationKind, is_valid_column_name};
pub use filter::{FilterConfig, FilterOp, FilterValue};
pub use request::{ChartRequest, DatasetId};
pub use types::{
    AxisConfig, AxisScale, ChartConfig, ChartKind, LegendConfig, LegendPosition,
    TableChartConfig, XYChartConfig,
};
