//! Fuzz target for the validation pipeline.
//!
//! Feeds arbitrary bytes as request JSON and checks that:
//! 1. The pipeline never panics past its boundary
//! 2. Every rejection carries an error code and a message

#![no_main]

use chartguard::{DatasetColumn, DatasetContext, InMemoryRepository, ValidationPipeline};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 64_000 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let dataset = DatasetContext::new(18, "orders")
        .with_column(DatasetColumn::new("OrderDate", "TIMESTAMP"))
        .with_column(DatasetColumn::new("Sales", "DECIMAL"));
    let pipeline =
        ValidationPipeline::new().with_repository(InMemoryRepository::new().with_dataset(dataset));

    if let Err(err) = pipeline.validate_json(text) {
        assert!(!err.error_code.is_empty());
        assert!(!err.message.is_empty());
    }
});
