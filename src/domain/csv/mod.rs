// ============================================================
// CSV DOMAIN LAYER
// ============================================================
// Core types for uploaded tabular data
// No I/O, no async

mod dataset;

pub use dataset::{CsvRow, Dataset, PID_COLUMN, TIME_INDEX_COLUMN};
