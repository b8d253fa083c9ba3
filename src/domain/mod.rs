pub mod error;
pub mod stats;

// Uploaded CSV data
pub mod csv;
