mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

pub use app::run;
pub use application::{ColumnStatsUseCase, StatsRequest, UploadedFile};
pub use domain::error::{AppError, Result};
pub use domain::stats::AggregationResult;
