pub mod use_cases;

pub use use_cases::column_stats::{ColumnStatsUseCase, StatsRequest, UploadedFile};
