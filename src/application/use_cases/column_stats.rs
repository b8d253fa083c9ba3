use std::time::Instant;

use crate::domain::csv::Dataset;
use crate::domain::error::{AppError, Result};
use crate::domain::stats::{aggregate_by_time_index, AggregationResult};
use crate::infrastructure::csv::CsvParser;
use crate::infrastructure::logging::RequestLog;

const LOG_SOURCE: &str = "ColumnStats";

/// File part of an upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied name, only used for the `.csv` suffix check
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct StatsRequest {
    pub column_name: String,
    pub separator: String,
    pub file: Option<UploadedFile>,
}

/// Stateless per-request stats computation. Holds only the log sink.
#[derive(Debug, Clone)]
pub struct ColumnStatsUseCase {
    log: RequestLog,
}

impl ColumnStatsUseCase {
    pub fn new(log: RequestLog) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &RequestLog {
        &self.log
    }

    pub fn health_check(&self) -> &'static str {
        "OK!"
    }

    /// Validate the upload and compute per-Zeitindex sum and mean of the
    /// requested column. Stops at the first failing check.
    pub fn compute_column_stats(&self, request: &StatsRequest) -> Result<AggregationResult> {
        let start = Instant::now();
        let result = self.run(request);

        match &result {
            Ok(stats) => self.log.info(
                LOG_SOURCE,
                &format!(
                    "Computed stats (column={} groups={} elapsed_ms={})",
                    request.column_name,
                    stats.len(),
                    start.elapsed().as_millis()
                ),
            ),
            Err(e) if e.is_client_error() => self.log.warn(
                LOG_SOURCE,
                &format!(
                    "Rejected stats request (status={} column={} separator={:?}): {}",
                    e.status_code(),
                    request.column_name,
                    request.separator,
                    e
                ),
            ),
            Err(e) => self.log.error(
                LOG_SOURCE,
                &format!(
                    "Stats request failed (column={} separator={:?} file={:?}): {}",
                    request.column_name,
                    request.separator,
                    request.file.as_ref().map(|f| f.file_name.as_str()),
                    e
                ),
            ),
        }

        result
    }

    fn run(&self, request: &StatsRequest) -> Result<AggregationResult> {
        if request.column_name.is_empty() {
            return Err(AppError::InvalidColumnName);
        }

        if request.separator.is_empty() {
            return Err(AppError::InvalidSeparator);
        }

        let file = request.file.as_ref().ok_or(AppError::MissingFile)?;

        if !file.file_name.ends_with(".csv") {
            return Err(AppError::InvalidFileFormat);
        }

        let dataset = CsvParser::with_separator(&request.separator)?.parse_bytes(&file.bytes)?;
        validate_columns(&dataset, &request.column_name)?;

        aggregate_by_time_index(&dataset, &request.column_name)
    }
}

fn validate_columns(dataset: &Dataset, column_name: &str) -> Result<()> {
    if !dataset.has_required_columns() {
        return Err(AppError::MissingRequiredColumns);
    }

    if !dataset.has_column(column_name) {
        return Err(AppError::ColumnNotFound(column_name.to_string()));
    }

    Ok(())
}
