// ============================================================
// DATASET TYPES
// ============================================================
// In-memory table produced by parsing one uploaded CSV file

/// Identifier column whose presence is required
pub const PID_COLUMN: &str = "PID";

/// Grouping key column (time bucket)
pub const TIME_INDEX_COLUMN: &str = "Zeitindex";

/// A single parsed data row
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    /// Line number in the source file (1-based, header is line 1)
    pub line: usize,

    /// Raw cell values, one per header column. `None` marks an empty or
    /// missing cell.
    pub cells: Vec<Option<String>>,
}

impl CsvRow {
    pub fn new(line: usize, cells: Vec<Option<String>>) -> Self {
        Self { line, cells }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(|cell| cell.as_deref())
    }
}

/// An ordered sequence of rows sharing one header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<CsvRow>,
}

impl Dataset {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with missing cells
    pub fn push_row(&mut self, mut row: CsvRow) {
        if row.cells.len() < self.headers.len() {
            row.cells.resize(self.headers.len(), None);
        }
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[CsvRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column with this exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// True when both `PID` and `Zeitindex` are present
    pub fn has_required_columns(&self) -> bool {
        self.has_column(PID_COLUMN) && self.has_column(TIME_INDEX_COLUMN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_required_columns() {
        let ds = Dataset::new(headers(&["PID", "Zeitindex", "X"]));
        assert!(ds.has_required_columns());

        let ds = Dataset::new(headers(&["PID", "X"]));
        assert!(!ds.has_required_columns());

        // Exact, case-sensitive match
        let ds = Dataset::new(headers(&["pid", "Zeitindex"]));
        assert!(!ds.has_required_columns());
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut ds = Dataset::new(headers(&["PID", "Zeitindex", "X"]));
        ds.push_row(CsvRow::new(2, vec![Some("1".to_string())]));

        assert_eq!(ds.len(), 1);
        assert_eq!(ds.rows()[0].cells.len(), 3);
        assert_eq!(ds.rows()[0].get(0), Some("1"));
        assert_eq!(ds.rows()[0].get(2), None);
    }

    #[test]
    fn test_duplicate_header_uses_first() {
        let ds = Dataset::new(headers(&["X", "PID", "X"]));
        assert_eq!(ds.column_index("X"), Some(0));
    }
}
