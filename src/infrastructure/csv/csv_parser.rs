// ============================================================
// CSV PARSER
// ============================================================
// Parse uploaded CSV bytes with Latin-1 decoding and a caller-chosen separator

use csv::{ReaderBuilder, Trim};
use encoding_rs::mem::decode_latin1;
use regex::Regex;

use crate::domain::csv::{CsvRow, Dataset};
use crate::domain::error::{AppError, Result};

/// How fields are split on each line
#[derive(Debug, Clone)]
enum Separator {
    /// Single ASCII delimiter, quoted fields supported
    Byte(u8),

    /// Anything else, split line by line without quoting
    Pattern(Regex),
}

/// CSV parser bound to one separator
#[derive(Debug, Clone)]
pub struct CsvParser {
    separator: Separator,
}

impl CsvParser {
    /// Build a parser for `separator`.
    ///
    /// One ASCII character is used as a plain delimiter. A single non-ASCII
    /// character is matched literally. Longer separators are regular
    /// expressions, so `\s+` splits on runs of whitespace.
    pub fn with_separator(separator: &str) -> Result<Self> {
        if separator.is_empty() {
            return Err(AppError::InvalidSeparator);
        }

        let separator = if separator.len() == 1 {
            Separator::Byte(separator.as_bytes()[0])
        } else if separator.chars().count() == 1 {
            Separator::Pattern(Regex::new(&regex::escape(separator))?)
        } else {
            Separator::Pattern(Regex::new(separator)?)
        };

        Ok(Self { separator })
    }

    /// Decode `bytes` as ISO-8859-1 and parse them into a dataset.
    /// The first non-blank line is the header.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Dataset> {
        let content = decode_latin1(bytes);

        if content.trim().is_empty() {
            return Err(AppError::ParseError(
                "No columns to parse from file".to_string(),
            ));
        }

        match &self.separator {
            Separator::Byte(delimiter) => Self::parse_delimited(&content, *delimiter),
            Separator::Pattern(pattern) => Self::parse_pattern(&content, pattern),
        }
    }

    fn parse_delimited(content: &str, delimiter: u8) -> Result<Dataset> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::None)
            .flexible(true) // column counts are checked below
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let mut dataset = Dataset::new(headers);

        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            let fields: Vec<&str> = record.iter().collect();
            if is_whitespace_line(&fields) {
                continue;
            }

            let line = record
                .position()
                .map(|pos| pos.line() as usize)
                .unwrap_or(index + 2);
            let row = Self::build_row(&dataset, line, &fields)?;
            dataset.push_row(row);
        }

        Ok(dataset)
    }

    fn parse_pattern(content: &str, pattern: &Regex) -> Result<Dataset> {
        let mut lines = content
            .lines()
            .enumerate()
            .map(|(index, text)| (index + 1, text))
            .filter(|(_, text)| !is_whitespace_line(&[*text]));

        let Some((_, header_line)) = lines.next() else {
            return Err(AppError::ParseError(
                "No columns to parse from file".to_string(),
            ));
        };

        let headers = pattern
            .split(header_line)
            .map(str::to_string)
            .collect::<Vec<_>>();
        let mut dataset = Dataset::new(headers);

        for (line, text) in lines {
            let fields: Vec<&str> = pattern.split(text).collect();
            let row = Self::build_row(&dataset, line, &fields)?;
            dataset.push_row(row);
        }

        Ok(dataset)
    }

    /// Rows wider than the header are rejected; narrower rows get missing cells
    fn build_row(dataset: &Dataset, line: usize, fields: &[&str]) -> Result<CsvRow> {
        let expected = dataset.headers().len();
        if fields.len() > expected {
            return Err(AppError::ParseError(format!(
                "Expected {} fields in line {}, saw {}",
                expected,
                line,
                fields.len()
            )));
        }

        let cells = fields
            .iter()
            .map(|value| {
                if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            })
            .collect();

        Ok(CsvRow::new(line, cells))
    }
}

/// A line holding nothing but whitespace and no separator. Lines like `,,`
/// are rows of missing cells and are kept.
fn is_whitespace_line(fields: &[&str]) -> bool {
    matches!(fields, [only] if only.trim().is_empty())
}
