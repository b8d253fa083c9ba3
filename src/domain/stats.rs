use std::cmp::Ordering;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::csv::{Dataset, TIME_INDEX_COLUMN};
use super::error::{AppError, Result};

static NON_DIGIT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").unwrap());

/// Removes every character that is not an ASCII digit
pub fn strip_non_digits(value: &str) -> String {
    NON_DIGIT_PATTERN.replace_all(value, "").into_owned()
}

/// Running sum and count for one time bucket
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupStats {
    pub sum: i64,
    pub count: usize,
}

impl GroupStats {
    pub fn update(&mut self, value: i64) -> Option<()> {
        self.sum = self.sum.checked_add(value)?;
        self.count += 1;
        Some(())
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum as f64 / self.count as f64
    }
}

/// Orders Zeitindex values naturally: integer keys first by value, then all
/// other keys by string. Ties between equal integers ("1", "01") fall back to
/// the raw string so distinct keys never compare equal.
pub fn compare_time_index(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Per-Zeitindex sums and means of one column, keyed by the raw Zeitindex
/// value in natural ascending order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationResult {
    groups: Vec<(String, GroupStats)>,
}

impl AggregationResult {
    fn from_groups(groups: HashMap<String, GroupStats>) -> Self {
        let mut groups: Vec<_> = groups.into_iter().collect();
        groups.sort_by(|(a, _), (b, _)| compare_time_index(a, b));
        Self { groups }
    }

    /// Zeitindex values in output order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn group(&self, key: &str) -> Option<&GroupStats> {
        self.groups
            .iter()
            .find(|(group_key, _)| group_key == key)
            .map(|(_, stats)| stats)
    }

    pub fn sum(&self, key: &str) -> Option<i64> {
        self.group(key).map(|stats| stats.sum)
    }

    pub fn mean(&self, key: &str) -> Option<f64> {
        self.group(key).map(GroupStats::mean)
    }

    pub fn count(&self, key: &str) -> Option<usize> {
        self.group(key).map(|stats| stats.count)
    }
}

/// One output map, written in group order
struct GroupMap<'a, F>(&'a [(String, GroupStats)], F);

impl<'a, F, V> Serialize for GroupMap<'a, F>
where
    F: Fn(&GroupStats) -> V,
    V: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(key, stats)| (key, (self.1)(stats))))
    }
}

impl Serialize for AggregationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AggregationResult", 2)?;
        state.serialize_field(
            "Summe pro Zeiteinheit",
            &GroupMap(&self.groups, |stats: &GroupStats| stats.sum),
        )?;
        state.serialize_field(
            "Durchschnitt pro Zeiteinheit",
            &GroupMap(&self.groups, GroupStats::mean),
        )?;
        state.end()
    }
}

/// Converts one raw cell of the target column to an integer
fn coerce_integer(raw: Option<&str>, column: &str, line: usize) -> Result<i64> {
    let raw = raw.ok_or_else(|| {
        AppError::Internal(format!(
            "Cannot convert missing value in column '{}' (line {}) to integer",
            column, line
        ))
    })?;

    let digits = strip_non_digits(raw);
    if digits.is_empty() {
        return Err(AppError::Internal(format!(
            "Value '{}' in column '{}' (line {}) contains no digits",
            raw, column, line
        )));
    }

    digits.parse::<i64>().map_err(|e| {
        AppError::Internal(format!(
            "Value '{}' in column '{}' (line {}) is not a valid integer: {}",
            raw, column, line, e
        ))
    })
}

/// Sums and averages `column` per distinct raw `Zeitindex` value.
///
/// Every row's target value must coerce to an integer, including rows whose
/// `Zeitindex` is empty. Those rows are validated but belong to no group.
pub fn aggregate_by_time_index(dataset: &Dataset, column: &str) -> Result<AggregationResult> {
    let value_idx = dataset
        .column_index(column)
        .ok_or_else(|| AppError::ColumnNotFound(column.to_string()))?;
    let key_idx = dataset
        .column_index(TIME_INDEX_COLUMN)
        .ok_or(AppError::MissingRequiredColumns)?;

    let mut groups: HashMap<String, GroupStats> = HashMap::new();

    for row in dataset.rows() {
        let value = coerce_integer(row.get(value_idx), column, row.line)?;

        let Some(key) = row.get(key_idx) else {
            continue;
        };

        groups
            .entry(key.to_string())
            .or_default()
            .update(value)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Sum of column '{}' overflows for Zeitindex '{}'",
                    column, key
                ))
            })?;
    }

    Ok(AggregationResult::from_groups(groups))
}
