//! Parsers for raw event tables
//!
//! Accepts the two layouts the CLI reads: a JSON array of row objects, or
//! newline-delimited JSON with one row object per line.

use crate::error::AnalyticsError;
use crate::normalizer::Normalizer;
use crate::schema::raw_table::{RawRow, RawTable};
use serde_json::Value;

/// Adapter for turning serialized rows into a [`RawTable`]
pub struct RawTableAdapter;

impl RawTableAdapter {
    /// Parse a JSON string containing an array of row objects
    pub fn parse_array(json: &str) -> Result<RawTable, AnalyticsError> {
        let values: Vec<Value> = serde_json::from_str(json)?;
        let mut rows = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            rows.push(into_row(value, index + 1)?);
        }
        Ok(RawTable::from_rows(rows))
    }

    /// Parse NDJSON (newline-delimited JSON) containing row objects
    pub fn parse_ndjson(ndjson: &str) -> Result<RawTable, AnalyticsError> {
        let mut rows = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(trimmed).map_err(|e| {
                AnalyticsError::ParseError(format!("Failed to parse line {}: {}", line_num + 1, e))
            })?;
            rows.push(into_row(value, line_num + 1)?);
        }
        Ok(RawTable::from_rows(rows))
    }

    /// Check every row for coercion problems without stopping at the first one
    pub fn validate_rows(table: &RawTable) -> Vec<ValidationResult> {
        table
            .rows()
            .iter()
            .enumerate()
            .filter_map(|(index, row)| {
                Normalizer::parse_row(index, row)
                    .err()
                    .map(|error| ValidationResult { index, error })
            })
            .collect()
    }
}

/// A row that failed validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub error: AnalyticsError,
}

fn into_row(value: Value, position: usize) -> Result<RawRow, AnalyticsError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AnalyticsError::ParseError(format!(
            "Row {} is not an object: {}",
            position, other
        ))),
    }
}
