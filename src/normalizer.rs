//! Event normalization
//!
//! This module validates a raw event table and enriches every row:
//! - Required columns checked before any row is touched
//! - `session_number` and `event_timestamp` coerced to integers
//! - UTC date, hour and weekday derived from the timestamp
//! - Login flag and elapsed time within the session computed

use crate::error::AnalyticsError;
use crate::schema::{columns, RawRow, RawTable, REQUIRED_COLUMNS};
use crate::snapshot::EventSnapshot;
use crate::types::{seconds_between, Campaign, Event};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

static NULL: Value = Value::Null;

/// Normalizer for converting raw rows into an immutable event snapshot
pub struct Normalizer;

impl Normalizer {
    /// Normalize a table against the standard required column set
    pub fn normalize(table: &RawTable) -> Result<EventSnapshot, AnalyticsError> {
        Self::normalize_with(table, &REQUIRED_COLUMNS)
    }

    /// Normalize a table against a caller-supplied required column set
    pub fn normalize_with(
        table: &RawTable,
        required: &[&str],
    ) -> Result<EventSnapshot, AnalyticsError> {
        let missing_columns = table.missing_columns(required);
        if !missing_columns.is_empty() {
            return Err(AnalyticsError::SchemaValidation { missing_columns });
        }

        let mut events = table
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| Self::parse_row(index, row))
            .collect::<Result<Vec<_>, _>>()?;

        fill_elapsed_in_session(&mut events);

        debug!(rows = table.len(), "normalized event table");
        Ok(EventSnapshot::from_events(events))
    }

    /// Parse and enrich a single row.
    ///
    /// `elapsed_in_session` is left at zero; it depends on the whole session and
    /// is filled in by [`Normalizer::normalize`].
    pub fn parse_row(index: usize, row: &RawRow) -> Result<Event, AnalyticsError> {
        let session_number = integer(row, columns::SESSION_NUMBER, index)?;
        if session_number < 1 {
            return Err(AnalyticsError::data_type(
                columns::SESSION_NUMBER,
                format!(
                    "session number {} is not positive at row {}",
                    session_number, index
                ),
            ));
        }
        let timestamp = timestamp(row, columns::EVENT_TIMESTAMP, index)?;
        let time = DateTime::<Utc>::from_timestamp_micros(timestamp).ok_or_else(|| {
            AnalyticsError::data_type(
                columns::EVENT_TIMESTAMP,
                format!("timestamp {} out of range at row {}", timestamp, index),
            )
        })?;

        let user_id = optional_string(row, columns::USER_ID, index)?;

        Ok(Event {
            row: index,
            event_name: required_string(row, columns::EVENT_NAME, index)?,
            actor_id: required_string(row, columns::CLIENT_ID, index)?,
            logged_in: user_id.is_some(),
            user_id,
            session_number,
            session_id: required_string(row, columns::SESSION_ID, index)?,
            campaign: Campaign {
                campaign_id: optional_string(row, columns::CAMPAIGN_ID, index)?,
                campaign_name: optional_string(row, columns::CAMPAIGN_NAME, index)?,
                source: optional_string(row, columns::SOURCE, index)?,
                medium: optional_string(row, columns::MEDIUM, index)?,
            },
            timestamp,
            date: time.date_naive(),
            hour: time.hour(),
            weekday: time.weekday(),
            elapsed_in_session: 0.0,
        })
    }
}

impl Event {
    /// Write the event back into the input column layout.
    ///
    /// Normalizing the resulting rows reproduces the same events.
    pub fn to_raw_row(&self) -> RawRow {
        let mut row = RawRow::new();
        let opt = |value: &Option<String>| value.clone().map_or(Value::Null, Value::String);

        row.insert(columns::EVENT_NAME.into(), Value::String(self.event_name.clone()));
        row.insert(columns::USER_ID.into(), opt(&self.user_id));
        row.insert(columns::CLIENT_ID.into(), Value::String(self.actor_id.clone()));
        row.insert(columns::SESSION_NUMBER.into(), Value::from(self.session_number));
        row.insert(columns::SESSION_ID.into(), Value::String(self.session_id.clone()));
        row.insert(columns::CAMPAIGN_ID.into(), opt(&self.campaign.campaign_id));
        row.insert(columns::CAMPAIGN_NAME.into(), opt(&self.campaign.campaign_name));
        row.insert(columns::SOURCE.into(), opt(&self.campaign.source));
        row.insert(columns::MEDIUM.into(), opt(&self.campaign.medium));
        row.insert(columns::EVENT_TIMESTAMP.into(), Value::from(self.timestamp));
        row
    }
}

/// Seconds since the earliest event of each (actor, session) group
fn fill_elapsed_in_session(events: &mut [Event]) {
    let mut first_seen: HashMap<(String, i64), i64> = HashMap::new();
    for event in events.iter() {
        first_seen
            .entry((event.actor_id.clone(), event.session_number))
            .and_modify(|min| *min = (*min).min(event.timestamp))
            .or_insert(event.timestamp);
    }

    for event in events.iter_mut() {
        if let Some(min) = first_seen.get(&(event.actor_id.clone(), event.session_number)) {
            event.elapsed_in_session = seconds_between(*min, event.timestamp);
        }
    }
}

fn cell<'a>(row: &'a RawRow, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&NULL)
}

fn required_string(row: &RawRow, column: &str, index: usize) -> Result<String, AnalyticsError> {
    match cell(row, column) {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(AnalyticsError::data_type(
            column,
            format!("null value at row {}", index),
        )),
        other => Err(AnalyticsError::data_type(
            column,
            format!("expected string at row {}, got {}", index, other),
        )),
    }
}

fn optional_string(
    row: &RawRow,
    column: &str,
    index: usize,
) -> Result<Option<String>, AnalyticsError> {
    match cell(row, column) {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(AnalyticsError::data_type(
            column,
            format!("expected string at row {}, got {}", index, other),
        )),
    }
}

fn integer(row: &RawRow, column: &str, index: usize) -> Result<i64, AnalyticsError> {
    let value = cell(row, column);
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    };
    parsed.ok_or_else(|| {
        AnalyticsError::data_type(
            column,
            format!("cannot coerce {} to integer at row {}", value, index),
        )
    })
}

fn timestamp(row: &RawRow, column: &str, index: usize) -> Result<i64, AnalyticsError> {
    let value = cell(row, column);
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_micros)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_micros))
        }
        _ => None,
    };
    parsed.ok_or_else(|| {
        AnalyticsError::data_type(
            column,
            format!("cannot coerce {} to a timestamp at row {}", value, index),
        )
    })
}

fn integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn whole_micros(value: f64) -> Option<i64> {
    if value.is_finite() && value.abs() < i64::MAX as f64 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Weekday};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn row(
        name: &str,
        client: &str,
        session: Value,
        ts: Value,
        user: Option<&str>,
    ) -> RawRow {
        json!({
            "event_name": name,
            "user_id": user,
            "client_id": client,
            "session_number": session,
            "session_id": format!("{}-{}", client, session),
            "session_campaign_id": null,
            "session_campaign_name": null,
            "session_source": "google",
            "session_medium": "organic",
            "event_timestamp": ts,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    // 2024-01-15T14:00:00Z, a Monday
    const T0: i64 = 1_705_327_200_000_000;

    #[test]
    fn test_missing_columns_rejected() {
        let table = RawTable::from_rows(vec![json!({"event_name": "a", "client_id": "c"})
            .as_object()
            .cloned()
            .unwrap()]);
        match Normalizer::normalize(&table) {
            Err(AnalyticsError::SchemaValidation { missing_columns }) => {
                assert!(missing_columns.contains(&"event_timestamp".to_string()));
                assert!(missing_columns.contains(&"session_number".to_string()));
                assert!(!missing_columns.contains(&"client_id".to_string()));
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_session_number_rejected() {
        let table = RawTable::from_rows(vec![row("a", "c1", json!("first"), json!(T0), None)]);
        match Normalizer::normalize(&table) {
            Err(AnalyticsError::DataType { column, .. }) => assert_eq!(column, "session_number"),
            other => panic!("expected data type error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_positive_session_number_rejected() {
        for session in [json!(0), json!(-3), json!("-1")] {
            let table = RawTable::from_rows(vec![row("a", "c1", session, json!(T0), None)]);
            match Normalizer::normalize(&table) {
                Err(AnalyticsError::DataType { column, reason }) => {
                    assert_eq!(column, "session_number");
                    assert!(reason.contains("not positive"));
                }
                other => panic!("expected data type error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_elapsed_across_extreme_timestamps() {
        let table = RawTable::from_rows(vec![
            row("a", "c1", json!(1), json!(-8_000_000_000_000_000_000_i64), None),
            row("b", "c1", json!(1), json!(8_000_000_000_000_000_000_i64), None),
        ]);
        let snapshot = Normalizer::normalize(&table).unwrap();
        let events = snapshot.events();
        assert_eq!(events[0].elapsed_in_session, 0.0);
        assert_eq!(events[1].elapsed_in_session, 16_000_000_000_000.0);
    }

    #[test]
    fn test_null_timestamp_rejected() {
        let table = RawTable::from_rows(vec![row("a", "c1", json!(1), Value::Null, None)]);
        match Normalizer::normalize(&table) {
            Err(AnalyticsError::DataType { column, .. }) => assert_eq!(column, "event_timestamp"),
            other => panic!("expected data type error, got {:?}", other),
        }
    }

    #[test]
    fn test_coercions() {
        let table = RawTable::from_rows(vec![
            row("a", "c1", json!("2"), json!("1705327200000000"), None),
            row("b", "c1", json!(2.0), json!(1_705_327_210_000_000.7), Some("u1")),
        ]);
        let snapshot = Normalizer::normalize(&table).unwrap();
        let events = snapshot.events();
        assert_eq!(events[0].session_number, 2);
        assert_eq!(events[0].timestamp, T0);
        assert_eq!(events[1].timestamp, T0 + 10_000_000);
        assert!(!events[0].logged_in);
        assert!(events[1].logged_in);
    }

    #[test]
    fn test_derived_fields() {
        let table = RawTable::from_rows(vec![
            row("b", "c1", json!(1), json!(T0 + 40_000_000), None),
            row("a", "c1", json!(1), json!(T0), None),
            row("a", "c2", json!(1), json!(T0 + 3_600_000_000), None),
        ]);
        let snapshot = Normalizer::normalize(&table).unwrap();
        let events = snapshot.events();

        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(events[0].hour, 14);
        assert_eq!(events[0].weekday, Weekday::Mon);
        assert_eq!(events[2].hour, 15);

        assert_eq!(events[0].elapsed_in_session, 40.0);
        assert_eq!(events[1].elapsed_in_session, 0.0);
        assert_eq!(events[2].elapsed_in_session, 0.0);
        assert_eq!(events[0].campaign.source.as_deref(), Some("google"));
    }

    #[test]
    fn test_numeric_client_id_stringified() {
        let mut raw = row("a", "c1", json!(1), json!(T0), None);
        raw.insert("client_id".into(), json!(1234.5678));
        let table = RawTable::from_rows(vec![raw]);
        let snapshot = Normalizer::normalize(&table).unwrap();
        assert_eq!(snapshot.events()[0].actor_id, "1234.5678");
    }

    #[test]
    fn test_empty_optional_string_is_none() {
        let mut raw = row("a", "c1", json!(1), json!(T0), Some(""));
        raw.insert("session_source".into(), json!(""));
        let table = RawTable::from_rows(vec![raw]);
        let snapshot = Normalizer::normalize(&table).unwrap();
        let event = &snapshot.events()[0];
        assert_eq!(event.user_id, None);
        assert!(!event.logged_in);
        assert_eq!(event.campaign.source, None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let table = RawTable::from_rows(vec![
            row("a", "c1", json!("1"), json!(T0 as f64 + 0.5), None),
            row("b", "c1", json!(1), json!(T0 + 5_000_000), Some("u1")),
            row("c", "c2", json!(3), json!(T0 + 9_000_000), None),
        ]);
        let first = Normalizer::normalize(&table).unwrap();
        let rows = first.events().iter().map(Event::to_raw_row).collect();
        let second = Normalizer::normalize(&RawTable::from_rows(rows)).unwrap();
        assert_eq!(first.events(), second.events());
    }

    #[test]
    fn test_custom_required_columns() {
        let table = RawTable::from_rows(vec![row("a", "c1", json!(1), json!(T0), None)]);
        let err = Normalizer::normalize_with(&table, &["event_name", "page_location"]).unwrap_err();
        assert_eq!(err.to_string(), "Missing required columns: page_location");
    }
}
