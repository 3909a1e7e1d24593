//! Raw event table definition
//!
//! Rows arrive as JSON objects keyed by column name, one row per user
//! interaction. Columns are the ordered union of keys seen across all rows, so a
//! column that is present but null in a given row is distinguishable from a
//! column the source never exported.

use serde_json::{Map, Value};

/// Identifier of the expected input layout
pub const SCHEMA_VERSION: &str = "journey.raw_event.v1";

/// Input column names
pub mod columns {
    pub const EVENT_NAME: &str = "event_name";
    pub const USER_ID: &str = "user_id";
    pub const CLIENT_ID: &str = "client_id";
    pub const SESSION_NUMBER: &str = "session_number";
    pub const SESSION_ID: &str = "session_id";
    pub const CAMPAIGN_ID: &str = "session_campaign_id";
    pub const CAMPAIGN_NAME: &str = "session_campaign_name";
    pub const SOURCE: &str = "session_source";
    pub const MEDIUM: &str = "session_medium";
    pub const EVENT_TIMESTAMP: &str = "event_timestamp";
}

/// Columns the normalizer requires, in export order
pub const REQUIRED_COLUMNS: [&str; 10] = [
    columns::EVENT_NAME,
    columns::USER_ID,
    columns::CLIENT_ID,
    columns::SESSION_NUMBER,
    columns::SESSION_ID,
    columns::CAMPAIGN_ID,
    columns::CAMPAIGN_NAME,
    columns::SOURCE,
    columns::MEDIUM,
    columns::EVENT_TIMESTAMP,
];

/// Column sets of the output tables consumed by export and rendering layers
pub const OUTPUT_TABLES: [(&str, &[&str]); 7] = [
    (
        "session",
        &[
            "actor_id",
            "session_number",
            "start_time",
            "end_time",
            "duration_s",
            "event_count",
            "logged_in",
            "source",
            "medium",
        ],
    ),
    ("path_frequency", &["path_tuple", "frequency"]),
    ("funnel", &["step", "count", "rate_pct"]),
    (
        "conversion_timing",
        &[
            "actor_id",
            "session_number",
            "elapsed_s",
            "logged_in",
            "source_medium",
        ],
    ),
    (
        "graph_node",
        &[
            "event_name",
            "total_count",
            "centrality",
            "in_degree",
            "out_degree",
        ],
    ),
    (
        "graph_edge",
        &["source", "target", "weight", "distinct_actors"],
    ),
    (
        "drop_off",
        &["event_name", "in_degree", "out_degree", "dropoff_pct"],
    ),
];

/// One input row keyed by column name
pub type RawRow = Map<String, Value>;

/// Tabular input: a column header plus rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<RawRow>,
}

impl RawTable {
    /// Build a table whose header is the ordered union of the rows' keys
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    /// Build a table with an explicit header (e.g. from a CSV export)
    pub fn with_columns(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Required columns absent from the header, in the order given
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| name.to_string())
            .collect()
    }
}
