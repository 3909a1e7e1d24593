//! Core types for the Journey Flux engine
//!
//! This module defines the records that flow between the pipeline stages:
//! normalized events, session summaries, the closed parameter enums resolved at
//! the request boundary, and the outcome wrapper every analyzer returns.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Grouping scope for journey analyses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// One group per (actor, session_number)
    #[default]
    #[serde(alias = "SESSION")]
    Session,
    /// One group per actor, spanning all of its sessions
    #[serde(alias = "ACTOR")]
    Actor,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Session => "session",
            Scope::Actor => "actor",
        }
    }
}

/// Funnel evaluation mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelMode {
    /// Sequential intersection of per-step presence sets.
    ///
    /// A key survives step i when it has any occurrence of step i's event;
    /// the relative timing of steps is not checked.
    #[default]
    #[serde(alias = "STRICT")]
    Strict,
    /// Independent distinct-key counts per step
    #[serde(alias = "UNORDERED")]
    Unordered,
    /// Like `Strict`, but each step must occur chronologically at or after the
    /// occurrence that satisfied the previous step
    #[serde(alias = "SEQUENTIAL")]
    Sequential,
}

/// Segmentation applied to conversion timings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentBy {
    #[default]
    #[serde(alias = "NONE")]
    None,
    #[serde(alias = "LOGIN")]
    Login,
    #[serde(alias = "SOURCE_MEDIUM")]
    SourceMedium,
}

/// Bucket size for temporal event distributions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeGranularity {
    #[default]
    #[serde(alias = "DAY")]
    Day,
    #[serde(alias = "HOUR")]
    Hour,
    #[serde(alias = "WEEKDAY")]
    Weekday,
}

/// Campaign attribution carried by every event of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
}

/// A validated, enriched product-analytics event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Position of the source row in the input table
    pub row: usize,
    pub event_name: String,
    /// Stable anonymous identifier (`client_id` in the input)
    pub actor_id: String,
    /// Authenticated user identifier, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub session_number: i64,
    pub session_id: String,
    #[serde(flatten)]
    pub campaign: Campaign,
    /// Microseconds since the Unix epoch
    pub timestamp: i64,
    /// UTC calendar date of the event
    pub date: NaiveDate,
    /// UTC hour of day (0-23)
    pub hour: u32,
    pub weekday: Weekday,
    pub logged_in: bool,
    /// Seconds since the first event of the same (actor, session) group
    pub elapsed_in_session: f64,
}

/// Session-level summary keyed by (actor_id, session_number)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub actor_id: String,
    pub session_number: i64,
    /// Earliest event timestamp (microseconds)
    pub start_time: i64,
    /// Latest event timestamp (microseconds)
    pub end_time: i64,
    pub duration_s: f64,
    pub event_count: usize,
    pub logged_in: bool,
    pub source: Option<String>,
    pub medium: Option<String>,
    /// First non-null user id seen in the session
    #[serde(skip)]
    pub user_id: Option<String>,
    /// Session id of the first event in the session
    #[serde(skip)]
    pub session_id: String,
}

/// Result of one analysis over a snapshot.
///
/// `Empty` is a normal value: it carries a human-readable reason and is never
/// used to signal malformed input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum AnalysisOutcome<T> {
    Ready(T),
    Empty { reason: String },
}

impl<T> AnalysisOutcome<T> {
    pub fn empty(reason: impl Into<String>) -> Self {
        AnalysisOutcome::Empty {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, AnalysisOutcome::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            AnalysisOutcome::Ready(value) => Some(value),
            AnalysisOutcome::Empty { .. } => None,
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            AnalysisOutcome::Ready(value) => Some(value),
            AnalysisOutcome::Empty { .. } => None,
        }
    }

    pub fn empty_reason(&self) -> Option<&str> {
        match self {
            AnalysisOutcome::Ready(_) => None,
            AnalysisOutcome::Empty { reason } => Some(reason),
        }
    }
}

/// Round to one decimal place, as percentages are reported
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Seconds from `start` to `end`, both in epoch microseconds.
///
/// The difference is taken in `i128` so any pair of `i64` timestamps is valid.
pub(crate) fn seconds_between(start: i64, end: i64) -> f64 {
    (i128::from(end) - i128::from(start)) as f64 / MICROS_PER_SECOND
}
