//! Conversion timing
//!
//! Measures how long groups take to go from a start event to an end event.
//! For every group containing both, the earliest occurrence of each is used;
//! the group is kept only when the end follows the start within the window.

use crate::deadline::{deadline_reason, Deadline};
use crate::error::AnalyticsError;
use crate::snapshot::EventSnapshot;
use crate::types::{seconds_between, AnalysisOutcome, Event, Scope, SegmentBy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Label used when source or medium is missing
pub const NOT_SET_LABEL: &str = "(not set)";

/// Number of source/medium labels kept for segmentation
pub const TOP_SOURCE_MEDIUMS: usize = 10;

/// Default conversion window in minutes
pub const DEFAULT_MAX_MINUTES: f64 = 30.0;

/// Conversion timing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRequest {
    pub start_event: String,
    pub end_event: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default = "default_max_minutes")]
    pub max_minutes: f64,
    #[serde(default)]
    pub segment_by: SegmentBy,
}

fn default_max_minutes() -> f64 {
    DEFAULT_MAX_MINUTES
}

impl TimingRequest {
    pub fn new(start_event: &str, end_event: &str) -> Self {
        Self {
            start_event: start_event.to_string(),
            end_event: end_event.to_string(),
            scope: Scope::Session,
            max_minutes: DEFAULT_MAX_MINUTES,
            segment_by: SegmentBy::None,
        }
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.start_event == self.end_event {
            return Err(AnalyticsError::invalid_parameter(format!(
                "start_event and end_event must differ, both are '{}'",
                self.start_event
            )));
        }
        if !self.max_minutes.is_finite() || self.max_minutes <= 0.0 {
            return Err(AnalyticsError::invalid_parameter(format!(
                "max_minutes must be a positive number, got {}",
                self.max_minutes
            )));
        }
        Ok(())
    }
}

/// One converting group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionTiming {
    pub actor_id: String,
    /// Absent for actor-scoped requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_number: Option<i64>,
    pub elapsed_s: f64,
    pub logged_in: bool,
    pub source_medium: String,
}

/// Descriptive statistics over elapsed seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    pub count: usize,
    pub mean_s: f64,
    pub median_s: f64,
    pub min_s: f64,
    pub max_s: f64,
}

impl TimingStats {
    /// `None` for an empty sample
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        let median_s = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        Some(Self {
            count: n,
            mean_s: sorted.iter().sum::<f64>() / n as f64,
            median_s,
            min_s: sorted[0],
            max_s: sorted[n - 1],
        })
    }
}

/// Statistics for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentStats {
    pub segment: String,
    #[serde(flatten)]
    pub stats: TimingStats,
}

/// Conversion timing table with aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingReport {
    pub start_event: String,
    pub end_event: String,
    pub scope: Scope,
    pub segment_by: SegmentBy,
    pub records: Vec<ConversionTiming>,
    pub overall: TimingStats,
    pub segments: Vec<SegmentStats>,
}

/// Analyzer for start-to-end conversion times
pub struct ConversionTimingAnalyzer;

impl ConversionTimingAnalyzer {
    pub fn analyze(
        snapshot: &EventSnapshot,
        request: &TimingRequest,
        deadline: Deadline,
    ) -> Result<AnalysisOutcome<TimingReport>, AnalyticsError> {
        request.validate()?;

        let window_s = request.max_minutes * 60.0;
        let groups = snapshot.groups(request.scope);
        let mut with_both = 0usize;
        let mut records = Vec::new();

        for (processed, group) in groups.iter().enumerate() {
            if deadline.expired() {
                warn!(processed, total = groups.len(), "conversion timing aborted");
                return Ok(AnalysisOutcome::empty(deadline_reason(
                    "conversion timing",
                    processed,
                    groups.len(),
                )));
            }

            let start_t = earliest(&group.events, &request.start_event);
            let end_t = earliest(&group.events, &request.end_event);
            let (Some(start_t), Some(end_t)) = (start_t, end_t) else {
                continue;
            };
            with_both += 1;

            if end_t <= start_t {
                continue;
            }
            let elapsed_s = seconds_between(start_t, end_t);
            if elapsed_s > window_s {
                continue;
            }

            records.push(ConversionTiming {
                actor_id: group.actor_id.to_string(),
                session_number: group.session_number,
                elapsed_s,
                logged_in: group.events.iter().any(|e| e.logged_in),
                source_medium: source_medium_label(
                    group.events.iter().copied().min_by_key(|e| e.row),
                ),
            });
        }

        if with_both == 0 {
            return Ok(AnalysisOutcome::empty(format!(
                "no groups contain both '{}' and '{}'",
                request.start_event, request.end_event
            )));
        }

        let samples: Vec<f64> = records.iter().map(|r| r.elapsed_s).collect();
        let Some(overall) = TimingStats::from_samples(&samples) else {
            return Ok(AnalysisOutcome::empty(
                "no sessions contain both events within the time window",
            ));
        };

        let segments = match request.segment_by {
            SegmentBy::None => Vec::new(),
            SegmentBy::Login => login_segments(&records),
            SegmentBy::SourceMedium => source_medium_segments(&records),
        };

        debug!(
            qualifying = with_both,
            converted = records.len(),
            segments = segments.len(),
            "computed conversion timing"
        );

        Ok(AnalysisOutcome::Ready(TimingReport {
            start_event: request.start_event.clone(),
            end_event: request.end_event.clone(),
            scope: request.scope,
            segment_by: request.segment_by,
            records,
            overall,
            segments,
        }))
    }
}

fn earliest(events: &[&Event], name: &str) -> Option<i64> {
    events
        .iter()
        .filter(|e| e.event_name == name)
        .map(|e| e.timestamp)
        .min()
}

/// `source/medium` of the group's earliest input row
fn source_medium_label(first: Option<&Event>) -> String {
    let campaign = first.map(|e| &e.campaign);
    match campaign.map(|c| (c.source.as_deref(), c.medium.as_deref())) {
        Some((Some(source), Some(medium))) => format!("{}/{}", source, medium),
        _ => NOT_SET_LABEL.to_string(),
    }
}

fn login_segments(records: &[ConversionTiming]) -> Vec<SegmentStats> {
    [("logged_in", true), ("anonymous", false)]
        .into_iter()
        .filter_map(|(label, flag)| {
            let samples: Vec<f64> = records
                .iter()
                .filter(|r| r.logged_in == flag)
                .map(|r| r.elapsed_s)
                .collect();
            TimingStats::from_samples(&samples).map(|stats| SegmentStats {
                segment: label.to_string(),
                stats,
            })
        })
        .collect()
}

/// Stats for the most frequent labels, largest segment first
fn source_medium_segments(records: &[ConversionTiming]) -> Vec<SegmentStats> {
    let mut order: Vec<&str> = Vec::new();
    let mut samples: HashMap<&str, Vec<f64>> = HashMap::new();
    for record in records {
        let label = record.source_medium.as_str();
        samples
            .entry(label)
            .or_insert_with(|| {
                order.push(label);
                Vec::new()
            })
            .push(record.elapsed_s);
    }

    // stable sort keeps first-seen order among equal counts
    order.sort_by_key(|label| std::cmp::Reverse(samples[label].len()));
    order.truncate(TOP_SOURCE_MEDIUMS);

    order
        .into_iter()
        .filter_map(|label| {
            TimingStats::from_samples(&samples[label]).map(|stats| SegmentStats {
                segment: label.to_string(),
                stats,
            })
        })
        .collect()
}
