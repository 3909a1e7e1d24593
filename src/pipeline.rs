//! Pipeline orchestration
//!
//! This module provides the public API for Journey Flux.
//! It takes a raw event table through normalization and session aggregation,
//! then runs the four independent analyzers over the same snapshot.

use crate::deadline::Deadline;
use crate::error::AnalyticsError;
use crate::events::{DatasetSummary, EventOverview};
use crate::funnel::{FunnelEngine, FunnelReport, FunnelRequest};
use crate::graph::{GraphRequest, TransitionGraph, TransitionGraphEngine};
use crate::normalizer::Normalizer;
use crate::paths::{PathExtractor, PathReport, PathRequest};
use crate::schema::RawTableAdapter;
use crate::sessions::SessionAggregator;
use crate::snapshot::{EventSnapshot, SnapshotFilter};
use crate::timing::{ConversionTimingAnalyzer, TimingReport, TimingRequest};
use crate::types::{AnalysisOutcome, Session};
use crate::ENGINE_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

/// Parameters for one analytics request.
///
/// Every field has a default, so `{}` is a valid request: session-scoped
/// 3-step paths, a transition graph with a threshold of 5, and no funnel or
/// timing analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisRequest {
    pub filter: SnapshotFilter,
    pub paths: PathRequest,
    pub funnel: Option<FunnelRequest>,
    pub timing: Option<TimingRequest>,
    pub graph: GraphRequest,
    /// Soft time limit for the analyzers, in milliseconds
    pub timeout_ms: Option<u64>,
}

impl AnalysisRequest {
    /// Parse a request from JSON
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject invalid parameters before any computation
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        self.paths.validate()?;
        if let Some(funnel) = &self.funnel {
            funnel.validate()?;
        }
        if let Some(timing) = &self.timing {
            timing.validate()?;
        }
        self.graph.validate()?;
        if let (Some(start), Some(end)) = (self.filter.start_date, self.filter.end_date) {
            if start > end {
                return Err(AnalyticsError::invalid_parameter(format!(
                    "filter start_date {} is after end_date {}",
                    start, end
                )));
            }
        }
        Ok(())
    }
}

/// Output of one analytics request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub engine_version: String,
    pub summary: DatasetSummary,
    pub sessions: Vec<Session>,
    pub paths: AnalysisOutcome<PathReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funnel: Option<AnalysisOutcome<FunnelReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<AnalysisOutcome<TimingReport>>,
    pub graph: AnalysisOutcome<TransitionGraph>,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String, AnalyticsError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, AnalyticsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Analyze a JSON array of raw event rows.
///
/// # Arguments
/// * `raw_json` - JSON array of row objects with the required columns
/// * `request` - Analysis parameters
///
/// # Example
/// ```ignore
/// let report = analyze_json_rows(rows_json, &AnalysisRequest::default())?;
/// println!("{}", report.to_json_pretty()?);
/// ```
pub fn analyze_json_rows(
    raw_json: &str,
    request: &AnalysisRequest,
) -> Result<AnalysisReport, AnalyticsError> {
    let table = RawTableAdapter::parse_array(raw_json)?;
    let snapshot = Normalizer::normalize(&table)?;
    JourneyProcessor::new(request.clone())?.analyze(&snapshot)
}

/// Analyze newline-delimited JSON rows
pub fn analyze_ndjson_rows(
    raw_ndjson: &str,
    request: &AnalysisRequest,
) -> Result<AnalysisReport, AnalyticsError> {
    let table = RawTableAdapter::parse_ndjson(raw_ndjson)?;
    let snapshot = Normalizer::normalize(&table)?;
    JourneyProcessor::new(request.clone())?.analyze(&snapshot)
}

/// Processor bound to one validated request.
///
/// Use this when the same parameters are applied to several snapshots.
#[derive(Debug, Clone)]
pub struct JourneyProcessor {
    request: AnalysisRequest,
}

impl JourneyProcessor {
    /// Create a processor, validating the request
    pub fn new(request: AnalysisRequest) -> Result<Self, AnalyticsError> {
        request.validate()?;
        Ok(Self { request })
    }

    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    /// Run the full analysis over a snapshot.
    ///
    /// Pipeline stages:
    /// 1. SnapshotFilter - Date range and event inclusion/exclusion
    /// 2. SessionAggregator - Session summaries
    /// 3. PathExtractor, FunnelEngine, ConversionTimingAnalyzer and
    ///    TransitionGraphEngine - run concurrently over the filtered snapshot
    pub fn analyze(&self, snapshot: &EventSnapshot) -> Result<AnalysisReport, AnalyticsError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        let request = &self.request;
        let deadline = Deadline::from_millis(request.timeout_ms);

        // Stage 1: filter
        let snapshot = snapshot.filtered(&request.filter);
        info!(%request_id, events = snapshot.len(), "analyzing journey snapshot");

        // Stage 2: sessions
        let summary = EventOverview::dataset_summary(&snapshot);
        let sessions = SessionAggregator::aggregate(&snapshot);

        // Stage 3: independent analyzers
        let snapshot = &snapshot;
        let ((paths, funnel), (timing, graph)) = rayon::join(
            || {
                rayon::join(
                    || PathExtractor::extract(snapshot, &request.paths, deadline),
                    || {
                        request
                            .funnel
                            .as_ref()
                            .map(|funnel| FunnelEngine::compute(snapshot, funnel, deadline))
                            .transpose()
                    },
                )
            },
            || {
                rayon::join(
                    || {
                        request
                            .timing
                            .as_ref()
                            .map(|timing| {
                                ConversionTimingAnalyzer::analyze(snapshot, timing, deadline)
                            })
                            .transpose()
                    },
                    || TransitionGraphEngine::build(snapshot, &request.graph, deadline),
                )
            },
        );

        let report = AnalysisReport {
            request_id,
            generated_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            summary,
            sessions,
            paths: paths?,
            funnel: funnel?,
            timing: timing?,
            graph: graph?,
        };

        info!(
            %request_id,
            sessions = report.sessions.len(),
            paths_ready = report.paths.is_ready(),
            graph_ready = report.graph.is_ready(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "journey analysis complete"
        );
        Ok(report)
    }
}
