//! Journey Flux - Batch event-journey analytics engine
//!
//! Journey Flux turns a flat product-analytics event table into behavioral
//! analytics through a deterministic pipeline: raw table → normalization →
//! session aggregation → {paths, funnels, conversion timing, transition graph}.
//!
//! ## Modules
//!
//! - **Input**: `schema` parses raw rows, `normalizer` validates and enriches
//!   them into an immutable [`EventSnapshot`]
//! - **Analyzers**: `sessions`, `paths`, `funnel`, `timing` and `graph`, each a
//!   pure function over a snapshot
//! - **Overview**: `events` provides frequency, temporal and per-actor tables
//! - **Pipeline**: `pipeline` runs a full [`AnalysisRequest`]

pub mod deadline;
pub mod error;
pub mod events;
pub mod funnel;
pub mod graph;
pub mod normalizer;
pub mod paths;
pub mod pipeline;
pub mod schema;
pub mod sessions;
pub mod snapshot;
pub mod timing;
pub mod types;

pub use deadline::Deadline;
pub use error::AnalyticsError;
pub use events::EventOverview;
pub use funnel::{FunnelEngine, FunnelReport, FunnelRequest};
pub use graph::{GraphRequest, TransitionGraph, TransitionGraphEngine};
pub use normalizer::Normalizer;
pub use paths::{PathExtractor, PathReport, PathRequest};
pub use pipeline::{
    analyze_json_rows, analyze_ndjson_rows, AnalysisReport, AnalysisRequest, JourneyProcessor,
};
pub use sessions::SessionAggregator;
pub use snapshot::{EventSnapshot, SnapshotFilter};
pub use timing::{ConversionTimingAnalyzer, TimingReport, TimingRequest};
pub use types::{AnalysisOutcome, Event, FunnelMode, Scope, SegmentBy, Session, TimeGranularity};

// Schema exports
pub use schema::{RawTable, RawTableAdapter, REQUIRED_COLUMNS, SCHEMA_VERSION};

/// Engine version embedded in every report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "journey-flux";
