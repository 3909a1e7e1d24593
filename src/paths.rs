//! Frequent navigation paths
//!
//! Extracts fixed-length contiguous event sequences (n-grams) from every scope
//! group and ranks them by how often they occur.
//!
//! Windows are counted as they are produced; the working set is the table of
//! distinct n-grams, never the full list of emitted windows. Event names are
//! interned so each distinct n-gram is stored once as a slice of ids.

use crate::deadline::{deadline_reason, Deadline};
use crate::error::AnalyticsError;
use crate::snapshot::EventSnapshot;
use crate::types::{AnalysisOutcome, Scope};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Default number of steps per path
pub const DEFAULT_PATH_LENGTH: usize = 3;

/// Default number of ranked paths returned
pub const DEFAULT_TOP_K: usize = 10;

/// Path extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathRequest {
    pub scope: Scope,
    /// Number of consecutive events per path (at least 2)
    pub path_length: usize,
    /// Number of ranked paths to keep
    pub top_k: usize,
    /// Upper bound on distinct n-grams tracked; once reached, unseen n-grams
    /// are no longer admitted
    pub max_distinct_paths: Option<usize>,
    /// Event names dropped before sequences are built
    pub exclude_events: Vec<String>,
}

impl Default for PathRequest {
    fn default() -> Self {
        Self {
            scope: Scope::Session,
            path_length: DEFAULT_PATH_LENGTH,
            top_k: DEFAULT_TOP_K,
            max_distinct_paths: None,
            exclude_events: Vec::new(),
        }
    }
}

impl PathRequest {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.path_length < 2 {
            return Err(AnalyticsError::invalid_parameter(format!(
                "path_length must be at least 2, got {}",
                self.path_length
            )));
        }
        if self.top_k == 0 {
            return Err(AnalyticsError::invalid_parameter("top_k must be positive"));
        }
        if self.max_distinct_paths == Some(0) {
            return Err(AnalyticsError::invalid_parameter(
                "max_distinct_paths must be positive when set",
            ));
        }
        Ok(())
    }
}

/// One ranked path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathFrequency {
    pub path_tuple: Vec<String>,
    pub frequency: u64,
}

/// Ranked n-gram frequencies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathReport {
    pub scope: Scope,
    pub path_length: usize,
    /// Windows emitted across all groups
    pub total_ngrams: u64,
    /// Distinct n-grams tracked
    pub distinct_ngrams: usize,
    /// True when `max_distinct_paths` stopped new n-grams from being tracked
    pub saturated: bool,
    /// Top-K paths by descending frequency, ties in first-seen order
    pub paths: Vec<PathFrequency>,
}

struct PathCount {
    frequency: u64,
    first_seen: u64,
}

/// Extractor for frequent contiguous paths
pub struct PathExtractor;

impl PathExtractor {
    pub fn extract(
        snapshot: &EventSnapshot,
        request: &PathRequest,
        deadline: Deadline,
    ) -> Result<AnalysisOutcome<PathReport>, AnalyticsError> {
        request.validate()?;

        let length = request.path_length;
        let groups = snapshot.groups(request.scope);

        let mut names: Vec<&str> = Vec::new();
        let mut ids: HashMap<&str, u32> = HashMap::new();
        let mut counts: HashMap<Vec<u32>, PathCount> = HashMap::new();
        let mut total_ngrams: u64 = 0;
        let mut saturated = false;
        let mut sequence: Vec<u32> = Vec::new();

        for (processed, group) in groups.iter().enumerate() {
            if deadline.expired() {
                warn!(processed, total = groups.len(), "path extraction aborted");
                return Ok(AnalysisOutcome::empty(deadline_reason(
                    "path extraction",
                    processed,
                    groups.len(),
                )));
            }

            sequence.clear();
            for event in &group.events {
                let name = event.event_name.as_str();
                if request.exclude_events.iter().any(|x| x == name) {
                    continue;
                }
                let id = *ids.entry(name).or_insert_with(|| {
                    names.push(name);
                    (names.len() - 1) as u32
                });
                sequence.push(id);
            }

            if sequence.len() < length {
                continue;
            }

            for window in sequence.windows(length) {
                let order = total_ngrams;
                total_ngrams += 1;
                if let Some(count) = counts.get_mut(window) {
                    count.frequency += 1;
                } else if request
                    .max_distinct_paths
                    .is_some_and(|cap| counts.len() >= cap)
                {
                    saturated = true;
                } else {
                    counts.insert(
                        window.to_vec(),
                        PathCount {
                            frequency: 1,
                            first_seen: order,
                        },
                    );
                }
            }
        }

        if total_ngrams == 0 {
            return Ok(AnalysisOutcome::empty(format!(
                "no group has a sequence of {} consecutive events",
                length
            )));
        }

        let distinct_ngrams = counts.len();
        let mut ranked: Vec<(Vec<u32>, PathCount)> = counts.into_iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.frequency
                .cmp(&a.frequency)
                .then(a.first_seen.cmp(&b.first_seen))
        });
        ranked.truncate(request.top_k);

        let paths = ranked
            .into_iter()
            .map(|(key, count)| PathFrequency {
                path_tuple: key.iter().map(|id| names[*id as usize].to_string()).collect(),
                frequency: count.frequency,
            })
            .collect();

        debug!(total_ngrams, distinct_ngrams, saturated, "extracted paths");
        Ok(AnalysisOutcome::Ready(PathReport {
            scope: request.scope,
            path_length: length,
            total_ngrams,
            distinct_ngrams,
            saturated,
            paths,
        }))
    }
}
