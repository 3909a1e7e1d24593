//! Funnel conversion
//!
//! Counts how many scope keys (sessions or actors) reach each step of an
//! ordered event list.
//!
//! - `Strict`: running intersection of per-step presence sets. Only presence
//!   is checked, so a key that fired the steps in reverse order still converts.
//! - `Unordered`: independent per-step counts relative to the largest step.
//! - `Sequential`: steps must be reached in chronological order.

use crate::deadline::{deadline_reason, Deadline};
use crate::error::AnalyticsError;
use crate::snapshot::{group_key, EventSnapshot, GroupKey};
use crate::types::{round1, AnalysisOutcome, FunnelMode, Scope};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Funnel parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelRequest {
    /// Ordered step event names (at least 2)
    pub steps: Vec<String>,
    #[serde(default)]
    pub mode: FunnelMode,
    #[serde(default)]
    pub scope: Scope,
}

impl FunnelRequest {
    pub fn new(steps: &[&str], mode: FunnelMode, scope: Scope) -> Self {
        Self {
            steps: steps.iter().map(|s| s.to_string()).collect(),
            mode,
            scope,
        }
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.steps.len() < 2 {
            return Err(AnalyticsError::invalid_parameter(format!(
                "a funnel needs at least 2 steps, got {}",
                self.steps.len()
            )));
        }
        if self.steps.iter().any(|s| s.trim().is_empty()) {
            return Err(AnalyticsError::invalid_parameter(
                "funnel step names must not be empty",
            ));
        }
        Ok(())
    }
}

/// One funnel row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStep {
    pub step: String,
    pub count: usize,
    pub rate_pct: f64,
}

/// Funnel table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelReport {
    pub mode: FunnelMode,
    pub scope: Scope,
    pub steps: Vec<FunnelStep>,
}

impl FunnelReport {
    /// Share of first-step keys that reached the last step (percent)
    pub fn overall_conversion_pct(&self) -> f64 {
        match (self.steps.first(), self.steps.last()) {
            (Some(first), Some(last)) if first.count > 0 => {
                round1(100.0 * last.count as f64 / first.count as f64)
            }
            _ => 0.0,
        }
    }
}

/// Engine for funnel conversion tables
pub struct FunnelEngine;

impl FunnelEngine {
    pub fn compute(
        snapshot: &EventSnapshot,
        request: &FunnelRequest,
        deadline: Deadline,
    ) -> Result<AnalysisOutcome<FunnelReport>, AnalyticsError> {
        request.validate()?;

        let counts = match request.mode {
            FunnelMode::Strict => strict_counts(snapshot, request),
            FunnelMode::Unordered => unordered_counts(snapshot, request),
            FunnelMode::Sequential => match sequential_counts(snapshot, request, deadline) {
                Ok(counts) => counts,
                Err(reason) => return Ok(AnalysisOutcome::empty(reason)),
            },
        };

        if counts.iter().all(|&c| c == 0) {
            return Ok(AnalysisOutcome::empty(
                "none of the funnel steps occur in the data",
            ));
        }

        let rates = match request.mode {
            FunnelMode::Unordered => relative_to_max(&counts),
            FunnelMode::Strict | FunnelMode::Sequential => step_over_step(&counts),
        };

        let steps = request
            .steps
            .iter()
            .zip(counts.iter().zip(rates))
            .map(|(step, (&count, rate_pct))| FunnelStep {
                step: step.clone(),
                count,
                rate_pct,
            })
            .collect();

        debug!(mode = ?request.mode, ?counts, "computed funnel");
        Ok(AnalysisOutcome::Ready(FunnelReport {
            mode: request.mode,
            scope: request.scope,
            steps,
        }))
    }
}

/// Keys having any occurrence of each step event
fn presence_sets<'a>(
    snapshot: &'a EventSnapshot,
    request: &FunnelRequest,
) -> HashMap<&'a str, HashSet<GroupKey<'a>>> {
    let mut sets: HashMap<&str, HashSet<GroupKey<'_>>> = HashMap::new();
    for event in snapshot.events() {
        if request.steps.iter().any(|s| *s == event.event_name) {
            sets.entry(event.event_name.as_str())
                .or_default()
                .insert(group_key(event, request.scope));
        }
    }
    sets
}

fn strict_counts(snapshot: &EventSnapshot, request: &FunnelRequest) -> Vec<usize> {
    let sets = presence_sets(snapshot, request);

    // Every key present in the step-filtered data
    let mut remaining: HashSet<GroupKey<'_>> = sets.values().flatten().copied().collect();

    request
        .steps
        .iter()
        .map(|step| {
            remaining = match sets.get(step.as_str()) {
                Some(with_step) => remaining.intersection(with_step).copied().collect(),
                None => HashSet::new(),
            };
            remaining.len()
        })
        .collect()
}

fn unordered_counts(snapshot: &EventSnapshot, request: &FunnelRequest) -> Vec<usize> {
    let sets = presence_sets(snapshot, request);
    request
        .steps
        .iter()
        .map(|step| sets.get(step.as_str()).map_or(0, HashSet::len))
        .collect()
}

/// Greedy in-order matching per group; `counts[i]` is the number of groups
/// that reached step i.
fn sequential_counts(
    snapshot: &EventSnapshot,
    request: &FunnelRequest,
    deadline: Deadline,
) -> Result<Vec<usize>, String> {
    let groups = snapshot.groups(request.scope);
    let mut counts = vec![0usize; request.steps.len()];

    for (processed, group) in groups.iter().enumerate() {
        if deadline.expired() {
            warn!(processed, total = groups.len(), "sequential funnel aborted");
            return Err(deadline_reason("funnel", processed, groups.len()));
        }

        let mut reached = 0;
        for event in &group.events {
            if reached == request.steps.len() {
                break;
            }
            if event.event_name == request.steps[reached] {
                reached += 1;
            }
        }
        for count in counts.iter_mut().take(reached) {
            *count += 1;
        }
    }
    Ok(counts)
}

/// First step 100%, then each step relative to the previous one
fn step_over_step(counts: &[usize]) -> Vec<f64> {
    counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            if i == 0 {
                100.0
            } else if counts[i - 1] == 0 {
                0.0
            } else {
                round1(100.0 * count as f64 / counts[i - 1] as f64)
            }
        })
        .collect()
}

fn relative_to_max(counts: &[usize]) -> Vec<f64> {
    let max = counts.iter().copied().max().unwrap_or(0);
    counts
        .iter()
        .map(|&count| {
            if max == 0 {
                0.0
            } else {
                100.0 * count as f64 / max as f64
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::test_support::*;
    use pretty_assertions::assert_eq;

    fn counts_and_rates(report: &FunnelReport) -> (Vec<usize>, Vec<f64>) {
        (
            report.steps.iter().map(|s| s.count).collect(),
            report.steps.iter().map(|s| s.rate_pct).collect(),
        )
    }

    fn run(snap: &EventSnapshot, steps: &[&str], mode: FunnelMode, scope: Scope) -> FunnelReport {
        FunnelEngine::compute(snap, &FunnelRequest::new(steps, mode, scope), Deadline::none())
            .unwrap()
            .into_ready()
            .unwrap()
    }

    #[test]
    fn test_strict_two_of_three_actors() {
        let snap = snapshot(vec![
            event("A", "1", 1, T0),
            event("A", "2", 1, T0),
            event("A", "3", 1, T0),
            event("B", "1", 1, T0 + SEC),
            event("B", "2", 1, T0 + SEC),
        ]);
        let report = run(&snap, &["A", "B"], FunnelMode::Strict, Scope::Actor);
        assert_eq!(counts_and_rates(&report), (vec![3, 2], vec![100.0, 66.7]));
        assert_eq!(report.overall_conversion_pct(), 66.7);
    }

    #[test]
    fn test_strict_ignores_order_and_is_non_increasing() {
        let snap = snapshot(vec![
            event("B", "1", 1, T0),
            event("A", "1", 1, T0 + SEC),
            event("A", "2", 1, T0),
            event("C", "2", 1, T0 + SEC),
            event("C", "3", 1, T0),
        ]);
        let report = run(&snap, &["A", "B", "C"], FunnelMode::Strict, Scope::Session);
        let (counts, rates) = counts_and_rates(&report);
        assert_eq!(counts, vec![2, 1, 0]);
        assert_eq!(rates, vec![100.0, 50.0, 0.0]);
        assert!(counts.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_zero_previous_step_rate_is_zero() {
        let snap = snapshot(vec![event("A", "1", 1, T0), event("C", "2", 1, T0)]);
        let report = run(&snap, &["A", "B", "C"], FunnelMode::Strict, Scope::Actor);
        assert_eq!(counts_and_rates(&report), (vec![1, 0, 0], vec![100.0, 0.0, 0.0]));
    }

    #[test]
    fn test_unordered_rates_relative_to_max() {
        let snap = snapshot(vec![
            event("A", "1", 1, T0),
            event("B", "1", 1, T0),
            event("B", "2", 1, T0),
            event("B", "3", 1, T0),
            event("B", "3", 2, T0 + 3600 * SEC),
        ]);
        let report = run(&snap, &["A", "B"], FunnelMode::Unordered, Scope::Session);
        let (counts, rates) = counts_and_rates(&report);
        assert_eq!(counts, vec![1, 4]);
        assert!((rates[0] - 25.0).abs() < 1e-9);
        assert_eq!(rates[1], 100.0);
        assert!(rates.iter().all(|r| (0.0..=100.0).contains(r)));
        assert_eq!(rates.iter().filter(|&&r| r == 100.0).count(), 1);
    }

    #[test]
    fn test_sequential_requires_order() {
        let snap = snapshot(vec![
            event("B", "1", 1, T0),
            event("A", "1", 1, T0 + SEC),
            event("A", "2", 1, T0),
            event("B", "2", 1, T0 + SEC),
        ]);
        let strict = run(&snap, &["A", "B"], FunnelMode::Strict, Scope::Session);
        let sequential = run(&snap, &["A", "B"], FunnelMode::Sequential, Scope::Session);
        assert_eq!(counts_and_rates(&strict).0, vec![2, 2]);
        assert_eq!(counts_and_rates(&sequential), (vec![2, 1], vec![100.0, 50.0]));
    }

    #[test]
    fn test_session_scope_counts_sessions() {
        let snap = snapshot(vec![
            event("A", "1", 1, T0),
            event("A", "1", 2, T0 + 3600 * SEC),
            event("B", "1", 2, T0 + 3601 * SEC),
        ]);
        let session = run(&snap, &["A", "B"], FunnelMode::Strict, Scope::Session);
        let actor = run(&snap, &["A", "B"], FunnelMode::Strict, Scope::Actor);
        assert_eq!(counts_and_rates(&session).0, vec![2, 1]);
        assert_eq!(counts_and_rates(&actor).0, vec![1, 1]);
    }

    #[test]
    fn test_single_step_rejected() {
        let snap = snapshot(vec![event("A", "1", 1, T0)]);
        let request = FunnelRequest::new(&["A"], FunnelMode::Strict, Scope::Session);
        let err = FunnelEngine::compute(&snap, &request, Deadline::none()).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidParameter(_)));
    }

    #[test]
    fn test_no_matching_events_is_empty() {
        let snap = snapshot(vec![event("X", "1", 1, T0)]);
        let request = FunnelRequest::new(&["A", "B"], FunnelMode::Unordered, Scope::Session);
        let outcome = FunnelEngine::compute(&snap, &request, Deadline::none()).unwrap();
        assert!(outcome.empty_reason().is_some());
    }
}
