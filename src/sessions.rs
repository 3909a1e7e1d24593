//! Session aggregation
//!
//! Folds the event snapshot into one summary per (actor, session_number).

use crate::snapshot::EventSnapshot;
use crate::types::{seconds_between, Event, Scope, Session};
use tracing::debug;

/// Aggregator for session-level summaries
pub struct SessionAggregator;

impl SessionAggregator {
    /// Summarize every (actor, session) group in first-appearance order
    pub fn aggregate(snapshot: &EventSnapshot) -> Vec<Session> {
        let sessions: Vec<Session> = snapshot
            .groups(Scope::Session)
            .into_iter()
            .filter_map(|group| {
                let session_number = group.session_number?;
                summarize(group.actor_id, session_number, &group.events)
            })
            .collect();

        debug!(sessions = sessions.len(), "aggregated sessions");
        sessions
    }
}

/// Build one session summary.
///
/// `events` is in chronological order; attribution comes from the event that
/// appeared first in the input.
fn summarize(actor_id: &str, session_number: i64, events: &[&Event]) -> Option<Session> {
    let first_in_input = events.iter().min_by_key(|event| event.row)?;
    let start_time = events.iter().map(|e| e.timestamp).min()?;
    let end_time = events.iter().map(|e| e.timestamp).max()?;

    Some(Session {
        actor_id: actor_id.to_string(),
        session_number,
        start_time,
        end_time,
        duration_s: seconds_between(start_time, end_time),
        event_count: events.len(),
        logged_in: events.iter().any(|e| e.logged_in),
        source: first_in_input.campaign.source.clone(),
        medium: first_in_input.campaign.medium.clone(),
        user_id: events
            .iter()
            .filter(|e| e.user_id.is_some())
            .min_by_key(|e| e.row)
            .and_then(|e| e.user_id.clone()),
        session_id: first_in_input.session_id.clone(),
    })
}
