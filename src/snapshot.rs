//! Immutable event snapshots
//!
//! An [`EventSnapshot`] is the handle every analyzer reads from. It is cheap to
//! clone and safe to share across threads; its lifetime is chosen by the caller.

use crate::types::{Event, Scope};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Read-only collection of normalized events in input order
#[derive(Debug, Clone)]
pub struct EventSnapshot {
    events: Arc<[Event]>,
}

impl Default for EventSnapshot {
    fn default() -> Self {
        Self::from_events(Vec::new())
    }
}

/// Events of one scope group in chronological order
#[derive(Debug, Clone)]
pub struct EventGroup<'a> {
    pub actor_id: &'a str,
    /// `None` when the group spans every session of the actor
    pub session_number: Option<i64>,
    pub events: Vec<&'a Event>,
}

impl<'a> EventGroup<'a> {
    pub fn key(&self) -> GroupKey<'a> {
        (self.actor_id, self.session_number)
    }
}

/// Identity of a scope group
pub type GroupKey<'a> = (&'a str, Option<i64>);

impl EventSnapshot {
    pub fn from_events(events: Vec<Event>) -> Self {
        Self {
            events: events.into(),
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Group events by scope, each group sorted by timestamp.
    ///
    /// Groups appear in order of their first event in the input. Sorting is
    /// stable, so equal timestamps keep their input order.
    pub fn groups(&self, scope: Scope) -> Vec<EventGroup<'_>> {
        let mut index: HashMap<GroupKey<'_>, usize> = HashMap::new();
        let mut groups: Vec<EventGroup<'_>> = Vec::new();

        for event in self.events.iter() {
            let key = group_key(event, scope);
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(EventGroup {
                    actor_id: key.0,
                    session_number: key.1,
                    events: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].events.push(event);
        }

        for group in &mut groups {
            group.events.sort_by_key(|event| event.timestamp);
        }
        groups
    }

    /// Number of distinct scope keys in the snapshot
    pub fn group_count(&self, scope: Scope) -> usize {
        self.events
            .iter()
            .map(|event| group_key(event, scope))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Apply a filter, producing a new snapshot.
    ///
    /// Derived fields keep the values computed on the unfiltered data.
    pub fn filtered(&self, filter: &SnapshotFilter) -> EventSnapshot {
        if filter.is_empty() {
            return self.clone();
        }
        let events: Vec<Event> = self
            .events
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect();
        EventSnapshot::from_events(events)
    }

    /// Event names in order of first appearance
    pub fn event_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.events
            .iter()
            .map(|event| event.event_name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Earliest and latest event date
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.events.iter().map(|e| e.date).min()?;
        let max = self.events.iter().map(|e| e.date).max()?;
        Some((min, max))
    }
}

pub(crate) fn group_key(event: &Event, scope: Scope) -> GroupKey<'_> {
    match scope {
        Scope::Session => (event.actor_id.as_str(), Some(event.session_number)),
        Scope::Actor => (event.actor_id.as_str(), None),
    }
}

/// Row filter applied before analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotFilter {
    /// Inclusive lower bound on event date
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on event date
    pub end_date: Option<NaiveDate>,
    /// When set, only these event names are kept
    pub include_events: Option<Vec<String>>,
    /// Event names removed from the analysis
    pub exclude_events: Vec<String>,
}

impl SnapshotFilter {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.include_events.is_none()
            && self.exclude_events.is_empty()
    }

    pub fn matches(&self, event: &Event) -> bool {
        if self.start_date.is_some_and(|start| event.date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| event.date > end) {
            return false;
        }
        if let Some(include) = &self.include_events {
            if !include.iter().any(|name| *name == event.event_name) {
                return false;
            }
        }
        !self.exclude_events.iter().any(|name| *name == event.event_name)
    }
}
