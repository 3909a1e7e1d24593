//! Event overview tables
//!
//! Descriptive views over a snapshot: event frequencies, dataset totals,
//! temporal distribution, co-occurring events, per-event traffic detail,
//! cross-session origin journeys and per-actor profiles.

use crate::error::AnalyticsError;
use crate::sessions::SessionAggregator;
use crate::snapshot::EventSnapshot;
use crate::types::{round1, AnalysisOutcome, Scope, Session, TimeGranularity};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Number of traffic origins listed in an event detail
pub const TOP_TRAFFIC_ORIGINS: usize = 10;

/// Stand-in for a missing source or medium in origin journeys
pub const NONE_LABEL: &str = "(none)";

/// Sequence entry for a session the actor never had
pub const NO_DATA_LABEL: &str = "(no data)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrequency {
    pub event_name: String,
    pub count: usize,
    /// Share of all events (percent)
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_events: usize,
    pub distinct_events: usize,
    pub sessions: usize,
    pub actors: usize,
    pub logged_in_actors: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Bucket of a temporal distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeBucket {
    Day(NaiveDate),
    Hour(u32),
    Weekday(Weekday),
}

impl TimeBucket {
    fn sort_key(&self) -> i64 {
        match self {
            TimeBucket::Day(date) => date.num_days_from_ce() as i64,
            TimeBucket::Hour(hour) => *hour as i64,
            TimeBucket::Weekday(day) => day.num_days_from_monday() as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalCount {
    pub bucket: TimeBucket,
    pub event_name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedEvent {
    pub event_name: String,
    /// Sessions containing both events
    pub shared_sessions: usize,
    /// Share of the chosen event's sessions (percent)
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficShare {
    /// `source / medium`
    pub source_medium: String,
    pub count: usize,
    /// Share of the occurrences that carry both source and medium (percent)
    pub pct: f64,
}

/// Occurrence totals and traffic origins of one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetail {
    pub event_name: String,
    pub total_occurrences: usize,
    /// Distinct (actor, session_number) pairs
    pub unique_sessions: usize,
    pub unique_actors: usize,
    pub logged_in_actors: usize,
    pub logged_in_pct: f64,
    /// Most frequent origins, largest first
    pub traffic: Vec<TrafficShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginShare {
    pub session_number: i64,
    /// `source/medium`, with missing parts as `(none)`
    pub source_medium: String,
    pub actors: usize,
    /// Share of the selected actors seen in this session number (percent)
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginSequence {
    /// One origin per session number from 1 up to the target session
    pub sequence: Vec<String>,
    pub actors: usize,
    /// Share of all selected actors (percent)
    pub pct: f64,
}

/// Where actors came from in the sessions leading up to an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginJourney {
    pub event_name: String,
    pub session_number: i64,
    pub first_occurrence_only: bool,
    /// Actors firing the event in the target session, after filtering
    pub actors: usize,
    /// Ordered by session number, then by descending actor count
    pub distribution: Vec<OriginShare>,
    /// Ranked by descending actor count
    pub sequences: Vec<OriginSequence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorProfile {
    pub actor_id: String,
    pub total_events: usize,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
    /// Distinct dates with at least one event
    pub days_active: usize,
    /// Distinct user ids in first-seen order
    pub user_ids: Vec<String>,
    pub sessions: Vec<Session>,
}

/// Descriptive tables over an event snapshot
pub struct EventOverview;

impl EventOverview {
    /// Event counts ranked by descending count, ties in first-seen order
    pub fn event_frequencies(snapshot: &EventSnapshot) -> Vec<EventFrequency> {
        let total = snapshot.len();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for event in snapshot.events() {
            *counts.entry(event.event_name.as_str()).or_default() += 1;
        }

        let mut names = snapshot.event_names();
        names.sort_by_key(|name| std::cmp::Reverse(counts[name]));

        names
            .into_iter()
            .map(|name| EventFrequency {
                event_name: name.to_string(),
                count: counts[name],
                pct: round1(100.0 * counts[name] as f64 / total as f64),
            })
            .collect()
    }

    pub fn dataset_summary(snapshot: &EventSnapshot) -> DatasetSummary {
        let events = snapshot.events();
        let logged_in_actors: HashSet<&str> = events
            .iter()
            .filter(|e| e.logged_in)
            .map(|e| e.actor_id.as_str())
            .collect();
        let range = snapshot.date_range();

        DatasetSummary {
            total_events: events.len(),
            distinct_events: snapshot.event_names().len(),
            sessions: snapshot.group_count(Scope::Session),
            actors: snapshot.group_count(Scope::Actor),
            logged_in_actors: logged_in_actors.len(),
            first_date: range.map(|(first, _)| first),
            last_date: range.map(|(_, last)| last),
        }
    }

    /// Event counts per time bucket.
    ///
    /// `event_names` restricts the table to those events; empty keeps all.
    /// Rows are ordered by bucket, then by descending count.
    pub fn temporal_distribution(
        snapshot: &EventSnapshot,
        granularity: TimeGranularity,
        event_names: &[String],
    ) -> Vec<TemporalCount> {
        let names = snapshot.event_names();
        let rank: HashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        let mut order: Vec<(TimeBucket, &str)> = Vec::new();
        let mut counts: HashMap<(i64, &str), usize> = HashMap::new();
        for event in snapshot.events() {
            let name = event.event_name.as_str();
            if !event_names.is_empty() && !event_names.iter().any(|n| n == name) {
                continue;
            }
            let bucket = match granularity {
                TimeGranularity::Day => TimeBucket::Day(event.date),
                TimeGranularity::Hour => TimeBucket::Hour(event.hour),
                TimeGranularity::Weekday => TimeBucket::Weekday(event.weekday),
            };
            *counts
                .entry((bucket.sort_key(), name))
                .or_insert_with(|| {
                    order.push((bucket, name));
                    0
                }) += 1;
        }

        let mut rows: Vec<TemporalCount> = order
            .into_iter()
            .map(|(bucket, name)| TemporalCount {
                bucket,
                event_name: name.to_string(),
                count: counts[&(bucket.sort_key(), name)],
            })
            .collect();
        rows.sort_by(|a, b| {
            a.bucket
                .sort_key()
                .cmp(&b.bucket.sort_key())
                .then(b.count.cmp(&a.count))
                .then(rank[a.event_name.as_str()].cmp(&rank[b.event_name.as_str()]))
        });
        rows
    }

    /// Events that share sessions with `event_name`, most shared first
    pub fn related_events(
        snapshot: &EventSnapshot,
        event_name: &str,
    ) -> AnalysisOutcome<Vec<RelatedEvent>> {
        let groups = snapshot.groups(Scope::Session);
        let with_target: Vec<_> = groups
            .iter()
            .filter(|g| g.events.iter().any(|e| e.event_name == event_name))
            .collect();
        if with_target.is_empty() {
            return AnalysisOutcome::empty(format!("no sessions contain '{}'", event_name));
        }

        let mut shared: HashMap<&str, usize> = HashMap::new();
        for group in &with_target {
            let distinct: HashSet<&str> = group
                .events
                .iter()
                .map(|e| e.event_name.as_str())
                .filter(|name| *name != event_name)
                .collect();
            for name in distinct {
                *shared.entry(name).or_default() += 1;
            }
        }

        let mut names: Vec<&str> = snapshot
            .event_names()
            .into_iter()
            .filter(|name| shared.contains_key(name))
            .collect();
        names.sort_by_key(|name| std::cmp::Reverse(shared[name]));

        let total = with_target.len() as f64;
        AnalysisOutcome::Ready(
            names
                .into_iter()
                .map(|name| RelatedEvent {
                    event_name: name.to_string(),
                    shared_sessions: shared[name],
                    pct: round1(100.0 * shared[name] as f64 / total),
                })
                .collect(),
        )
    }

    /// Totals and top traffic origins for one event name
    pub fn event_detail(
        snapshot: &EventSnapshot,
        event_name: &str,
    ) -> AnalysisOutcome<EventDetail> {
        let occurrences: Vec<_> = snapshot
            .events()
            .iter()
            .filter(|e| e.event_name == event_name)
            .collect();
        if occurrences.is_empty() {
            return AnalysisOutcome::empty(format!("no occurrences of '{}'", event_name));
        }

        let sessions: HashSet<(&str, i64)> = occurrences
            .iter()
            .map(|e| (e.actor_id.as_str(), e.session_number))
            .collect();
        let actors: HashSet<&str> = occurrences.iter().map(|e| e.actor_id.as_str()).collect();
        let logged_in: HashSet<&str> = occurrences
            .iter()
            .filter(|e| e.logged_in)
            .map(|e| e.actor_id.as_str())
            .collect();

        // occurrences missing either part are left out, as a grouped count would
        let origins: Vec<String> = occurrences
            .iter()
            .filter_map(|e| match (&e.campaign.source, &e.campaign.medium) {
                (Some(source), Some(medium)) => Some(format!("{} / {}", source, medium)),
                _ => None,
            })
            .collect();
        let attributed = origins.len() as f64;
        let mut traffic = ranked(origins);
        traffic.truncate(TOP_TRAFFIC_ORIGINS);

        AnalysisOutcome::Ready(EventDetail {
            event_name: event_name.to_string(),
            total_occurrences: occurrences.len(),
            unique_sessions: sessions.len(),
            unique_actors: actors.len(),
            logged_in_actors: logged_in.len(),
            logged_in_pct: round1(100.0 * logged_in.len() as f64 / actors.len() as f64),
            traffic: traffic
                .into_iter()
                .map(|(source_medium, count)| TrafficShare {
                    source_medium,
                    count,
                    pct: round1(100.0 * count as f64 / attributed),
                })
                .collect(),
        })
    }

    /// Origins of the sessions that led actors to `event_name` in session
    /// `session_number`.
    ///
    /// Actors are those firing the event in that session. With
    /// `first_occurrence_only`, actors that fired it in an earlier session are
    /// dropped. Each of their sessions numbered 1 up to `session_number` is
    /// labelled with the first non-null source and medium in input order.
    pub fn origin_journey(
        snapshot: &EventSnapshot,
        event_name: &str,
        session_number: i64,
        first_occurrence_only: bool,
    ) -> Result<AnalysisOutcome<OriginJourney>, AnalyticsError> {
        if session_number < 1 {
            return Err(AnalyticsError::invalid_parameter(format!(
                "session_number must be at least 1, got {}",
                session_number
            )));
        }

        let mut first_session: HashMap<&str, i64> = HashMap::new();
        let mut in_target: Vec<&str> = Vec::new();
        for event in snapshot.events().iter().filter(|e| e.event_name == event_name) {
            let actor = event.actor_id.as_str();
            first_session
                .entry(actor)
                .and_modify(|s| *s = (*s).min(event.session_number))
                .or_insert(event.session_number);
            if event.session_number == session_number && !in_target.contains(&actor) {
                in_target.push(actor);
            }
        }

        let actors: Vec<&str> = in_target
            .into_iter()
            .filter(|actor| !first_occurrence_only || first_session[actor] == session_number)
            .collect();
        if actors.is_empty() {
            return Ok(AnalysisOutcome::empty(format!(
                "no actors fired '{}' in session {}",
                event_name, session_number
            )));
        }
        let selected: HashSet<&str> = actors.iter().copied().collect();

        let mut origins: HashMap<(&str, i64), (Option<&str>, Option<&str>)> = HashMap::new();
        for event in snapshot.events() {
            let actor = event.actor_id.as_str();
            if event.session_number > session_number || !selected.contains(actor) {
                continue;
            }
            let origin = origins.entry((actor, event.session_number)).or_default();
            origin.0 = origin.0.or(event.campaign.source.as_deref());
            origin.1 = origin.1.or(event.campaign.medium.as_deref());
        }
        let label = |actor: &str, number: i64| -> Option<String> {
            origins.get(&(actor, number)).map(|(source, medium)| {
                format!(
                    "{}/{}",
                    source.unwrap_or(NONE_LABEL),
                    medium.unwrap_or(NONE_LABEL)
                )
            })
        };

        let mut distribution = Vec::new();
        for number in 1..=session_number {
            let labels: Vec<String> = actors
                .iter()
                .filter_map(|actor| label(*actor, number))
                .collect();
            let seen = labels.len() as f64;
            distribution.extend(ranked(labels).into_iter().map(|(source_medium, count)| {
                OriginShare {
                    session_number: number,
                    source_medium,
                    actors: count,
                    pct: round1(100.0 * count as f64 / seen),
                }
            }));
        }

        let sequences: Vec<Vec<String>> = actors
            .iter()
            .map(|actor| {
                (1..=session_number)
                    .map(|number| {
                        label(*actor, number).unwrap_or_else(|| NO_DATA_LABEL.to_string())
                    })
                    .collect()
            })
            .collect();
        let total = actors.len() as f64;

        Ok(AnalysisOutcome::Ready(OriginJourney {
            event_name: event_name.to_string(),
            session_number,
            first_occurrence_only,
            actors: actors.len(),
            distribution,
            sequences: ranked(sequences)
                .into_iter()
                .map(|(sequence, count)| OriginSequence {
                    sequence,
                    actors: count,
                    pct: round1(100.0 * count as f64 / total),
                })
                .collect(),
        }))
    }

    /// Activity of one actor, `None` when the actor has no events
    pub fn actor_profile(snapshot: &EventSnapshot, actor_id: &str) -> Option<ActorProfile> {
        let events: Vec<_> = snapshot
            .events()
            .iter()
            .filter(|e| e.actor_id == actor_id)
            .cloned()
            .collect();
        if events.is_empty() {
            return None;
        }
        let own = EventSnapshot::from_events(events);
        let (first_seen, last_seen) = own.date_range()?;

        let days: HashSet<NaiveDate> = own.events().iter().map(|e| e.date).collect();
        let mut seen = HashSet::new();
        let user_ids = own
            .events()
            .iter()
            .filter_map(|e| e.user_id.as_deref())
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect();

        Some(ActorProfile {
            actor_id: actor_id.to_string(),
            total_events: own.len(),
            first_seen,
            last_seen,
            days_active: days.len(),
            user_ids,
            sessions: SessionAggregator::aggregate(&own),
        })
    }

    /// Actors that have authenticated as `user_id`, in first-seen order
    pub fn actors_for_user(snapshot: &EventSnapshot, user_id: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        snapshot
            .events()
            .iter()
            .filter(|e| e.user_id.as_deref() == Some(user_id))
            .map(|e| e.actor_id.as_str())
            .filter(|actor| seen.insert(*actor))
            .map(str::to_string)
            .collect()
    }
}

/// Distinct values with their counts, by descending count then first-seen
fn ranked<K: Eq + Hash + Clone>(values: impl IntoIterator<Item = K>) -> Vec<(K, usize)> {
    let mut order: Vec<K> = Vec::new();
    let mut counts: HashMap<K, usize> = HashMap::new();
    for value in values {
        *counts.entry(value.clone()).or_insert_with(|| {
            order.push(value);
            0
        }) += 1;
    }
    order.sort_by_key(|value| std::cmp::Reverse(counts[value]));
    order
        .into_iter()
        .map(|value| {
            let count = counts[&value];
            (value, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::test_support::*;
    use crate::types::Event;
    use pretty_assertions::assert_eq;

    const DAY: i64 = 86_400 * SEC;

    fn sample() -> EventSnapshot {
        snapshot(vec![
            event("page_view", "c1", 1, T0),
            event("add_to_cart", "c1", 1, T0 + 10 * SEC),
            event("page_view", "c1", 1, T0 + 20 * SEC),
            logged_in(event("purchase", "c1", 2, T0 + DAY), "u1"),
            event("page_view", "c2", 1, T0 + 3600 * SEC),
            logged_in(event("page_view", "c3", 1, T0 + DAY), "u1"),
        ])
    }

    #[test]
    fn test_event_frequencies() {
        let table = EventOverview::event_frequencies(&sample());
        assert_eq!(table[0].event_name, "page_view");
        assert_eq!(table[0].count, 4);
        assert_eq!(table[0].pct, 66.7);
        // tie between add_to_cart and purchase keeps first-seen order
        assert_eq!(table[1].event_name, "add_to_cart");
        assert_eq!(table[2].event_name, "purchase");
    }

    #[test]
    fn test_dataset_summary() {
        let summary = EventOverview::dataset_summary(&sample());
        assert_eq!(summary.total_events, 6);
        assert_eq!(summary.distinct_events, 3);
        assert_eq!(summary.sessions, 4);
        assert_eq!(summary.actors, 3);
        assert_eq!(summary.logged_in_actors, 2);
        assert_eq!(summary.first_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(summary.last_date, NaiveDate::from_ymd_opt(2024, 1, 16));
    }

    #[test]
    fn test_temporal_by_hour_and_filter() {
        let rows =
            EventOverview::temporal_distribution(&sample(), TimeGranularity::Hour, &[]);
        assert_eq!(rows[0].bucket, TimeBucket::Hour(14));
        assert_eq!(rows[0].event_name, "page_view");
        assert_eq!(rows[0].count, 3);
        assert_eq!(rows.last().unwrap().bucket, TimeBucket::Hour(15));

        let only = EventOverview::temporal_distribution(
            &sample(),
            TimeGranularity::Day,
            &["purchase".to_string()],
        );
        assert_eq!(only.len(), 1);
        assert_eq!(
            only[0].bucket,
            TimeBucket::Day(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap())
        );
    }

    #[test]
    fn test_weekday_buckets_start_monday() {
        let snap = snapshot(vec![
            event("a", "c1", 1, T0 + 6 * DAY),
            event("a", "c1", 1, T0),
        ]);
        let rows = EventOverview::temporal_distribution(&snap, TimeGranularity::Weekday, &[]);
        let days: Vec<TimeBucket> = rows.iter().map(|r| r.bucket).collect();
        assert_eq!(
            days,
            vec![TimeBucket::Weekday(Weekday::Mon), TimeBucket::Weekday(Weekday::Sun)]
        );
        assert_eq!(serde_json::to_value(days[0]).unwrap(), serde_json::json!("Mon"));
    }

    #[test]
    fn test_related_events() {
        let related = EventOverview::related_events(&sample(), "add_to_cart")
            .into_ready()
            .unwrap();
        assert_eq!(
            related,
            vec![RelatedEvent {
                event_name: "page_view".to_string(),
                shared_sessions: 1,
                pct: 100.0,
            }]
        );
        assert!(!EventOverview::related_events(&sample(), "missing").is_ready());
    }

    fn with_origin(mut event: Event, source: Option<&str>, medium: Option<&str>) -> Event {
        event.campaign.source = source.map(str::to_string);
        event.campaign.medium = medium.map(str::to_string);
        event
    }

    #[test]
    fn test_event_detail() {
        let snap = snapshot(vec![
            with_source(event("purchase", "c1", 1, T0), "google", "cpc"),
            logged_in(with_source(event("purchase", "c1", 2, T0 + DAY), "google", "cpc"), "u1"),
            with_source(event("purchase", "c2", 1, T0), "bing", "cpc"),
            with_origin(event("purchase", "c3", 1, T0), Some("google"), None),
            with_source(event("page_view", "c4", 1, T0), "google", "cpc"),
        ]);
        let detail = EventOverview::event_detail(&snap, "purchase").into_ready().unwrap();
        assert_eq!(detail.total_occurrences, 4);
        assert_eq!(detail.unique_sessions, 4);
        assert_eq!(detail.unique_actors, 3);
        assert_eq!(detail.logged_in_actors, 1);
        assert_eq!(detail.logged_in_pct, 33.3);
        assert_eq!(
            detail.traffic,
            vec![
                TrafficShare {
                    source_medium: "google / cpc".to_string(),
                    count: 2,
                    pct: 66.7,
                },
                TrafficShare {
                    source_medium: "bing / cpc".to_string(),
                    count: 1,
                    pct: 33.3,
                },
            ]
        );
        assert!(!EventOverview::event_detail(&snap, "refund").is_ready());
    }

    #[test]
    fn test_event_detail_keeps_top_origins() {
        let events = (0..12)
            .map(|i| {
                let source = format!("s{}", i);
                with_source(event("a", &format!("c{}", i), 1, T0), &source, "cpc")
            })
            .collect();
        let detail = EventOverview::event_detail(&snapshot(events), "a").into_ready().unwrap();
        assert_eq!(detail.traffic.len(), TOP_TRAFFIC_ORIGINS);
        assert_eq!(detail.traffic[0].source_medium, "s0 / cpc");
        assert_eq!(detail.traffic[9].source_medium, "s9 / cpc");
        assert_eq!(detail.traffic[0].pct, 8.3);
    }

    fn journey_sample() -> EventSnapshot {
        snapshot(vec![
            event("page_view", "c1", 1, T0),
            with_source(event("page_view", "c1", 1, T0 + SEC), "google", "cpc"),
            with_source(event("purchase", "c1", 2, T0 + DAY), "newsletter", "email"),
            with_source(event("purchase", "c2", 1, T0), "bing", "cpc"),
            with_origin(event("purchase", "c2", 2, T0 + DAY), Some("direct"), None),
            with_source(event("purchase", "c3", 2, T0 + DAY), "newsletter", "email"),
            with_source(event("page_view", "c4", 1, T0), "google", "cpc"),
            with_source(event("purchase", "c4", 2, T0 + DAY), "newsletter", "email"),
            with_source(event("purchase", "c5", 3, T0 + 2 * DAY), "bing", "cpc"),
        ])
    }

    fn shares(journey: &OriginJourney) -> Vec<(i64, &str, usize, f64)> {
        journey
            .distribution
            .iter()
            .map(|d| (d.session_number, d.source_medium.as_str(), d.actors, d.pct))
            .collect()
    }

    fn sequences(journey: &OriginJourney) -> Vec<(String, usize, f64)> {
        journey
            .sequences
            .iter()
            .map(|s| (s.sequence.join(" > "), s.actors, s.pct))
            .collect()
    }

    #[test]
    fn test_origin_journey_all_actors() {
        let journey = EventOverview::origin_journey(&journey_sample(), "purchase", 2, false)
            .unwrap()
            .into_ready()
            .unwrap();
        assert_eq!(journey.actors, 4);
        assert_eq!(
            shares(&journey),
            vec![
                (1, "google/cpc", 2, 66.7),
                (1, "bing/cpc", 1, 33.3),
                (2, "newsletter/email", 3, 75.0),
                (2, "direct/(none)", 1, 25.0),
            ]
        );
        assert_eq!(
            sequences(&journey),
            vec![
                ("google/cpc > newsletter/email".to_string(), 2, 50.0),
                ("bing/cpc > direct/(none)".to_string(), 1, 25.0),
                ("(no data) > newsletter/email".to_string(), 1, 25.0),
            ]
        );
    }

    #[test]
    fn test_origin_journey_first_occurrence_only() {
        let journey = EventOverview::origin_journey(&journey_sample(), "purchase", 2, true)
            .unwrap()
            .into_ready()
            .unwrap();
        // c2 already purchased in session 1
        assert_eq!(journey.actors, 3);
        assert!(journey.first_occurrence_only);
        assert_eq!(
            shares(&journey),
            vec![(1, "google/cpc", 2, 100.0), (2, "newsletter/email", 3, 100.0)]
        );
        assert_eq!(
            sequences(&journey),
            vec![
                ("google/cpc > newsletter/email".to_string(), 2, 66.7),
                ("(no data) > newsletter/email".to_string(), 1, 33.3),
            ]
        );
    }

    #[test]
    fn test_origin_journey_empty_and_invalid() {
        let snap = journey_sample();
        let none = EventOverview::origin_journey(&snap, "purchase", 5, false).unwrap();
        assert_eq!(none.empty_reason(), Some("no actors fired 'purchase' in session 5"));
        assert!(matches!(
            EventOverview::origin_journey(&snap, "purchase", 0, false),
            Err(AnalyticsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_actor_profile_and_user_lookup() {
        let snap = sample();
        let profile = EventOverview::actor_profile(&snap, "c1").unwrap();
        assert_eq!(profile.total_events, 4);
        assert_eq!(profile.days_active, 2);
        assert_eq!(profile.sessions.len(), 2);
        assert_eq!(profile.user_ids, vec!["u1".to_string()]);
        assert!(EventOverview::actor_profile(&snap, "nobody").is_none());

        assert_eq!(
            EventOverview::actors_for_user(&snap, "u1"),
            vec!["c1".to_string(), "c3".to_string()]
        );
    }
}
