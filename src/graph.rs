//! Event transition graph
//!
//! Builds a directed weighted graph whose nodes are event names and whose
//! edges count chronologically adjacent pairs within a scope group. Event names
//! below the occurrence threshold are removed before sequences are built, so
//! their neighbours become adjacent.
//!
//! The retained names and edges are loaded into a petgraph `DiGraph`. Weighted
//! degrees come from its directed edge iterators. petgraph has no weighted
//! betweenness, so centrality runs Brandes' algorithm with Dijkstra search over
//! the graph's adjacency, treating edge weight as distance, normalized by
//! `1 / ((n-1)(n-2))` for a directed graph of `n > 2` nodes.

use crate::deadline::{deadline_reason, Deadline};
use crate::error::AnalyticsError;
use crate::snapshot::EventSnapshot;
use crate::types::{round1, AnalysisOutcome, Scope};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::{debug, warn};

/// Default minimum occurrences for nodes and edges
pub const DEFAULT_MIN_OCCURRENCES: u64 = 5;

/// Transition graph parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphRequest {
    pub scope: Scope,
    /// Threshold applied to node counts and final edge weights
    pub min_occurrences: u64,
}

impl Default for GraphRequest {
    fn default() -> Self {
        Self {
            scope: Scope::Session,
            min_occurrences: DEFAULT_MIN_OCCURRENCES,
        }
    }
}

impl GraphRequest {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.min_occurrences == 0 {
            return Err(AnalyticsError::invalid_parameter(
                "min_occurrences must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub event_name: String,
    pub total_count: u64,
    pub centrality: f64,
    pub in_degree: u64,
    pub out_degree: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub weight: u64,
    pub distinct_actors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropOff {
    pub event_name: String,
    pub in_degree: u64,
    pub out_degree: u64,
    pub dropoff_pct: f64,
}

/// Graph tables for flow rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionGraph {
    pub scope: Scope,
    pub min_occurrences: u64,
    /// Nodes by descending centrality, then descending count
    pub nodes: Vec<GraphNode>,
    /// Edges in order of first transition
    pub edges: Vec<GraphEdge>,
    /// Nodes with incoming flow, by descending drop-off
    pub dropoff: Vec<DropOff>,
    /// Sum of surviving edge weights
    pub total_transitions: u64,
}

struct EdgeTally<'a> {
    weight: u64,
    actors: HashSet<&'a str>,
}

/// Engine for transition graphs
pub struct TransitionGraphEngine;

impl TransitionGraphEngine {
    pub fn build(
        snapshot: &EventSnapshot,
        request: &GraphRequest,
        deadline: Deadline,
    ) -> Result<AnalysisOutcome<TransitionGraph>, AnalyticsError> {
        request.validate()?;
        let threshold = request.min_occurrences;

        // 1. node selection, in descending count then first-seen order
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for event in snapshot.events() {
            *counts.entry(event.event_name.as_str()).or_default() += 1;
        }
        let mut names: Vec<&str> = snapshot
            .event_names()
            .into_iter()
            .filter(|name| counts[name] >= threshold)
            .collect();
        names.sort_by_key(|name| Reverse(counts[name]));

        if names.len() < 2 {
            return Ok(AnalysisOutcome::empty(format!(
                "fewer than 2 events occur at least {} times",
                threshold
            )));
        }
        let index: HashMap<&str, usize> =
            names.iter().enumerate().map(|(i, name)| (*name, i)).collect();

        // 2. adjacent pairs over the filtered sequences
        let groups = snapshot.groups(request.scope);
        let mut edge_order: Vec<(usize, usize)> = Vec::new();
        let mut tallies: HashMap<(usize, usize), EdgeTally<'_>> = HashMap::new();

        for (processed, group) in groups.iter().enumerate() {
            if deadline.expired() {
                warn!(processed, total = groups.len(), "transition graph aborted");
                return Ok(AnalysisOutcome::empty(deadline_reason(
                    "transition graph",
                    processed,
                    groups.len(),
                )));
            }

            let sequence: Vec<usize> = group
                .events
                .iter()
                .filter_map(|event| index.get(event.event_name.as_str()).copied())
                .collect();

            for pair in sequence.windows(2) {
                let edge = (pair[0], pair[1]);
                let tally = tallies.entry(edge).or_insert_with(|| {
                    edge_order.push(edge);
                    EdgeTally {
                        weight: 0,
                        actors: HashSet::new(),
                    }
                });
                tally.weight += 1;
                tally.actors.insert(group.actor_id);
            }
        }

        // 3. edge threshold
        let kept: Vec<((usize, usize), &EdgeTally<'_>)> = edge_order
            .iter()
            .filter_map(|edge| tallies.get(edge).map(|tally| (*edge, tally)))
            .filter(|(_, tally)| tally.weight >= threshold)
            .collect();

        if kept.is_empty() {
            return Ok(AnalysisOutcome::empty(format!(
                "no transition occurs at least {} times",
                threshold
            )));
        }

        // 4. degrees and centrality
        let mut graph: DiGraph<&str, u64> = DiGraph::with_capacity(names.len(), kept.len());
        for name in &names {
            graph.add_node(*name);
        }
        for ((source, target), tally) in &kept {
            graph.add_edge(NodeIndex::new(*source), NodeIndex::new(*target), tally.weight);
        }
        let centrality = betweenness_centrality(&graph);

        let weighted_degree = |node: NodeIndex, direction: Direction| -> u64 {
            graph.edges_directed(node, direction).map(|e| *e.weight()).sum()
        };
        let in_degree: Vec<u64> = graph
            .node_indices()
            .map(|node| weighted_degree(node, Direction::Incoming))
            .collect();
        let out_degree: Vec<u64> = graph
            .node_indices()
            .map(|node| weighted_degree(node, Direction::Outgoing))
            .collect();
        let n = graph.node_count();

        let mut nodes: Vec<GraphNode> = names
            .iter()
            .enumerate()
            .map(|(i, name)| GraphNode {
                event_name: name.to_string(),
                total_count: counts[name],
                centrality: centrality[i],
                in_degree: in_degree[i],
                out_degree: out_degree[i],
            })
            .collect();
        nodes.sort_by(|a, b| b.centrality.total_cmp(&a.centrality));

        let edges: Vec<GraphEdge> = kept
            .iter()
            .map(|((source, target), tally)| GraphEdge {
                source: names[*source].to_string(),
                target: names[*target].to_string(),
                weight: tally.weight,
                distinct_actors: tally.actors.len(),
            })
            .collect();
        let total_transitions = edges.iter().map(|e| e.weight).sum();

        // 5. drop-off
        let mut dropoff: Vec<DropOff> = (0..n)
            .filter(|&i| in_degree[i] > 0)
            .map(|i| {
                let inflow = in_degree[i] as f64;
                let rate = ((inflow - out_degree[i] as f64) / inflow).max(0.0);
                DropOff {
                    event_name: names[i].to_string(),
                    in_degree: in_degree[i],
                    out_degree: out_degree[i],
                    dropoff_pct: round1(rate * 100.0),
                }
            })
            .collect();
        dropoff.sort_by(|a, b| b.dropoff_pct.total_cmp(&a.dropoff_pct));

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            total_transitions,
            "built transition graph"
        );

        Ok(AnalysisOutcome::Ready(TransitionGraph {
            scope: request.scope,
            min_occurrences: threshold,
            nodes,
            edges,
            dropoff,
            total_transitions,
        }))
    }
}

/// Normalized betweenness centrality of a directed graph whose edge weights
/// are distances, indexed by node index
pub(crate) fn betweenness_centrality<N>(graph: &DiGraph<N, u64>) -> Vec<f64> {
    let n = graph.node_count();
    let adjacency: Vec<Vec<(usize, u64)>> = graph
        .node_indices()
        .map(|node| {
            graph
                .edges(node)
                .map(|e| (e.target().index(), *e.weight()))
                .collect()
        })
        .collect();
    let mut centrality = vec![0.0f64; n];

    for source in 0..n {
        let mut order: Vec<usize> = Vec::with_capacity(n);
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut dist: Vec<Option<u64>> = vec![None; n];
        let mut settled = vec![false; n];
        let mut heap = BinaryHeap::new();

        sigma[source] = 1.0;
        dist[source] = Some(0);
        heap.push(Reverse((0u64, source)));

        while let Some(Reverse((d, v))) = heap.pop() {
            if settled[v] || dist[v] != Some(d) {
                continue;
            }
            settled[v] = true;
            order.push(v);

            for &(w, weight) in &adjacency[v] {
                if w == v || settled[w] {
                    continue;
                }
                let candidate = d + weight;
                match dist[w] {
                    Some(current) if candidate > current => {}
                    Some(current) if candidate == current => {
                        sigma[w] += sigma[v];
                        preds[w].push(v);
                    }
                    _ => {
                        dist[w] = Some(candidate);
                        sigma[w] = sigma[v];
                        preds[w] = vec![v];
                        heap.push(Reverse((candidate, w)));
                    }
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        while let Some(w) = order.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                centrality[w] += delta[w];
            }
        }
    }

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for value in &mut centrality {
            *value *= scale;
        }
    }
    centrality
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::test_support::*;
    use crate::types::Event;
    use pretty_assertions::assert_eq;

    fn session(actor: &str, number: i64, names: &[&str]) -> Vec<Event> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| event(name, actor, number, T0 + i as i64 * SEC))
            .collect()
    }

    fn build(events: Vec<Event>, min_occurrences: u64) -> TransitionGraph {
        let request = GraphRequest {
            min_occurrences,
            ..Default::default()
        };
        TransitionGraphEngine::build(&snapshot(events), &request, Deadline::none())
            .unwrap()
            .into_ready()
            .unwrap()
    }

    fn node<'a>(graph: &'a TransitionGraph, name: &str) -> &'a GraphNode {
        graph.nodes.iter().find(|n| n.event_name == name).unwrap()
    }

    #[test]
    fn test_threshold_drops_rare_nodes_and_edges() {
        let mut events = Vec::new();
        events.extend(session("c1", 1, &["A", "B"]));
        events.extend(session("c2", 1, &["A", "B"]));
        events.extend(session("c3", 1, &["A", "B"]));
        events.extend(session("c4", 1, &["A", "C"]));

        let graph = build(events, 2);
        assert_eq!(
            graph.edges,
            vec![GraphEdge {
                source: "A".to_string(),
                target: "B".to_string(),
                weight: 3,
                distinct_actors: 3,
            }]
        );
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.nodes.iter().all(|n| n.event_name != "C"));
    }

    #[test]
    fn test_edge_weights_sum_to_adjacent_pairs() {
        let mut events = Vec::new();
        events.extend(session("c1", 1, &["A", "B", "A", "A", "C"]));
        events.extend(session("c1", 2, &["B", "C"]));
        events.extend(session("c2", 1, &["C"]));

        let graph = build(events, 1);
        // 4 + 1 + 0 adjacent pairs
        assert_eq!(graph.total_transitions, 5);
        assert_eq!(graph.edges.iter().map(|e| e.weight).sum::<u64>(), 5);

        let self_loop = graph
            .edges
            .iter()
            .find(|e| e.source == "A" && e.target == "A")
            .unwrap();
        assert_eq!(self_loop.weight, 1);

        let b_to_c = graph.edges.iter().find(|e| e.source == "B" && e.target == "C").unwrap();
        assert_eq!(b_to_c.distinct_actors, 1);
    }

    #[test]
    fn test_removed_names_make_neighbours_adjacent() {
        let mut events = Vec::new();
        events.extend(session("c1", 1, &["A", "rare", "B"]));
        events.extend(session("c2", 1, &["A", "B"]));

        let graph = build(events, 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].weight, 2);
    }

    #[test]
    fn test_chain_centrality() {
        let graph = build(session("c1", 1, &["A", "B", "C"]), 1);
        assert_eq!(graph.nodes[0].event_name, "B");
        assert!((node(&graph, "B").centrality - 0.5).abs() < 1e-12);
        assert_eq!(node(&graph, "A").centrality, 0.0);
        assert_eq!(node(&graph, "C").centrality, 0.0);
    }

    #[test]
    fn test_heavy_edge_is_long_distance() {
        let mut events = session("c0", 1, &["A", "B", "C"]);
        for i in 1..=5 {
            events.extend(session(&format!("c{}", i), 1, &["A", "C"]));
        }
        let graph = build(events, 1);
        // A->C has weight 5, so A->B->C (distance 2) is the shortest path
        assert!((node(&graph, "B").centrality - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_split_shortest_paths() {
        let graph = DiGraph::<&str, u64>::from_edges([(0u32, 1u32, 1u64), (0, 2, 1), (1, 3, 1), (2, 3, 1)]);
        let centrality = betweenness_centrality(&graph);
        // one of two shortest 0->3 paths through each of 1 and 2, scaled by 1/6
        assert!((centrality[1] - 0.5 / 6.0).abs() < 1e-12);
        assert!((centrality[2] - 0.5 / 6.0).abs() < 1e-12);
        assert_eq!(centrality[0], 0.0);
    }

    #[test]
    fn test_isolated_node_counts_toward_normalization() {
        // D is retained but never transitions, so n = 4 and the scale is 1/6
        let mut graph = DiGraph::<&str, u64>::new();
        let a = graph.add_node("A");
        let b = graph.add_node("B");
        let c = graph.add_node("C");
        graph.add_node("D");
        graph.add_edge(a, b, 1);
        graph.add_edge(b, c, 1);
        let centrality = betweenness_centrality(&graph);
        assert!((centrality[b.index()] - 1.0 / 6.0).abs() < 1e-12);
        assert_eq!(centrality[3], 0.0);
    }

    #[test]
    fn test_degrees_are_weighted_sums() {
        let mut events = Vec::new();
        for i in 0..3 {
            events.extend(session(&format!("c{}", i), 1, &["A", "B"]));
        }
        events.extend(session("c3", 1, &["C", "B", "A"]));

        let graph = build(events, 1);
        let b = node(&graph, "B");
        assert_eq!((b.in_degree, b.out_degree), (4, 1));
        let a = node(&graph, "A");
        assert_eq!((a.in_degree, a.out_degree), (1, 3));
        assert_eq!(graph.total_transitions, 5);
    }

    #[test]
    fn test_dropoff_table() {
        let mut events = Vec::new();
        events.extend(session("c1", 1, &["A", "B", "C"]));
        events.extend(session("c2", 1, &["A", "B"]));

        let graph = build(events, 1);
        let table: Vec<(&str, f64)> = graph
            .dropoff
            .iter()
            .map(|d| (d.event_name.as_str(), d.dropoff_pct))
            .collect();
        assert_eq!(table, vec![("C", 100.0), ("B", 50.0)]);
        assert_eq!(node(&graph, "B").in_degree, 2);
        assert_eq!(node(&graph, "B").out_degree, 1);
    }

    #[test]
    fn test_empty_conditions() {
        let few_nodes = TransitionGraphEngine::build(
            &snapshot(session("c1", 1, &["A", "B"])),
            &GraphRequest::default(),
            Deadline::none(),
        )
        .unwrap();
        assert!(few_nodes.empty_reason().unwrap().contains("fewer than 2 events"));

        let mut events = session("c1", 1, &["A", "A"]);
        events.extend(session("c2", 1, &["B", "B"]));
        let request = GraphRequest {
            min_occurrences: 2,
            ..Default::default()
        };
        let no_edges =
            TransitionGraphEngine::build(&snapshot(events), &request, Deadline::none()).unwrap();
        assert!(no_edges.empty_reason().unwrap().contains("no transition"));
    }
}
