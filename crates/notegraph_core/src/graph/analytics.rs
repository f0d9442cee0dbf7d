//! Graph analytics over the note-link graph.
//!
//! # Responsibility
//! - Compute density, clustering, centrality, communities, bridges and
//!   hub/authority rankings from a note collection.
//!
//! # Invariants
//! - Pure over its input; no I/O and no shared state between calls.
//! - Every ratio short-circuits to `0.0` when its denominator is zero.
//! - Betweenness is the first-path BFS approximation, not exact Brandes.
//! - Clustering, communities and bridges read the undirected view derived
//!   from the directed adjacency.

use crate::config::AnalyticsConfig;
use crate::graph::builder::NoteGraph;
use crate::model::note::{Note, NoteId};
use log::info;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::Instant;

/// Per-node centrality scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCentrality {
    pub id: NoteId,
    /// Outgoing link count.
    pub degree: usize,
    pub betweenness: usize,
    pub closeness: f64,
    /// Local clustering coefficient; `None` when degree < 2.
    pub clustering: Option<f64>,
}

/// Connected group found by label propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Community {
    /// Label node id the community converged on.
    pub id: NoteId,
    pub nodes: Vec<NoteId>,
    pub size: usize,
}

/// Undirected edge whose removal disconnects the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bridge {
    pub from: NoteId,
    pub to: NoteId,
}

/// Note ranked by a degree-like count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedNote {
    pub id: NoteId,
    pub title: String,
    pub count: usize,
}

/// Aggregate graph metrics for one note collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub node_count: usize,
    pub total_edges: usize,
    pub density: f64,
    pub average_degree: f64,
    pub clustering_coefficient: f64,
    pub centrality: Vec<NodeCentrality>,
    pub communities: Vec<Community>,
    pub bridges: Vec<Bridge>,
    pub hubs: Vec<RankedNote>,
    pub authorities: Vec<RankedNote>,
    /// Notes with neither outgoing links nor backlinks.
    pub orphans: Vec<NoteId>,
}

impl Metrics {
    pub fn centrality_of(&self, id: &str) -> Option<&NodeCentrality> {
        self.centrality.iter().find(|node| node.id == id)
    }

    /// Community label for `id`, if it belongs to a surfaced community.
    pub fn community_of(&self, id: &str) -> Option<&str> {
        self.communities
            .iter()
            .find(|community| community.nodes.iter().any(|node| node == id))
            .map(|community| community.id.as_str())
    }
}

/// Stateless analytics engine parameterized by thresholds.
#[derive(Debug, Clone, Default)]
pub struct GraphAnalytics {
    config: AnalyticsConfig,
}

impl GraphAnalytics {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Computes all metrics for `notes`.
    pub fn calculate_metrics(&self, notes: &[Note]) -> Metrics {
        let started_at = Instant::now();
        let graph = NoteGraph::from_notes(notes);
        let n = graph.node_count();
        let total_edges: usize = graph.nodes.iter().map(|id| graph.out_degree(id)).sum();

        let clustering = local_clustering(&graph);
        let betweenness = approximate_betweenness(&graph);
        let centrality = graph
            .nodes
            .iter()
            .map(|id| NodeCentrality {
                id: id.clone(),
                degree: graph.out_degree(id),
                betweenness: betweenness.get(id).copied().unwrap_or(0),
                closeness: closeness(&graph, id),
                clustering: clustering.get(id).copied(),
            })
            .collect();

        let undirected = graph.undirected_neighbors();
        let metrics = Metrics {
            node_count: n,
            total_edges,
            density: density(total_edges, n),
            average_degree: ratio(total_edges as f64, n as f64),
            clustering_coefficient: mean(
                graph
                    .nodes
                    .iter()
                    .filter_map(|id| clustering.get(id).copied()),
            ),
            centrality,
            communities: self.detect_communities(&graph.nodes, &undirected),
            bridges: find_bridges(&graph.nodes, &undirected),
            hubs: self.hubs(notes, &graph),
            authorities: self.authorities(notes, &graph),
            orphans: graph
                .nodes
                .iter()
                .filter(|id| graph.out_degree(id) == 0 && graph.backlinks(id) == 0)
                .cloned()
                .collect(),
        };

        info!(
            "event=metrics_calculate module=graph status=ok nodes={} edges={} communities={} bridges={} duration_ms={}",
            metrics.node_count,
            metrics.total_edges,
            metrics.communities.len(),
            metrics.bridges.len(),
            started_at.elapsed().as_millis()
        );
        metrics
    }

    /// Label propagation; singletons are dropped from the result.
    ///
    /// A node adopts the most frequent community among its neighbors unless
    /// its current community already ties for the maximum. Among equally
    /// frequent challengers the first in neighbor order wins.
    pub fn detect_communities(
        &self,
        nodes: &[NoteId],
        neighbors: &HashMap<NoteId, BTreeSet<NoteId>>,
    ) -> Vec<Community> {
        let mut labels: HashMap<&str, &str> =
            nodes.iter().map(|id| (id.as_str(), id.as_str())).collect();

        for _ in 0..self.config.max_label_passes {
            let mut changed = false;
            for id in nodes {
                let Some(adjacent) = neighbors.get(id) else {
                    continue;
                };
                let mut counts: Vec<(&str, usize)> = Vec::new();
                for neighbor in adjacent {
                    let Some(&label) = labels.get(neighbor.as_str()) else {
                        continue;
                    };
                    match counts.iter_mut().find(|(existing, _)| *existing == label) {
                        Some((_, count)) => *count += 1,
                        None => counts.push((label, 1)),
                    }
                }
                let Some(max) = counts.iter().map(|(_, count)| *count).max() else {
                    continue;
                };
                let current = labels[id.as_str()];
                let current_count = counts
                    .iter()
                    .find(|(label, _)| *label == current)
                    .map_or(0, |(_, count)| *count);
                if current_count == max {
                    continue;
                }
                if let Some((best, _)) = counts.iter().find(|(_, count)| *count == max) {
                    labels.insert(id.as_str(), *best);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let mut grouped: Vec<Community> = Vec::new();
        for id in nodes {
            let label = labels[id.as_str()];
            match grouped.iter_mut().find(|community| community.id == label) {
                Some(community) => community.nodes.push(id.clone()),
                None => grouped.push(Community {
                    id: label.to_string(),
                    nodes: vec![id.clone()],
                    size: 0,
                }),
            }
        }
        grouped.retain(|community| community.nodes.len() > 1);
        for community in &mut grouped {
            community.size = community.nodes.len();
        }
        grouped.sort_by(|a, b| b.size.cmp(&a.size));
        grouped
    }

    fn hubs(&self, notes: &[Note], graph: &NoteGraph) -> Vec<RankedNote> {
        self.rank(notes, |id| graph.out_degree(id), self.config.hub_min_degree)
    }

    fn authorities(&self, notes: &[Note], graph: &NoteGraph) -> Vec<RankedNote> {
        self.rank(
            notes,
            |id| graph.backlinks(id),
            self.config.authority_min_backlinks,
        )
    }

    fn rank(
        &self,
        notes: &[Note],
        count_of: impl Fn(&str) -> usize,
        threshold: usize,
    ) -> Vec<RankedNote> {
        let mut seen = HashSet::new();
        let mut ranked: Vec<RankedNote> = notes
            .iter()
            .filter(|note| seen.insert(note.id.as_str()))
            .map(|note| RankedNote {
                id: note.id.clone(),
                title: note.title.clone(),
                count: count_of(&note.id),
            })
            .filter(|ranked| ranked.count > threshold)
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(self.config.top_k);
        ranked
    }
}

/// Directed density `edges / (n·(n-1))`; `0.0` for fewer than two nodes.
pub fn density(total_edges: usize, node_count: usize) -> f64 {
    if node_count < 2 {
        return 0.0;
    }
    ratio(total_edges as f64, (node_count * (node_count - 1)) as f64)
}

/// Local clustering for nodes with at least two outgoing neighbors.
///
/// A neighbor pair counts as connected when either endpoint links the other.
fn local_clustering(graph: &NoteGraph) -> HashMap<NoteId, f64> {
    let mut result = HashMap::new();
    for id in &graph.nodes {
        let Some(out) = graph.out_neighbors(id) else {
            continue;
        };
        let neighbors: Vec<&NoteId> = out.iter().collect();
        let k = neighbors.len();
        if k < 2 {
            continue;
        }
        let mut connected = 0usize;
        for (i, a) in neighbors.iter().enumerate() {
            for b in &neighbors[i + 1..] {
                if graph.linked_either_way(a, b) {
                    connected += 1;
                }
            }
        }
        let possible = k * (k - 1) / 2;
        result.insert(id.clone(), ratio(connected as f64, possible as f64));
    }
    result
}

/// First-path betweenness: one BFS tree per source, intermediate nodes on
/// each recorded path get one point.
fn approximate_betweenness(graph: &NoteGraph) -> HashMap<NoteId, usize> {
    let mut scores: HashMap<NoteId, usize> = HashMap::new();
    for source in &graph.nodes {
        let parents = bfs_parents(graph, source);
        for target in parents.keys() {
            let mut cursor = parents.get(target).copied().flatten();
            while let Some(step) = cursor {
                if step == source.as_str() {
                    break;
                }
                *scores.entry(step.to_string()).or_insert(0) += 1;
                cursor = parents.get(step).copied().flatten();
            }
        }
    }
    scores
}

/// BFS over outgoing links; maps each reached node to its first parent.
fn bfs_parents<'g>(graph: &'g NoteGraph, source: &'g str) -> HashMap<&'g str, Option<&'g str>> {
    let mut parents: HashMap<&str, Option<&str>> = HashMap::new();
    let mut queue = VecDeque::new();
    parents.insert(source, None);
    queue.push_back(source);
    while let Some(current) = queue.pop_front() {
        let Some(out) = graph.out_neighbors(current) else {
            continue;
        };
        for next in out {
            if !parents.contains_key(next.as_str()) {
                parents.insert(next.as_str(), Some(current));
                queue.push_back(next.as_str());
            }
        }
    }
    parents
}

fn bfs_distances<'g>(graph: &'g NoteGraph, source: &'g str) -> HashMap<&'g str, usize> {
    let mut distances = HashMap::new();
    let mut queue = VecDeque::new();
    distances.insert(source, 0usize);
    queue.push_back(source);
    while let Some(current) = queue.pop_front() {
        let depth = distances[current];
        let Some(out) = graph.out_neighbors(current) else {
            continue;
        };
        for next in out {
            if !distances.contains_key(next.as_str()) {
                distances.insert(next.as_str(), depth + 1);
                queue.push_back(next.as_str());
            }
        }
    }
    distances
}

/// `(n-1) / sum(distances)` over reachable nodes; `0.0` when nothing is
/// reachable.
fn closeness(graph: &NoteGraph, id: &str) -> f64 {
    let total: usize = bfs_distances(graph, id).values().sum();
    if total == 0 {
        return 0.0;
    }
    (graph.node_count().saturating_sub(1)) as f64 / total as f64
}

/// Tarjan low-link bridge search; iterative to bound stack depth.
fn find_bridges(nodes: &[NoteId], neighbors: &HashMap<NoteId, BTreeSet<NoteId>>) -> Vec<Bridge> {
    let mut discovery: HashMap<&str, usize> = HashMap::new();
    let mut low: HashMap<&str, usize> = HashMap::new();
    let mut bridges = Vec::new();
    let mut timer = 0usize;

    for root in nodes {
        if discovery.contains_key(root.as_str()) {
            continue;
        }
        discovery.insert(root.as_str(), timer);
        low.insert(root.as_str(), timer);
        timer += 1;

        // (node, parent, neighbor iterator)
        let mut stack: Vec<(&str, Option<&str>, Vec<&str>)> =
            vec![(root.as_str(), None, neighbor_list(neighbors, root))];

        while let Some(frame) = stack.last_mut() {
            let (node, parent) = (frame.0, frame.1);
            if let Some(next) = frame.2.pop() {
                if Some(next) == parent {
                    continue;
                }
                if let Some(&seen) = discovery.get(next) {
                    let updated = low[node].min(seen);
                    low.insert(node, updated);
                } else {
                    discovery.insert(next, timer);
                    low.insert(next, timer);
                    timer += 1;
                    stack.push((next, Some(node), neighbor_list(neighbors, next)));
                }
                continue;
            }

            stack.pop();
            if let Some(parent) = parent {
                let child_low = low[node];
                let updated = low[parent].min(child_low);
                low.insert(parent, updated);
                if child_low > discovery[parent] {
                    bridges.push(Bridge {
                        from: parent.to_string(),
                        to: node.to_string(),
                    });
                }
            }
        }
    }
    bridges
}

/// Neighbors reversed so `pop()` visits them in ascending order.
fn neighbor_list<'g>(neighbors: &'g HashMap<NoteId, BTreeSet<NoteId>>, id: &str) -> Vec<&'g str> {
    neighbors
        .get(id)
        .map(|set| set.iter().rev().map(String::as_str).collect())
        .unwrap_or_default()
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    ratio(sum, count as f64)
}
