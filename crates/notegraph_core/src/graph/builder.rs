//! Link graph construction from a flat note collection.
//!
//! # Responsibility
//! - Build the raw outgoing adjacency and backlink counts shared by search
//!   scoring and analytics.
//! - Build the analytics view restricted to known notes, plus its
//!   symmetrized neighbor view.
//!
//! # Invariants
//! - `LinkGraph` keeps dangling targets; `NoteGraph` drops them from
//!   adjacency but inherits the permissive backlink counts.
//! - The directed adjacency is never mutated to derive the undirected view.
//! - Neighbor sets are ordered so traversals are deterministic.

use crate::model::note::{Note, NoteId};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Raw link structure: every note's outgoing links plus reverse counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkGraph {
    pub adjacency: HashMap<NoteId, BTreeSet<NoteId>>,
    /// Incremented once per (note, target) pair, dangling targets included.
    pub backlink_count: HashMap<NoteId, usize>,
}

impl LinkGraph {
    pub fn backlinks(&self, id: &str) -> usize {
        self.backlink_count.get(id).copied().unwrap_or(0)
    }
}

/// Builds the raw adjacency and backlink counts.
pub fn build_graph(notes: &[Note]) -> LinkGraph {
    let mut graph = LinkGraph::default();
    for note in notes {
        let targets: BTreeSet<NoteId> = note.links.iter().cloned().collect();
        for target in &targets {
            *graph.backlink_count.entry(target.clone()).or_insert(0) += 1;
        }
        graph
            .adjacency
            .entry(note.id.clone())
            .or_default()
            .extend(targets);
    }
    graph
}

/// Directed graph over known notes used by the analytics engine.
#[derive(Debug, Clone, Default)]
pub struct NoteGraph {
    /// Node ids in input order, duplicates removed.
    pub nodes: Vec<NoteId>,
    /// Outgoing links restricted to known nodes.
    pub adjacency: HashMap<NoteId, BTreeSet<NoteId>>,
    /// Incoming links restricted to known nodes.
    pub in_links: HashMap<NoteId, BTreeSet<NoteId>>,
    pub backlink_count: HashMap<NoteId, usize>,
}

impl NoteGraph {
    pub fn from_notes(notes: &[Note]) -> Self {
        let raw = build_graph(notes);
        let mut seen = HashSet::new();
        let nodes: Vec<NoteId> = notes
            .iter()
            .filter(|note| seen.insert(note.id.clone()))
            .map(|note| note.id.clone())
            .collect();

        let mut adjacency: HashMap<NoteId, BTreeSet<NoteId>> = HashMap::new();
        let mut in_links: HashMap<NoteId, BTreeSet<NoteId>> = HashMap::new();
        for id in &nodes {
            adjacency.insert(id.clone(), BTreeSet::new());
            in_links.insert(id.clone(), BTreeSet::new());
        }

        for id in &nodes {
            let Some(targets) = raw.adjacency.get(id) else {
                continue;
            };
            for target in targets.iter().filter(|target| seen.contains(*target)) {
                if let Some(out) = adjacency.get_mut(id) {
                    out.insert(target.clone());
                }
                if let Some(incoming) = in_links.get_mut(target) {
                    incoming.insert(id.clone());
                }
            }
        }

        Self {
            nodes,
            adjacency,
            in_links,
            backlink_count: raw.backlink_count,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn out_neighbors(&self, id: &str) -> Option<&BTreeSet<NoteId>> {
        self.adjacency.get(id)
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.adjacency.get(id).map_or(0, BTreeSet::len)
    }

    pub fn backlinks(&self, id: &str) -> usize {
        self.backlink_count.get(id).copied().unwrap_or(0)
    }

    /// Returns whether `from` links to `to` or `to` links to `from`.
    pub fn linked_either_way(&self, from: &str, to: &str) -> bool {
        self.adjacency
            .get(from)
            .is_some_and(|out| out.contains(to))
            || self.adjacency.get(to).is_some_and(|out| out.contains(from))
    }

    /// Derives the symmetrized neighbor view (outgoing ∪ incoming).
    pub fn undirected_neighbors(&self) -> HashMap<NoteId, BTreeSet<NoteId>> {
        self.nodes
            .iter()
            .map(|id| {
                let mut neighbors = BTreeSet::new();
                if let Some(out) = self.adjacency.get(id) {
                    neighbors.extend(out.iter().cloned());
                }
                if let Some(incoming) = self.in_links.get(id) {
                    neighbors.extend(incoming.iter().cloned());
                }
                neighbors.remove(id);
                (id.clone(), neighbors)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{build_graph, NoteGraph};
    use crate::model::note::Note;

    fn notes() -> Vec<Note> {
        vec![
            Note::new("a", "A", "").with_links(["b", "ghost"]),
            Note::new("b", "B", "").with_links(["c"]),
            Note::new("c", "C", "").with_links(["ghost"]),
        ]
    }

    #[test]
    fn build_graph_counts_dangling_backlinks() {
        let graph = build_graph(&notes());
        assert_eq!(graph.backlinks("ghost"), 2);
        assert_eq!(graph.backlinks("b"), 1);
        assert_eq!(graph.backlinks("a"), 0);
        assert!(graph.adjacency["a"].contains("ghost"));
    }

    #[test]
    fn note_graph_filters_unknown_targets() {
        let graph = NoteGraph::from_notes(&notes());
        assert_eq!(graph.nodes, vec!["a", "b", "c"]);
        assert_eq!(graph.out_degree("a"), 1);
        assert_eq!(graph.out_degree("c"), 0);
        assert_eq!(graph.backlinks("ghost"), 2);
    }

    #[test]
    fn undirected_view_is_symmetric_and_leaves_directed_intact() {
        let graph = NoteGraph::from_notes(&notes());
        let view = graph.undirected_neighbors();
        assert!(view["b"].contains("a"));
        assert!(view["a"].contains("b"));
        assert!(!graph.adjacency["b"].contains("a"));
        assert!(graph.linked_either_way("b", "a"));
    }
}
