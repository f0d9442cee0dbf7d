//! Human-readable observations derived from graph metrics.

use crate::graph::analytics::Metrics;
use crate::model::note::Note;
use serde::Serialize;

const SPARSE_DENSITY: f64 = 0.05;
const DENSE_DENSITY: f64 = 0.3;
const HIGH_CLUSTERING: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Structure,
    Hub,
    Authority,
    Orphans,
    Bridges,
    Communities,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
    pub priority: InsightPriority,
}

impl Insight {
    fn new(
        kind: InsightKind,
        priority: InsightPriority,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            priority,
        }
    }
}

/// Summarizes `metrics` into observations, highest priority first.
///
/// Returns nothing for an empty collection.
pub fn generate_insights(metrics: &Metrics, notes: &[Note]) -> Vec<Insight> {
    if notes.is_empty() || metrics.node_count == 0 {
        return Vec::new();
    }
    let mut insights = Vec::new();

    if metrics.node_count > 1 && metrics.density < SPARSE_DENSITY {
        insights.push(Insight::new(
            InsightKind::Structure,
            InsightPriority::Medium,
            "Sparse knowledge graph",
            format!(
                "Only {:.1}% of possible links exist; linking related notes will surface more connections.",
                metrics.density * 100.0
            ),
        ));
    } else if metrics.density > DENSE_DENSITY {
        insights.push(Insight::new(
            InsightKind::Structure,
            InsightPriority::Low,
            "Densely connected notes",
            format!(
                "{:.1}% of possible links exist across {} notes.",
                metrics.density * 100.0,
                metrics.node_count
            ),
        ));
    }

    if metrics.clustering_coefficient > HIGH_CLUSTERING {
        insights.push(Insight::new(
            InsightKind::Structure,
            InsightPriority::Low,
            "Tightly knit topics",
            format!(
                "Average clustering coefficient is {:.2}; linked notes tend to link each other.",
                metrics.clustering_coefficient
            ),
        ));
    }

    if let Some(hub) = metrics.hubs.first() {
        insights.push(Insight::new(
            InsightKind::Hub,
            InsightPriority::Medium,
            "Hub note",
            format!(
                "\"{}\" links out to {} notes.",
                display_title(&hub.title, &hub.id),
                hub.count
            ),
        ));
    }

    if let Some(authority) = metrics.authorities.first() {
        insights.push(Insight::new(
            InsightKind::Authority,
            InsightPriority::Medium,
            "Most referenced note",
            format!(
                "\"{}\" is referenced by {} notes.",
                display_title(&authority.title, &authority.id),
                authority.count
            ),
        ));
    }

    if !metrics.orphans.is_empty() {
        let priority = if metrics.orphans.len() * 2 > metrics.node_count {
            InsightPriority::High
        } else {
            InsightPriority::Medium
        };
        insights.push(Insight::new(
            InsightKind::Orphans,
            priority,
            "Unconnected notes",
            format!(
                "{} of {} notes have no links in or out.",
                metrics.orphans.len(),
                metrics.node_count
            ),
        ));
    }

    if !metrics.bridges.is_empty() {
        insights.push(Insight::new(
            InsightKind::Bridges,
            InsightPriority::High,
            "Fragile connections",
            format!(
                "{} links are the only path between parts of the graph.",
                metrics.bridges.len()
            ),
        ));
    }

    if metrics.communities.len() > 1 {
        insights.push(Insight::new(
            InsightKind::Communities,
            InsightPriority::Low,
            "Distinct topic clusters",
            format!(
                "Found {} clusters; the largest has {} notes.",
                metrics.communities.len(),
                metrics.communities[0].size
            ),
        ));
    }

    insights.sort_by_key(|insight| insight.priority);
    insights
}

fn display_title<'a>(title: &'a str, id: &'a str) -> &'a str {
    if title.trim().is_empty() {
        id
    } else {
        title
    }
}
