//! Presentation exports of the note graph (JSON, CSV, GEXF).
//!
//! # Invariants
//! - Edges only connect notes present in the collection.
//! - Node order follows the input collection.

use crate::graph::analytics::Metrics;
use crate::graph::builder::NoteGraph;
use crate::model::note::Note;
use serde_json::{json, Value};
use std::collections::HashSet;

/// Node/edge lists annotated with centrality and community labels.
pub fn export_json(notes: &[Note], metrics: &Metrics) -> Value {
    let graph = NoteGraph::from_notes(notes);
    let nodes: Vec<Value> = unique_notes(notes)
        .map(|note| {
            let centrality = metrics.centrality_of(&note.id);
            json!({
                "id": note.id,
                "title": note.title,
                "tags": note.tags,
                "color": note.color,
                "degree": graph.out_degree(&note.id),
                "backlinks": graph.backlinks(&note.id),
                "betweenness": centrality.map_or(0, |c| c.betweenness),
                "closeness": centrality.map_or(0.0, |c| c.closeness),
                "community": metrics.community_of(&note.id),
            })
        })
        .collect();
    let edges: Vec<Value> = edge_pairs(&graph)
        .into_iter()
        .map(|(source, target)| json!({ "source": source, "target": target }))
        .collect();

    json!({
        "nodes": nodes,
        "edges": edges,
        "metrics": {
            "nodeCount": metrics.node_count,
            "totalEdges": metrics.total_edges,
            "density": metrics.density,
            "clusteringCoefficient": metrics.clustering_coefficient,
        },
    })
}

/// One CSV row per note with degree and centrality columns.
pub fn export_csv(notes: &[Note], metrics: &Metrics) -> String {
    let graph = NoteGraph::from_notes(notes);
    let mut out = String::from("id,title,tags,degree,backlinks,betweenness,closeness,community\n");
    for note in unique_notes(notes) {
        let centrality = metrics.centrality_of(&note.id);
        out.push_str(&format!(
            "{},{},{},{},{},{},{:.6},{}\n",
            csv_field(&note.id),
            csv_field(&note.title),
            csv_field(&note.tags.join(" ")),
            graph.out_degree(&note.id),
            graph.backlinks(&note.id),
            centrality.map_or(0, |c| c.betweenness),
            centrality.map_or(0.0, |c| c.closeness),
            csv_field(metrics.community_of(&note.id).unwrap_or("")),
        ));
    }
    out
}

/// GEXF 1.3 document with a directed static graph.
pub fn export_gexf(notes: &[Note], metrics: &Metrics) -> String {
    let graph = NoteGraph::from_notes(notes);
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<gexf xmlns=\"http://gexf.net/1.3\" version=\"1.3\">\n");
    out.push_str("  <graph mode=\"static\" defaultedgetype=\"directed\">\n");
    out.push_str("    <attributes class=\"node\">\n");
    out.push_str("      <attribute id=\"0\" title=\"degree\" type=\"integer\"/>\n");
    out.push_str("      <attribute id=\"1\" title=\"backlinks\" type=\"integer\"/>\n");
    out.push_str("      <attribute id=\"2\" title=\"community\" type=\"string\"/>\n");
    out.push_str("    </attributes>\n");
    out.push_str("    <nodes>\n");
    for note in unique_notes(notes) {
        out.push_str(&format!(
            "      <node id=\"{}\" label=\"{}\">\n",
            xml_escape(&note.id),
            xml_escape(&note.title)
        ));
        out.push_str("        <attvalues>\n");
        out.push_str(&format!(
            "          <attvalue for=\"0\" value=\"{}\"/>\n",
            graph.out_degree(&note.id)
        ));
        out.push_str(&format!(
            "          <attvalue for=\"1\" value=\"{}\"/>\n",
            graph.backlinks(&note.id)
        ));
        out.push_str(&format!(
            "          <attvalue for=\"2\" value=\"{}\"/>\n",
            xml_escape(metrics.community_of(&note.id).unwrap_or(""))
        ));
        out.push_str("        </attvalues>\n");
        out.push_str("      </node>\n");
    }
    out.push_str("    </nodes>\n");
    out.push_str("    <edges>\n");
    for (index, (source, target)) in edge_pairs(&graph).into_iter().enumerate() {
        out.push_str(&format!(
            "      <edge id=\"{index}\" source=\"{}\" target=\"{}\"/>\n",
            xml_escape(source),
            xml_escape(target)
        ));
    }
    out.push_str("    </edges>\n");
    out.push_str("  </graph>\n");
    out.push_str("</gexf>\n");
    out
}

fn unique_notes(notes: &[Note]) -> impl Iterator<Item = &Note> {
    let mut seen = HashSet::new();
    notes.iter().filter(move |note| seen.insert(note.id.as_str()))
}

fn edge_pairs(graph: &NoteGraph) -> Vec<(&str, &str)> {
    graph
        .nodes
        .iter()
        .flat_map(|source| {
            graph
                .out_neighbors(source)
                .into_iter()
                .flatten()
                .map(move |target| (source.as_str(), target.as_str()))
        })
        .collect()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
