//! Core domain logic for notegraph.
//! This crate owns note normalization, search and link-graph analytics.

pub mod config;
pub mod db;
pub mod graph;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{AnalyticsConfig, ConfigError, IndexConfig, NotegraphConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use graph::analytics::{
    Bridge, Community, GraphAnalytics, Metrics, NodeCentrality, RankedNote,
};
pub use graph::builder::{build_graph, LinkGraph, NoteGraph};
pub use graph::export::{export_csv, export_gexf, export_json};
pub use graph::insights::{generate_insights, Insight, InsightKind, InsightPriority};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{normalize_tag, Note, NoteId, NoteValidationError, RawNote};
pub use repo::memory_repo::InMemoryNoteStore;
pub use repo::note_repo::SqliteNoteStore;
pub use repo::{NoteStore, RepoError, RepoResult};
pub use search::index::{IndexStats, MatchField, SearchHit, SearchIndex, SearchMatch};
pub use search::query::{parse_query, FilterPatch, ParsedQuery, SearchFilters};
pub use search::tokenize::tokenize;
pub use service::workspace_service::{
    NoteWorkspace, WorkspaceError, WorkspaceHealth, WorkspaceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
