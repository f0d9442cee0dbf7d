//! Link graph construction, metrics and presentation.
//!
//! # Responsibility
//! - Derive adjacency and backlink counts from note `links`.
//! - Compute structural metrics and summarize them as insights.
//! - Export the annotated graph for external tools.

pub mod analytics;
pub mod builder;
pub mod export;
pub mod insights;
