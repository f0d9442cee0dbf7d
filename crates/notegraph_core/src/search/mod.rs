//! In-memory note search.
//!
//! # Responsibility
//! - Tokenize note text and parse structured queries.
//! - Score and filter notes through a rebuildable `SearchIndex`.

pub mod cache;
pub mod index;
pub mod query;
pub mod tokenize;
