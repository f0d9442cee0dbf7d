//! Note domain model shared by search and graph analytics.
//!
//! # Responsibility
//! - Define the canonical, fully-populated note record consumed by core.
//! - Own the normalization boundary from loosely-shaped input to `Note`.
//!
//! # Invariants
//! - Every `Note` carries non-null fields; absent input becomes empty values.
//! - Tags are lowercase, `#`-prefixed and deduplicated.

pub mod note;
