//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, index and analytics calls into use-case level APIs.
//! - Keep CLI layers decoupled from storage details.

pub mod workspace_service;
