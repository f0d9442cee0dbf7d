//! Tunables for the search index and graph analytics engine.
//!
//! # Responsibility
//! - Hold the scoring/cache/threshold knobs with defaults matching the
//!   established behavior.
//! - Load overrides from JSON supplied by the host application.
//!
//! # Invariants
//! - Every field has a default; partial JSON documents are accepted.
//! - `validate()` must pass before a config reaches core components.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Configuration error for invalid or unparseable settings.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid { field: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::Invalid { field, message } => write!(f, "invalid config `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Search index settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Maximum cached token bags keyed by `(id, updated_at)`.
    pub cache_capacity: usize,
    /// Notes updated within this many days get the recency boost.
    pub recency_window_days: i64,
    pub recency_boost: f64,
    /// Per-outgoing-link multiplier increment.
    pub link_boost: f64,
    /// Per-backlink multiplier increment.
    pub backlink_boost: f64,
    /// Limit applied when callers pass `0`.
    pub default_limit: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 500,
            recency_window_days: 7,
            recency_boost: 1.2,
            link_boost: 0.1,
            backlink_boost: 0.15,
            default_limit: 20,
        }
    }
}

/// Graph analytics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Hubs need strictly more outgoing links than this.
    pub hub_min_degree: usize,
    /// Authorities need strictly more backlinks than this.
    pub authority_min_backlinks: usize,
    /// Length cap for hub and authority lists.
    pub top_k: usize,
    /// Upper bound on label propagation passes.
    pub max_label_passes: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            hub_min_degree: 3,
            authority_min_backlinks: 2,
            top_k: 10,
            max_label_passes: 100,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotegraphConfig {
    pub index: IndexConfig,
    pub analytics: AnalyticsConfig,
}

impl NotegraphConfig {
    /// Parses and validates a JSON config document.
    ///
    /// # Errors
    /// - Returns `ConfigError::Parse` for malformed JSON.
    /// - Returns `ConfigError::Invalid` when a value violates constraints.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index.cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "index.cache_capacity",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.index.default_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "index.default_limit",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.index.recency_window_days < 0 {
            return Err(ConfigError::Invalid {
                field: "index.recency_window_days",
                message: "must not be negative".to_string(),
            });
        }
        for (field, value) in [
            ("index.recency_boost", self.index.recency_boost),
            ("index.link_boost", self.index.link_boost),
            ("index.backlink_boost", self.index.backlink_boost),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("expected a finite non-negative number, got {value}"),
                });
            }
        }
        if self.analytics.max_label_passes == 0 {
            return Err(ConfigError::Invalid {
                field: "analytics.max_label_passes",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
