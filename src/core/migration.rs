use super::types::{MigrationType, RiskLevel};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

lazy_static! {
    static ref NON_SLUG: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Reduce a human-readable migration name to the id-safe slug that
/// forms the second half of the migration id.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    NON_SLUG
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// A single named, typed unit of change.
///
/// Immutable once created and never deleted; the registry keeps every
/// definition as a historical record. The executable units are not
/// part of the document; they are registered separately against the
/// id (see [`crate::unit::HandlerSet`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationDefinition {
    /// Creation-ordered, lexicographically sortable id:
    /// `{timestamp}_{slug}`.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub migration_type: MigrationType,
    pub description: String,
    /// Ids of migrations that must be applied before this one.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    pub rollbackable: bool,
    pub estimated_duration_secs: u64,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

/// Options accepted by [`crate::registry::MigrationRegistry::create`].
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub dependencies: BTreeSet<String>,
    pub rollbackable: bool,
    /// Falls back to [`MigrationType::default_duration_secs`] when unset.
    pub estimated_duration_secs: Option<u64>,
    pub risk_level: RiskLevel,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            dependencies: BTreeSet::new(),
            rollbackable: true,
            estimated_duration_secs: None,
            risk_level: RiskLevel::Low,
        }
    }
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency on a previously created migration.
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.insert(id.into());
        self
    }

    pub fn rollbackable(mut self, rollbackable: bool) -> Self {
        self.rollbackable = rollbackable;
        self
    }

    pub fn estimated_duration_secs(mut self, secs: u64) -> Self {
        self.estimated_duration_secs = Some(secs);
        self
    }

    pub fn risk_level(mut self, level: RiskLevel) -> Self {
        self.risk_level = level;
        self
    }
}
