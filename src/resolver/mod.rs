//! Deterministic dependency ordering for migration sets.

use crate::core::{MigrateError, MigrationDefinition, Result};
use crate::ledger::Ledger;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Orders a set of pending migrations into a dependency-respecting
/// sequence.
///
/// The order is deterministic: each round selects every migration
/// whose dependencies are already placed (or already applied per the
/// ledger), sorted by id, until the set is exhausted. A round that
/// places nothing while migrations remain is a cycle.
#[derive(Debug, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        migrations: &[MigrationDefinition],
        ledger: &dyn Ledger,
    ) -> Result<Vec<MigrationDefinition>> {
        let in_set: BTreeSet<&str> = migrations.iter().map(|m| m.id.as_str()).collect();

        // A dependency outside the set must already be applied,
        // otherwise the plan can never be valid.
        for migration in migrations {
            for dep in &migration.dependencies {
                if !in_set.contains(dep.as_str()) && !ledger.contains(dep) {
                    return Err(MigrateError::MissingDependency {
                        migration: migration.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut remaining: BTreeMap<&str, &MigrationDefinition> =
            migrations.iter().map(|m| (m.id.as_str(), m)).collect();
        let mut placed: BTreeSet<&str> = BTreeSet::new();
        let mut ordered = Vec::with_capacity(migrations.len());

        while !remaining.is_empty() {
            // BTreeMap iteration keeps each round id-sorted.
            let ready: Vec<&str> = remaining
                .values()
                .filter(|m| {
                    m.dependencies.iter().all(|dep| {
                        placed.contains(dep.as_str()) || !in_set.contains(dep.as_str())
                    })
                })
                .map(|m| m.id.as_str())
                .collect();

            if ready.is_empty() {
                let unresolved: Vec<String> =
                    remaining.keys().map(|id| id.to_string()).collect();
                return Err(MigrateError::CircularDependency(unresolved));
            }

            for id in ready {
                let migration = remaining.remove(id).unwrap();
                placed.insert(id);
                ordered.push(migration.clone());
            }
        }

        debug!(count = ordered.len(), "dependency order resolved");
        Ok(ordered)
    }
}
