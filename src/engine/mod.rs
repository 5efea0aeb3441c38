//! Sequential apply/rollback execution over a resolved plan.

use crate::backup::{BackupCoordinator, BackupSnapshot};
use crate::core::types::MigrationState;
use crate::core::{MigrateError, MigrationDefinition, Result};
use crate::ledger::{AppliedMigrationRecord, Ledger};
use crate::registry::MigrationRegistry;
use crate::resolver::DependencyResolver;
use crate::risk::{RiskAssessment, RiskAssessor};
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{error, info, warn};
use uuid::Uuid;

// ============================================================================
// Plan and reports
// ============================================================================

/// A deterministically ordered subset of pending migrations computed
/// for one invocation. Never persisted; recomputed per call.
#[derive(Debug)]
pub struct MigrationPlan {
    pub batch_id: Uuid,
    pub migrations: Vec<MigrationDefinition>,
    pub total_estimated_duration_secs: u64,
    pub risk: RiskAssessment,
    pub rollback_strategy: String,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.migrations.iter().map(|m| m.id.as_str()).collect()
    }
}

/// How a whole batch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed,
    DryRun,
    Aborted { migration_id: String, error: String },
}

/// What happened to one migration within a batch.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub migration_id: String,
    pub state: MigrationState,
    pub detail: Option<String>,
}

impl StepOutcome {
    fn new(migration_id: &str, state: MigrationState) -> Self {
        Self {
            migration_id: migration_id.to_string(),
            state,
            detail: None,
        }
    }

    fn with_detail(migration_id: &str, state: MigrationState, detail: impl Into<String>) -> Self {
        Self {
            migration_id: migration_id.to_string(),
            state,
            detail: Some(detail.into()),
        }
    }
}

/// Result of [`ExecutionEngine::apply_batch`]. The plan (with risk and
/// rollback strategy) is always present, dry run or not.
#[derive(Debug)]
pub struct ApplyReport {
    pub plan: MigrationPlan,
    pub backup: Option<BackupSnapshot>,
    pub steps: Vec<StepOutcome>,
    pub outcome: BatchOutcome,
}

impl ApplyReport {
    pub fn succeeded(&self) -> bool {
        !matches!(self.outcome, BatchOutcome::Aborted { .. })
    }

    /// Ids applied (and recorded in the ledger) by this batch, in order.
    pub fn applied_ids(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.state == MigrationState::Applied)
            .map(|s| s.migration_id.as_str())
            .collect()
    }
}

/// Result of [`ExecutionEngine::rollback_batch`].
#[derive(Debug)]
pub struct RollbackReport {
    pub batch_id: Uuid,
    pub steps: Vec<StepOutcome>,
    /// Ledger records removed by this batch, each stamped with its
    /// rollback time.
    pub removed: Vec<AppliedMigrationRecord>,
    pub outcome: BatchOutcome,
}

impl RollbackReport {
    pub fn succeeded(&self) -> bool {
        !matches!(self.outcome, BatchOutcome::Aborted { .. })
    }

    pub fn rolled_back_ids(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.state == MigrationState::RolledBack)
            .map(|s| s.migration_id.as_str())
            .collect()
    }
}

// ============================================================================
// Execution engine
// ============================================================================

/// Consumes plans and mutates the ledger, strictly sequentially.
///
/// Owns every collaborator explicitly (registry, ledger, resolver,
/// assessor, backup coordinator), so there is no hidden process-wide
/// state. The framework assumes at most one batch runs at a time per
/// target environment; callers racing on the same ledger need
/// external mutual exclusion.
pub struct ExecutionEngine {
    registry: MigrationRegistry,
    ledger: Box<dyn Ledger>,
    resolver: DependencyResolver,
    assessor: RiskAssessor,
    backup: BackupCoordinator,
}

impl ExecutionEngine {
    pub fn new(
        registry: MigrationRegistry,
        ledger: Box<dyn Ledger>,
        resolver: DependencyResolver,
        assessor: RiskAssessor,
        backup: BackupCoordinator,
    ) -> Self {
        Self {
            registry,
            ledger,
            resolver,
            assessor,
            backup,
        }
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MigrationRegistry {
        &mut self.registry
    }

    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    /// Compute the plan for the pending set (optionally restricted to
    /// `ids`) without any side effects.
    pub fn plan(&self, ids: Option<&[String]>) -> Result<MigrationPlan> {
        let mut pending = self.registry.get_pending(self.ledger.as_ref());
        if let Some(ids) = ids {
            for id in ids {
                if !self.registry.contains(id) {
                    return Err(MigrateError::UnknownMigration(id.clone()));
                }
            }
            let requested: BTreeSet<&str> = ids.iter().map(|s| s.as_str()).collect();
            pending.retain(|m| requested.contains(m.id.as_str()));
        }

        let migrations = self.resolver.resolve(&pending, self.ledger.as_ref())?;
        for migration in &migrations {
            tracing::debug!(migration = %migration.id, state = %MigrationState::Pending, "planned");
        }
        let total_estimated_duration_secs =
            migrations.iter().map(|m| m.estimated_duration_secs).sum();
        let risk = self.assessor.assess(&migrations);
        let rollback_strategy = self.assessor.rollback_strategy(&migrations);

        Ok(MigrationPlan {
            batch_id: Uuid::new_v4(),
            migrations,
            total_estimated_duration_secs,
            risk,
            rollback_strategy,
        })
    }

    /// Apply the pending set (optionally restricted to `ids`).
    ///
    /// Planning failures return `Err` before anything is mutated. Once
    /// execution starts, the batch stops at the first failing
    /// migration: its own backward unit is attempted (best effort,
    /// when rollbackable), the remaining plan is abandoned, and the
    /// report's `Aborted` outcome names the failure. Migrations that
    /// already made it into the ledger stay applied.
    pub fn apply_batch(&mut self, ids: Option<&[String]>, dry_run: bool) -> Result<ApplyReport> {
        let plan = self.plan(ids)?;
        info!(
            batch = %plan.batch_id,
            migrations = plan.migrations.len(),
            risk = %plan.risk.overall,
            dry_run,
            "batch planned"
        );

        if dry_run {
            return Ok(ApplyReport {
                plan,
                backup: None,
                steps: Vec::new(),
                outcome: BatchOutcome::DryRun,
            });
        }

        // All requested migrations already applied: nothing to invoke.
        if plan.is_empty() {
            return Ok(ApplyReport {
                plan,
                backup: None,
                steps: Vec::new(),
                outcome: BatchOutcome::Completed,
            });
        }

        let backup = self.backup.snapshot()?;

        let mut steps: Vec<StepOutcome> = Vec::with_capacity(plan.migrations.len());
        let mut failure: Option<(String, String)> = None;
        for migration in &plan.migrations {
            info!(
                batch = %plan.batch_id,
                migration = %migration.id,
                state = %MigrationState::Applying,
                "applying"
            );
            match self.apply_one(migration) {
                Ok(()) => {
                    self.ledger.append(AppliedMigrationRecord::new(&migration.id));
                    self.ledger.flush()?;
                    info!(batch = %plan.batch_id, migration = %migration.id, "applied");
                    steps.push(StepOutcome::new(&migration.id, MigrationState::Applied));
                }
                Err(err) => {
                    error!(
                        batch = %plan.batch_id,
                        migration = %migration.id,
                        "apply failed: {}",
                        err
                    );
                    self.undo_failed_apply(migration);
                    steps.push(StepOutcome::with_detail(
                        &migration.id,
                        MigrationState::Failed,
                        err.to_string(),
                    ));
                    failure = Some((migration.id.clone(), err.to_string()));
                    break;
                }
            }
        }

        let outcome = match failure {
            Some((migration_id, error)) => BatchOutcome::Aborted { migration_id, error },
            None => {
                info!(batch = %plan.batch_id, applied = steps.len(), "batch completed");
                BatchOutcome::Completed
            }
        };
        Ok(ApplyReport {
            plan,
            backup: Some(backup),
            steps,
            outcome,
        })
    }

    /// Roll back the `count` most recently applied migrations.
    ///
    /// Non-rollbackable entries are skipped with a warning and kept in
    /// the ledger; a failing backward unit aborts the remaining
    /// rollbacks and leaves every not-yet-processed entry untouched.
    pub fn rollback_batch(&mut self, count: usize) -> Result<RollbackReport> {
        let batch_id = Uuid::new_v4();

        let mut recent: Vec<(usize, AppliedMigrationRecord)> = self
            .ledger
            .records()
            .iter()
            .cloned()
            .enumerate()
            .collect();
        recent.sort_by(|(ai, a), (bi, b)| {
            (b.applied_at, bi).cmp(&(a.applied_at, ai))
        });
        recent.truncate(count);

        info!(batch = %batch_id, candidates = recent.len(), "rollback batch planned");

        let mut steps: Vec<StepOutcome> = Vec::with_capacity(recent.len());
        let mut removed_records: Vec<AppliedMigrationRecord> = Vec::new();
        for (_, record) in recent {
            let id = record.migration_id.as_str();
            let backward = match self.registry.get(id) {
                None => {
                    warn!(batch = %batch_id, migration = %id, "no definition for ledger entry, skipping rollback");
                    steps.push(StepOutcome::with_detail(
                        id,
                        MigrationState::Applied,
                        "skipped: definition not found",
                    ));
                    continue;
                }
                Some(def) if !def.rollbackable => {
                    warn!(batch = %batch_id, migration = %id, "not rollbackable, skipping");
                    steps.push(StepOutcome::with_detail(
                        id,
                        MigrationState::Applied,
                        "skipped: not rollbackable",
                    ));
                    continue;
                }
                Some(_) => match self.registry.handlers(id).and_then(|h| h.backward.clone()) {
                    None => {
                        warn!(batch = %batch_id, migration = %id, "no backward unit registered, skipping");
                        steps.push(StepOutcome::with_detail(
                            id,
                            MigrationState::Applied,
                            "skipped: no backward unit registered",
                        ));
                        continue;
                    }
                    Some(backward) => backward,
                },
            };

            info!(
                batch = %batch_id,
                migration = %id,
                state = %MigrationState::RollingBack,
                "rolling back"
            );
            match backward.execute() {
                Ok(()) => {
                    if let Some(mut removed) = self.ledger.remove(id) {
                        removed.rolled_back_at = Some(Utc::now());
                        info!(
                            batch = %batch_id,
                            migration = %removed.migration_id,
                            applied_at = %removed.applied_at,
                            "rolled back"
                        );
                        removed_records.push(removed);
                    }
                    self.ledger.flush()?;
                    steps.push(StepOutcome::new(id, MigrationState::RolledBack));
                }
                Err(err) => {
                    error!(batch = %batch_id, migration = %id, "rollback failed: {}", err);
                    steps.push(StepOutcome::with_detail(
                        id,
                        MigrationState::Failed,
                        err.to_string(),
                    ));
                    return Ok(RollbackReport {
                        batch_id,
                        steps,
                        removed: removed_records,
                        outcome: BatchOutcome::Aborted {
                            migration_id: id.to_string(),
                            error: err.to_string(),
                        },
                    });
                }
            }
        }

        Ok(RollbackReport {
            batch_id,
            steps,
            removed: removed_records,
            outcome: BatchOutcome::Completed,
        })
    }

    /// Run forward then validate for one migration. A validation
    /// failure is indistinguishable from an execution failure.
    fn apply_one(&self, migration: &MigrationDefinition) -> Result<()> {
        let handlers = self.registry.handlers(&migration.id).ok_or_else(|| {
            MigrateError::Execution {
                migration: migration.id.clone(),
                message: "no handlers registered".to_string(),
            }
        })?;

        handlers.forward.execute().map_err(|e| MigrateError::Execution {
            migration: migration.id.clone(),
            message: e.to_string(),
        })?;

        if let Some(validate) = &handlers.validate {
            validate.execute().map_err(|e| MigrateError::Execution {
                migration: migration.id.clone(),
                message: format!("validation failed: {}", e),
            })?;
        }
        Ok(())
    }

    /// Best-effort undo of a migration whose forward/validate just
    /// failed. The outcome is logged and never changes the abort.
    fn undo_failed_apply(&self, migration: &MigrationDefinition) {
        if !migration.rollbackable {
            warn!(migration = %migration.id, "failed migration is not rollbackable, leaving partial effects");
            return;
        }
        let Some(backward) = self
            .registry
            .handlers(&migration.id)
            .and_then(|h| h.backward.clone())
        else {
            warn!(migration = %migration.id, "no backward unit registered for failed migration");
            return;
        };
        match backward.execute() {
            Ok(()) => info!(migration = %migration.id, "partial effects rolled back"),
            Err(err) => {
                warn!(migration = %migration.id, "undo of failed migration also failed: {}", err)
            }
        }
    }
}
