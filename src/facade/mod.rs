//! High-level entry point wiring every component together.

use crate::backup::BackupCoordinator;
use crate::config::MigratorConfig;
use crate::core::{CreateOptions, MigrateError, MigrationDefinition, MigrationType, Result};
use crate::engine::{ApplyReport, ExecutionEngine, MigrationPlan, RollbackReport};
use crate::ledger::{JsonLedger, Ledger};
use crate::registry::MigrationRegistry;
use crate::resolver::DependencyResolver;
use crate::risk::RiskAssessor;
use crate::unit::HandlerSet;

/// Migration orchestrator facade.
///
/// This is the recommended way to use rustmigrate in applications:
/// open a [`Migrator`] from a [`MigratorConfig`], register handlers
/// for your migrations, then plan, apply, or roll back.
///
/// # Examples
///
/// ```no_run
/// use rustmigrate::{CreateOptions, HandlerSet, MigrationType, Migrator, MigratorConfig};
///
/// # fn main() -> rustmigrate::Result<()> {
/// let mut migrator = Migrator::open(MigratorConfig::new("migrations"))?;
///
/// let id = migrator.create(
///     "add users table",
///     MigrationType::Database,
///     "creates the users table",
///     CreateOptions::default(),
/// )?;
///
/// migrator.register_handlers(
///     &id,
///     HandlerSet::new(|| {
///         // forward: perform the change
///         Ok(())
///     })
///     .with_backward(|| {
///         // backward: undo it
///         Ok(())
///     }),
/// )?;
///
/// let report = migrator.apply(None, false)?;
/// assert!(report.succeeded());
/// # Ok(())
/// # }
/// ```
pub struct Migrator {
    engine: ExecutionEngine,
    config: MigratorConfig,
}

impl Migrator {
    /// Open an orchestrator for the environment described by `config`.
    ///
    /// Loads every definition document from the registry directory and
    /// the ledger from disk; both are created empty when absent.
    pub fn open(config: MigratorConfig) -> Result<Self> {
        config.validate().map_err(MigrateError::Storage)?;
        let ledger = JsonLedger::open(&config.ledger_path)?;
        Self::with_ledger(config, Box::new(ledger))
    }

    /// Open with a caller-supplied ledger backend.
    pub fn with_ledger(config: MigratorConfig, ledger: Box<dyn Ledger>) -> Result<Self> {
        let registry = MigrationRegistry::open(&config.registry_dir)?;
        let backup =
            BackupCoordinator::new(&config.backups_root, config.backup_artifacts.clone());
        let engine = ExecutionEngine::new(
            registry,
            ledger,
            DependencyResolver::new(),
            RiskAssessor::new(),
            backup,
        );
        Ok(Self { engine, config })
    }

    /// Create a new migration definition. Returns its id.
    pub fn create(
        &mut self,
        name: &str,
        migration_type: MigrationType,
        description: &str,
        options: CreateOptions,
    ) -> Result<String> {
        self.engine
            .registry_mut()
            .create(name, migration_type, description, options)
    }

    /// Register real forward/backward/validate logic for a migration.
    pub fn register_handlers(&mut self, id: &str, handlers: HandlerSet) -> Result<()> {
        self.engine.registry_mut().register_handlers(id, handlers)
    }

    /// All known definitions in creation order.
    pub fn list(&self) -> Vec<&MigrationDefinition> {
        self.engine.registry().list()
    }

    /// Definitions not yet applied, in creation order.
    pub fn pending(&self) -> Vec<MigrationDefinition> {
        self.engine.registry().get_pending(self.engine.ledger())
    }

    /// Compute the plan (order, risk, rollback strategy) without side
    /// effects.
    pub fn plan(&self, ids: Option<&[String]>) -> Result<MigrationPlan> {
        self.engine.plan(ids)
    }

    /// Apply pending migrations. See
    /// [`ExecutionEngine::apply_batch`].
    pub fn apply(&mut self, ids: Option<&[String]>, dry_run: bool) -> Result<ApplyReport> {
        self.engine.apply_batch(ids, dry_run)
    }

    /// Roll back the `count` most recently applied migrations. See
    /// [`ExecutionEngine::rollback_batch`].
    pub fn rollback(&mut self, count: usize) -> Result<RollbackReport> {
        self.engine.rollback_batch(count)
    }

    /// Read-only view of the applied-migration ledger.
    pub fn ledger(&self) -> &dyn Ledger {
        self.engine.ledger()
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }
}
