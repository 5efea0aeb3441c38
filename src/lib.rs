// ============================================================================
// RustMigrate Library
// ============================================================================

//! Dependency-aware migration orchestrator.
//!
//! Ordered units of change (database, config, code or data mutations)
//! are registered with forward/backward/validate logic, planned with a
//! deterministic dependency resolution, risk-assessed, backed up
//! against, and applied or rolled back strictly sequentially with
//! partial-failure recovery. The applied-migration ledger on disk is
//! the sole source of truth for pending vs done.

pub mod backup;
pub mod config;
pub mod core;
pub mod engine;
pub mod facade;
pub mod ledger;
pub mod prelude;
pub mod registry;
pub mod resolver;
pub mod risk;
pub mod unit;

// Re-export main types for convenience
pub use config::MigratorConfig;
pub use facade::Migrator;
pub use self::core::{
    CreateOptions, MigrateError, MigrationDefinition, MigrationState, MigrationType, Result,
    RiskLevel,
};
pub use unit::{ExecutableUnit, HandlerSet};
