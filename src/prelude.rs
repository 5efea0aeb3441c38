//! Recommended API entrypoints grouped by abstraction level.
//!
//! `dx` is the stable default for applications orchestrating their own
//! migrations. `advanced` is an explicit escape hatch for callers
//! assembling the machinery themselves.

pub mod dx {
    //! Stable high-level surface: the facade plus everything needed to
    //! define migrations and read reports.
    pub use crate::{
        CreateOptions, HandlerSet, MigrateError, MigrationDefinition, MigrationType, Migrator,
        MigratorConfig, Result, RiskLevel,
    };

    pub use crate::engine::{ApplyReport, BatchOutcome, MigrationPlan, RollbackReport};
}

pub mod advanced {
    //! Escape hatch for wiring components by hand.
    //!
    //! App-level product code should normally stay on `prelude::dx`.
    pub use crate::backup::{BackupCoordinator, BackupSnapshot, BackupWarning};
    pub use crate::engine::ExecutionEngine;
    pub use crate::ledger::{AppliedMigrationRecord, JsonLedger, Ledger, MemoryLedger};
    pub use crate::registry::MigrationRegistry;
    pub use crate::resolver::DependencyResolver;
    pub use crate::risk::{RiskAssessment, RiskAssessor};
    pub use crate::unit::{DefaultTemplates, ExecutableUnit, TemplateProvider};
}
