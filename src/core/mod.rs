pub mod error;
pub mod migration;
pub mod types;

pub use error::{MigrateError, Result};
pub use migration::{CreateOptions, MigrationDefinition, slugify};
pub use types::{MigrationState, MigrationType, RiskLevel};
