use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Migration '{0}' already exists")]
    DuplicateMigration(String),

    #[error("Circular dependency among migrations: {}", .0.join(", "))]
    CircularDependency(Vec<String>),

    #[error("Migration '{migration}' depends on '{dependency}', which is neither pending nor applied")]
    MissingDependency { migration: String, dependency: String },

    #[error("Migration '{0}' not found in registry")]
    UnknownMigration(String),

    #[error("Migration '{migration}' failed: {message}")]
    Execution { migration: String, message: String },

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, MigrateError>;
