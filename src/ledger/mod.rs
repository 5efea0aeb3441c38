//! Applied-migration ledger: the sole source of truth for pending vs done.

use crate::core::{MigrateError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// One applied migration, 1:1 with a definition by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedMigrationRecord {
    pub migration_id: String,
    pub applied_at: DateTime<Utc>,
    /// Stamped on the record handed back when a rollback removes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolled_back_at: Option<DateTime<Utc>>,
}

impl AppliedMigrationRecord {
    pub fn new(migration_id: impl Into<String>) -> Self {
        Self {
            migration_id: migration_id.into(),
            applied_at: Utc::now(),
            rolled_back_at: None,
        }
    }
}

/// Ordered collection of applied-migration records.
///
/// The engine is the only writer; it appends or removes one record per
/// migration and flushes after every mutation. The trait exists so the
/// storage backend can change without touching the execution engine.
pub trait Ledger: Send {
    fn records(&self) -> &[AppliedMigrationRecord];

    fn get(&self, migration_id: &str) -> Option<&AppliedMigrationRecord> {
        self.records()
            .iter()
            .find(|r| r.migration_id == migration_id)
    }

    fn contains(&self, migration_id: &str) -> bool {
        self.get(migration_id).is_some()
    }

    fn append(&mut self, record: AppliedMigrationRecord);

    /// Remove and return the record for `migration_id`, if present.
    fn remove(&mut self, migration_id: &str) -> Option<AppliedMigrationRecord>;

    /// Persist the current state. In-memory backends may no-op.
    fn flush(&mut self) -> Result<()>;
}

// ============================================================================
// JSON file-backed ledger
// ============================================================================

/// File-backed ledger: one ordered JSON document, rewritten atomically
/// on every flush.
pub struct JsonLedger {
    path: PathBuf,
    records: Vec<AppliedMigrationRecord>,
}

impl JsonLedger {
    /// Open the ledger at `path`, creating an empty one if the file
    /// does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let file = File::open(&path)
                .map_err(|e| MigrateError::Ledger(format!("Failed to open ledger: {}", e)))?;
            serde_json::from_reader(BufReader::new(file))
                .map_err(|e| MigrateError::Ledger(format!("Failed to parse ledger: {}", e)))?
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), records = records.len(), "ledger opened");
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Ledger for JsonLedger {
    fn records(&self) -> &[AppliedMigrationRecord] {
        &self.records
    }

    fn append(&mut self, record: AppliedMigrationRecord) {
        self.records.push(record);
    }

    fn remove(&mut self, migration_id: &str) -> Option<AppliedMigrationRecord> {
        let idx = self
            .records
            .iter()
            .position(|r| r.migration_id == migration_id)?;
        Some(self.records.remove(idx))
    }

    fn flush(&mut self) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)
            .map_err(|e| MigrateError::Ledger(format!("Failed to create ledger directory: {}", e)))?;

        // Write-then-rename so a crash mid-flush never leaves a
        // truncated ledger behind.
        let mut tmp = NamedTempFile::new_in(&parent)
            .map_err(|e| MigrateError::Ledger(format!("Failed to create temp ledger: {}", e)))?;
        serde_json::to_writer_pretty(&mut tmp, &self.records)
            .map_err(|e| MigrateError::Ledger(format!("Failed to serialize ledger: {}", e)))?;
        tmp.flush()
            .map_err(|e| MigrateError::Ledger(format!("Failed to flush ledger: {}", e)))?;
        tmp.persist(&self.path)
            .map_err(|e| MigrateError::Ledger(format!("Failed to persist ledger: {}", e)))?;
        debug!(path = %self.path.display(), records = self.records.len(), "ledger flushed");
        Ok(())
    }
}

// ============================================================================
// In-memory ledger
// ============================================================================

/// Purely in-memory ledger for tests and embedded callers that manage
/// durability themselves.
#[derive(Default)]
pub struct MemoryLedger {
    records: Vec<AppliedMigrationRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for MemoryLedger {
    fn records(&self) -> &[AppliedMigrationRecord] {
        &self.records
    }

    fn append(&mut self, record: AppliedMigrationRecord) {
        self.records.push(record);
    }

    fn remove(&mut self, migration_id: &str) -> Option<AppliedMigrationRecord> {
        let idx = self
            .records
            .iter()
            .position(|r| r.migration_id == migration_id)?;
        Some(self.records.remove(idx))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
