//! Migration registry: definition documents plus their executable units.

use crate::core::{CreateOptions, MigrateError, MigrationDefinition, MigrationType, Result, slugify};
use crate::ledger::Ledger;
use crate::unit::{DefaultTemplates, HandlerSet, TemplateProvider};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Stores and creates migration definitions.
///
/// Definitions are kept as one JSON document per migration id under
/// the registry directory and indexed in memory in id (creation)
/// order. Executable units never touch the disk; they are registered
/// in memory against the id.
pub struct MigrationRegistry {
    dir: PathBuf,
    definitions: BTreeMap<String, MigrationDefinition>,
    handlers: HashMap<String, HandlerSet>,
    templates: Box<dyn TemplateProvider>,
}

impl MigrationRegistry {
    /// Open the registry at `dir` with the default unit templates,
    /// loading every definition document found there.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::with_templates(dir, Box::new(DefaultTemplates))
    }

    pub fn with_templates<P: AsRef<Path>>(
        dir: P,
        templates: Box<dyn TemplateProvider>,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            MigrateError::Storage(format!("Failed to create registry directory: {}", e))
        })?;

        let mut definitions = BTreeMap::new();
        let entries = fs::read_dir(&dir)
            .map_err(|e| MigrateError::Storage(format!("Failed to read registry directory: {}", e)))?;
        for entry in entries {
            let entry = entry
                .map_err(|e| MigrateError::Storage(format!("Failed to read registry entry: {}", e)))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_str::<MigrationDefinition>(&raw).map_err(|e| e.to_string()))
            {
                Ok(def) => {
                    definitions.insert(def.id.clone(), def);
                }
                Err(e) => {
                    warn!(path = %path.display(), "Skipping unreadable definition document: {}", e);
                }
            }
        }

        let mut registry = Self {
            dir,
            definitions,
            handlers: HashMap::new(),
            templates,
        };
        // Loaded definitions start with template units too; real
        // handlers arrive via register_handlers.
        let seeded: Vec<(String, HandlerSet)> = registry
            .definitions
            .values()
            .map(|def| (def.id.clone(), registry.seed_handlers(def)))
            .collect();
        registry.handlers.extend(seeded);
        debug!(count = registry.definitions.len(), "registry opened");
        Ok(registry)
    }

    /// Create a new migration definition and persist it.
    ///
    /// The id is `{creation timestamp}_{slug(name)}`; a collision
    /// aborts with `DuplicateMigration` and nothing is written.
    pub fn create(
        &mut self,
        name: &str,
        migration_type: MigrationType,
        description: &str,
        options: CreateOptions,
    ) -> Result<String> {
        let created_at = Utc::now();
        let id = format!("{}_{}", created_at.format("%Y%m%d%H%M%S%3f"), slugify(name));
        if self.definitions.contains_key(&id) {
            return Err(MigrateError::DuplicateMigration(id));
        }

        let definition = MigrationDefinition {
            id: id.clone(),
            name: name.to_string(),
            migration_type,
            description: description.to_string(),
            dependencies: options.dependencies,
            rollbackable: options.rollbackable,
            estimated_duration_secs: options
                .estimated_duration_secs
                .unwrap_or_else(|| migration_type.default_duration_secs()),
            risk_level: options.risk_level,
            created_at,
        };

        self.persist(&definition)?;
        let handlers = self.seed_handlers(&definition);
        self.handlers.insert(id.clone(), handlers);
        self.definitions.insert(id.clone(), definition);
        debug!(migration = %id, "migration created");
        Ok(id)
    }

    /// All definitions in id (creation) order.
    pub fn list(&self) -> Vec<&MigrationDefinition> {
        self.definitions.values().collect()
    }

    pub fn get(&self, id: &str) -> Option<&MigrationDefinition> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Definitions with no record in `ledger`, in id order.
    pub fn get_pending(&self, ledger: &dyn Ledger) -> Vec<MigrationDefinition> {
        self.definitions
            .values()
            .filter(|def| !ledger.contains(&def.id))
            .cloned()
            .collect()
    }

    /// Replace the units registered for `id` with real migration logic.
    ///
    /// A non-rollbackable definition never keeps a backward unit,
    /// whatever the caller supplies.
    pub fn register_handlers(&mut self, id: &str, mut handlers: HandlerSet) -> Result<()> {
        let definition = self
            .definitions
            .get(id)
            .ok_or_else(|| MigrateError::UnknownMigration(id.to_string()))?;
        if !definition.rollbackable {
            handlers.backward = None;
        }
        self.handlers.insert(id.to_string(), handlers);
        Ok(())
    }

    pub fn handlers(&self, id: &str) -> Option<&HandlerSet> {
        self.handlers.get(id)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn seed_handlers(&self, definition: &MigrationDefinition) -> HandlerSet {
        let mut handlers = self.templates.seed(definition);
        if !definition.rollbackable {
            handlers.backward = None;
        }
        handlers
    }

    fn persist(&self, definition: &MigrationDefinition) -> Result<()> {
        let path = self.dir.join(format!("{}.json", definition.id));
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| MigrateError::Storage(format!("Failed to create temp definition: {}", e)))?;
        serde_json::to_writer_pretty(&mut tmp, definition)
            .map_err(|e| MigrateError::Storage(format!("Failed to serialize definition: {}", e)))?;
        tmp.flush()
            .map_err(|e| MigrateError::Storage(format!("Failed to flush definition: {}", e)))?;
        tmp.persist(&path)
            .map_err(|e| MigrateError::Storage(format!("Failed to persist definition: {}", e)))?;
        Ok(())
    }
}
