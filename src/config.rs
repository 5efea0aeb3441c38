use std::path::{Path, PathBuf};

/// Filesystem layout and backup allow-list for one target environment.
///
/// All paths default to living under a single migrations root so a
/// project can adopt the orchestrator with zero configuration.
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Root directory for orchestrator-owned state.
    pub root: PathBuf,

    /// Directory of per-migration definition documents.
    pub registry_dir: PathBuf,

    /// The applied-migration ledger document.
    pub ledger_path: PathBuf,

    /// Where pre-batch backup snapshots are written.
    pub backups_root: PathBuf,

    /// Allow-list of mutable artifacts copied before every batch.
    pub backup_artifacts: Vec<PathBuf>,
}

impl MigratorConfig {
    /// Create a configuration rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            registry_dir: root.join("registry"),
            ledger_path: root.join("ledger.json"),
            backups_root: root.join("backups"),
            backup_artifacts: vec![
                PathBuf::from("data/store.json"),
                PathBuf::from("config"),
                PathBuf::from("settings.toml"),
            ],
            root,
        }
    }

    /// Override the registry directory.
    pub fn registry_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.registry_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Override the ledger document path.
    pub fn ledger_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.ledger_path = path.as_ref().to_path_buf();
        self
    }

    /// Override the backups root.
    pub fn backups_root<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.backups_root = dir.as_ref().to_path_buf();
        self
    }

    /// Replace the backup allow-list.
    pub fn backup_artifacts(mut self, artifacts: Vec<PathBuf>) -> Self {
        self.backup_artifacts = artifacts;
        self
    }

    /// Add one artifact to the backup allow-list.
    pub fn backup_artifact<P: AsRef<Path>>(mut self, artifact: P) -> Self {
        self.backup_artifacts.push(artifact.as_ref().to_path_buf());
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.root.as_os_str().is_empty() {
            return Err("root cannot be empty".to_string());
        }
        if self.registry_dir.as_os_str().is_empty() {
            return Err("registry_dir cannot be empty".to_string());
        }
        if self.ledger_path.as_os_str().is_empty() {
            return Err("ledger_path cannot be empty".to_string());
        }
        if self.backups_root.as_os_str().is_empty() {
            return Err("backups_root cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self::new("migrations")
    }
}
