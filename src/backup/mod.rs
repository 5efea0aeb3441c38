//! Best-effort pre-batch snapshots of mutable artifacts.

use crate::core::{MigrateError, Result};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One artifact that could not be copied. Non-fatal: the snapshot and
/// the batch that requested it both proceed.
#[derive(Debug, Clone)]
pub struct BackupWarning {
    pub artifact: PathBuf,
    pub reason: String,
}

impl fmt::Display for BackupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backup of '{}' failed: {}", self.artifact.display(), self.reason)
    }
}

/// The result of one snapshot: where it lives and what made it in.
#[derive(Debug)]
pub struct BackupSnapshot {
    pub id: String,
    pub dir: PathBuf,
    pub copied: Vec<PathBuf>,
    pub warnings: Vec<BackupWarning>,
}

#[derive(Serialize)]
struct BackupManifest<'a> {
    id: &'a str,
    created_at: String,
    copied: Vec<String>,
    warnings: Vec<String>,
}

/// Copies a fixed allow-list of mutable artifacts into a timestamped
/// directory before a batch runs.
///
/// Restoration is an out-of-band operational procedure; no restore
/// operation is exposed here.
pub struct BackupCoordinator {
    backups_root: PathBuf,
    artifacts: Vec<PathBuf>,
}

impl BackupCoordinator {
    pub fn new<P: AsRef<Path>>(backups_root: P, artifacts: Vec<PathBuf>) -> Self {
        Self {
            backups_root: backups_root.as_ref().to_path_buf(),
            artifacts,
        }
    }

    pub fn backups_root(&self) -> &Path {
        &self.backups_root
    }

    /// Take a snapshot. Each artifact copy is independent: a failed
    /// copy becomes a [`BackupWarning`] and the rest still land.
    /// Only failing to create the snapshot directory itself is fatal.
    pub fn snapshot(&self) -> Result<BackupSnapshot> {
        let id = Utc::now().format("%Y%m%d%H%M%S%3f").to_string();
        let dir = self.backups_root.join(&id);
        fs::create_dir_all(&dir).map_err(|e| {
            MigrateError::Storage(format!("Failed to create backup directory: {}", e))
        })?;

        let mut copied = Vec::new();
        let mut warnings = Vec::new();
        for artifact in &self.artifacts {
            match self.copy_artifact(artifact, &dir) {
                Ok(dest) => copied.push(dest),
                Err(reason) => {
                    let warning = BackupWarning {
                        artifact: artifact.clone(),
                        reason,
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        self.write_manifest(&id, &dir, &copied, &mut warnings);
        info!(
            backup = %id,
            copied = copied.len(),
            warnings = warnings.len(),
            "backup snapshot taken"
        );
        Ok(BackupSnapshot { id, dir, copied, warnings })
    }

    fn copy_artifact(&self, artifact: &Path, dir: &Path) -> std::result::Result<PathBuf, String> {
        let name = artifact
            .file_name()
            .ok_or_else(|| "artifact path has no file name".to_string())?;
        let dest = dir.join(name);

        let meta = fs::metadata(artifact).map_err(|e| e.to_string())?;
        if meta.is_dir() {
            copy_dir_recursive(artifact, &dest).map_err(|e| e.to_string())?;
        } else {
            fs::copy(artifact, &dest).map_err(|e| e.to_string())?;
        }
        Ok(dest)
    }

    fn write_manifest(
        &self,
        id: &str,
        dir: &Path,
        copied: &[PathBuf],
        warnings: &mut Vec<BackupWarning>,
    ) {
        let manifest = BackupManifest {
            id,
            created_at: Utc::now().to_rfc3339(),
            copied: copied.iter().map(|p| p.display().to_string()).collect(),
            warnings: warnings.iter().map(|w| w.to_string()).collect(),
        };
        let path = dir.join("manifest.json");
        let result = serde_json::to_string_pretty(&manifest)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&path, json).map_err(|e| e.to_string()));
        if let Err(reason) = result {
            let warning = BackupWarning { artifact: path, reason };
            warn!("{}", warning);
            warnings.push(warning);
        }
    }
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
