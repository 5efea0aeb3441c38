use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of change a migration performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationType {
    Database,
    Config,
    Code,
    Data,
}

impl MigrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationType::Database => "database",
            MigrationType::Config => "config",
            MigrationType::Code => "code",
            MigrationType::Data => "data",
        }
    }

    /// Default estimated duration used when a migration is created
    /// without an explicit estimate.
    pub fn default_duration_secs(&self) -> u64 {
        match self {
            MigrationType::Database => 120,
            MigrationType::Config => 30,
            MigrationType::Code => 60,
            MigrationType::Data => 300,
        }
    }
}

impl fmt::Display for MigrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MigrationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "database" | "db" => Ok(MigrationType::Database),
            "config" => Ok(MigrationType::Config),
            "code" => Ok(MigrationType::Code),
            "data" => Ok(MigrationType::Data),
            other => Err(format!(
                "Unknown migration type '{}' (expected database, config, code or data)",
                other
            )),
        }
    }
}

/// Risk rating of a single migration or a whole plan.
///
/// Ordered: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(format!(
                "Unknown risk level '{}' (expected low, medium or high)",
                other
            )),
        }
    }
}

/// Per-migration state within a single batch.
///
/// Apply path: `Pending -> Applying -> Applied | Failed`.
/// Rollback path: `Applied -> RollingBack -> RolledBack | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Pending,
    Applying,
    Applied,
    Failed,
    RollingBack,
    RolledBack,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationState::Pending => "pending",
            MigrationState::Applying => "applying",
            MigrationState::Applied => "applied",
            MigrationState::Failed => "failed",
            MigrationState::RollingBack => "rolling-back",
            MigrationState::RolledBack => "rolled-back",
        };
        write!(f, "{}", s)
    }
}
