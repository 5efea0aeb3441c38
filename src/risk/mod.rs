//! Risk scoring for migration plans.

use crate::core::types::RiskLevel;
use crate::core::MigrationDefinition;

/// Total estimated duration above which a plan earns a duration
/// concern, in seconds.
const LONG_DURATION_THRESHOLD_SECS: u64 = 300;

/// Aggregate rating plus the individual concerns behind it.
#[derive(Debug, Clone)]
pub struct RiskAssessment {
    pub overall: RiskLevel,
    pub concerns: Vec<String>,
}

/// Scores an ordered plan and narrates its rollback options.
#[derive(Debug, Default)]
pub struct RiskAssessor;

impl RiskAssessor {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, migrations: &[MigrationDefinition]) -> RiskAssessment {
        let high = migrations
            .iter()
            .filter(|m| m.risk_level == RiskLevel::High)
            .count();
        let medium = migrations
            .iter()
            .filter(|m| m.risk_level == RiskLevel::Medium)
            .count();
        let non_rollbackable = migrations.iter().filter(|m| !m.rollbackable).count();
        let total_secs: u64 = migrations.iter().map(|m| m.estimated_duration_secs).sum();

        // More than two medium-risk migrations in one batch escalate
        // the whole plan.
        let overall = if high > 0 {
            RiskLevel::High
        } else if medium > 2 {
            RiskLevel::High
        } else if medium > 0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        let mut concerns = Vec::new();
        if high > 0 {
            concerns.push(format!("{} high-risk migration(s)", high));
        }
        if medium > 0 {
            concerns.push(format!("{} medium-risk migration(s)", medium));
        }
        if non_rollbackable > 0 {
            concerns.push(format!("{} non-rollbackable migration(s)", non_rollbackable));
        }
        if total_secs > LONG_DURATION_THRESHOLD_SECS {
            concerns.push(format!(
                "long estimated duration: {}m",
                total_secs.div_ceil(60)
            ));
        }

        RiskAssessment { overall, concerns }
    }

    /// Human-readable narrative of how the plan can be undone.
    pub fn rollback_strategy(&self, migrations: &[MigrationDefinition]) -> String {
        if migrations.is_empty() {
            return "Nothing to execute; no rollback needed.".to_string();
        }

        let auto: Vec<&str> = migrations
            .iter()
            .filter(|m| m.rollbackable)
            .map(|m| m.id.as_str())
            .collect();
        let manual: Vec<&str> = migrations
            .iter()
            .filter(|m| !m.rollbackable)
            .map(|m| m.id.as_str())
            .collect();

        let mut lines =
            vec!["A backup snapshot is taken before any migration runs.".to_string()];
        if !auto.is_empty() {
            lines.push(format!("Automatic rollback available for: {}.", auto.join(", ")));
        }
        if !manual.is_empty() {
            lines.push(format!(
                "Manual rollback required for: {} (restore from the backup or intervene by hand).",
                manual.join(", ")
            ));
        }
        lines.join(" ")
    }
}
