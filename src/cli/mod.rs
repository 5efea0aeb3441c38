//! Command-line surface over the [`Migrator`] facade.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rustmigrate::engine::{BatchOutcome, MigrationPlan};
use rustmigrate::{CreateOptions, MigrationType, Migrator, MigratorConfig, RiskLevel};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rustmigrate")]
#[command(about = "Dependency-aware migration orchestrator with risk assessment and rollback")]
struct Cli {
    /// Migrations root directory
    #[arg(long, global = true, default_value = "migrations")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new migration definition
    Create {
        name: String,
        /// database, config, code or data
        #[arg(value_name = "TYPE")]
        migration_type: String,
        description: String,
        /// Id of a migration this one depends on (repeatable)
        #[arg(long = "depends-on", value_name = "ID")]
        depends_on: Vec<String>,
        /// Mark the migration as non-rollbackable
        #[arg(long)]
        no_rollback: bool,
        /// Estimated duration in seconds
        #[arg(long)]
        duration: Option<u64>,
        /// low, medium or high
        #[arg(long)]
        risk: Option<String>,
    },
    /// List pending migrations
    Status,
    /// Show the execution plan and risk without executing
    Plan {
        /// Restrict the plan to these migration ids
        ids: Vec<String>,
    },
    /// Apply pending migrations
    Apply {
        /// Restrict the batch to these migration ids
        ids: Vec<String>,
        /// Plan and assess only; mutate nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Roll back the most recently applied migrations
    Rollback {
        #[arg(default_value_t = 1)]
        count: usize,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = MigratorConfig::new(&cli.root);
    let mut migrator = Migrator::open(config).context("failed to open migrations root")?;

    match cli.command {
        Command::Create {
            name,
            migration_type,
            description,
            depends_on,
            no_rollback,
            duration,
            risk,
        } => {
            let migration_type: MigrationType =
                migration_type.parse().map_err(|e: String| anyhow!(e))?;
            let mut options = CreateOptions::new().rollbackable(!no_rollback);
            for dep in depends_on {
                options = options.depends_on(dep);
            }
            if let Some(secs) = duration {
                options = options.estimated_duration_secs(secs);
            }
            if let Some(risk) = risk {
                let level: RiskLevel = risk.parse().map_err(|e: String| anyhow!(e))?;
                options = options.risk_level(level);
            }
            let id = migrator.create(&name, migration_type, &description, options)?;
            println!("Created migration {}", id);
        }

        Command::Status => {
            let pending = migrator.pending();
            if pending.is_empty() {
                println!("No pending migrations.");
            } else {
                println!("{} pending migration(s):", pending.len());
                for migration in pending {
                    println!(
                        "  {} [{}] {} (risk: {})",
                        migration.id,
                        migration.migration_type,
                        migration.name,
                        migration.risk_level
                    );
                }
            }
        }

        Command::Plan { ids } => {
            let plan = migrator.plan(as_filter(&ids))?;
            print_plan(&plan);
        }

        Command::Apply { ids, dry_run } => {
            // The plan, risk and rollback strategy always print before
            // anything mutates.
            let plan = migrator.plan(as_filter(&ids))?;
            print_plan(&plan);
            if plan.is_empty() {
                println!("Nothing to apply.");
                return Ok(());
            }

            let report = migrator.apply(as_filter(&ids), dry_run)?;
            if let BatchOutcome::DryRun = report.outcome {
                println!("Dry run: nothing was executed.");
                return Ok(());
            }

            if let Some(backup) = &report.backup {
                println!(
                    "Backup {} written to {} ({} warning(s))",
                    backup.id,
                    backup.dir.display(),
                    backup.warnings.len()
                );
            }
            for step in &report.steps {
                match &step.detail {
                    Some(detail) => println!("  {}: {} ({})", step.migration_id, step.state, detail),
                    None => println!("  {}: {}", step.migration_id, step.state),
                }
            }
            match &report.outcome {
                BatchOutcome::Aborted { migration_id, error } => {
                    println!(
                        "Batch aborted: {} of {} migration(s) applied.",
                        report.applied_ids().len(),
                        plan.migrations.len()
                    );
                    return Err(anyhow!("migration '{}' failed: {}", migration_id, error));
                }
                _ => println!("Applied {} migration(s).", report.applied_ids().len()),
            }
        }

        Command::Rollback { count } => {
            let report = migrator.rollback(count)?;
            for step in &report.steps {
                match &step.detail {
                    Some(detail) => println!("  {}: {} ({})", step.migration_id, step.state, detail),
                    None => println!("  {}: {}", step.migration_id, step.state),
                }
            }
            match &report.outcome {
                BatchOutcome::Aborted { migration_id, error } => {
                    return Err(anyhow!("rollback of '{}' failed: {}", migration_id, error));
                }
                _ => println!("Rolled back {} migration(s).", report.rolled_back_ids().len()),
            }
        }
    }

    Ok(())
}

fn as_filter(ids: &[String]) -> Option<&[String]> {
    if ids.is_empty() { None } else { Some(ids) }
}

fn print_plan(plan: &MigrationPlan) {
    println!(
        "Plan: {} migration(s), estimated {}s",
        plan.migrations.len(),
        plan.total_estimated_duration_secs
    );
    for migration in &plan.migrations {
        println!(
            "  {} [{}] {} (risk: {}{})",
            migration.id,
            migration.migration_type,
            migration.name,
            migration.risk_level,
            if migration.rollbackable { "" } else { ", not rollbackable" }
        );
    }
    println!("Overall risk: {}", plan.risk.overall);
    for concern in &plan.risk.concerns {
        println!("  concern: {}", concern);
    }
    println!("Rollback strategy: {}", plan.rollback_strategy);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RUSTMIGRATE_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
