/// Apply-batch tests
///
/// Sequential execution, ledger bookkeeping, partial-failure abort,
/// idempotence and dry runs, driven through the Migrator facade.
/// Run with: cargo test --test apply_tests

use rustmigrate::engine::BatchOutcome;
use rustmigrate::ledger::Ledger;
use rustmigrate::{
    CreateOptions, HandlerSet, MigrateError, MigrationState, MigrationType, Migrator,
    MigratorConfig, RiskLevel,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn open_migrator(temp_dir: &TempDir) -> Migrator {
    let config =
        MigratorConfig::new(temp_dir.path().join("migrations")).backup_artifacts(Vec::new());
    Migrator::open(config).unwrap()
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

fn counting(hits: Arc<AtomicUsize>) -> impl Fn() -> rustmigrate::Result<()> + Send + Sync + 'static {
    move || {
        hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn failing(
    hits: Arc<AtomicUsize>,
    message: String,
) -> impl Fn() -> rustmigrate::Result<()> + Send + Sync + 'static {
    move || {
        hits.fetch_add(1, Ordering::SeqCst);
        Err(MigrateError::Storage(message.clone()))
    }
}

/// Creates A(low), B(medium, deps A), C(high, deps A) in order.
fn create_abc(migrator: &mut Migrator) -> (String, String, String) {
    let a = migrator
        .create("a base", MigrationType::Database, "", CreateOptions::default())
        .unwrap();
    let b = migrator
        .create(
            "b follow",
            MigrationType::Data,
            "",
            CreateOptions::new().depends_on(&a).risk_level(RiskLevel::Medium),
        )
        .unwrap();
    let c = migrator
        .create(
            "c follow",
            MigrationType::Data,
            "",
            CreateOptions::new().depends_on(&a).risk_level(RiskLevel::High),
        )
        .unwrap();
    (a, b, c)
}

#[test]
fn test_apply_runs_in_dependency_order_and_records_ledger() {
    let temp_dir = TempDir::new().unwrap();
    let mut migrator = open_migrator(&temp_dir);
    let (a, b, c) = create_abc(&mut migrator);

    let hits = counter();
    for id in [&a, &b, &c] {
        migrator
            .register_handlers(id, HandlerSet::new(counting(Arc::clone(&hits))))
            .unwrap();
    }

    let report = migrator.apply(None, false).unwrap();
    assert!(report.succeeded());
    assert_eq!(report.plan.risk.overall, RiskLevel::High);
    assert_eq!(report.applied_ids(), vec![a.as_str(), b.as_str(), c.as_str()]);
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    let recorded: Vec<&str> = migrator
        .ledger()
        .records()
        .iter()
        .map(|r| r.migration_id.as_str())
        .collect();
    assert_eq!(recorded, vec![a.as_str(), b.as_str(), c.as_str()]);
    assert!(migrator.pending().is_empty());
}

#[test]
fn test_failure_aborts_batch_and_keeps_succeeded_prefix() {
    let temp_dir = TempDir::new().unwrap();
    let mut migrator = open_migrator(&temp_dir);
    let (a, b, c) = create_abc(&mut migrator);

    let forward_hits = counter();
    migrator
        .register_handlers(&a, HandlerSet::new(counting(Arc::clone(&forward_hits))))
        .unwrap();
    migrator
        .register_handlers(&b, HandlerSet::new(counting(Arc::clone(&forward_hits))))
        .unwrap();

    let c_forward = counter();
    let c_backward = counter();
    migrator
        .register_handlers(
            &c,
            HandlerSet::new(failing(Arc::clone(&c_forward), "disk full".to_string())).with_backward(counting(Arc::clone(&c_backward))),
        )
        .unwrap();

    let report = migrator.apply(None, false).unwrap();
    assert!(!report.succeeded());
    match &report.outcome {
        BatchOutcome::Aborted { migration_id, error } => {
            assert_eq!(migration_id, &c);
            assert!(error.contains("disk full"));
        }
        other => panic!("expected Aborted, got {:?}", other),
    }

    // The ledger holds exactly the succeeded prefix, in order.
    let recorded: Vec<&str> = migrator
        .ledger()
        .records()
        .iter()
        .map(|r| r.migration_id.as_str())
        .collect();
    assert_eq!(recorded, vec![a.as_str(), b.as_str()]);

    // The failed migration's own backward unit ran as best-effort undo.
    assert_eq!(c_backward.load(Ordering::SeqCst), 1);

    // Steps: two applied, one failed, nothing beyond the failure.
    assert_eq!(report.steps.len(), 3);
    assert_eq!(report.steps[2].state, MigrationState::Failed);
}

#[test]
fn test_apply_is_idempotent_via_ledger_membership() {
    let temp_dir = TempDir::new().unwrap();
    let mut migrator = open_migrator(&temp_dir);
    let (a, b, c) = create_abc(&mut migrator);

    let hits = counter();
    for id in [&a, &b, &c] {
        migrator
            .register_handlers(id, HandlerSet::new(counting(Arc::clone(&hits))))
            .unwrap();
    }

    assert!(migrator.apply(None, false).unwrap().succeeded());
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    // Second call: empty plan, zero forward invocations.
    let second = migrator.apply(None, false).unwrap();
    assert_eq!(second.outcome, BatchOutcome::Completed);
    assert!(second.steps.is_empty());
    assert!(second.plan.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[test]
fn test_dry_run_surfaces_plan_without_side_effects() {
    let temp_dir = TempDir::new().unwrap();
    let mut migrator = open_migrator(&temp_dir);
    let (_, _, c) = create_abc(&mut migrator);

    let hits = counter();
    migrator
        .register_handlers(&c, HandlerSet::new(counting(Arc::clone(&hits))))
        .unwrap();

    let report = migrator.apply(None, true).unwrap();
    assert_eq!(report.outcome, BatchOutcome::DryRun);
    // Plan and risk are still fully computed.
    assert_eq!(report.plan.migrations.len(), 3);
    assert_eq!(report.plan.risk.overall, RiskLevel::High);
    assert!(!report.plan.rollback_strategy.is_empty());
    // Nothing moved: no units ran, no ledger entries, no backup.
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(migrator.ledger().records().is_empty());
    assert!(report.backup.is_none());
    assert!(!temp_dir.path().join("migrations").join("backups").exists());
}

#[test]
fn test_validation_failure_equals_execution_failure() {
    let temp_dir = TempDir::new().unwrap();
    let mut migrator = open_migrator(&temp_dir);
    let id = migrator
        .create("guarded", MigrationType::Database, "", CreateOptions::default())
        .unwrap();

    let forward_hits = counter();
    let backward_hits = counter();
    let validate_hits = counter();
    migrator
        .register_handlers(
            &id,
            HandlerSet::new(counting(Arc::clone(&forward_hits)))
                .with_backward(counting(Arc::clone(&backward_hits)))
                .with_validate(failing(Arc::clone(&validate_hits), "row count mismatch".to_string())),
        )
        .unwrap();

    let report = migrator.apply(None, false).unwrap();
    match &report.outcome {
        BatchOutcome::Aborted { migration_id, error } => {
            assert_eq!(migration_id, &id);
            assert!(error.contains("validation failed"));
            assert!(error.contains("row count mismatch"));
        }
        other => panic!("expected Aborted, got {:?}", other),
    }

    assert_eq!(forward_hits.load(Ordering::SeqCst), 1);
    assert_eq!(validate_hits.load(Ordering::SeqCst), 1);
    // Undo ran because the definition is rollbackable.
    assert_eq!(backward_hits.load(Ordering::SeqCst), 1);
    assert!(migrator.ledger().records().is_empty());
}

#[test]
fn test_apply_subset_by_ids() {
    let temp_dir = TempDir::new().unwrap();
    let mut migrator = open_migrator(&temp_dir);
    let a = migrator
        .create("a solo", MigrationType::Config, "", CreateOptions::default())
        .unwrap();
    let b = migrator
        .create("b solo", MigrationType::Config, "", CreateOptions::default())
        .unwrap();

    let report = migrator.apply(Some(&[a.clone()]), false).unwrap();
    assert!(report.succeeded());
    assert_eq!(report.applied_ids(), vec![a.as_str()]);

    let pending: Vec<String> = migrator.pending().into_iter().map(|m| m.id).collect();
    assert_eq!(pending, vec![b]);
}

#[test]
fn test_apply_unknown_id_fails_preflight() {
    let temp_dir = TempDir::new().unwrap();
    let mut migrator = open_migrator(&temp_dir);
    migrator
        .create("real", MigrationType::Config, "", CreateOptions::default())
        .unwrap();

    let err = migrator
        .apply(Some(&["20990101000000000_ghost".to_string()]), false)
        .unwrap_err();
    assert!(matches!(err, MigrateError::UnknownMigration(_)));
    assert!(migrator.ledger().records().is_empty());
}

#[test]
fn test_requesting_an_applied_id_is_a_no_op() {
    let temp_dir = TempDir::new().unwrap();
    let mut migrator = open_migrator(&temp_dir);
    let a = migrator
        .create("once", MigrationType::Code, "", CreateOptions::default())
        .unwrap();

    let hits = counter();
    migrator
        .register_handlers(&a, HandlerSet::new(counting(Arc::clone(&hits))))
        .unwrap();

    migrator.apply(Some(&[a.clone()]), false).unwrap();
    let second = migrator.apply(Some(&[a.clone()]), false).unwrap();

    assert_eq!(second.outcome, BatchOutcome::Completed);
    assert!(second.plan.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
