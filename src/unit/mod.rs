//! Executable migration units.
//!
//! Migration logic is opaque to the core: each migration carries a
//! forward unit, an optional backward unit, and an optional validate
//! unit. Units are plain trait objects registered against a migration
//! id at registry-population time, so arbitrary logic stays an
//! extension point without any dynamic code loading.

use crate::core::types::MigrationType;
use crate::core::{MigrationDefinition, Result};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// One opaque, blocking unit of migration logic.
///
/// Implemented for free by any `Fn() -> Result<()>` closure.
pub trait ExecutableUnit: Send + Sync {
    fn execute(&self) -> Result<()>;
}

impl<F> ExecutableUnit for F
where
    F: Fn() -> Result<()> + Send + Sync,
{
    fn execute(&self) -> Result<()> {
        (self)()
    }
}

/// The forward/backward/validate units registered for one migration.
#[derive(Clone)]
pub struct HandlerSet {
    pub forward: Arc<dyn ExecutableUnit>,
    pub backward: Option<Arc<dyn ExecutableUnit>>,
    pub validate: Option<Arc<dyn ExecutableUnit>>,
}

impl HandlerSet {
    pub fn new<F>(forward: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self {
            forward: Arc::new(forward),
            backward: None,
            validate: None,
        }
    }

    /// Build a set around a pre-built unit object instead of a closure.
    pub fn from_unit(forward: Arc<dyn ExecutableUnit>) -> Self {
        Self {
            forward,
            backward: None,
            validate: None,
        }
    }

    pub fn with_backward<F>(mut self, backward: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.backward = Some(Arc::new(backward));
        self
    }

    pub fn with_validate<F>(mut self, validate: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSet")
            .field("backward", &self.backward.is_some())
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

/// Seeds the initial [`HandlerSet`] for a newly created migration.
///
/// The registry consults the provider once per `create` call; callers
/// replace the seeded placeholders with real logic via
/// `register_handlers` before applying.
pub trait TemplateProvider: Send + Sync {
    fn seed(&self, definition: &MigrationDefinition) -> HandlerSet;
}

/// Default per-type templates: placeholder units that log and succeed.
pub struct DefaultTemplates;

impl TemplateProvider for DefaultTemplates {
    fn seed(&self, definition: &MigrationDefinition) -> HandlerSet {
        let ty = definition.migration_type;
        let id = definition.id.clone();
        let mut set = HandlerSet::new(placeholder_unit(id.clone(), ty, "forward"))
            .with_validate(placeholder_unit(id.clone(), ty, "validate"));
        if definition.rollbackable {
            set = set.with_backward(placeholder_unit(id, ty, "backward"));
        }
        set
    }
}

fn placeholder_unit(
    id: String,
    ty: MigrationType,
    direction: &'static str,
) -> impl Fn() -> Result<()> + Send + Sync + 'static {
    move || {
        info!(
            migration = %id,
            migration_type = %ty,
            "{} unit placeholder executed (register real handlers before production use)",
            direction
        );
        Ok(())
    }
}
