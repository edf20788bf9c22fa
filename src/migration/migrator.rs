//! Migrator - core migration execution engine

use crate::dialect::Dialect;
use crate::executor::SchemaExecutor;
use crate::migration::lock::{MigrationLockGuard, DEFAULT_LOCK_TIMEOUT};
use crate::migration::state_table::version_update_sql;
use crate::migration::{
    calculate_checksum, initialize_state_table, is_migration_lock_held, read_version, state_table_exists,
    validate_checksum,
    AppliedStep, MigrationError, MigrationReport, MigrationState, MigrationStatus, PendingRefactoring, Plan,
    PlannedStep, VersionRecord,
};
use crate::refactor::Refactoring;
use crate::schema::Database;
use crate::script::Script;
use crate::transaction::Transaction;
use chrono::Utc;
use std::time::{Duration, Instant};

/// Applies a declared sequence of refactorings to a database
///
/// The migrator owns the dialect and the sequence; executors are borrowed
/// per call. Planning is pure and needs no database, so `plan` and
/// `plan_down` can be used for dry runs.
pub struct Migrator {
    dialect: Box<dyn Dialect>,
    refactorings: Vec<Refactoring>,
    baseline: Database,
    lock_timeout: Duration,
    strict: bool,
}

fn fail(state: &mut MigrationState, error: MigrationError) -> MigrationError {
    state.advance(MigrationState::Failed);
    log::error!("{error}");
    error
}

impl Migrator {
    pub fn new(dialect: Box<dyn Dialect>, refactorings: Vec<Refactoring>) -> Self {
        Self {
            dialect,
            refactorings,
            baseline: Database::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            strict: false,
        }
    }

    /// Schema that exists before the first refactoring (empty by default)
    #[must_use]
    pub fn with_baseline(mut self, baseline: Database) -> Self {
        self.baseline = baseline;
        self
    }

    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Refuse to apply anything when any pending refactoring is invalid
    ///
    /// By default the valid prefix of the pending refactorings is applied and
    /// the run then fails at the first invalid one.
    #[must_use]
    pub fn with_strict_planning(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn refactorings(&self) -> &[Refactoring] {
        &self.refactorings
    }

    fn check_declared(&self, version: usize) -> Result<(), MigrationError> {
        if version > self.refactorings.len() {
            return Err(MigrationError::VersionConflict {
                stored: i64::try_from(version).unwrap_or(i64::MAX),
                declared: self.refactorings.len(),
            });
        }
        Ok(())
    }

    /// Model after the first `version` refactorings
    pub fn model_at(&self, version: usize) -> Result<Database, MigrationError> {
        self.check_declared(version)?;
        let mut model = self.baseline.clone();
        for (index, refactoring) in self.refactorings[..version].iter().enumerate() {
            refactoring
                .alter_model(&mut model)
                .map_err(|error| MigrationError::Schema {
                    version: index + 1,
                    description: refactoring.description(),
                    error,
                })?;
        }
        Ok(model)
    }

    /// Checksum of the first `version` refactorings
    pub fn checksum(&self, version: usize) -> Result<String, MigrationError> {
        self.check_declared(version)?;
        calculate_checksum(&self.refactorings[..version])
    }

    fn plan_step(
        &self,
        model: &Database,
        version: usize,
        refactoring: &Refactoring,
    ) -> Result<(Database, PlannedStep), MigrationError> {
        let description = refactoring.description();
        let mut next = model.clone();
        if let Err(error) = refactoring.alter_model(&mut next) {
            return Err(MigrationError::Schema {
                version,
                description,
                error,
            });
        }
        match refactoring.script(self.dialect(), &next) {
            Ok(script) => Ok((
                next,
                PlannedStep {
                    version,
                    description,
                    script,
                },
            )),
            Err(error) => Err(MigrationError::Unsupported {
                version,
                description,
                error,
            }),
        }
    }

    /// Validate and render every refactoring after `from_version`
    ///
    /// No SQL runs. In strict mode the first invalid refactoring is returned
    /// as the error; otherwise it ends up in [`Plan::blocked_by`].
    pub fn plan(&self, from_version: usize) -> Result<Plan, MigrationError> {
        let mut model = self.model_at(from_version)?;
        let mut steps = Vec::new();
        let mut blocked_by = None;

        for (offset, refactoring) in self.refactorings[from_version..].iter().enumerate() {
            match self.plan_step(&model, from_version + offset + 1, refactoring) {
                Ok((next, step)) => {
                    model = next;
                    steps.push(step);
                }
                Err(error) => {
                    blocked_by = Some(error);
                    break;
                }
            }
        }

        match blocked_by {
            Some(error) if self.strict => Err(error),
            blocked_by => Ok(Plan {
                from_version,
                steps,
                model,
                blocked_by,
            }),
        }
    }

    /// Render the reversal of the last `steps` applied refactorings, newest first
    ///
    /// Fails before returning anything if one of them cannot be reversed.
    pub fn plan_down(&self, from_version: usize, steps: usize) -> Result<Vec<PlannedStep>, MigrationError> {
        self.check_declared(from_version)?;
        let target = from_version.saturating_sub(steps);

        // models[k] is the model at marker target + k
        let mut models = vec![self.model_at(target)?];
        for (offset, refactoring) in self.refactorings[target..from_version].iter().enumerate() {
            let mut next = models[offset].clone();
            refactoring
                .alter_model(&mut next)
                .map_err(|error| MigrationError::Schema {
                    version: target + offset + 1,
                    description: refactoring.description(),
                    error,
                })?;
            models.push(next);
        }

        let mut planned = Vec::with_capacity(from_version - target);
        for version in (target + 1..=from_version).rev() {
            let refactoring = &self.refactorings[version - 1];
            let inverse = refactoring
                .reverse(&models[version - 1 - target])
                .ok_or_else(|| MigrationError::Irreversible {
                    version,
                    description: refactoring.description(),
                })?;

            let description = format!("revert {}", refactoring.description());
            let mut model = models[version - target].clone();
            let mut script = Script::new();
            for step in &inverse {
                step.alter_model(&mut model).map_err(|error| MigrationError::Schema {
                    version,
                    description: description.clone(),
                    error,
                })?;
                let rendered = step
                    .script(self.dialect(), &model)
                    .map_err(|error| MigrationError::Unsupported {
                        version,
                        description: description.clone(),
                        error,
                    })?;
                script.append(rendered);
            }
            planned.push(PlannedStep {
                version: version - 1,
                description: description.clone(),
                script: script.described(description),
            });
        }
        Ok(planned)
    }

    /// Create the bookkeeping table if needed and read the marker
    fn load_version(&self, executor: &dyn SchemaExecutor) -> Result<VersionRecord, MigrationError> {
        initialize_state_table(executor, self.dialect())?;
        Ok(read_version(executor)?.unwrap_or_else(|| VersionRecord::new(0, "")))
    }

    fn verify(&self, record: &VersionRecord) -> Result<(), MigrationError> {
        if record.version > self.refactorings.len() {
            return Err(MigrationError::VersionConflict {
                stored: i64::try_from(record.version).unwrap_or(i64::MAX),
                declared: self.refactorings.len(),
            });
        }
        if record.version > 0 {
            validate_checksum(record.version, &record.checksum, &self.checksum(record.version)?)?;
        }
        Ok(())
    }

    /// Read the marker and check it against the declared sequence
    pub fn validate(&self, executor: &dyn SchemaExecutor) -> Result<VersionRecord, MigrationError> {
        let record = self.load_version(executor)?;
        self.verify(&record)?;
        Ok(record)
    }

    /// Like [`validate`](Self::validate), but never writes
    ///
    /// A database without the bookkeeping table reads as version 0. Dry runs
    /// use this so that previewing a migration leaves no trace.
    pub fn inspect(&self, executor: &dyn SchemaExecutor) -> Result<VersionRecord, MigrationError> {
        let record = if state_table_exists(executor, self.dialect())? {
            read_version(executor)?.unwrap_or_else(|| VersionRecord::new(0, ""))
        } else {
            VersionRecord::new(0, "")
        };
        self.verify(&record)?;
        Ok(record)
    }

    /// Applied and pending refactorings
    ///
    /// A checksum mismatch is reported in the status rather than as an error.
    pub fn status(&self, executor: &dyn SchemaExecutor) -> Result<MigrationStatus, MigrationError> {
        let record = self.load_version(executor)?;
        self.check_declared(record.version)?;

        let current = record.version;
        let checksum_valid = current == 0 || record.checksum == self.checksum(current)?;
        let applied = self.refactorings[..current]
            .iter()
            .map(Refactoring::description)
            .collect();
        let pending = self.refactorings[current..]
            .iter()
            .enumerate()
            .map(|(offset, refactoring)| PendingRefactoring {
                version: current + offset + 1,
                description: refactoring.description(),
            })
            .collect();

        Ok(MigrationStatus {
            current_version: current,
            declared: self.refactorings.len(),
            applied,
            pending,
            checksum_valid,
            locked: is_migration_lock_held(executor)?,
        })
    }

    /// Apply pending refactorings under the migration lock
    ///
    /// `steps` limits how many are applied (`None` = all).
    pub fn up(&self, executor: &dyn SchemaExecutor, steps: Option<usize>) -> Result<MigrationReport, MigrationError> {
        initialize_state_table(executor, self.dialect())?;
        let lock = MigrationLockGuard::new(executor, self.dialect(), self.lock_timeout)?;
        self.up_with_lock(lock.executor(), steps)
    }

    /// Apply pending refactorings; the caller already holds the lock
    pub fn up_with_lock(
        &self,
        executor: &dyn SchemaExecutor,
        steps: Option<usize>,
    ) -> Result<MigrationReport, MigrationError> {
        let started_at = Utc::now();
        let mut state = MigrationState::Idle;

        state.advance(MigrationState::LoadingVersion);
        let record = self
            .validate(executor)
            .map_err(|error| fail(&mut state, error))?;

        state.advance(MigrationState::Planning);
        let mut plan = self.plan(record.version).map_err(|error| fail(&mut state, error))?;
        if let Some(limit) = steps {
            if limit <= plan.steps.len() {
                plan.steps.truncate(limit);
                plan.blocked_by = None;
            }
        }
        if plan.steps.is_empty() && plan.blocked_by.is_none() {
            log::info!("Database is up to date at version {}", record.version);
        }

        let applied = self.apply_steps(executor, &plan.steps, &mut state)?;
        if let Some(error) = plan.blocked_by {
            return Err(fail(&mut state, error));
        }

        state.advance(MigrationState::Committed);
        Ok(MigrationReport {
            from_version: record.version,
            to_version: applied.last().map_or(record.version, |step| step.version),
            applied,
            state,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Revert the last `steps` applied refactorings (default 1) under the migration lock
    pub fn down(&self, executor: &dyn SchemaExecutor, steps: Option<usize>) -> Result<MigrationReport, MigrationError> {
        initialize_state_table(executor, self.dialect())?;
        let lock = MigrationLockGuard::new(executor, self.dialect(), self.lock_timeout)?;
        self.down_with_lock(lock.executor(), steps)
    }

    /// Revert refactorings; the caller already holds the lock
    pub fn down_with_lock(
        &self,
        executor: &dyn SchemaExecutor,
        steps: Option<usize>,
    ) -> Result<MigrationReport, MigrationError> {
        let started_at = Utc::now();
        let mut state = MigrationState::Idle;

        state.advance(MigrationState::LoadingVersion);
        let record = self
            .validate(executor)
            .map_err(|error| fail(&mut state, error))?;

        state.advance(MigrationState::Planning);
        let count = steps.unwrap_or(1).min(record.version);
        let planned = self
            .plan_down(record.version, count)
            .map_err(|error| fail(&mut state, error))?;

        let applied = self.apply_steps(executor, &planned, &mut state)?;

        state.advance(MigrationState::Committed);
        Ok(MigrationReport {
            from_version: record.version,
            to_version: applied.last().map_or(record.version, |step| step.version),
            applied,
            state,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn apply_steps(
        &self,
        executor: &dyn SchemaExecutor,
        steps: &[PlannedStep],
        state: &mut MigrationState,
    ) -> Result<Vec<AppliedStep>, MigrationError> {
        if !steps.is_empty() && !self.dialect.supports_transactional_ddl() {
            log::warn!(
                "The {} dialect commits DDL implicitly; a failing refactoring may be left partially applied",
                self.dialect.name()
            );
        }

        let mut applied = Vec::with_capacity(steps.len());
        for step in steps {
            state.advance(MigrationState::Applying(step.version));
            match self.apply_step(executor, step) {
                Ok(done) => {
                    log::info!(
                        "Applied '{}' in {} ms, now at version {}",
                        done.description,
                        done.execution_time_ms,
                        done.version
                    );
                    applied.push(done);
                }
                Err(error) => return Err(fail(state, error)),
            }
        }
        Ok(applied)
    }

    /// Run one step and move the marker, all in one transaction
    fn apply_step(&self, executor: &dyn SchemaExecutor, step: &PlannedStep) -> Result<AppliedStep, MigrationError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "revolt.apply",
            version = step.version,
            description = %step.description
        )
        .entered();

        let start = Instant::now();
        let checksum = self.checksum(step.version)?;
        let tx = Transaction::begin(executor)?;

        for statement in step.script.statements() {
            log::debug!("Executing: {statement}");
            if let Err(error) = tx.execute(statement) {
                if let Err(rollback_error) = tx.rollback() {
                    log::warn!("Rollback after failed statement also failed: {rollback_error}");
                }
                return Err(MigrationError::StatementExecution {
                    version: step.version,
                    description: step.description.clone(),
                    statement: statement.clone(),
                    error: error.to_string(),
                });
            }
        }

        tx.execute(&version_update_sql(self.dialect(), step.version, &checksum, Utc::now()))?;
        tx.commit()?;

        Ok(AppliedStep {
            version: step.version,
            description: step.description.clone(),
            statements: step.script.statements().to_vec(),
            execution_time_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}
