//! Command handlers
//!
//! Each handler writes its report to `out` so the binary can pass stdout and
//! tests can pass a buffer.

use anyhow::Result;
use colored::Colorize;
use revolt::executor::SchemaExecutor;
use revolt::migration::{MigrationError, Migrator, PlannedStep};
use std::io::Write;

fn write_step(out: &mut dyn Write, step: &PlannedStep) -> Result<()> {
    writeln!(out, "-- {} (version {})", step.description, step.version)?;
    write!(out, "{}", step.script)?;
    writeln!(out)?;
    Ok(())
}

fn blocked(out: &mut dyn Write, error: MigrationError) -> Result<()> {
    writeln!(out, "{} {error}", "✗".red())?;
    Err(error.into())
}

pub fn status(migrator: &Migrator, executor: &dyn SchemaExecutor, out: &mut dyn Write) -> Result<()> {
    let status = migrator.status(executor)?;

    writeln!(out, "\n📊 Migration Status ({})\n", migrator.dialect().name())?;
    writeln!(out, "Version: {} of {}", status.current_version, status.declared)?;

    if status.applied.is_empty() {
        writeln!(out, "✅ Applied: None")?;
    } else {
        writeln!(out, "✅ Applied ({}):", status.applied.len())?;
        for (index, description) in status.applied.iter().enumerate() {
            writeln!(out, "  ✓ {}. {description}", index + 1)?;
        }
    }

    writeln!(out)?;

    if status.pending.is_empty() {
        writeln!(out, "⏳ Pending: None")?;
    } else {
        writeln!(out, "⏳ Pending ({}):", status.pending_count())?;
        for pending in &status.pending {
            writeln!(out, "  ⏳ {}. {}", pending.version, pending.description)?;
        }
    }

    if !status.checksum_valid {
        writeln!(
            out,
            "\n{}",
            "⚠ The stored checksum does not match the changelog; applied refactorings were edited".yellow()
        )?;
    }
    if status.locked {
        writeln!(out, "\n{}", "🔒 The migration lock is held by another process".yellow())?;
    }

    writeln!(
        out,
        "\n📈 Summary: {} applied, {} pending",
        status.applied.len(),
        status.pending_count()
    )?;
    Ok(())
}

pub fn up(
    migrator: &Migrator,
    executor: &dyn SchemaExecutor,
    steps: Option<usize>,
    dry_run: bool,
    out: &mut dyn Write,
) -> Result<()> {
    if dry_run {
        let record = migrator.inspect(executor)?;
        let mut plan = migrator.plan(record.version)?;
        let blocked_by = match steps {
            Some(limit) if limit <= plan.steps.len() => {
                plan.steps.truncate(limit);
                None
            }
            _ => plan.blocked_by.take(),
        };

        if plan.steps.is_empty() {
            writeln!(out, "No pending refactorings to apply")?;
        } else {
            writeln!(out, "Would apply {} refactoring(s):\n", plan.steps.len())?;
            for step in &plan.steps {
                write_step(out, step)?;
            }
        }
        return match blocked_by {
            Some(error) => blocked(out, error),
            None => Ok(()),
        };
    }

    writeln!(out, "Applying refactorings...")?;
    let report = migrator.up(executor, steps)?;
    for step in &report.applied {
        writeln!(
            out,
            "  ✓ {}. {} ({} ms)",
            step.version, step.description, step.execution_time_ms
        )?;
    }

    if report.applied.is_empty() {
        writeln!(out, "✅ Database is up to date at version {}", report.to_version)?;
    } else {
        writeln!(
            out,
            "✅ Applied {} refactoring(s), now at version {}",
            report.applied_count(),
            report.to_version
        )?;
    }
    Ok(())
}

pub fn down(
    migrator: &Migrator,
    executor: &dyn SchemaExecutor,
    steps: usize,
    dry_run: bool,
    out: &mut dyn Write,
) -> Result<()> {
    if dry_run {
        let record = migrator.inspect(executor)?;
        let planned = migrator.plan_down(record.version, steps.min(record.version))?;
        if planned.is_empty() {
            writeln!(out, "No applied refactorings to revert")?;
        } else {
            writeln!(out, "Would revert {} refactoring(s):\n", planned.len())?;
            for step in &planned {
                write_step(out, step)?;
            }
        }
        return Ok(());
    }

    writeln!(out, "Reverting refactorings...")?;
    let report = migrator.down(executor, Some(steps))?;
    for step in &report.applied {
        writeln!(out, "  ✓ {} ({} ms)", step.description, step.execution_time_ms)?;
    }

    if report.applied.is_empty() {
        writeln!(out, "✅ Nothing to revert")?;
    } else {
        writeln!(
            out,
            "✅ Reverted {} refactoring(s), now at version {}",
            report.applied_count(),
            report.to_version
        )?;
    }
    Ok(())
}

/// Render the SQL of every refactoring after `from_version` without a database
pub fn plan(migrator: &Migrator, from_version: usize, out: &mut dyn Write) -> Result<()> {
    let plan = migrator.plan(from_version)?;

    writeln!(
        out,
        "-- revolt plan for {}: version {} -> {}\n",
        migrator.dialect().name(),
        plan.from_version,
        plan.target_version()
    )?;
    for step in &plan.steps {
        write_step(out, step)?;
    }

    match plan.blocked_by {
        Some(error) => blocked(out, error),
        None => Ok(()),
    }
}

/// Validate the whole changelog against the model and the dialect
pub fn check(migrator: &Migrator, out: &mut dyn Write) -> Result<()> {
    let plan = migrator.plan(0)?;
    if let Some(error) = plan.blocked_by {
        return blocked(out, error);
    }

    writeln!(
        out,
        "✅ {} refactoring(s) valid for {} ({} table(s) in the final schema)",
        plan.steps.len(),
        migrator.dialect().name(),
        plan.model.len()
    )?;
    Ok(())
}

pub fn validate(migrator: &Migrator, executor: &dyn SchemaExecutor, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Validating checksum...")?;
    let record = migrator.validate(executor)?;
    if record.version == 0 {
        writeln!(out, "✅ Nothing applied yet")?;
    } else {
        writeln!(out, "✅ Checksum valid at version {}", record.version)?;
    }
    Ok(())
}
