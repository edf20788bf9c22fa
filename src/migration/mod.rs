//! Versioned application of refactorings
//!
//! The declared refactorings form an ordered sequence `S`. The database
//! stores a single marker `v` (how many of them have been applied) in the
//! `revolt_version` table, together with a checksum of `S[..v]`. Running
//! the migrator applies the suffix `S[v..]`, one transaction per
//! refactoring, advancing the marker inside each transaction.
//!
//! # Example
//!
//! ```rust,no_run
//! use revolt::dialect::DialectKind;
//! use revolt::migration::Migrator;
//! use revolt::refactor::Refactoring;
//! use revolt::schema::{Column, ColumnType};
//!
//! # fn run(executor: &dyn revolt::executor::SchemaExecutor) -> Result<(), revolt::migration::MigrationError> {
//! let migrator = Migrator::new(
//!     DialectKind::Postgres.dialect(),
//!     vec![Refactoring::CreateTable {
//!         table: "users".to_string(),
//!         columns: vec![Column::new("id", ColumnType::BigInt).auto_increment()],
//!         primary_key: None,
//!     }],
//! );
//! let report = migrator.up(executor, None)?;
//! println!("now at version {}", report.to_version);
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod error;
pub mod lock;
pub mod migrator;
pub mod plan;
pub mod record;
pub mod startup;
pub mod state_table;
pub mod status;

pub use checksum::{calculate_checksum, validate_checksum};
pub use error::MigrationError;
pub use lock::{acquire_migration_lock, is_migration_lock_held, release_migration_lock, MigrationLockGuard};
pub use migrator::Migrator;
pub use plan::{AppliedStep, MigrationReport, MigrationState, Plan, PlannedStep};
pub use record::VersionRecord;
pub use startup::startup_migrations;
pub use state_table::{initialize_state_table, read_version, state_table_exists};
pub use status::{MigrationStatus, PendingRefactoring};

/// Name of the bookkeeping table
pub const VERSION_TABLE: &str = "revolt_version";
