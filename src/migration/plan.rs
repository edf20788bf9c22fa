//! Plans, engine states and run reports

use crate::migration::MigrationError;
use crate::schema::Database;
use crate::script::Script;
use chrono::{DateTime, Utc};
use std::fmt;

/// Engine state of a single run
///
/// `Idle -> LoadingVersion -> Planning -> Applying(n) ... -> Committed`, with
/// `Failed` reachable from any state but `Idle` and `Committed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Idle,
    LoadingVersion,
    Planning,
    /// Applying the refactoring that moves the marker to this version
    Applying(usize),
    Committed,
    Failed,
}

impl MigrationState {
    /// Move to `next`, logging the transition
    pub(crate) fn advance(&mut self, next: MigrationState) {
        log::debug!("Migration state {self} -> {next}");
        *self = next;
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationState::Idle => f.write_str("idle"),
            MigrationState::LoadingVersion => f.write_str("loading version"),
            MigrationState::Planning => f.write_str("planning"),
            MigrationState::Applying(version) => write!(f, "applying {version}"),
            MigrationState::Committed => f.write_str("committed"),
            MigrationState::Failed => f.write_str("failed"),
        }
    }
}

/// One refactoring (or its reversal) rendered and ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    /// Marker value once this step commits
    pub version: usize,
    pub description: String,
    pub script: Script,
}

/// Result of planning from a given marker
///
/// `steps` is the longest valid prefix of the pending refactorings. When a
/// refactoring does not fit the model or cannot be rendered, planning stops
/// there and the reason is kept in `blocked_by`.
#[derive(Debug)]
pub struct Plan {
    pub from_version: usize,
    pub steps: Vec<PlannedStep>,
    /// Model after all planned steps
    pub model: Database,
    pub blocked_by: Option<MigrationError>,
}

impl Plan {
    /// Marker value once every planned step commits
    #[must_use]
    pub fn target_version(&self) -> usize {
        self.steps.last().map_or(self.from_version, |step| step.version)
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked_by.is_some()
    }
}

/// A step that was committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedStep {
    pub version: usize,
    pub description: String,
    pub statements: Vec<String>,
    pub execution_time_ms: u64,
}

/// Outcome of an `up` or `down` run
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub from_version: usize,
    pub to_version: usize,
    pub applied: Vec<AppliedStep>,
    pub state: MigrationState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MigrationReport {
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let mut state = MigrationState::Idle;
        state.advance(MigrationState::LoadingVersion);
        state.advance(MigrationState::Applying(3));
        assert_eq!(state, MigrationState::Applying(3));
        assert_eq!(state.to_string(), "applying 3");
    }

    #[test]
    fn test_target_version() {
        let plan = Plan {
            from_version: 2,
            steps: vec![PlannedStep {
                version: 3,
                description: "drop table t".to_string(),
                script: Script::single("DROP TABLE t"),
            }],
            model: Database::new(),
            blocked_by: None,
        };
        assert_eq!(plan.target_version(), 3);
        assert!(!plan.is_blocked());
    }
}
