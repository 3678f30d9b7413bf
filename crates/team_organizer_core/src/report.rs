//! Outcome counters for a reconciliation run.

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

/// Counters collected while reconciling a single entity.
///
/// In dry-run mode `mutations` counts the writes that would have been issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Number of write calls issued (or planned in dry-run mode)
    pub mutations: usize,

    /// Number of places where live state diverged from the desired state
    pub violations: usize,
}

impl ReconcileStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a divergence that needs `writes` calls to fix.
    pub(crate) fn diverged(&mut self, writes: usize) {
        self.violations += 1;
        self.mutations += writes;
    }

    /// Returns true if any change was issued or planned.
    pub fn has_changes(&self) -> bool {
        self.mutations > 0
    }

    pub fn merge(&mut self, other: ReconcileStats) {
        self.mutations += other.mutations;
        self.violations += other.violations;
    }
}

/// Kind of entity an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Team,
    Project,
    Repository,
    Organization,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Team => f.write_str("team"),
            Self::Project => f.write_str("project"),
            Self::Repository => f.write_str("repository"),
            Self::Organization => f.write_str("organization"),
        }
    }
}

/// An entity whose reconciliation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFailure {
    pub kind: EntityKind,
    pub name: String,
    pub error: String,
}

/// Summary of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Teams reconciled without error
    pub teams_reconciled: usize,

    /// Repositories reconciled without error
    pub repositories_reconciled: usize,

    /// Totals across all entities, including failed ones up to the point of failure
    pub stats: ReconcileStats,

    /// Entities whose reconciliation failed
    pub failures: Vec<EntityFailure>,

    /// Repositories that exist in the organization but are not configured
    pub unmanaged_repositories: Vec<String>,

    /// Whether the run stopped early because it was cancelled
    pub aborted: bool,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if every entity reconciled and the run was not cancelled.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.aborted
    }

    pub(crate) fn record_failure(
        &mut self,
        kind: EntityKind,
        name: impl Into<String>,
        error: impl std::fmt::Display,
    ) {
        self.failures.push(EntityFailure {
            kind,
            name: name.into(),
            error: error.to_string(),
        });
    }
}
