use axum::http::HeaderMap;

use super::domain::{ActorId, Application, ApplicationId, AuditRecord, Stage, StageHistoryEntry};

/// Storage abstraction so the engine can be exercised in isolation.
///
/// Implementations must make `insert` and `commit_transition` atomic units:
/// partial application of their writes would let the live stage disagree
/// with history and audit.
pub trait PipelineRepository: Send + Sync {
    /// Persist a fresh application together with its seed history entry.
    /// Must enforce the single-active-application constraint for the
    /// (candidate, job) pair atomically with the insert; a separate
    /// check-then-insert is racy.
    fn insert(
        &self,
        application: Application,
        opening: StageHistoryEntry,
    ) -> Result<Application, StoreError>;

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;

    /// Stage history for one application, ordered by entry timestamp.
    fn history(&self, id: &ApplicationId) -> Result<Vec<StageHistoryEntry>, StoreError>;

    /// Commit a status change as one unit: persist the mutated application,
    /// append the history entry, append the audit record. `expected_stage`
    /// is the stage observed when the application was loaded; the commit
    /// must fail with [`StoreError::StaleStage`] when the stored stage no
    /// longer matches, so the loser of a concurrent race is reported
    /// instead of silently overwritten.
    fn commit_transition(
        &self,
        application: Application,
        entry: StageHistoryEntry,
        audit: AuditRecord,
        expected_stage: Stage,
    ) -> Result<(), StoreError>;

    /// All audit records, newest first.
    fn audit_trail(&self) -> Result<Vec<AuditRecord>, StoreError>;

    /// Audit records for one target, newest first. Backends index the
    /// (target_type, target_id) pair.
    fn audits_for(&self, target_type: &str, target_id: &str)
        -> Result<Vec<AuditRecord>, StoreError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("an active application already exists for this candidate and job")]
    ActiveApplicationExists,
    #[error("application stage changed since it was loaded")]
    StaleStage,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Identity interface: yields the optional authenticated actor behind a
/// request. Anonymous and system calls resolve to `None`.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<ActorId>;
}
