use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use super::domain::{
    ActorId, Application, ApplicationId, ApplicationRecord, AuditRecord, CandidateId, JobId,
    Stage, StageHistoryEntry, SCORE_MAX, SCORE_MIN,
};
use super::reject_reasons::RejectReason;
use super::repository::{PipelineRepository, StoreError};
use super::transitions;

/// Verb recorded on every audit entry written for a status change.
pub const STATUS_CHANGED_VERB: &str = "application_status_changed";

const APPLICATION_TARGET_TYPE: &str = "Application";

/// Engine orchestrating status changes against the repository.
pub struct PipelineEngine<R> {
    repository: Arc<R>,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

impl<R> PipelineEngine<R>
where
    R: PipelineRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Open a new application in the `applied` stage, seeding its history
    /// atomically with the insert. The store rejects a second active
    /// application for the same (candidate, job) pair.
    pub fn open_application(
        &self,
        candidate: CandidateId,
        job: JobId,
        score: Option<i32>,
        meta: BTreeMap<String, Value>,
    ) -> Result<ApplicationRecord, PipelineError> {
        if let Some(score) = score {
            if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
                return Err(PipelineError::ScoreOutOfRange { score });
            }
        }

        let now = Utc::now();
        let application = Application {
            id: next_application_id(),
            candidate,
            job,
            stage: Stage::Applied,
            score,
            applied_at: now,
            hired_at: None,
            meta,
        };
        let opening = StageHistoryEntry {
            application: application.id.clone(),
            stage: Stage::Applied,
            entered_at: now,
            note: "Initial application".to_string(),
        };

        let stored = self.repository.insert(application, opening)?;
        info!(
            application = %stored.id.0,
            candidate = %stored.candidate.0,
            job = %stored.job.0,
            "application opened"
        );

        self.application(&stored.id)
    }

    /// Apply a status change, enforcing the pipeline rules in order:
    /// load, known-status check, transition table, reject-reason checks,
    /// then one atomic commit of the mutation, history entry, and audit
    /// record, conditional on the stage observed at load time.
    pub fn transition(
        &self,
        id: &ApplicationId,
        requested: &str,
        note: &str,
        reject_reason: Option<&str>,
        actor: Option<ActorId>,
    ) -> Result<ApplicationRecord, PipelineError> {
        let mut application = self.repository.fetch(id)?.ok_or(PipelineError::NotFound)?;

        let target = Stage::from_label(requested).ok_or_else(|| PipelineError::InvalidStatus {
            value: requested.to_string(),
        })?;

        let source = application.stage;
        if !transitions::is_transition_allowed(source, target) {
            return Err(PipelineError::TransitionNotAllowed {
                from: source,
                to: target,
            });
        }

        let reason = if target == Stage::Rejected {
            let code = match reject_reason {
                Some(code) if !code.is_empty() => code,
                _ => return Err(PipelineError::MissingRejectReason),
            };
            Some(
                RejectReason::from_code(code).ok_or_else(|| PipelineError::InvalidRejectReason {
                    code: code.to_string(),
                })?,
            )
        } else {
            None
        };

        let now = Utc::now();
        let entry = StageHistoryEntry {
            application: id.clone(),
            stage: target,
            entered_at: now,
            note: note.to_string(),
        };

        application.stage = target;
        if target == Stage::Hired && application.hired_at.is_none() {
            application.hired_at = Some(now);
        }

        let audit = AuditRecord {
            actor,
            verb: STATUS_CHANGED_VERB.to_string(),
            target_type: APPLICATION_TARGET_TYPE.to_string(),
            target_id: id.0.clone(),
            timestamp: now,
            data: json!({
                "old_status": source.label(),
                "new_status": target.label(),
                "note": note,
                "reject_reason": reason.map(RejectReason::code),
            }),
        };

        self.repository
            .commit_transition(application, entry, audit, source)?;
        info!(
            application = %id.0,
            from = source.label(),
            to = target.label(),
            "application status updated"
        );

        self.application(id)
    }

    /// Fetch an application together with its ordered stage history.
    pub fn application(&self, id: &ApplicationId) -> Result<ApplicationRecord, PipelineError> {
        let application = self.repository.fetch(id)?.ok_or(PipelineError::NotFound)?;
        let history = self.repository.history(id)?;
        Ok(ApplicationRecord {
            application,
            history,
        })
    }

    /// Full audit trail, newest first.
    pub fn audit_trail(&self) -> Result<Vec<AuditRecord>, PipelineError> {
        Ok(self.repository.audit_trail()?)
    }

    /// Audit records for one application, newest first.
    pub fn application_audits(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<AuditRecord>, PipelineError> {
        Ok(self
            .repository
            .audits_for(APPLICATION_TARGET_TYPE, &id.0)?)
    }
}

/// Error raised by the pipeline engine. Display strings double as the
/// user-facing `detail` messages on the HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Not found.")]
    NotFound,
    #[error("Invalid status")]
    InvalidStatus { value: String },
    #[error("Transition from '{from}' to '{to}' is not allowed.")]
    TransitionNotAllowed { from: Stage, to: Stage },
    #[error("reject_reason is required when rejecting an application")]
    MissingRejectReason,
    #[error("Invalid reject reason")]
    InvalidRejectReason { code: String },
    #[error("Candidate already has an active application for this job")]
    DuplicateActiveApplication,
    #[error("Score must be between values 0 and 100 included.")]
    ScoreOutOfRange { score: i32 },
    #[error("application was modified concurrently, retry the transition")]
    ConcurrentTransition,
    #[error("storage unavailable")]
    Unavailable(#[source] StoreError),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => PipelineError::NotFound,
            StoreError::ActiveApplicationExists => PipelineError::DuplicateActiveApplication,
            StoreError::StaleStage => PipelineError::ConcurrentTransition,
            err @ StoreError::Unavailable(_) => PipelineError::Unavailable(err),
        }
    }
}
