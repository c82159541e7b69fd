//! Application status pipeline: transition validation, the rejection-reason
//! registry, and the engine that turns a status change into an atomic
//! mutation + stage-history append + audit append.

pub mod domain;
pub mod reject_reasons;
pub mod repository;
pub mod router;
pub mod service;
pub mod transitions;

#[cfg(test)]
mod tests;

pub use domain::{
    ActorId, Application, ApplicationId, ApplicationRecord, ApplicationView, AuditRecord,
    CandidateId, JobId, Stage, StageHistoryEntry, StageHistoryView, SCORE_MAX, SCORE_MIN,
};
pub use reject_reasons::RejectReason;
pub use repository::{IdentityResolver, PipelineRepository, StoreError};
pub use router::{pipeline_router, OpenApplicationRequest, PipelineContext, StatusChangeRequest};
pub use service::{PipelineEngine, PipelineError, STATUS_CHANGED_VERB};
