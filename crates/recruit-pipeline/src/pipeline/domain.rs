use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier wrapper for pipeline applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Loose reference to a candidate profile owned by the surrounding service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

/// Loose reference to a job posting owned by the surrounding service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Authenticated actor identifier yielded by the identity interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorId(pub String);

/// Fixed status enumeration an application moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Applied,
    PhoneScreen,
    Onsite,
    Offer,
    Hired,
    Rejected,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Applied,
        Stage::PhoneScreen,
        Stage::Onsite,
        Stage::Offer,
        Stage::Hired,
        Stage::Rejected,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Stage::Applied => "applied",
            Stage::PhoneScreen => "phone_screen",
            Stage::Onsite => "onsite",
            Stage::Offer => "offer",
            Stage::Hired => "hired",
            Stage::Rejected => "rejected",
        }
    }

    /// Terminal stages never transition again and do not count as active.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Stage::Hired | Stage::Rejected)
    }

    pub fn from_label(value: &str) -> Option<Self> {
        Stage::ALL.into_iter().find(|stage| stage.label() == value)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive score bounds checked before any write reaches the store.
pub const SCORE_MIN: i32 = 0;
pub const SCORE_MAX: i32 = 100;

/// The mutable aggregate root of the pipeline. Only the engine mutates
/// `stage` and `hired_at`; direct field edits bypass history and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub candidate: CandidateId,
    pub job: JobId,
    pub stage: Stage,
    pub score: Option<i32>,
    pub applied_at: DateTime<Utc>,
    pub hired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,
}

impl Application {
    /// Whole days elapsed between applying and hiring; absent until hired.
    pub fn days_to_hire(&self) -> Option<i64> {
        self.hired_at
            .map(|hired_at| (hired_at - self.applied_at).num_days())
    }

    pub fn is_active(&self) -> bool {
        !self.stage.is_terminal()
    }
}

/// Immutable record of one stage entry for an application. Never updated
/// or deleted; entries are ordered by `entered_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageHistoryEntry {
    pub application: ApplicationId,
    pub stage: Stage,
    pub entered_at: DateTime<Utc>,
    pub note: String,
}

/// System-wide append-only record of an actor performing a verb against a
/// target entity. The target reference is loose (type + string id) so audit
/// entries outlive the entities they describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub actor: Option<ActorId>,
    pub verb: String,
    pub target_type: String,
    pub target_id: String,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

/// An application together with its ordered stage history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationRecord {
    pub application: Application,
    pub history: Vec<StageHistoryEntry>,
}

impl ApplicationRecord {
    /// Elapsed wall-clock time since the most recent stage entry; absent
    /// when no history exists yet.
    pub fn time_in_stage(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.history.last().map(|entry| now - entry.entered_at)
    }

    pub fn view(&self) -> ApplicationView {
        ApplicationView {
            id: self.application.id.clone(),
            candidate: self.application.candidate.clone(),
            job: self.application.job.clone(),
            status: self.application.stage,
            score: self.application.score,
            applied_at: self.application.applied_at,
            hired_at: self.application.hired_at,
            days_to_hire: self.application.days_to_hire(),
            stage_history: self
                .history
                .iter()
                .map(|entry| StageHistoryView {
                    stage: entry.stage,
                    entered_at: entry.entered_at,
                    note: entry.note.clone(),
                })
                .collect(),
        }
    }
}

/// Wire representation returned by the application endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub candidate: CandidateId,
    pub job: JobId,
    pub status: Stage,
    pub score: Option<i32>,
    pub applied_at: DateTime<Utc>,
    pub hired_at: Option<DateTime<Utc>>,
    pub days_to_hire: Option<i64>,
    pub stage_history: Vec<StageHistoryView>,
}

/// Read-only history embedding inside [`ApplicationView`].
#[derive(Debug, Clone, Serialize)]
pub struct StageHistoryView {
    pub stage: Stage,
    pub entered_at: DateTime<Utc>,
    pub note: String,
}
