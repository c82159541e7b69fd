use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::Value;

use crate::pipeline::domain::{
    ActorId, Application, ApplicationId, ApplicationRecord, AuditRecord, CandidateId, JobId,
    Stage, StageHistoryEntry,
};
use crate::pipeline::repository::{IdentityResolver, PipelineRepository, StoreError};
use crate::pipeline::router::PipelineContext;
use crate::pipeline::service::PipelineEngine;
use crate::pipeline::pipeline_router;

#[derive(Default)]
struct StoreInner {
    applications: HashMap<ApplicationId, Application>,
    history: HashMap<ApplicationId, Vec<StageHistoryEntry>>,
    audits: Vec<AuditRecord>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
    /// Raw audit entries in append order, for assertions.
    pub(super) fn audits(&self) -> Vec<AuditRecord> {
        self.inner.lock().expect("store mutex poisoned").audits.clone()
    }
}

impl PipelineRepository for MemoryStore {
    fn insert(
        &self,
        application: Application,
        opening: StageHistoryEntry,
    ) -> Result<Application, StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let duplicate = inner.applications.values().any(|existing| {
            existing.candidate == application.candidate
                && existing.job == application.job
                && existing.is_active()
        });
        if duplicate {
            return Err(StoreError::ActiveApplicationExists);
        }
        inner
            .history
            .entry(application.id.clone())
            .or_default()
            .push(opening);
        inner
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.applications.get(id).cloned())
    }

    fn history(&self, id: &ApplicationId) -> Result<Vec<StageHistoryEntry>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.history.get(id).cloned().unwrap_or_default())
    }

    fn commit_transition(
        &self,
        application: Application,
        entry: StageHistoryEntry,
        audit: AuditRecord,
        expected_stage: Stage,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let stored = inner
            .applications
            .get(&application.id)
            .ok_or(StoreError::NotFound)?;
        if stored.stage != expected_stage {
            return Err(StoreError::StaleStage);
        }
        inner
            .history
            .entry(application.id.clone())
            .or_default()
            .push(entry);
        inner.audits.push(audit);
        inner.applications.insert(application.id.clone(), application);
        Ok(())
    }

    fn audit_trail(&self) -> Result<Vec<AuditRecord>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut entries = inner.audits.clone();
        entries.reverse();
        Ok(entries)
    }

    fn audits_for(
        &self,
        target_type: &str,
        target_id: &str,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .audits
            .iter()
            .rev()
            .filter(|audit| audit.target_type == target_type && audit.target_id == target_id)
            .cloned()
            .collect())
    }
}

/// Wrapper whose commits always lose the optimistic-concurrency race.
#[derive(Clone)]
pub(super) struct StaleStore(pub(super) MemoryStore);

impl PipelineRepository for StaleStore {
    fn insert(
        &self,
        application: Application,
        opening: StageHistoryEntry,
    ) -> Result<Application, StoreError> {
        self.0.insert(application, opening)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        self.0.fetch(id)
    }

    fn history(&self, id: &ApplicationId) -> Result<Vec<StageHistoryEntry>, StoreError> {
        self.0.history(id)
    }

    fn commit_transition(
        &self,
        _application: Application,
        _entry: StageHistoryEntry,
        _audit: AuditRecord,
        _expected_stage: Stage,
    ) -> Result<(), StoreError> {
        Err(StoreError::StaleStage)
    }

    fn audit_trail(&self) -> Result<Vec<AuditRecord>, StoreError> {
        self.0.audit_trail()
    }

    fn audits_for(
        &self,
        target_type: &str,
        target_id: &str,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        self.0.audits_for(target_type, target_id)
    }
}

pub(super) struct UnavailableStore;

impl PipelineRepository for UnavailableStore {
    fn insert(
        &self,
        _application: Application,
        _opening: StageHistoryEntry,
    ) -> Result<Application, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn history(&self, _id: &ApplicationId) -> Result<Vec<StageHistoryEntry>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn commit_transition(
        &self,
        _application: Application,
        _entry: StageHistoryEntry,
        _audit: AuditRecord,
        _expected_stage: Stage,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn audit_trail(&self) -> Result<Vec<AuditRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn audits_for(
        &self,
        _target_type: &str,
        _target_id: &str,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Trusts a forwarded `x-actor` header, as the API service does.
#[derive(Default, Clone)]
pub(super) struct HeaderActor;

impl IdentityResolver for HeaderActor {
    fn resolve(&self, headers: &HeaderMap) -> Option<ActorId> {
        headers
            .get("x-actor")
            .and_then(|value| value.to_str().ok())
            .map(|value| ActorId(value.to_string()))
    }
}

pub(super) fn candidate(id: &str) -> CandidateId {
    CandidateId(id.to_string())
}

pub(super) fn job(id: &str) -> JobId {
    JobId(id.to_string())
}

pub(super) fn build_engine() -> (PipelineEngine<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    (PipelineEngine::new(store.clone()), store)
}

pub(super) fn build_router<R>(store: Arc<R>) -> axum::Router
where
    R: PipelineRepository + 'static,
{
    pipeline_router(Arc::new(PipelineContext {
        engine: PipelineEngine::new(store),
        identity: HeaderActor,
    }))
}

pub(super) fn open(
    engine: &PipelineEngine<MemoryStore>,
    candidate_id: &str,
    job_id: &str,
) -> ApplicationRecord {
    engine
        .open_application(candidate(candidate_id), job(job_id), None, BTreeMap::new())
        .expect("application opens")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
