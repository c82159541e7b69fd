use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;
use metrics_exporter_prometheus::PrometheusHandle;
use recruit_pipeline::pipeline::{
    ActorId, Application, ApplicationId, AuditRecord, IdentityResolver, PipelineRepository,
    Stage, StageHistoryEntry, StoreError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreInner {
    applications: HashMap<ApplicationId, Application>,
    history: HashMap<ApplicationId, Vec<StageHistoryEntry>>,
    audits: Vec<AuditRecord>,
    audit_index: HashMap<(String, String), Vec<usize>>,
}

/// Single-process store backing the service. One mutex over the whole state
/// makes insert and commit_transition atomic units; a SQL backend would use
/// a transaction plus a partial unique index over non-terminal stages and a
/// conditional UPDATE on the expected stage instead.
#[derive(Default, Clone)]
pub(crate) struct InMemoryPipelineStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl PipelineRepository for InMemoryPipelineStore {
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
        let position = inner.audits.len();
        inner
            .audit_index
            .entry((audit.target_type.clone(), audit.target_id.clone()))
            .or_default()
            .push(position);
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
        let Some(positions) = inner
            .audit_index
            .get(&(target_type.to_string(), target_id.to_string()))
        else {
            return Ok(Vec::new());
        };
        Ok(positions
            .iter()
            .rev()
            .map(|&position| inner.audits[position].clone())
            .collect())
    }
}

/// Trusts the actor header forwarded by the authenticating proxy. Requests
/// without the header are treated as anonymous/system calls.
#[derive(Clone)]
pub(crate) struct HeaderIdentity {
    header: &'static str,
}

impl Default for HeaderIdentity {
    fn default() -> Self {
        Self { header: "x-actor" }
    }
}

impl IdentityResolver for HeaderIdentity {
    fn resolve(&self, headers: &HeaderMap) -> Option<ActorId> {
        headers
            .get(self.header)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| ActorId(value.to_string()))
    }
}
