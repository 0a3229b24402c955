//! Repositorios en memoria (default del engine y de los tests).
//!
//! `DashMap` bloquea por shard: mientras se sostiene un `get_mut` sobre una
//! entrada nadie más puede leerla ni escribirla, lo que da atomicidad a
//! `define_steps` y al compare-and-swap de `save_job`.
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use log::debug;

use super::{BlueprintRepository, JobRepository};
use crate::errors::{Missing, StoreError};
use crate::model::{Blueprint, BlueprintId, ExecutionTable, Job, JobId, Step, StepDraft, StepId};

#[derive(Debug, Default)]
pub struct InMemoryBlueprintRepository {
    blueprints: DashMap<BlueprintId, Blueprint>,
    steps: DashMap<StepId, Step>,
    next_blueprint_id: AtomicI64,
    next_step_id: AtomicI64,
}

impl InMemoryBlueprintRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl BlueprintRepository for InMemoryBlueprintRepository {
    fn create_blueprint(&self, name: &str) -> Result<Blueprint, StoreError> {
        let id = BlueprintId(Self::next_id(&self.next_blueprint_id));
        let bp = Blueprint { id,
                             name: name.to_string(),
                             execution_table: ExecutionTable::default(),
                             created_at: Utc::now() };
        self.blueprints.insert(id, bp.clone());
        Ok(bp)
    }

    fn load_blueprint(&self, id: BlueprintId) -> Result<Blueprint, StoreError> {
        self.blueprints
            .get(&id)
            .map(|b| b.value().clone())
            .ok_or(StoreError::NotFound(Missing::Blueprint(id)))
    }

    fn define_steps(&self, id: BlueprintId, draft: &StepDraft) -> Result<Blueprint, StoreError> {
        let mut slot = self.blueprints
                           .get_mut(&id)
                           .ok_or(StoreError::NotFound(Missing::Blueprint(id)))?;
        if slot.is_defined() {
            return Err(StoreError::AlreadyDefined(id));
        }
        let persisted: Vec<Step> = draft.new_steps()
                                        .map(|s| Step { id: StepId(Self::next_id(&self.next_step_id)),
                                                        blueprint_id: id,
                                                        name: s.name.clone(),
                                                        return_value: s.return_value })
                                        .collect();
        let table = draft.resolve(&persisted)
                         .map_err(|e| StoreError::Backend(e.to_string()))?;
        for step in persisted {
            self.steps.insert(step.id, step);
        }
        slot.execution_table = table;
        debug!("define_steps blueprint={id} steps={}", draft.len());
        Ok(slot.value().clone())
    }

    fn list_steps(&self, id: BlueprintId) -> Result<Vec<Step>, StoreError> {
        if !self.blueprints.contains_key(&id) {
            return Err(StoreError::NotFound(Missing::Blueprint(id)));
        }
        // Los ids son crecientes en orden de inserción.
        let mut steps: Vec<Step> = self.steps
                                       .iter()
                                       .filter(|s| s.blueprint_id == id)
                                       .map(|s| s.value().clone())
                                       .collect();
        steps.sort_by_key(|s| s.id);
        Ok(steps)
    }

    fn load_step(&self, id: StepId) -> Result<Step, StoreError> {
        self.steps
            .get(&id)
            .map(|s| s.value().clone())
            .ok_or(StoreError::NotFound(Missing::Step(id)))
    }

    fn set_step_return_value(&self, id: StepId, value: Option<i32>) -> Result<Step, StoreError> {
        let mut step = self.steps
                           .get_mut(&id)
                           .ok_or(StoreError::NotFound(Missing::Step(id)))?;
        step.return_value = value;
        Ok(step.value().clone())
    }

    fn delete_blueprint(&self, id: BlueprintId) -> Result<(), StoreError> {
        self.blueprints
            .remove(&id)
            .ok_or(StoreError::NotFound(Missing::Blueprint(id)))?;
        self.steps.retain(|_, s| s.blueprint_id != id);
        Ok(())
    }
}

#[cfg(test)]
impl InMemoryBlueprintRepository {
    /// Guarda el blueprint tal cual, sin validar su tabla.
    pub(crate) fn overwrite_blueprint(&self, bp: Blueprint) {
        self.blueprints.insert(bp.id, bp);
    }
}

#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    jobs: DashMap<JobId, Job>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobRepository for InMemoryJobRepository {
    fn insert_job(&self, job: &Job) -> Result<Job, StoreError> {
        let mut stored = job.clone();
        stored.version = 0;
        stored.updated_at = Utc::now();
        self.jobs.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn load_job(&self, id: JobId) -> Result<Job, StoreError> {
        self.jobs
            .get(&id)
            .map(|j| j.value().clone())
            .ok_or(StoreError::NotFound(Missing::Job(id)))
    }

    fn save_job(&self, job: &Job) -> Result<Job, StoreError> {
        let mut slot = self.jobs
                           .get_mut(&job.id)
                           .ok_or(StoreError::NotFound(Missing::Job(job.id)))?;
        if slot.version != job.version {
            debug!("save_job conflict job={} stored_version={} given={}",
                   job.id,
                   slot.version,
                   job.version);
            return Err(StoreError::VersionConflict(job.id));
        }
        let mut next = job.clone();
        next.version += 1;
        next.updated_at = Utc::now();
        *slot = next.clone();
        Ok(next)
    }

    fn list_jobs(&self, blueprint_id: BlueprintId) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self.jobs
                                     .iter()
                                     .filter(|j| j.blueprint_id == blueprint_id)
                                     .map(|j| j.value().clone())
                                     .collect();
        jobs.sort_by_key(|j| j.updated_at);
        Ok(jobs)
    }

    fn delete_jobs_for(&self, blueprint_id: BlueprintId) -> Result<usize, StoreError> {
        let before = self.jobs.len();
        self.jobs.retain(|_, j| j.blueprint_id != blueprint_id);
        Ok(before - self.jobs.len())
    }
}
