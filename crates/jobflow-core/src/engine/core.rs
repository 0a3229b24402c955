//! Core JobEngine implementation

use log::{debug, info, warn};
use serde_json::Value;

use crate::errors::{JobflowError, Missing};
use crate::model::{Blueprint, BlueprintId, Decision, Job, JobId, Step, StepDraft, StepId, StepSpec, Transition};
use crate::repo::{BlueprintRepository, InMemoryBlueprintRepository, InMemoryJobRepository, JobRepository};

/// Motor de ejecución de jobs.
///
/// No avanza nada por sí solo: cada operación pública es una unidad completa
/// leer -> calcular -> guardar. Los guardados de jobs llevan la versión leída,
/// así dos `accept_step` concurrentes sobre el mismo job no pueden avanzar
/// ambos desde el mismo estado: el segundo recibe `ConcurrentModification`.
#[derive(Debug)]
pub struct JobEngine<B, J>
    where B: BlueprintRepository,
          J: JobRepository
{
    blueprints: B,
    jobs: J,
}

impl JobEngine<InMemoryBlueprintRepository, InMemoryJobRepository> {
    /// Engine con repositorios en memoria.
    pub fn in_memory() -> Self {
        Self::new_with_stores(InMemoryBlueprintRepository::new(), InMemoryJobRepository::new())
    }
}

impl Default for JobEngine<InMemoryBlueprintRepository, InMemoryJobRepository> {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl<B, J> JobEngine<B, J>
    where B: BlueprintRepository,
          J: JobRepository
{
    pub fn new_with_stores(blueprints: B, jobs: J) -> Self {
        Self { blueprints, jobs }
    }

    pub fn blueprint_store(&self) -> &B {
        &self.blueprints
    }

    pub fn job_store(&self) -> &J {
        &self.jobs
    }

    // ---------------------------------------------------------------------
    // Blueprints
    // ---------------------------------------------------------------------

    pub fn create_blueprint(&self, name: &str) -> Result<Blueprint, JobflowError> {
        let bp = self.blueprints.create_blueprint(name)?;
        debug!("create_blueprint id={} name={}", bp.id, bp.name);
        Ok(bp)
    }

    pub fn blueprint(&self, id: BlueprintId) -> Result<Blueprint, JobflowError> {
        Ok(self.blueprints.load_blueprint(id)?)
    }

    /// Adjunta los steps y fija la tabla de ejecución (una sola vez).
    ///
    /// `entries` es la secuencia `(índice, spec)` del llamador; se valida
    /// completa antes de tocar el almacenamiento y no se modifica.
    pub fn set_steps<I>(&self, id: BlueprintId, entries: I) -> Result<Blueprint, JobflowError>
        where I: IntoIterator<Item = (usize, StepSpec)>
    {
        let draft = StepDraft::new(entries).inspect_err(|e| warn!("set_steps rejected blueprint={id}: {e}"))?;
        let bp = self.blueprints.define_steps(id, &draft)?;
        info!("blueprint {} defined with {} steps", bp.id, bp.execution_table.len());
        Ok(bp)
    }

    /// Steps del blueprint en el orden en que se definieron.
    pub fn steps(&self, id: BlueprintId) -> Result<Vec<Step>, JobflowError> {
        Ok(self.blueprints.list_steps(id)?)
    }

    pub fn set_step_return_value(&self, id: StepId, value: Option<i32>) -> Result<Step, JobflowError> {
        Ok(self.blueprints.set_step_return_value(id, value)?)
    }

    /// Borra el blueprint junto con sus steps y jobs.
    ///
    /// El blueprint se borra primero: desde ahí `create_job` falla, y el
    /// barrido de jobs posterior recoge cualquiera creado en medio.
    pub fn delete_blueprint(&self, id: BlueprintId) -> Result<(), JobflowError> {
        self.blueprints.delete_blueprint(id)?;
        let removed = self.jobs.delete_jobs_for(id)?;
        info!("blueprint {id} deleted ({removed} jobs)");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Jobs
    // ---------------------------------------------------------------------

    pub fn create_job(&self, blueprint_id: BlueprintId) -> Result<Job, JobflowError> {
        self.blueprints.load_blueprint(blueprint_id)?;
        let job = self.jobs.insert_job(&Job::new(blueprint_id))?;
        debug!("create_job id={} blueprint={}", job.id, blueprint_id);
        Ok(job)
    }

    pub fn job(&self, id: JobId) -> Result<Job, JobflowError> {
        Ok(self.jobs.load_job(id)?)
    }

    pub fn jobs_for(&self, blueprint_id: BlueprintId) -> Result<Vec<Job>, JobflowError> {
        Ok(self.jobs.list_jobs(blueprint_id)?)
    }

    /// Carga un job junto con su blueprint.
    fn load_pair(&self, id: JobId) -> Result<(Job, Blueprint), JobflowError> {
        let job = self.jobs.load_job(id)?;
        let bp = self.blueprints.load_blueprint(job.blueprint_id)?;
        Ok((job, bp))
    }

    /// Pasa el job a `Started` en el índice 0 y devuelve el step actual.
    pub fn start(&self, id: JobId) -> Result<Step, JobflowError> {
        let (mut job, bp) = self.load_pair(id)?;
        job.start(&bp.execution_table)
           .inspect_err(|e| warn!("start rejected job={id}: {e}"))?;
        let saved = self.jobs.save_job(&job)?;
        info!("job {id} started on blueprint {}", bp.id);
        self.resolve_current_step(&saved, &bp)
    }

    /// Step correspondiente al índice actual del job.
    pub fn current_step(&self, id: JobId) -> Result<Step, JobflowError> {
        let (job, bp) = self.load_pair(id)?;
        self.resolve_current_step(&job, &bp)
    }

    fn resolve_current_step(&self, job: &Job, bp: &Blueprint) -> Result<Step, JobflowError> {
        let entry = job.current_entry(&bp.execution_table)?;
        let step = self.blueprints.load_step(entry.step_id)?;
        // Un step de otro blueprint es una referencia corrupta.
        if step.blueprint_id != bp.id {
            return Err(Missing::Step(entry.step_id).into());
        }
        Ok(step)
    }

    /// Aplica la acción `accept` de la entrada actual.
    pub fn accept_step(&self, id: JobId) -> Result<Job, JobflowError> {
        self.advance(id, Decision::Accept)
    }

    /// Aplica la acción `reject` de la entrada actual.
    pub fn reject_step(&self, id: JobId) -> Result<Job, JobflowError> {
        self.advance(id, Decision::Reject)
    }

    fn advance(&self, id: JobId, decision: Decision) -> Result<Job, JobflowError> {
        let (mut job, bp) = self.load_pair(id)?;
        let outcome = match decision {
            Decision::Accept => job.accept(&bp.execution_table),
            Decision::Reject => job.reject(&bp.execution_table),
        };
        let transition = outcome.inspect_err(|e| warn!("{decision:?} rejected job={id}: {e}"))?;
        let saved = self.jobs.save_job(&job)?;
        match transition {
            Transition::Moved { from, to } => info!("job {id} {decision:?}: step {from} -> {to}"),
            Transition::Finished { from } => info!("job {id} {decision:?}: finished at step {from}"),
        }
        Ok(saved)
    }

    // ---------------------------------------------------------------------
    // Datos por step
    // ---------------------------------------------------------------------

    pub fn get_data_for_step(&self, id: JobId, index: usize) -> Result<Value, JobflowError> {
        let job = self.jobs.load_job(id)?;
        job.data_for_step(index).cloned()
    }

    pub fn set_data_for_step(&self, id: JobId, index: usize, payload: Value) -> Result<Job, JobflowError> {
        let mut job = self.jobs.load_job(id)?;
        job.set_data_for_step(index, payload);
        let saved = self.jobs.save_job(&job)?;
        debug!("set_data_for_step job={id} index={index} version={}", saved.version);
        Ok(saved)
    }
}
