//! Contratos de persistencia: tres registros (blueprint, step, job).
//!
//! Reglas que toda implementación debe cumplir:
//! - `define_steps` es atómico: o se persisten todos los steps y la tabla, o
//!   nada. Si el blueprint ya tiene tabla devuelve `StoreError::AlreadyDefined`.
//! - `list_steps` devuelve los steps en el orden en que se definieron.
//! - `delete_blueprint` borra en cascada sus steps.
//! - `save_job` sólo escribe si `job.version` coincide con la versión
//!   almacenada (compare-and-swap) y devuelve el job con la versión nueva.
use crate::errors::StoreError;
use crate::model::{Blueprint, BlueprintId, Job, JobId, Step, StepDraft, StepId};

pub trait BlueprintRepository: Send + Sync {
    fn create_blueprint(&self, name: &str) -> Result<Blueprint, StoreError>;
    fn load_blueprint(&self, id: BlueprintId) -> Result<Blueprint, StoreError>;
    /// Persiste los steps del borrador y la tabla resuelta, devolviendo el
    /// blueprint actualizado.
    fn define_steps(&self, id: BlueprintId, draft: &StepDraft) -> Result<Blueprint, StoreError>;
    fn list_steps(&self, id: BlueprintId) -> Result<Vec<Step>, StoreError>;
    fn load_step(&self, id: StepId) -> Result<Step, StoreError>;
    fn set_step_return_value(&self, id: StepId, value: Option<i32>) -> Result<Step, StoreError>;
    fn delete_blueprint(&self, id: BlueprintId) -> Result<(), StoreError>;
}

pub trait JobRepository: Send + Sync {
    /// Inserta un job nuevo (versión 0).
    fn insert_job(&self, job: &Job) -> Result<Job, StoreError>;
    fn load_job(&self, id: JobId) -> Result<Job, StoreError>;
    fn save_job(&self, job: &Job) -> Result<Job, StoreError>;
    fn list_jobs(&self, blueprint_id: BlueprintId) -> Result<Vec<Job>, StoreError>;
    /// Borra los jobs de un blueprint; devuelve cuántos había.
    fn delete_jobs_for(&self, blueprint_id: BlueprintId) -> Result<usize, StoreError>;
}
