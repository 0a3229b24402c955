//! Errores del core.
//!
//! - `JobflowError`: lo que ve el llamador de `JobEngine`.
//! - `StoreError`: contrato de los repositorios (cualquier backend).
//! - `Missing` / `InvalidTransition`: detalle tipado para que el llamador
//!   distinga "todavía no hay datos" de "referencia corrupta".

use thiserror::Error;

use crate::model::{BlueprintId, JobId, StepId};

/// Qué búsqueda falló.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Missing {
    #[error("blueprint {0}")] Blueprint(BlueprintId),
    #[error("step {0}")] Step(StepId),
    #[error("job {0}")] Job(JobId),
    #[error("execution table entry at index {index}")] Entry { index: usize },
    #[error("no data for step index {index}")] Data { index: usize },
    #[error("job {0} has no current step")] CurrentStep(JobId),
}

/// Transiciones que el motor se niega a aplicar.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum InvalidTransition {
    #[error("job already started")] AlreadyStarted,
    #[error("job not started")] NotStarted,
    #[error("blueprint has no execution table")] BlueprintNotDefined,
    #[error("GO_TO_STEP {target} from index {from} points outside the execution table")] TargetOutOfRange { from: usize, target: usize },
    #[error("entry at index {index} has no reject action")] NoRejectAction { index: usize },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum JobflowError {
    /// El job ya terminó: error lógico del driver, nunca se reintenta.
    #[error("job {0} already finished")] AlreadyFinished(JobId),
    #[error("not found: {0}")] NotFound(Missing),
    #[error("invalid transition: {0}")] InvalidTransition(InvalidTransition),
    #[error("invalid blueprint definition: {0}")] InvalidDefinition(String),
    /// Otro llamador guardó el job entre nuestra lectura y nuestra escritura.
    #[error("job {0} was modified concurrently")] ConcurrentModification(JobId),
    #[error("storage error: {0}")] Storage(String),
}

impl From<Missing> for JobflowError {
    fn from(m: Missing) -> Self {
        Self::NotFound(m)
    }
}

impl From<InvalidTransition> for JobflowError {
    fn from(t: InvalidTransition) -> Self {
        Self::InvalidTransition(t)
    }
}

/// Errores que un repositorio puede devolver.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StoreError {
    #[error("not found: {0}")] NotFound(Missing),
    #[error("version conflict on job {0}")] VersionConflict(JobId),
    #[error("blueprint {0} already has an execution table")] AlreadyDefined(BlueprintId),
    #[error("backend: {0}")] Backend(String),
}

impl From<StoreError> for JobflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(m) => Self::NotFound(m),
            StoreError::VersionConflict(id) => Self::ConcurrentModification(id),
            StoreError::AlreadyDefined(id) => Self::InvalidDefinition(format!("blueprint {id} already has an execution table")),
            StoreError::Backend(msg) => Self::Storage(msg),
        }
    }
}
