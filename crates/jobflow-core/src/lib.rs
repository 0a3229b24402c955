//! jobflow-core: motor mínimo de workflows (blueprint + job).
//!
//! - `model`: acciones, steps, tabla de ejecución y máquina de estados del job.
//! - `repo`: contratos de persistencia y repositorios en memoria.
//! - `engine`: `JobEngine`, que aplica cada operación como una unidad
//!   leer -> calcular -> guardar con control optimista de versión.
pub mod engine;
pub mod errors;
pub mod model;
pub mod repo;

pub use engine::JobEngine;
pub use errors::{InvalidTransition, JobflowError, Missing, StoreError};
pub use model::{Action, ActionParseError, Blueprint, BlueprintId, ExecutionTable, Job, JobId, JobState, NewStep, Step, StepDraft, StepId,
                StepSpec, Transition, TransitionEntry};
pub use repo::{BlueprintRepository, InMemoryBlueprintRepository, InMemoryJobRepository, JobRepository};
