//! Modelo: capa de blueprint (acciones, steps, tabla) y capa de ejecución (job).

mod action;
mod blueprint;
mod ids;
pub mod job;
mod step;
mod table;

pub use action::{Action, ActionParseError};
pub use blueprint::Blueprint;
pub use ids::{BlueprintId, JobId, StepId};
pub use job::{Decision, Job, JobState, Transition};
pub use step::{NewStep, Step, StepSpec};
pub use table::{ExecutionTable, StepDraft, TransitionEntry};
