//! Flujo de ejemplo "revisión de documento".
//!
//! draft (0) -> review (1) -> publish (2). Un rechazo en `review` vuelve a
//! `draft`; la demo rechaza una vez y luego acepta hasta terminar.
use jobflow_core::{Action, BlueprintId, BlueprintRepository, JobEngine, JobId, JobRepository, JobState, NewStep, StepSpec};
use log::info;
use serde::Serialize;
use serde_json::json;

use crate::errors::AppError;

/// Resultado observable de una ejecución de la demo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoReport {
    pub blueprint_id: BlueprintId,
    pub job_id: JobId,
    /// Nombres de los steps visitados, en orden.
    pub visited: Vec<String>,
    pub final_state: JobState,
    pub version: i64,
}

pub fn review_steps() -> Vec<(usize, StepSpec)> {
    vec![(0, StepSpec::new(NewStep::named("draft"), Action::GoToStep(1))),
         (1, StepSpec::new(NewStep::named("review").with_return_value(1), Action::GoToStep(2)).with_reject(Action::GoToStep(0))),
         (2, StepSpec::new(NewStep::named("publish"), Action::EndJob).with_reject(Action::EndJob))]
}

pub fn run_demo<B, J>(engine: &JobEngine<B, J>) -> Result<DemoReport, AppError>
    where B: BlueprintRepository,
          J: JobRepository
{
    let bp = engine.create_blueprint("document-review")?;
    let bp = engine.set_steps(bp.id, review_steps())?;
    let job = engine.create_job(bp.id)?;

    let mut visited = vec![engine.start(job.id)?.name];
    engine.set_data_for_step(job.id, 0, json!({"title": "jobflow"}))?;

    engine.accept_step(job.id)?;
    visited.push(engine.current_step(job.id)?.name);
    engine.set_data_for_step(job.id, 1, json!({"comments": ["más detalle"]}))?;

    engine.reject_step(job.id)?;
    visited.push(engine.current_step(job.id)?.name);

    let mut current = engine.accept_step(job.id)?;
    while current.state != JobState::Finished {
        visited.push(engine.current_step(job.id)?.name);
        current = engine.accept_step(job.id)?;
    }
    info!("demo job {} finished after {} steps", current.id, visited.len());

    Ok(DemoReport { blueprint_id: bp.id,
                    job_id: current.id,
                    visited,
                    final_state: current.state,
                    version: current.version })
}
