//! Máquina de estados de un job.
//!
//! Transiciones válidas:
//! - `NotStarted` -> `Started` (start, índice 0)
//! - `Started` -> `Started` (GO_TO_STEP n)
//! - `Started` -> `Finished` (END_JOB)
//!
//! Los métodos de este módulo son puros respecto al almacenamiento: mutan el
//! `Job` en memoria y el `JobEngine` decide cuándo persistir.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Action, BlueprintId, ExecutionTable, JobId, TransitionEntry};
use crate::errors::{InvalidTransition, JobflowError, Missing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    #[serde(rename = "NS")] NotStarted,
    #[serde(rename = "S")] Started,
    #[serde(rename = "F")] Finished,
}

impl JobState {
    /// Código corto usado en la columna `jobs.state`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotStarted => "NS",
            Self::Started => "S",
            Self::Finished => "F",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NS" => Some(Self::NotStarted),
            "S" => Some(Self::Started),
            "F" => Some(Self::Finished),
            _ => None,
        }
    }
}

/// Resultado observable de un accept/reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved { from: usize, to: usize },
    Finished { from: usize },
}

/// Qué acción de la entrada actual se aplica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub blueprint_id: BlueprintId,
    pub current_execution_step: Option<usize>,
    pub state: JobState,
    /// Payload por índice de step; serializa con claves string.
    pub data: BTreeMap<usize, Value>,
    /// Versión para control optimista; la incrementa el repositorio en cada save.
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(blueprint_id: BlueprintId) -> Self {
        Self { id: JobId::new(),
               blueprint_id,
               current_execution_step: None,
               state: JobState::NotStarted,
               data: BTreeMap::new(),
               version: 0,
               updated_at: Utc::now() }
    }

    pub fn is_finished(&self) -> bool {
        self.state == JobState::Finished
    }

    /// Comprueba la coherencia estado/índice (p.ej. al leer de un backend).
    pub fn check_invariants(&self) -> Result<(), String> {
        match (self.state, self.current_execution_step) {
            (JobState::NotStarted, None) | (JobState::Finished, None) | (JobState::Started, Some(_)) => Ok(()),
            (state, idx) => Err(format!("job {} has state {:?} with index {:?}", self.id, state, idx)),
        }
    }

    pub fn start(&mut self, table: &ExecutionTable) -> Result<(), JobflowError> {
        match self.state {
            JobState::NotStarted => {}
            JobState::Started => return Err(InvalidTransition::AlreadyStarted.into()),
            JobState::Finished => return Err(JobflowError::AlreadyFinished(self.id)),
        }
        if !table.contains(0) {
            return Err(InvalidTransition::BlueprintNotDefined.into());
        }
        self.state = JobState::Started;
        self.current_execution_step = Some(0);
        Ok(())
    }

    /// Entrada de la tabla para el índice actual.
    pub fn current_entry<'t>(&self, table: &'t ExecutionTable) -> Result<&'t TransitionEntry, JobflowError> {
        let index = self.current_execution_step
                        .ok_or(Missing::CurrentStep(self.id))?;
        table.entry(index)
             .ok_or_else(|| Missing::Entry { index }.into())
    }

    pub fn accept(&mut self, table: &ExecutionTable) -> Result<Transition, JobflowError> {
        self.advance(table, Decision::Accept)
    }

    pub fn reject(&mut self, table: &ExecutionTable) -> Result<Transition, JobflowError> {
        self.advance(table, Decision::Reject)
    }

    fn advance(&mut self, table: &ExecutionTable, decision: Decision) -> Result<Transition, JobflowError> {
        // Guardia terminal primero: un job terminado no se toca.
        if self.is_finished() {
            return Err(JobflowError::AlreadyFinished(self.id));
        }
        let from = match (self.state, self.current_execution_step) {
            (JobState::Started, Some(index)) => index,
            _ => return Err(InvalidTransition::NotStarted.into()),
        };
        let entry = self.current_entry(table)?;
        let action = match decision {
            Decision::Accept => entry.accept,
            Decision::Reject => entry.reject
                                     .ok_or(InvalidTransition::NoRejectAction { index: from })?,
        };
        match action {
            Action::GoToStep(target) => {
                if !table.contains(target) {
                    return Err(InvalidTransition::TargetOutOfRange { from, target }.into());
                }
                self.current_execution_step = Some(target);
                Ok(Transition::Moved { from, to: target })
            }
            Action::EndJob => {
                self.state = JobState::Finished;
                self.current_execution_step = None;
                Ok(Transition::Finished { from })
            }
        }
    }

    pub fn data_for_step(&self, index: usize) -> Result<&Value, JobflowError> {
        self.data
            .get(&index)
            .ok_or_else(|| Missing::Data { index }.into())
    }

    /// Sobrescribe el payload del índice. No exige que el step se haya visitado.
    pub fn set_data_for_step(&mut self, index: usize, payload: Value) {
        self.data.insert(index, payload);
    }
}
