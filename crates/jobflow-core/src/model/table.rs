//! Tabla de ejecución de un blueprint y su borrador previo a persistir.
//!
//! Flujo de `set_steps`:
//! 1. `StepDraft::new` valida las entradas del llamador (índices contiguos,
//!    destinos de `GO_TO_STEP` dentro de la tabla).
//! 2. El repositorio persiste `draft.new_steps()` en el orden recibido.
//! 3. `StepDraft::resolve` construye una `ExecutionTable` nueva con los ids
//!    asignados. El borrador no se modifica.
use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Action, NewStep, Step, StepId, StepSpec};
use crate::errors::{InvalidTransition, JobflowError};

/// Entrada persistida: `{step_id, accept, reject?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEntry {
    pub step_id: StepId,
    pub accept: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject: Option<Action>,
}

/// Mapa ordenado índice → entrada. Serializa con claves string ("0", "1", ...).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionTable {
    entries: BTreeMap<usize, TransitionEntry>,
}

impl ExecutionTable {
    pub fn entry(&self, index: usize) -> Option<&TransitionEntry> {
        self.entries.get(&index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &TransitionEntry)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Ids de steps referenciados, en orden de índice.
    pub fn step_ids(&self) -> Vec<StepId> {
        self.entries.values().map(|e| e.step_id).collect()
    }
}

/// Entradas validadas de `set_steps`, en el orden en que llegaron.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDraft {
    entries: IndexMap<usize, StepSpec>,
}

impl StepDraft {
    pub fn new<I>(entries: I) -> Result<Self, JobflowError>
        where I: IntoIterator<Item = (usize, StepSpec)>
    {
        let mut map: IndexMap<usize, StepSpec> = IndexMap::new();
        for (index, spec) in entries {
            if map.insert(index, spec).is_some() {
                return Err(JobflowError::InvalidDefinition(format!("duplicate step index {index}")));
            }
        }
        if map.is_empty() {
            return Err(JobflowError::InvalidDefinition("a blueprint needs at least one step".into()));
        }
        let n = map.len();
        if let Some(bad) = map.keys().find(|i| **i >= n) {
            return Err(JobflowError::InvalidDefinition(format!("step indices must be contiguous from 0, found {bad} with {n} steps")));
        }
        for (from, spec) in &map {
            for action in std::iter::once(&spec.accept).chain(spec.reject.as_ref()) {
                if let Some(target) = action.target() {
                    if target >= n {
                        return Err(InvalidTransition::TargetOutOfRange { from: *from, target }.into());
                    }
                }
            }
        }
        Ok(Self { entries: map })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Steps a persistir, en el orden recibido.
    pub fn new_steps(&self) -> impl Iterator<Item = &NewStep> {
        self.entries.values().map(|s| &s.step)
    }

    /// Construye la tabla a partir de los steps ya persistidos. `persisted`
    /// debe venir en el mismo orden que `new_steps()`.
    pub fn resolve(&self, persisted: &[Step]) -> Result<ExecutionTable, JobflowError> {
        if persisted.len() != self.entries.len() {
            return Err(JobflowError::Storage(format!("expected {} persisted steps, got {}",
                                                     self.entries.len(),
                                                     persisted.len())));
        }
        let entries = self.entries
                          .iter()
                          .zip(persisted)
                          .map(|((index, spec), step)| {
                              (*index,
                               TransitionEntry { step_id: step.id,
                                                 accept: spec.accept,
                                                 reject: spec.reject })
                          })
                          .collect();
        Ok(ExecutionTable { entries })
    }
}
