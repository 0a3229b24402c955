use serde::{Deserialize, Serialize};

use super::{Action, BlueprintId, StepId};

/// Etapa con nombre dentro de un blueprint.
///
/// Una vez adjuntado sólo cambia `return_value`, cuyo significado lo define
/// el llamador (el motor no lo interpreta).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub blueprint_id: BlueprintId,
    pub name: String,
    pub return_value: Option<i32>,
}

/// Step todavía no persistido (sin id ni blueprint).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewStep {
    pub name: String,
    pub return_value: Option<i32>,
}

impl NewStep {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               return_value: None }
    }

    pub fn with_return_value(mut self, value: i32) -> Self {
        self.return_value = Some(value);
        self
    }
}

/// Una entrada tal como la entrega el llamador a `set_steps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    pub step: NewStep,
    pub accept: Action,
    pub reject: Option<Action>,
}

impl StepSpec {
    pub fn new(step: NewStep, accept: Action) -> Self {
        Self { step,
               accept,
               reject: None }
    }

    pub fn with_reject(mut self, reject: Action) -> Self {
        self.reject = Some(reject);
        self
    }
}
