//! `Action`: directiva de transición de una entrada de la tabla.
//!
//! En memoria es un enum etiquetado. La gramática de texto (`"END_JOB"` y
//! `"GO_TO_STEP <n>"`) sólo existe en el borde de serialización, para seguir
//! leyendo tablas guardadas con ese formato.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const END_JOB: &str = "END_JOB";
const GO_TO_STEP: &str = "GO_TO_STEP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    /// Termina el job.
    EndJob,
    /// Salta al índice indicado de la tabla de ejecución.
    GoToStep(usize),
}

impl Action {
    pub fn end_job() -> Self {
        Self::EndJob
    }

    pub fn go_to_step(index: usize) -> Self {
        Self::GoToStep(index)
    }

    /// Índice destino, si la acción es un salto.
    pub fn target(&self) -> Option<usize> {
        match self {
            Self::EndJob => None,
            Self::GoToStep(n) => Some(*n),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ActionParseError {
    #[error("empty action")] Empty,
    #[error("unknown action command `{0}`")] UnknownCommand(String),
    #[error("`{command}` expects {expected} argument(s), got {got}")] Arity { command: &'static str, expected: usize, got: usize },
    #[error("invalid step index `{0}`")] InvalidIndex(String),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndJob => f.write_str(END_JOB),
            Self::GoToStep(n) => write!(f, "{GO_TO_STEP} {n}"),
        }
    }
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Separador: exactamente un espacio (no se normalizan espacios extra).
        let tokens: Vec<&str> = s.split(' ').collect();
        match tokens.as_slice() {
            [""] => Err(ActionParseError::Empty),
            [END_JOB] => Ok(Self::EndJob),
            [END_JOB, rest @ ..] => Err(ActionParseError::Arity { command: END_JOB,
                                                                  expected: 0,
                                                                  got: rest.len() }),
            [GO_TO_STEP, arg] => {
                if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ActionParseError::InvalidIndex(arg.to_string()));
                }
                arg.parse::<usize>()
                   .map(Self::GoToStep)
                   .map_err(|_| ActionParseError::InvalidIndex(arg.to_string()))
            }
            [GO_TO_STEP, rest @ ..] => Err(ActionParseError::Arity { command: GO_TO_STEP,
                                                                     expected: 1,
                                                                     got: rest.len() }),
            [other, ..] => Err(ActionParseError::UnknownCommand(other.to_string())),
            [] => Err(ActionParseError::Empty),
        }
    }
}

impl TryFrom<String> for Action {
    type Error = ActionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_two_token_grammar() {
        assert_eq!(Action::EndJob.to_string(), "END_JOB");
        assert_eq!(Action::GoToStep(12).to_string(), "GO_TO_STEP 12");
    }

    #[test]
    fn parses_stored_actions() {
        assert_eq!("END_JOB".parse::<Action>(), Ok(Action::EndJob));
        assert_eq!("GO_TO_STEP 3".parse::<Action>(), Ok(Action::GoToStep(3)));
    }

    #[test]
    fn rejects_malformed_actions() {
        assert_eq!("".parse::<Action>(), Err(ActionParseError::Empty));
        assert!(matches!("GO_TO_STEP".parse::<Action>(), Err(ActionParseError::Arity { expected: 1, got: 0, .. })));
        assert!(matches!("GO_TO_STEP 1 2".parse::<Action>(), Err(ActionParseError::Arity { expected: 1, got: 2, .. })));
        assert!(matches!("GO_TO_STEP  1".parse::<Action>(), Err(ActionParseError::Arity { .. })));
        assert_eq!("GO_TO_STEP -1".parse::<Action>(), Err(ActionParseError::InvalidIndex("-1".into())));
        assert_eq!("GO_TO_STEP +1".parse::<Action>(), Err(ActionParseError::InvalidIndex("+1".into())));
        assert!(matches!("END_JOB now".parse::<Action>(), Err(ActionParseError::Arity { expected: 0, .. })));
        assert_eq!("end_job".parse::<Action>(), Err(ActionParseError::UnknownCommand("end_job".into())));
    }

    #[test]
    fn serde_uses_text_form() {
        let v = serde_json::to_value(Action::GoToStep(2)).unwrap();
        assert_eq!(v, serde_json::json!("GO_TO_STEP 2"));
        let back: Action = serde_json::from_value(serde_json::json!("END_JOB")).unwrap();
        assert_eq!(back, Action::EndJob);
        assert!(serde_json::from_value::<Action>(serde_json::json!("JUMP 2")).is_err());
    }
}
