//! Engine module for JobEngine implementation
//!
//! Orquesta blueprints y jobs sobre los repositorios, con guardado
//! optimista por versión en cada mutación de un job.

pub mod core;

pub use self::core::JobEngine;

pub use crate::model::{Action, Blueprint, Job, JobState, Step};
pub use crate::repo::{BlueprintRepository, InMemoryBlueprintRepository, InMemoryJobRepository, JobRepository};
