//! jobflow: motor mínimo de workflows.
//!
//! El modelo y el engine viven en `jobflow-core`; el backend Postgres en
//! `jobflow-persistence`. Este crate añade la configuración de la aplicación
//! y la demo usada por el binario `jobflow-demo`.

pub mod config;
pub mod demo;
pub mod errors;

pub use jobflow_core;
pub use jobflow_persistence;

pub use config::{AppConfig, Backend};
pub use demo::{run_demo, DemoReport};
pub use errors::AppError;
