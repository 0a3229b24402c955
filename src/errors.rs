use jobflow_core::JobflowError;
use jobflow_persistence::PersistenceError;
use thiserror::Error;

/// Errores de la aplicación (binario de demo y facade).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error del motor: {0}")]
    Engine(#[from] JobflowError),
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Error de configuración: {0}")]
    Config(String),
}

impl AppError {
    /// Código de salida del proceso para este error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Engine(_) => 4,
            Self::Persistence(_) => 5,
        }
    }
}
