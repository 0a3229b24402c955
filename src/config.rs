//! Configuración de la aplicación.
//! Lee variables de entorno (.env incluido) y decide el backend de la demo.
use std::env;

use crate::errors::AppError;

/// Backend de almacenamiento del engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: Backend,
}

impl AppConfig {
    /// `JOBFLOW_BACKEND` = `memory` | `postgres`. Sin valor: Postgres si hay
    /// `DATABASE_URL`, memoria en otro caso.
    pub fn from_env() -> Result<Self, AppError> {
        jobflow_persistence::init_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
        where F: Fn(&str) -> Option<String>
    {
        let backend = match lookup("JOBFLOW_BACKEND").as_deref() {
            Some("memory") => Backend::Memory,
            Some("postgres") => Backend::Postgres,
            Some(other) => return Err(AppError::Config(format!("JOBFLOW_BACKEND desconocido: {other}"))),
            None if lookup("DATABASE_URL").is_some() => Backend::Postgres,
            None => Backend::Memory,
        };
        Ok(Self { backend })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_defaults_follow_database_url() {
        let cfg = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.backend, Backend::Memory);
        let cfg = AppConfig::from_lookup(|k| (k == "DATABASE_URL").then(|| "postgres://x".to_string())).unwrap();
        assert_eq!(cfg.backend, Backend::Postgres);
    }

    #[test]
    fn explicit_backend_wins() {
        let cfg = AppConfig::from_lookup(|k| match k {
                                   "JOBFLOW_BACKEND" => Some("memory".into()),
                                   "DATABASE_URL" => Some("postgres://x".into()),
                                   _ => None,
                               }).unwrap();
        assert_eq!(cfg.backend, Backend::Memory);
        let err = AppConfig::from_lookup(|k| (k == "JOBFLOW_BACKEND").then(|| "sqlite".to_string())).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
