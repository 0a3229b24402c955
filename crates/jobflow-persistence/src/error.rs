//! `PersistenceError`: lo que puede fallar hablando con Postgres.
//! Los repositorios lo convierten en `StoreError` al devolver; los resultados
//! de dominio (`Store`) pasan intactos.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use jobflow_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("not found")]
    NotFound,
    #[error("serialization conflict (retryable)")]
    SerializationConflict,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("configuration error: {0}")]
    Config(String),
    /// Fila que no respeta el modelo (JSON inválido, estado desconocido...).
    #[error("corrupt row: {0}")]
    Decode(String),
    /// Resultado de dominio decidido dentro de una transacción (provoca rollback).
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(kind, info) => {
                let msg = info.message().to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(msg),
                    DatabaseErrorKind::CheckViolation => Self::CheckViolation(msg),
                    DatabaseErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(msg),
                    DatabaseErrorKind::SerializationFailure => Self::SerializationConflict,
                    DatabaseErrorKind::ClosedConnection => Self::TransientIo(msg),
                    other => Self::Unknown(format!("{other:?}: {msg}")),
                }
            }
            DieselError::NotFound => Self::NotFound,
            DieselError::DeserializationError(e) => Self::Decode(e.to_string()),
            DieselError::BrokenTransactionManager => Self::TransientIo("transaction manager left in a broken state".into()),
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Store(inner) => inner,
            other => StoreError::Backend(other.to_string()),
        }
    }
}
